//! Strongly-typed block configuration.
//!
//! Raw block config is an opaque JSON map. Each template deserializes it once,
//! at plan-build time, into one variant of [`BlockEvaluator`]. Evaluation only
//! ever sees the compiled variant.

use crate::error::BlockError;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const DEFAULT_BLOCK_MESSAGE: &str = "Request blocked.";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    And,
    Or,
    Not,
}

/// The side-channel signal an action block emits when it activates.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSignal {
    Block { message: String },
    Allow,
    Warn { warning: String },
    RequireApproval { approvers: Vec<String> },
    Log { level: String, include_message: bool },
}

/// A compiled, ready-to-run block.
#[derive(Debug, Clone)]
pub enum BlockEvaluator {
    InputMessage,
    InputContext {
        field: Option<String>,
    },
    Contains {
        keywords: Vec<String>,
        mode: MatchMode,
    },
    Regex {
        pattern: Regex,
    },
    Role {
        allowed: Vec<String>,
    },
    Logic(Gate),
    Action(ActionSignal),
    DataUser {
        fields: Vec<String>,
    },
    DataPolicy {
        policy_id: String,
        metadata: Map<String, Value>,
    },
    ModelCheck {
        prompt: String,
        temperature: Option<f64>,
        min_confidence: f64,
    },
    Output,
    /// A block whose config could not be compiled. It never activates.
    Invalid(BlockError),
}

/// An explicit `null` means the same as an absent key.
fn parse<T: DeserializeOwned>(config: &Map<String, Value>) -> Result<T, BlockError> {
    let present: Map<String, Value> = config
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    serde_json::from_value(Value::Object(present)).map_err(|e| BlockError::Config(e.to_string()))
}

#[derive(Deserialize)]
struct InputContextConfig {
    #[serde(default)]
    field: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainsConfig {
    keywords: Vec<String>,
    #[serde(default)]
    match_mode: MatchMode,
}

#[derive(Deserialize)]
struct RegexConfig {
    pattern: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleConfig {
    allowed_roles: Vec<String>,
}

#[derive(Deserialize)]
struct BlockActionConfig {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct WarnConfig {
    #[serde(default)]
    warning: Option<String>,
}

#[derive(Deserialize)]
struct ApprovalConfig {
    #[serde(default)]
    approvers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogConfig {
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    include_message: bool,
}

#[derive(Deserialize)]
struct DataUserConfig {
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataPolicyConfig {
    policy_id: String,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelCheckConfig {
    prompt: String,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    min_confidence: Option<f64>,
}

pub(crate) fn input_message(_: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    Ok(BlockEvaluator::InputMessage)
}

pub(crate) fn input_context(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let InputContextConfig { field } = parse(config)?;
    Ok(BlockEvaluator::InputContext { field })
}

pub(crate) fn contains(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let ContainsConfig {
        keywords,
        match_mode,
    } = parse(config)?;
    Ok(BlockEvaluator::Contains {
        keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        mode: match_mode,
    })
}

pub(crate) fn regex(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let RegexConfig { pattern } = parse(config)?;
    let pattern = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| BlockError::Config(format!("invalid pattern: {}", e)))?;
    Ok(BlockEvaluator::Regex { pattern })
}

pub(crate) fn role(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let RoleConfig { allowed_roles } = parse(config)?;
    Ok(BlockEvaluator::Role {
        allowed: allowed_roles.iter().map(|r| r.to_lowercase()).collect(),
    })
}

pub(crate) fn logic_and(_: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    Ok(BlockEvaluator::Logic(Gate::And))
}

pub(crate) fn logic_or(_: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    Ok(BlockEvaluator::Logic(Gate::Or))
}

pub(crate) fn logic_not(_: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    Ok(BlockEvaluator::Logic(Gate::Not))
}

pub(crate) fn action_block(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let BlockActionConfig { message } = parse(config)?;
    Ok(BlockEvaluator::Action(ActionSignal::Block {
        message: message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_BLOCK_MESSAGE.to_string()),
    }))
}

pub(crate) fn action_allow(_: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    Ok(BlockEvaluator::Action(ActionSignal::Allow))
}

pub(crate) fn action_warn(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let WarnConfig { warning } = parse(config)?;
    Ok(BlockEvaluator::Action(ActionSignal::Warn {
        warning: warning.unwrap_or_default(),
    }))
}

pub(crate) fn action_approval(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let ApprovalConfig { approvers } = parse(config)?;
    Ok(BlockEvaluator::Action(ActionSignal::RequireApproval {
        approvers,
    }))
}

pub(crate) fn action_log(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let LogConfig {
        log_level,
        include_message,
    } = parse(config)?;
    Ok(BlockEvaluator::Action(ActionSignal::Log {
        level: log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        include_message,
    }))
}

pub(crate) fn data_user(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let DataUserConfig { fields } = parse(config)?;
    Ok(BlockEvaluator::DataUser { fields })
}

pub(crate) fn data_policy(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let DataPolicyConfig {
        policy_id,
        metadata,
    } = parse(config)?;
    Ok(BlockEvaluator::DataPolicy {
        policy_id,
        metadata,
    })
}

pub(crate) fn model_check(config: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    let ModelCheckConfig {
        prompt,
        temperature,
        min_confidence,
    } = parse(config)?;
    let min_confidence = min_confidence.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(BlockError::Config(format!(
            "minConfidence must be within 0..=1, got {}",
            min_confidence
        )));
    }
    Ok(BlockEvaluator::ModelCheck {
        prompt,
        temperature,
        min_confidence,
    })
}

pub(crate) fn output(_: &Map<String, Value>) -> Result<BlockEvaluator, BlockError> {
    Ok(BlockEvaluator::Output)
}
