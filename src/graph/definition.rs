use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The semantic category of a block. A block's template refines this further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Input,
    Condition,
    Logic,
    Action,
    Data,
    #[serde(alias = "llm", alias = "model_check")]
    ModelCheck,
    Output,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Input => "input",
            BlockKind::Condition => "condition",
            BlockKind::Logic => "logic",
            BlockKind::Action => "action",
            BlockKind::Data => "data",
            BlockKind::ModelCheck => "model-check",
            BlockKind::Output => "output",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an author drew a connection. Advisory only, evaluation ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    #[default]
    Sequential,
    Conditional,
    Parallel,
}

/// A single typed node of a guardrail graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: BlockKind,
    pub template_id: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind, template_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            template_id: template_id.into(),
            config: Map::new(),
        }
    }

    /// Adds a config entry. Mostly useful when assembling graphs in code.
    pub fn with_config(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }
}

/// A directed edge from one block's output handle to another block's input handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub id: String,
    pub source_block_id: String,
    pub source_handle: String,
    pub target_block_id: String,
    pub target_handle: String,
    #[serde(default, alias = "type")]
    pub kind: ConnectionKind,
}

impl Connection {
    pub fn new(
        source_block_id: impl Into<String>,
        source_handle: impl Into<String>,
        target_block_id: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        let source_block_id = source_block_id.into();
        let source_handle = source_handle.into();
        let target_block_id = target_block_id.into();
        let target_handle = target_handle.into();
        Self {
            id: format!(
                "{}:{}->{}:{}",
                source_block_id, source_handle, target_block_id, target_handle
            ),
            source_block_id,
            source_handle,
            target_block_id,
            target_handle,
            kind: ConnectionKind::Sequential,
        }
    }
}

fn default_version() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// The complete, canonical definition of one guardrail policy.
///
/// Block order is significant: it is the declaration order the scheduler uses
/// to break ties between independent blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailGraph {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Publication flag for whoever stores and selects guardrails. The engine
    /// validates and evaluates inactive graphs like any other.
    #[serde(default = "default_active", alias = "is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl GuardrailGraph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            is_active: true,
            blocks: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }
}
