use crate::graph::BlockKind;
use crate::trace::ExecutionTrace;
use serde::Serialize;
use thiserror::Error;

/// Structural problems that make a graph impossible to run. Evaluation never starts.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Graph contains a cycle: {}", .path.join(" -> "))]
    CyclicGraph { path: Vec<String> },

    #[error("Block '{block_id}' has no connection on required input handle '{handle}'")]
    MissingInput { block_id: String, handle: String },

    #[error("Block id '{block_id}' is declared more than once")]
    DuplicateBlock { block_id: String },

    #[error("Block '{block_id}' uses an unregistered template: '{template_id}'")]
    UnknownTemplate {
        block_id: String,
        template_id: String,
    },

    #[error(
        "Block '{block_id}' is declared as '{declared}' but template '{template_id}' is '{expected}'"
    )]
    KindMismatch {
        block_id: String,
        template_id: String,
        declared: BlockKind,
        expected: BlockKind,
    },

    #[error("Block '{missing_block_id}' not found, which is required by connection '{connection_id}'")]
    BlockNotFound {
        missing_block_id: String,
        connection_id: String,
    },

    #[error("Connection '{connection_id}' uses handle '{handle}', which block '{block_id}' does not declare")]
    UnknownHandle {
        connection_id: String,
        block_id: String,
        handle: String,
    },
}

/// Per-block failures. Recorded in the trace, never fatal for the evaluation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Model-check capability failed: {0}")]
    ExternalCapability(String),

    #[error("Model-check capability timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Errors that end an evaluation without a decision.
#[derive(Error, Debug, Clone)]
pub enum EvaluationError {
    #[error("Graph failed validation: {0}")]
    InvalidGraph(#[from] ValidationError),

    #[error("Evaluation cancelled after {completed} block(s)")]
    Cancelled {
        completed: usize,
        trace: ExecutionTrace,
    },
}

/// Errors raised by a model-check capability implementation.
#[derive(Error, Debug, Clone)]
pub enum ModelCheckError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Format(String),
}

/// Errors that can occur when converting a custom authoring format into a `GuardrailGraph`.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("Invalid custom data: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}
