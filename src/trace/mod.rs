use crate::graph::BlockKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

mod audit;
mod formatter;

pub use audit::{AuditInput, AuditRecord};
pub use formatter::TraceFormatter;

/// What happened to one block during one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResult {
    pub block_id: String,
    pub kind: BlockKind,
    pub template_id: String,
    /// Whether any upstream signal arrived. Unreached blocks never activate.
    pub reached: bool,
    pub activated: bool,
    /// Values of the output handles that fired, keyed by handle name.
    pub output: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_micros: u64,
}

impl BlockResult {
    /// `true` if the block fired the given output handle.
    pub fn fired(&self, handle: &str) -> bool {
        self.output.contains_key(handle)
    }
}

/// The ordered per-block record of one evaluation.
pub type ExecutionTrace = Vec<BlockResult>;
