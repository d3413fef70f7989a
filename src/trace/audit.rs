use super::ExecutionTrace;
use crate::context::ExecutionContext;
use crate::evaluator::{Decision, EvaluationResult};
use serde::{Deserialize, Serialize};

/// The request fields that are kept in an audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInput {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

/// A self-contained record of one evaluation, ready to be persisted.
///
/// The engine does not store records itself; callers hand them to whatever
/// audit sink they use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub guardrail_id: String,
    pub graph_version: u32,
    pub input: AuditInput,
    pub decision: Decision,
    pub reason: String,
    pub execution_trace: ExecutionTrace,
    pub latency_micros: u64,
}

impl AuditRecord {
    pub fn new(
        guardrail_id: impl Into<String>,
        graph_version: u32,
        context: &ExecutionContext,
        result: &EvaluationResult,
    ) -> Self {
        Self {
            guardrail_id: guardrail_id.into(),
            graph_version,
            input: AuditInput {
                message: context.message.clone(),
                user_role: context.user_role.clone(),
            },
            decision: result.decision,
            reason: result.reason.clone(),
            execution_trace: result.trace.clone(),
            latency_micros: result.total_duration_micros,
        }
    }
}
