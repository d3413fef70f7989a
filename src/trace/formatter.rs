use super::BlockResult;
use crate::evaluator::EvaluationResult;
use itertools::Itertools;
use serde_json::Value;

/// Formats evaluation results into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Formats the decision line followed by one line per traced block.
    pub fn format_result(result: &EvaluationResult) -> String {
        let mut lines = vec![format!("{}: {}", result.decision, result.reason)];
        lines.extend(result.trace.iter().map(Self::format_block));
        lines.join("\n")
    }

    /// One trace entry, e.g. `  [fired] check-role (condition-role) -> true=true`.
    pub fn format_block(block: &BlockResult) -> String {
        let status = if let Some(error) = &block.error {
            format!("[error] {} ({}): {}", block.block_id, block.template_id, error)
        } else if !block.reached {
            format!("[skipped] {} ({})", block.block_id, block.template_id)
        } else if block.output.is_empty() {
            format!("[silent] {} ({})", block.block_id, block.template_id)
        } else {
            let handles = block
                .output
                .iter()
                .map(|(handle, value)| format!("{}={}", handle, Self::format_value(value)))
                .join(", ");
            let marker = if block.activated { "fired" } else { "passed" };
            format!("[{}] {} ({}) -> {}", marker, block.block_id, block.template_id, handles)
        };
        format!("  {}", status)
    }

    /// Short strings stay readable; everything else is compact JSON.
    fn format_value(value: &Value) -> String {
        match value {
            Value::String(s) if s.chars().count() > 40 => {
                format!("\"{}...\"", s.chars().take(40).collect::<String>())
            }
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}
