use super::Decision;
use crate::compiler::config::ActionSignal;
use std::ops::ControlFlow;

const DEFAULT_REASON: &str = "no blocking condition met";
const DEFAULT_WARNING: &str = "Warning issued";
const APPROVAL_REASON: &str = "Request requires human approval";

/// Folds activated action signals into one decision.
///
/// Precedence is `block > require_approval > warn > allow`. A `block` ends the
/// walk immediately; everything else keeps going until the graph is exhausted.
#[derive(Debug, Clone)]
pub struct DecisionAggregator {
    decision: Decision,
    reason: String,
    warnings: Vec<String>,
    approvers: Vec<String>,
}

impl Default for DecisionAggregator {
    fn default() -> Self {
        Self {
            decision: Decision::Allow,
            reason: DEFAULT_REASON.to_string(),
            warnings: Vec::new(),
            approvers: Vec::new(),
        }
    }
}

impl DecisionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The decision as it stands after the signals applied so far.
    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Applies one activated action's signal. `Break` means the decision is final.
    pub fn apply(&mut self, signal: &ActionSignal) -> ControlFlow<()> {
        match signal {
            ActionSignal::Block { message } => {
                self.decision = Decision::Block;
                self.reason = message.clone();
                return ControlFlow::Break(());
            }
            ActionSignal::RequireApproval { approvers } => {
                for approver in approvers {
                    if !self.approvers.contains(approver) {
                        self.approvers.push(approver.clone());
                    }
                }
                self.decision = Decision::RequireApproval;
                self.reason = if self.approvers.is_empty() {
                    APPROVAL_REASON.to_string()
                } else {
                    format!("{} (approvers: {})", APPROVAL_REASON, self.approvers.join(", "))
                };
            }
            ActionSignal::Warn { warning } => {
                let warning = if warning.is_empty() {
                    DEFAULT_WARNING
                } else {
                    warning.as_str()
                };
                self.warnings.push(warning.to_string());
                if self.decision <= Decision::Warn {
                    self.decision = Decision::Warn;
                    self.reason = self.warnings.join("; ");
                }
            }
            ActionSignal::Allow | ActionSignal::Log { .. } => {}
        }
        ControlFlow::Continue(())
    }

    pub fn finish(self) -> (Decision, String) {
        (self.decision, self.reason)
    }
}
