use super::aggregator::DecisionAggregator;
use super::blocks::{self, BlockOutcome};
use super::inputs::ResolvedInputs;
use super::{Decision, EvaluationResult};
use crate::compiler::config::{ActionSignal, BlockEvaluator};
use crate::compiler::{ExecutionPlan, PlannedBlock};
use crate::context::ExecutionContext;
use crate::error::{BlockError, EvaluationError};
use crate::model_check::{ModelCheck, ModelVerdict};
use crate::settings::EngineSettings;
use crate::trace::{BlockResult, ExecutionTrace};
use std::ops::ControlFlow;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Walks one plan for one request.
///
/// Steps run strictly in plan order; a step only ever reads results of steps
/// before it, so `trace[i]` is always the result of step `i`.
pub(super) struct PlanEngine<'a> {
    plan: &'a ExecutionPlan,
    context: &'a ExecutionContext,
    settings: &'a EngineSettings,
    model_check: Option<&'a dyn ModelCheck>,
    cancel: &'a CancellationToken,
}

impl<'a> PlanEngine<'a> {
    pub(super) fn new(
        plan: &'a ExecutionPlan,
        context: &'a ExecutionContext,
        settings: &'a EngineSettings,
        model_check: Option<&'a dyn ModelCheck>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            plan,
            context,
            settings,
            model_check,
            cancel,
        }
    }

    pub(super) async fn run(self) -> Result<EvaluationResult, EvaluationError> {
        let started = Instant::now();
        let mut aggregator = DecisionAggregator::new();
        let mut trace: ExecutionTrace = Vec::with_capacity(self.plan.steps().len());

        for step in self.plan.steps() {
            if self.cancel.is_cancelled() {
                return Err(cancelled(trace));
            }

            let block_started = Instant::now();
            let Some(outcome) = self.evaluate_step(step, &trace, aggregator.decision()).await
            else {
                return Err(cancelled(trace));
            };

            if let Some(error) = &outcome.error {
                warn!(block_id = %step.block_id, template = %step.template_id, %error, "Block failed");
            }
            debug!(
                block_id = %step.block_id,
                reached = outcome.reached,
                activated = outcome.activated,
                "Evaluated block"
            );

            let mut flow = ControlFlow::Continue(());
            if outcome.activated {
                if let Some(signal) = &outcome.signal {
                    self.emit_log(step, signal);
                    flow = aggregator.apply(signal);
                }
            }

            trace.push(BlockResult {
                block_id: step.block_id.clone(),
                kind: step.kind,
                template_id: step.template_id.clone(),
                reached: outcome.reached,
                activated: outcome.activated,
                output: outcome.output,
                error: outcome.error.map(|e| e.to_string()),
                duration_micros: elapsed_micros(block_started),
            });

            if flow.is_break() {
                debug!(block_id = %step.block_id, "Terminating block activated");
                break;
            }
        }

        let (decision, reason) = aggregator.finish();
        info!(
            graph_id = %self.plan.graph_id(),
            version = self.plan.version(),
            %decision,
            blocks = trace.len(),
            "Guardrail evaluated"
        );

        Ok(EvaluationResult {
            decision,
            reason,
            trace,
            total_duration_micros: elapsed_micros(started),
        })
    }

    /// Runs one step. `None` means the evaluation was cancelled while the step
    /// was waiting on the model-check capability.
    async fn evaluate_step(
        &self,
        step: &PlannedBlock,
        recorded: &[BlockResult],
        running: Decision,
    ) -> Option<BlockOutcome> {
        let inputs = ResolvedInputs::resolve(step, recorded);
        let BlockEvaluator::ModelCheck {
            prompt,
            temperature,
            min_confidence,
        } = &step.evaluator
        else {
            return Some(blocks::evaluate(
                &step.evaluator,
                &inputs,
                self.context,
                running,
            ));
        };

        if !inputs.any_fired() {
            return Some(BlockOutcome::not_reached());
        }

        let prompt = blocks::model_prompt(prompt, inputs.subject(&self.context.message));
        let temperature = temperature.unwrap_or(self.settings.model.default_temperature);

        let verdict = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            verdict = self.run_model_check(&prompt, temperature) => verdict,
        };

        Some(match verdict {
            Ok(verdict) => blocks::model_outcome(verdict, *min_confidence),
            Err(error) => BlockOutcome::failed(error),
        })
    }

    async fn run_model_check(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<ModelVerdict, BlockError> {
        let Some(model_check) = self.model_check else {
            return Err(BlockError::ExternalCapability(
                "no model-check capability configured".to_string(),
            ));
        };

        let timeout = self.settings.model.timeout();
        match tokio::time::timeout(timeout, model_check.evaluate(prompt, temperature)).await {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(e)) => Err(BlockError::ExternalCapability(e.to_string())),
            Err(_) => Err(BlockError::Timeout {
                timeout_ms: self.settings.model.timeout_ms,
            }),
        }
    }

    fn emit_log(&self, step: &PlannedBlock, signal: &ActionSignal) {
        let ActionSignal::Log {
            level,
            include_message,
        } = signal
        else {
            return;
        };
        let request = include_message.then_some(self.context.message.as_str());
        let block_id = step.block_id.as_str();
        match level.to_ascii_lowercase().as_str() {
            "error" => error!(block_id, request, "Guardrail log action"),
            "warn" | "warning" => warn!(block_id, request, "Guardrail log action"),
            "debug" => debug!(block_id, request, "Guardrail log action"),
            "trace" => trace!(block_id, request, "Guardrail log action"),
            _ => info!(block_id, request, "Guardrail log action"),
        }
    }
}

fn elapsed_micros(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

fn cancelled(trace: ExecutionTrace) -> EvaluationError {
    EvaluationError::Cancelled {
        completed: trace.len(),
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::elapsed_micros;
    use std::time::{Duration, Instant};

    #[test]
    fn elapsed_micros_reports_whole_duration() {
        let Some(earlier) = Instant::now().checked_sub(Duration::from_secs(2)) else {
            return;
        };
        assert!(elapsed_micros(earlier) >= 2_000_000);
    }
}
