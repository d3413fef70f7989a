use crate::cache::PlanCache;
use crate::compiler::{ExecutionPlan, ValidationReport};
use crate::context::ExecutionContext;
use crate::error::EvaluationError;
use crate::graph::GuardrailGraph;
use crate::model_check::ModelCheck;
use crate::settings::EngineSettings;
use crate::trace::ExecutionTrace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod aggregator;
mod blocks;
mod engine;
mod inputs;

pub use aggregator::DecisionAggregator;
use engine::PlanEngine;

/// The governance outcome of one evaluation.
///
/// Variants are ordered by precedence: a later variant always wins over an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Warn,
    RequireApproval,
    Block,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Warn => "warn",
            Decision::RequireApproval => "require_approval",
            Decision::Block => "block",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub decision: Decision,
    /// A human-readable explanation of the decision.
    pub reason: String,
    /// Every block processed, in execution order, up to and including a terminating block.
    pub trace: ExecutionTrace,
    pub total_duration_micros: u64,
}

/// Evaluates guardrail graphs against requests.
///
/// An `Evaluator` holds no per-request state. It can be shared behind an `Arc`
/// and used concurrently from many tasks; the plan cache is the only shared
/// structure, and it hands out immutable snapshots.
pub struct Evaluator {
    settings: EngineSettings,
    model_check: Option<Arc<dyn ModelCheck>>,
    plans: Arc<PlanCache>,
}

pub struct EvaluatorBuilder {
    settings: EngineSettings,
    model_check: Option<Arc<dyn ModelCheck>>,
    plans: Option<Arc<PlanCache>>,
}

impl EvaluatorBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            model_check: None,
            plans: None,
        }
    }

    /// Capability used by `llm-evaluate` blocks. Without one, those blocks fail
    /// individually and the rest of the graph still runs.
    pub fn with_model_check(mut self, model_check: Arc<dyn ModelCheck>) -> Self {
        self.model_check = Some(model_check);
        self
    }

    /// Shares a plan cache between several evaluators.
    pub fn with_plan_cache(mut self, plans: Arc<PlanCache>) -> Self {
        self.plans = Some(plans);
        self
    }

    pub fn build(self) -> Evaluator {
        Evaluator {
            settings: self.settings,
            model_check: self.model_check,
            plans: self.plans.unwrap_or_default(),
        }
    }
}

impl Evaluator {
    pub fn builder(settings: EngineSettings) -> EvaluatorBuilder {
        EvaluatorBuilder::new(settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn plan_cache(&self) -> &PlanCache {
        &self.plans
    }

    /// Validates a graph with this evaluator's template registry.
    pub fn validate(&self, graph: &GuardrailGraph) -> ValidationReport {
        crate::compiler::Compiler::builder(graph.clone())
            .with_registry(self.plans.registry().clone())
            .build()
            .validate()
    }

    /// Evaluates `context` against `graph`, compiling the graph or reusing the
    /// cached plan for its version.
    pub async fn evaluate(
        &self,
        graph: &GuardrailGraph,
        context: &ExecutionContext,
    ) -> Result<EvaluationResult, EvaluationError> {
        self.evaluate_with_cancel(graph, context, &CancellationToken::new())
            .await
    }

    /// Like [`evaluate`](Self::evaluate), but stops as soon as `cancel` fires.
    pub async fn evaluate_with_cancel(
        &self,
        graph: &GuardrailGraph,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, EvaluationError> {
        let plan = self.plans.get_or_compile(graph)?;
        self.evaluate_plan(&plan, context, cancel).await
    }

    /// Runs an already compiled plan.
    ///
    /// # Returns
    ///
    /// * `Ok(EvaluationResult)`: the decision, its reason and the full trace.
    /// * `Err(EvaluationError::Cancelled)`: `cancel` fired; the error carries the
    ///   blocks that completed before it did. Never a partial `allow`.
    pub async fn evaluate_plan(
        &self,
        plan: &ExecutionPlan,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, EvaluationError> {
        PlanEngine::new(
            plan,
            context,
            &self.settings,
            self.model_check.as_deref(),
            cancel,
        )
        .run()
        .await
    }
}
