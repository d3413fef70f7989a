use super::config::BlockEvaluator;
use super::validator::ValidationReport;
use crate::graph::BlockKind;

/// Where a bound input handle reads its signal from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourceRef {
    /// Position of the upstream block in the plan's step list.
    pub step: usize,
    pub handle: String,
}

/// One connected input handle with its upstream sources, in execution order.
#[derive(Debug, Clone)]
pub(crate) struct InputBinding {
    pub handle: &'static str,
    pub sources: Vec<SourceRef>,
}

/// A block as it will run: compiled evaluator plus resolved input wiring.
#[derive(Debug, Clone)]
pub struct PlannedBlock {
    pub block_id: String,
    pub kind: BlockKind,
    pub template_id: String,
    pub(crate) evaluator: BlockEvaluator,
    pub(crate) inputs: Vec<InputBinding>,
}

impl PlannedBlock {
    /// Names of the input handles that have at least one upstream connection.
    pub fn connected_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|b| b.handle)
    }
}

/// A validated, immutable, topologically ordered guardrail graph.
///
/// Plans are built by [`Compiler::compile`](super::Compiler::compile) and are
/// safe to share between concurrent evaluations behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub(crate) graph_id: String,
    pub(crate) version: u32,
    pub(crate) steps: Vec<PlannedBlock>,
    pub(crate) report: ValidationReport,
}

impl ExecutionPlan {
    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn steps(&self) -> &[PlannedBlock] {
        &self.steps
    }

    /// Block ids in the order they will be evaluated.
    pub fn execution_order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.block_id.as_str()).collect()
    }

    /// The validation report the plan was built from. Contains warnings only.
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}
