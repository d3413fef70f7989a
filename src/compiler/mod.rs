use crate::error::ValidationError;
use crate::graph::GuardrailGraph;
use crate::registry::{Arity, BlockRegistry};
use ahash::AHashMap;
use tracing::{debug, warn};

pub mod config;
mod plan;
mod scheduler;
mod validator;

use plan::{InputBinding, SourceRef};
pub use plan::{ExecutionPlan, PlannedBlock};
pub use validator::{ValidationReport, ValidationWarning};
use validator::GraphValidator;

/// Turns a `GuardrailGraph` into an `ExecutionPlan`.
pub struct Compiler {
    graph: GuardrailGraph,
    registry: BlockRegistry,
}

pub struct CompilerBuilder {
    graph: GuardrailGraph,
    registry: BlockRegistry,
}

impl CompilerBuilder {
    pub fn new(graph: GuardrailGraph) -> Self {
        Self {
            graph,
            registry: BlockRegistry::default(),
        }
    }

    /// Lets blocks use `user_template_id` as a name for a built-in template.
    pub fn with_template_alias(mut self, user_template_id: &str, template_id: &str) -> Self {
        self.registry = self.registry.with_alias(user_template_id, template_id);
        self
    }

    pub fn with_registry(mut self, registry: BlockRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            graph: self.graph,
            registry: self.registry,
        }
    }
}

impl Compiler {
    pub fn builder(graph: GuardrailGraph) -> CompilerBuilder {
        CompilerBuilder::new(graph)
    }

    /// Reports every structural error, orphan and config problem in the graph
    /// without building a plan.
    pub fn validate(&self) -> ValidationReport {
        GraphValidator::new(&self.graph, &self.registry)
            .analyze()
            .report
    }

    /// Validates the graph and builds its execution plan.
    ///
    /// Fails on the first fatal error. Orphans, config problems and input
    /// conflicts are kept as warnings on the plan's report.
    pub fn compile(self) -> Result<ExecutionPlan, ValidationError> {
        let analysis = GraphValidator::new(&self.graph, &self.registry).analyze();
        if let Some(error) = analysis.report.errors.first() {
            return Err(error.clone());
        }
        // A valid report always comes with a schedule.
        let order = analysis.order.unwrap_or_default();

        for warning in &analysis.report.warnings {
            warn!(graph_id = %self.graph.id, ?warning, "Guardrail graph warning");
        }

        let position: AHashMap<usize, usize> =
            order.iter().enumerate().map(|(pos, &i)| (i, pos)).collect();

        let mut evaluators = analysis.evaluators;
        let mut steps = Vec::with_capacity(order.len());
        for &index in &order {
            let block = &self.graph.blocks[index];
            let (Some(descriptor), Some(evaluator)) =
                (analysis.descriptors[index], evaluators[index].take())
            else {
                continue;
            };

            let mut inputs = Vec::new();
            for handle in descriptor.inputs {
                let mut sources: Vec<SourceRef> = analysis.incoming[index]
                    .iter()
                    .map(|&e| &analysis.edges[e])
                    .filter(|e| e.target_handle == handle.name)
                    .filter_map(|e| {
                        position.get(&e.source).map(|&step| SourceRef {
                            step,
                            handle: e.source_handle.clone(),
                        })
                    })
                    .collect();
                if sources.is_empty() {
                    continue;
                }
                sources.sort_by_key(|s| s.step);
                if handle.arity == Arity::Single {
                    sources.truncate(1);
                }
                inputs.push(InputBinding {
                    handle: handle.name,
                    sources,
                });
            }

            steps.push(PlannedBlock {
                block_id: block.id.clone(),
                kind: block.kind,
                template_id: block.template_id.clone(),
                evaluator,
                inputs,
            });
        }

        debug!(
            graph_id = %self.graph.id,
            version = self.graph.version,
            steps = steps.len(),
            orphans = analysis.report.orphans.len(),
            "Compiled guardrail plan"
        );

        Ok(ExecutionPlan {
            graph_id: self.graph.id,
            version: self.graph.version,
            steps,
            report: analysis.report,
        })
    }
}

/// Validates a graph against the built-in template registry.
pub fn validate(graph: &GuardrailGraph) -> ValidationReport {
    GraphValidator::new(graph, &BlockRegistry::default())
        .analyze()
        .report
}
