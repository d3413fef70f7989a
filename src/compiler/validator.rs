use super::config::BlockEvaluator;
use super::scheduler;
use crate::error::ValidationError;
use crate::graph::{BlockKind, GuardrailGraph};
use crate::registry::{Arity, BlockDescriptor, BlockRegistry};
use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;
use std::collections::VecDeque;

/// Non-fatal findings. The graph still runs, but an author should look at these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// The block cannot be reached from any input block and is excluded from execution.
    OrphanedBlock { block_id: String },
    /// The block's config could not be compiled. It runs as never-activated.
    InvalidConfig { block_id: String, message: String },
    /// A single-signal handle is fed by several edges; only `kept` is used.
    ConflictingInputs {
        block_id: String,
        handle: String,
        kept: String,
        ignored: Vec<String>,
    },
}

/// Everything `validate` found wrong with a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub orphans: Vec<String>,
}

impl ValidationReport {
    /// `true` when the graph has no fatal errors. Warnings are allowed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A connection whose endpoints and handles all resolved.
#[derive(Debug, Clone)]
pub(super) struct ResolvedEdge {
    pub source: usize,
    pub source_handle: String,
    pub target: usize,
    pub target_handle: String,
}

/// The outcome of analysing a graph: the report plus everything the plan needs.
pub(super) struct Analysis {
    pub report: ValidationReport,
    pub descriptors: Vec<Option<&'static BlockDescriptor>>,
    pub evaluators: Vec<Option<BlockEvaluator>>,
    pub edges: Vec<ResolvedEdge>,
    /// Indices into `edges`, grouped by target block.
    pub incoming: Vec<Vec<usize>>,
    pub order: Option<Vec<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

pub(super) struct GraphValidator<'a> {
    graph: &'a GuardrailGraph,
    registry: &'a BlockRegistry,
}

impl<'a> GraphValidator<'a> {
    pub(super) fn new(graph: &'a GuardrailGraph, registry: &'a BlockRegistry) -> Self {
        Self { graph, registry }
    }

    pub(super) fn analyze(&self) -> Analysis {
        let mut report = ValidationReport::default();
        let index = self.index_blocks(&mut report);
        let descriptors = self.resolve_templates(&mut report);
        let edges = self.resolve_connections(&index, &descriptors, &mut report);
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); self.graph.blocks.len()];
        for (i, edge) in edges.iter().enumerate() {
            incoming[edge.target].push(i);
        }

        if let Some(path) = self.find_cycle(&edges) {
            report.errors.push(ValidationError::CyclicGraph { path });
            return Analysis {
                report,
                descriptors,
                evaluators: vec![None; self.graph.blocks.len()],
                edges,
                incoming,
                order: None,
            };
        }

        let reachable = self.reachable_from_inputs(&edges);
        for (i, block) in self.graph.blocks.iter().enumerate() {
            if !reachable[i] {
                report.orphans.push(block.id.clone());
                report.warnings.push(ValidationWarning::OrphanedBlock {
                    block_id: block.id.clone(),
                });
            }
        }

        self.check_required_inputs(&descriptors, &reachable, &edges, &incoming, &mut report);
        let evaluators = self.compile_configs(&descriptors, &reachable, &mut report);

        let order = if report.is_valid() {
            let pairs: Vec<(usize, usize)> = edges.iter().map(|e| (e.source, e.target)).collect();
            let order = scheduler::schedule(&reachable, &pairs);
            if let Some(order) = &order {
                self.check_input_conflicts(&descriptors, &edges, &incoming, order, &mut report);
            }
            order
        } else {
            None
        };

        Analysis {
            report,
            descriptors,
            evaluators,
            edges,
            incoming,
            order,
        }
    }

    fn index_blocks(&self, report: &mut ValidationReport) -> AHashMap<&'a str, usize> {
        let mut index = AHashMap::with_capacity(self.graph.blocks.len());
        for (i, block) in self.graph.blocks.iter().enumerate() {
            if index.contains_key(block.id.as_str()) {
                report.errors.push(ValidationError::DuplicateBlock {
                    block_id: block.id.clone(),
                });
            } else {
                index.insert(block.id.as_str(), i);
            }
        }
        index
    }

    fn resolve_templates(
        &self,
        report: &mut ValidationReport,
    ) -> Vec<Option<&'static BlockDescriptor>> {
        self.graph
            .blocks
            .iter()
            .map(|block| match self.registry.describe(&block.template_id) {
                None => {
                    report.errors.push(ValidationError::UnknownTemplate {
                        block_id: block.id.clone(),
                        template_id: block.template_id.clone(),
                    });
                    None
                }
                Some(descriptor) if descriptor.kind != block.kind => {
                    report.errors.push(ValidationError::KindMismatch {
                        block_id: block.id.clone(),
                        template_id: block.template_id.clone(),
                        declared: block.kind,
                        expected: descriptor.kind,
                    });
                    None
                }
                Some(descriptor) => Some(descriptor),
            })
            .collect()
    }

    fn resolve_connections(
        &self,
        index: &AHashMap<&str, usize>,
        descriptors: &[Option<&'static BlockDescriptor>],
        report: &mut ValidationReport,
    ) -> Vec<ResolvedEdge> {
        let mut edges = Vec::with_capacity(self.graph.connections.len());
        for conn in &self.graph.connections {
            let lookup = |block_id: &str| {
                index
                    .get(block_id)
                    .copied()
                    .ok_or_else(|| ValidationError::BlockNotFound {
                        missing_block_id: block_id.to_string(),
                        connection_id: conn.id.clone(),
                    })
            };
            let (source, target) = match (lookup(&conn.source_block_id), lookup(&conn.target_block_id))
            {
                (Ok(s), Ok(t)) => (s, t),
                (s, t) => {
                    report.errors.extend(s.err());
                    report.errors.extend(t.err());
                    continue;
                }
            };

            let mut handles_ok = true;
            if let Some(descriptor) = descriptors[source] {
                if !descriptor.has_output(&conn.source_handle) {
                    handles_ok = false;
                    report.errors.push(ValidationError::UnknownHandle {
                        connection_id: conn.id.clone(),
                        block_id: conn.source_block_id.clone(),
                        handle: conn.source_handle.clone(),
                    });
                }
            }
            if let Some(descriptor) = descriptors[target] {
                if descriptor.input(&conn.target_handle).is_none() {
                    handles_ok = false;
                    report.errors.push(ValidationError::UnknownHandle {
                        connection_id: conn.id.clone(),
                        block_id: conn.target_block_id.clone(),
                        handle: conn.target_handle.clone(),
                    });
                }
            }

            if handles_ok {
                edges.push(ResolvedEdge {
                    source,
                    source_handle: conn.source_handle.clone(),
                    target,
                    target_handle: conn.target_handle.clone(),
                });
            }
        }
        edges
    }

    /// Depth-first search with three-colour marking. A back edge to a block that
    /// is still on the stack closes a cycle; the returned path starts and ends on it.
    ///
    /// The walk keeps its own stack of `(block, next edge)` frames so long chains
    /// cannot exhaust the thread stack.
    fn find_cycle(&self, edges: &[ResolvedEdge]) -> Option<Vec<String>> {
        let block_count = self.graph.blocks.len();
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); block_count];
        for edge in edges {
            downstream[edge.source].push(edge.target);
        }

        let mut marks = vec![Mark::Unvisited; block_count];
        for root in 0..block_count {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            if let Some(cycle) = Self::walk(root, &downstream, &mut marks) {
                return Some(
                    cycle
                        .into_iter()
                        .map(|i| self.graph.blocks[i].id.clone())
                        .collect(),
                );
            }
        }
        None
    }

    fn walk(root: usize, downstream: &[Vec<usize>], marks: &mut [Mark]) -> Option<Vec<usize>> {
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::InProgress;

        while let Some(frame) = stack.last_mut() {
            let (node, next_edge) = *frame;
            let Some(&next) = downstream[node].get(next_edge) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[next] {
                Mark::InProgress => {
                    let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    marks[next] = Mark::InProgress;
                    stack.push((next, 0));
                }
                Mark::Done => {}
            }
        }
        None
    }

    fn reachable_from_inputs(&self, edges: &[ResolvedEdge]) -> Vec<bool> {
        let block_count = self.graph.blocks.len();
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); block_count];
        for edge in edges {
            downstream[edge.source].push(edge.target);
        }

        let mut reachable = vec![false; block_count];
        let mut queue: VecDeque<usize> = self
            .graph
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.kind == BlockKind::Input)
            .map(|(i, _)| i)
            .collect();
        for &i in &queue {
            reachable[i] = true;
        }
        while let Some(node) = queue.pop_front() {
            for &next in &downstream[node] {
                if !reachable[next] {
                    reachable[next] = true;
                    queue.push_back(next);
                }
            }
        }
        reachable
    }

    fn check_required_inputs(
        &self,
        descriptors: &[Option<&'static BlockDescriptor>],
        reachable: &[bool],
        edges: &[ResolvedEdge],
        incoming: &[Vec<usize>],
        report: &mut ValidationReport,
    ) {
        for (i, block) in self.graph.blocks.iter().enumerate() {
            let Some(descriptor) = descriptors[i] else {
                continue;
            };
            if !reachable[i] || block.kind == BlockKind::Input {
                continue;
            }
            for handle in descriptor.inputs.iter().filter(|h| h.required) {
                let satisfied = incoming[i].iter().map(|&e| &edges[e]).any(|e| {
                    e.target_handle == handle.name && reachable[e.source]
                });
                if !satisfied {
                    report.errors.push(ValidationError::MissingInput {
                        block_id: block.id.clone(),
                        handle: handle.name.to_string(),
                    });
                }
            }
        }
    }

    fn compile_configs(
        &self,
        descriptors: &[Option<&'static BlockDescriptor>],
        reachable: &[bool],
        report: &mut ValidationReport,
    ) -> Vec<Option<BlockEvaluator>> {
        self.graph
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let descriptor = descriptors[i].filter(|_| reachable[i])?;
                Some(
                    descriptor
                        .compile_config(&block.config)
                        .unwrap_or_else(|error| {
                            report.warnings.push(ValidationWarning::InvalidConfig {
                                block_id: block.id.clone(),
                                message: error.to_string(),
                            });
                            BlockEvaluator::Invalid(error)
                        }),
                )
            })
            .collect()
    }

    fn check_input_conflicts(
        &self,
        descriptors: &[Option<&'static BlockDescriptor>],
        edges: &[ResolvedEdge],
        incoming: &[Vec<usize>],
        order: &[usize],
        report: &mut ValidationReport,
    ) {
        let position: AHashMap<usize, usize> =
            order.iter().enumerate().map(|(pos, &i)| (i, pos)).collect();

        for &target in order {
            let Some(descriptor) = descriptors[target] else {
                continue;
            };
            for handle in descriptor.inputs.iter().filter(|h| h.arity == Arity::Single) {
                let sources: Vec<usize> = incoming[target]
                    .iter()
                    .map(|&e| &edges[e])
                    .filter(|e| e.target_handle == handle.name)
                    .filter_map(|e| position.get(&e.source).map(|_| e.source))
                    .sorted_by_key(|s| position[s])
                    .collect();
                if let Some((&kept, ignored)) = sources.split_first() {
                    if !ignored.is_empty() {
                        report.warnings.push(ValidationWarning::ConflictingInputs {
                            block_id: self.graph.blocks[target].id.clone(),
                            handle: handle.name.to_string(),
                            kept: self.graph.blocks[kept].id.clone(),
                            ignored: ignored
                                .iter()
                                .map(|&s| self.graph.blocks[s].id.clone())
                                .collect(),
                        });
                    }
                }
            }
        }
    }
}
