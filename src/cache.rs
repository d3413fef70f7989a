use crate::compiler::{Compiler, ExecutionPlan};
use crate::error::ValidationError;
use crate::graph::GuardrailGraph;
use crate::registry::BlockRegistry;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Validated plans keyed by graph id, each tagged with the version it was built from.
///
/// Plans are handed out as `Arc` snapshots. Replacing or invalidating an entry
/// never touches a plan an in-flight evaluation is already holding.
#[derive(Debug, Default)]
pub struct PlanCache {
    registry: BlockRegistry,
    plans: RwLock<AHashMap<String, Arc<ExecutionPlan>>>,
}

impl PlanCache {
    pub fn new(registry: BlockRegistry) -> Self {
        Self {
            registry,
            plans: RwLock::new(AHashMap::new()),
        }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Returns the cached plan for this graph version, compiling it on a miss.
    pub fn get_or_compile(
        &self,
        graph: &GuardrailGraph,
    ) -> Result<Arc<ExecutionPlan>, ValidationError> {
        if let Some(plan) = self.get(&graph.id, graph.version) {
            return Ok(plan);
        }

        // Compile outside the lock; a concurrent miss for the same version
        // just builds an identical plan.
        let plan = Arc::new(
            Compiler::builder(graph.clone())
                .with_registry(self.registry.clone())
                .build()
                .compile()?,
        );

        let mut plans = self.plans.write().unwrap_or_else(|e| e.into_inner());
        match plans.get(&graph.id) {
            // Never replace a newer version with an older one.
            Some(existing) if existing.version() > graph.version => {}
            _ => {
                debug!(graph_id = %graph.id, version = graph.version, "Caching guardrail plan");
                plans.insert(graph.id.clone(), plan.clone());
            }
        }
        Ok(plan)
    }

    /// The cached plan for `graph_id`, if it was built from exactly `version`.
    pub fn get(&self, graph_id: &str, version: u32) -> Option<Arc<ExecutionPlan>> {
        let plans = self.plans.read().unwrap_or_else(|e| e.into_inner());
        plans
            .get(graph_id)
            .filter(|plan| plan.version() == version)
            .cloned()
    }

    /// Drops the cached plan for a graph, e.g. when the graph store reports a new version.
    pub fn invalidate(&self, graph_id: &str) {
        let mut plans = self.plans.write().unwrap_or_else(|e| e.into_inner());
        if plans.remove(graph_id).is_some() {
            debug!(graph_id, "Invalidated guardrail plan");
        }
    }

    pub fn len(&self) -> usize {
        self.plans.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
