//! # Railier - Guardrail Graph Evaluation Engine
//!
//! **Railier** evaluates block-based governance policies ("guardrails") against
//! incoming requests. A guardrail is a directed acyclic graph of typed blocks:
//! inputs extract request data, conditions test it, logic gates combine
//! signals, actions emit decisions and an output block reports the result.
//! Every evaluation yields one of `allow`, `warn`, `require_approval` or
//! `block`, together with a reason and a per-block execution trace.
//!
//! ## Core Workflow
//!
//! 1.  **Load Your Graph**: Deserialize a [`GuardrailGraph`](graph::GuardrailGraph) from JSON, or implement [`IntoGraph`](graph::IntoGraph) for your own stored format.
//! 2.  **Compile**: Use [`Compiler::builder`](compiler::Compiler::builder) to validate the graph and build an immutable [`ExecutionPlan`](compiler::ExecutionPlan). Structural errors (cycles, missing inputs, unknown templates) are rejected here.
//! 3.  **Evaluate**: Create an [`Evaluator`](evaluator::Evaluator) and run requests through it. Plans are cached per graph version, so repeated evaluations skip compilation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use railier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // A graph that blocks the HR role.
//!     let mut graph = GuardrailGraph::new("hr-lockout");
//!     graph.blocks = vec![
//!         Block::new("msg", BlockKind::Input, "input-message"),
//!         Block::new("is-hr", BlockKind::Condition, "condition-role")
//!             .with_config("allowedRoles", serde_json::json!(["hr"])),
//!         Block::new("deny", BlockKind::Action, "action-block")
//!             .with_config("message", "Access denied"),
//!         Block::new("out", BlockKind::Output, "output-decision"),
//!     ];
//!     graph.connections = vec![
//!         Connection::new("msg", "output", "is-hr", "input"),
//!         Connection::new("is-hr", "true", "deny", "input"),
//!     ];
//!
//!     let evaluator = Evaluator::builder(EngineSettings::default()).build();
//!     let context = ExecutionContext::new("Show me the salary table").with_role("hr");
//!
//!     let result = evaluator.evaluate(&graph, &context).await?;
//!     println!("{}", TraceFormatter::format_result(&result));
//!     assert_eq!(result.decision, Decision::Block);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod compiler;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod model_check;
pub mod prelude;
pub mod registry;
pub mod settings;
pub mod trace;
