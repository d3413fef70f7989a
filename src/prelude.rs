//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the railier crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use railier::prelude::*;
//!
//! # async fn run_example() -> Result<()> {
//! let graph: GuardrailGraph =
//!     serde_json::from_str(&std::fs::read_to_string("path/to/guardrail.json")?)?;
//! let context = ExecutionContext::from_file("path/to/request.json")?;
//!
//! let evaluator = Evaluator::builder(EngineSettings::default()).build();
//! let result = evaluator.evaluate(&graph, &context).await?;
//!
//! println!("Decision: {} ({})", result.decision, result.reason);
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::graph::{Block, BlockKind, Connection, ConnectionKind, GuardrailGraph, IntoGraph};

// Compilation and evaluation
pub use crate::cache::PlanCache;
pub use crate::compiler::{Compiler, ExecutionPlan, ValidationReport, ValidationWarning};
pub use crate::context::ExecutionContext;
pub use crate::evaluator::{Decision, EvaluationResult, Evaluator};
pub use crate::model_check::{ModelCheck, ModelVerdict};
pub use crate::registry::BlockRegistry;
pub use crate::settings::EngineSettings;

// Error types
pub use crate::error::{BlockError, EvaluationError, ValidationError};

// Trace and audit
pub use crate::trace::{AuditRecord, BlockResult, ExecutionTrace, TraceFormatter};

// Result type alias for convenience
pub type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;
