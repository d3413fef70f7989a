//! The pluggable capability behind `llm-evaluate` blocks.
//!
//! The engine only knows the contract: given a prompt and a temperature,
//! return whether the check fired and how confident the model was. How the
//! verdict is produced is up to the implementation.

use crate::error::ModelCheckError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::OllamaModelCheck;

/// A model's answer to one check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub activated: bool,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

/// External text-evaluation capability.
///
/// Implementations do not need to enforce a timeout or honour cancellation;
/// the evaluator wraps every call in both.
pub trait ModelCheck: Send + Sync + 'static {
    fn evaluate<'a>(
        &'a self,
        prompt: &'a str,
        temperature: f64,
    ) -> BoxFuture<'a, Result<ModelVerdict, ModelCheckError>>;
}
