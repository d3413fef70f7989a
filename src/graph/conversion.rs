use super::definition::GuardrailGraph;
use crate::error::ConversionError;

/// A trait for stored or authored formats that can be converted into a `GuardrailGraph`.
///
/// The engine never reads a graph store itself. Whatever shape the authoring UI or
/// the database uses, implement this trait on it and hand the result to the compiler.
///
/// # Example
///
/// ```rust,no_run
/// use railier::prelude::*;
/// use railier::error::ConversionError;
///
/// struct StoredBlock { id: String, template: String }
/// struct StoredPolicy { id: String, blocks: Vec<StoredBlock> }
///
/// impl IntoGraph for StoredPolicy {
///     fn into_graph(self) -> Result<GuardrailGraph, ConversionError> {
///         let mut graph = GuardrailGraph::new(self.id);
///         for block in self.blocks {
///             let kind = match block.template.split('-').next() {
///                 Some("input") => BlockKind::Input,
///                 Some("action") => BlockKind::Action,
///                 _ => return Err(ConversionError::Invalid(block.template.clone())),
///             };
///             graph.blocks.push(Block::new(block.id, kind, block.template));
///         }
///         Ok(graph)
///     }
/// }
/// ```
pub trait IntoGraph {
    /// Consumes the object and converts it into a guardrail graph.
    fn into_graph(self) -> Result<GuardrailGraph, ConversionError>;
}

impl IntoGraph for GuardrailGraph {
    fn into_graph(self) -> Result<GuardrailGraph, ConversionError> {
        Ok(self)
    }
}
