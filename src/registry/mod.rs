//! The block template registry.
//!
//! Every block names a template id. The registry maps that id onto a static
//! [`BlockDescriptor`] that declares the template's kind, its input and output
//! handles, and its config schema. The compiler consults it while building a
//! plan; nothing in here is touched during evaluation.

use crate::compiler::config::BlockEvaluator;
use crate::error::BlockError;
use crate::graph::BlockKind;
use ahash::AHashMap;
use serde::Serialize;
use serde_json::{Map, Value};

mod templates;

pub use templates::builtin_templates;

/// How many upstream edges an input handle consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    /// Exactly one upstream signal. Extra edges are ignored with a warning.
    Single,
    /// Any number of upstream edges; the handle fires if any of them fires.
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandleSpec {
    pub name: &'static str,
    pub required: bool,
    pub arity: Arity,
}

impl HandleSpec {
    pub const fn single(name: &'static str, required: bool) -> Self {
        Self {
            name,
            required,
            arity: Arity::Single,
        }
    }

    pub const fn variadic(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            arity: Arity::Variadic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    StringList,
    Number,
    Bool,
    Object,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldType::Number => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Object => value.is_object(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::StringList => "a list of strings",
            FieldType::Number => "a number",
            FieldType::Bool => "a boolean",
            FieldType::Object => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigField {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

impl ConfigField {
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
        }
    }
}

/// Converts a raw config map into the compiled evaluator for one template.
pub type EvaluatorBuilder = fn(&Map<String, Value>) -> Result<BlockEvaluator, BlockError>;

/// Static description of a block template.
#[derive(Debug, Serialize)]
pub struct BlockDescriptor {
    pub template_id: &'static str,
    pub kind: BlockKind,
    pub description: &'static str,
    pub inputs: &'static [HandleSpec],
    pub outputs: &'static [&'static str],
    pub config: &'static [ConfigField],
    #[serde(skip)]
    pub(crate) build: EvaluatorBuilder,
}

impl BlockDescriptor {
    pub fn input(&self, handle: &str) -> Option<&HandleSpec> {
        self.inputs.iter().find(|h| h.name == handle)
    }

    pub fn has_output(&self, handle: &str) -> bool {
        self.outputs.contains(&handle)
    }

    /// Checks a raw config map against this template's schema.
    /// Unknown keys are tolerated; authoring tools attach their own metadata.
    pub fn check_config(&self, config: &Map<String, Value>) -> Result<(), BlockError> {
        for field in self.config {
            match config.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(BlockError::Config(format!(
                        "missing required field '{}'",
                        field.name
                    )));
                }
                Some(value) if !value.is_null() && !field.field_type.accepts(value) => {
                    return Err(BlockError::Config(format!(
                        "field '{}' must be {}",
                        field.name,
                        field.field_type.describe()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validates the config and compiles it into an evaluator.
    pub(crate) fn compile_config(
        &self,
        config: &Map<String, Value>,
    ) -> Result<BlockEvaluator, BlockError> {
        self.check_config(config)?;
        (self.build)(config)
    }
}

/// Lookup table from template id to descriptor, with optional user aliases.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    templates: AHashMap<String, &'static BlockDescriptor>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        let mut templates = AHashMap::new();
        for descriptor in builtin_templates() {
            templates.insert(descriptor.template_id.to_string(), descriptor);
        }
        let registry = Self { templates };
        registry.with_alias("model-check", "llm-evaluate")
    }
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe(&self, template_id: &str) -> Option<&'static BlockDescriptor> {
        self.templates.get(template_id).copied()
    }

    /// Maps a user-defined template name onto a registered template.
    /// Unknown targets are ignored.
    pub fn with_alias(mut self, alias: &str, template_id: &str) -> Self {
        if let Some(descriptor) = self.describe(template_id) {
            self.templates.insert(alias.to_string(), descriptor);
        }
        self
    }

    /// All distinct templates, in catalogue order.
    pub fn templates(&self) -> impl Iterator<Item = &'static BlockDescriptor> {
        builtin_templates().iter()
    }
}
