use super::{BlockDescriptor, ConfigField, FieldType, HandleSpec};
use crate::compiler::config;
use crate::graph::BlockKind;

const NO_INPUTS: &[HandleSpec] = &[];
const MAIN_INPUT: &[HandleSpec] = &[HandleSpec::variadic("input")];
const GATE_INPUTS: &[HandleSpec] = &[
    HandleSpec::single("input", true),
    HandleSpec::single("input-2", false),
];
const NEGATION_INPUT: &[HandleSpec] = &[HandleSpec::single("input", true)];

const SINGLE_OUTPUT: &[&str] = &["output"];
const BRANCH_OUTPUTS: &[&str] = &["true", "false"];

/// Defines the built-in template catalogue as one static table.
macro_rules! define_block_templates {
    ( $( ($template_id:expr, $kind:ident, $description:expr, $inputs:expr, $outputs:expr, [ $($field:expr),* $(,)? ], $build:path) ),* $(,)? ) => {
        static TEMPLATES: &[BlockDescriptor] = &[
            $(
                BlockDescriptor {
                    template_id: $template_id,
                    kind: BlockKind::$kind,
                    description: $description,
                    inputs: $inputs,
                    outputs: $outputs,
                    config: &[ $($field),* ],
                    build: $build,
                },
            )*
        ];

        /// The built-in templates, in catalogue order.
        pub fn builtin_templates() -> &'static [BlockDescriptor] {
            TEMPLATES
        }
    };
}

define_block_templates! {
    // Inputs
    ("input-message", Input, "Captures the incoming message", NO_INPUTS, SINGLE_OUTPUT, [], config::input_message),
    ("input-context", Input, "Captures a field of the request context", NO_INPUTS, SINGLE_OUTPUT, [
        ConfigField::optional("field", FieldType::String),
    ], config::input_context),

    // Conditions
    ("condition-contains", Condition, "Keyword check", MAIN_INPUT, BRANCH_OUTPUTS, [
        ConfigField::required("keywords", FieldType::StringList),
        ConfigField::optional("matchMode", FieldType::String),
    ], config::contains),
    ("condition-regex", Condition, "Regex match", MAIN_INPUT, BRANCH_OUTPUTS, [
        ConfigField::required("pattern", FieldType::String),
    ], config::regex),
    ("condition-role", Condition, "Role check", MAIN_INPUT, BRANCH_OUTPUTS, [
        ConfigField::required("allowedRoles", FieldType::StringList),
    ], config::role),

    // Logic gates
    ("logic-and", Logic, "AND gate", GATE_INPUTS, SINGLE_OUTPUT, [], config::logic_and),
    ("logic-or", Logic, "OR gate", GATE_INPUTS, SINGLE_OUTPUT, [], config::logic_or),
    ("logic-not", Logic, "NOT gate", NEGATION_INPUT, SINGLE_OUTPUT, [], config::logic_not),

    // Actions
    ("action-block", Action, "Block the request", MAIN_INPUT, SINGLE_OUTPUT, [
        ConfigField::optional("message", FieldType::String),
    ], config::action_block),
    ("action-allow", Action, "Allow the request", MAIN_INPUT, SINGLE_OUTPUT, [], config::action_allow),
    ("action-warn", Action, "Attach a warning", MAIN_INPUT, SINGLE_OUTPUT, [
        ConfigField::optional("warning", FieldType::String),
    ], config::action_warn),
    ("action-approval", Action, "Require human approval", MAIN_INPUT, SINGLE_OUTPUT, [
        ConfigField::optional("approvers", FieldType::StringList),
    ], config::action_approval),
    ("action-log", Action, "Log the event", MAIN_INPUT, SINGLE_OUTPUT, [
        ConfigField::optional("logLevel", FieldType::String),
        ConfigField::optional("includeMessage", FieldType::Bool),
    ], config::action_log),

    // Data lookups
    ("data-user", Data, "Look up caller data", MAIN_INPUT, SINGLE_OUTPUT, [
        ConfigField::optional("fields", FieldType::StringList),
    ], config::data_user),
    ("data-policy", Data, "Load policy metadata", MAIN_INPUT, SINGLE_OUTPUT, [
        ConfigField::required("policyId", FieldType::String),
        ConfigField::optional("metadata", FieldType::Object),
    ], config::data_policy),

    // Model-backed checks
    ("llm-evaluate", ModelCheck, "Model-backed evaluation", MAIN_INPUT, BRANCH_OUTPUTS, [
        ConfigField::required("prompt", FieldType::String),
        ConfigField::optional("temperature", FieldType::Number),
        ConfigField::optional("minConfidence", FieldType::Number),
    ], config::model_check),

    // Output
    ("output-decision", Output, "Final decision", MAIN_INPUT, SINGLE_OUTPUT, [], config::output),
}
