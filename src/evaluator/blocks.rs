use super::Decision;
use super::inputs::ResolvedInputs;
use crate::compiler::config::{ActionSignal, BlockEvaluator, Gate, MatchMode};
use crate::context::ExecutionContext;
use crate::error::BlockError;
use crate::model_check::ModelVerdict;
use serde_json::{Map, Value, json};

/// What one block produced.
#[derive(Debug, Clone, Default)]
pub(crate) struct BlockOutcome {
    pub reached: bool,
    pub activated: bool,
    pub output: Map<String, Value>,
    pub signal: Option<ActionSignal>,
    pub error: Option<BlockError>,
}

impl BlockOutcome {
    fn fire(activated: bool, handle: &str, value: Value) -> Self {
        let mut output = Map::new();
        output.insert(handle.to_string(), value);
        Self {
            reached: true,
            activated,
            output,
            ..Self::default()
        }
    }

    /// A condition-like result: exactly one of `true` / `false` fires.
    fn branch(result: bool) -> Self {
        let handle = if result { "true" } else { "false" };
        Self::fire(result, handle, Value::Bool(result))
    }

    pub(crate) fn not_reached() -> Self {
        Self::default()
    }

    pub(crate) fn failed(error: BlockError) -> Self {
        Self {
            reached: true,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Evaluates every block kind except model checks, which need the network.
///
/// `running` is the aggregator's decision at this point of the walk; only
/// output blocks look at it.
pub(crate) fn evaluate(
    evaluator: &BlockEvaluator,
    inputs: &ResolvedInputs<'_>,
    context: &ExecutionContext,
    running: Decision,
) -> BlockOutcome {
    match evaluator {
        BlockEvaluator::InputMessage => {
            BlockOutcome::fire(true, "output", Value::String(context.message.clone()))
        }
        BlockEvaluator::InputContext { field } => {
            let value = match field {
                Some(name) => context.lookup(name),
                None => Value::Object(context.fields.clone()),
            };
            BlockOutcome::fire(true, "output", value)
        }
        BlockEvaluator::Logic(gate) => evaluate_gate(*gate, inputs),
        BlockEvaluator::Output => {
            BlockOutcome::fire(true, "output", Value::String(running.as_str().to_string()))
        }
        BlockEvaluator::Invalid(error) => BlockOutcome {
            reached: inputs.is_unwired() || inputs.any_fired(),
            error: Some(error.clone()),
            ..BlockOutcome::default()
        },
        _ if !inputs.any_fired() => BlockOutcome::not_reached(),
        BlockEvaluator::Contains { keywords, mode } => {
            let subject = inputs.subject(&context.message).to_lowercase();
            let matched = match mode {
                MatchMode::Any => keywords.iter().any(|k| subject.contains(k.as_str())),
                MatchMode::All => keywords.iter().all(|k| subject.contains(k.as_str())),
            };
            BlockOutcome::branch(matched)
        }
        BlockEvaluator::Regex { pattern } => {
            BlockOutcome::branch(pattern.is_match(inputs.subject(&context.message)))
        }
        BlockEvaluator::Role { allowed } => {
            let role = context.role().to_lowercase();
            BlockOutcome::branch(allowed.contains(&role))
        }
        BlockEvaluator::Action(signal) => {
            let mut outcome = BlockOutcome::fire(true, "output", signal_payload(signal, context));
            outcome.signal = Some(signal.clone());
            outcome
        }
        BlockEvaluator::DataUser { fields } => {
            let looked_up: Map<String, Value> = fields
                .iter()
                .map(|name| (name.clone(), context.lookup(name)))
                .collect();
            BlockOutcome::fire(
                true,
                "output",
                json!({ "userRole": context.lookup("userRole"), "fields": looked_up }),
            )
        }
        BlockEvaluator::DataPolicy {
            policy_id,
            metadata,
        } => BlockOutcome::fire(
            true,
            "output",
            json!({ "policyId": policy_id, "loaded": true, "metadata": metadata }),
        ),
        BlockEvaluator::ModelCheck { .. } => BlockOutcome::failed(BlockError::ExternalCapability(
            "model checks are evaluated asynchronously".to_string(),
        )),
    }
}

fn evaluate_gate(gate: Gate, inputs: &ResolvedInputs<'_>) -> BlockOutcome {
    let result = match gate {
        Gate::And => inputs.signals().all(|fired| fired),
        Gate::Or => inputs.signals().any(|fired| fired),
        Gate::Not => !inputs.fired("input"),
    };
    if result {
        BlockOutcome::fire(true, "output", Value::Bool(true))
    } else {
        BlockOutcome {
            reached: true,
            ..BlockOutcome::default()
        }
    }
}

/// The structured signal an action puts on its `output` handle.
fn signal_payload(signal: &ActionSignal, context: &ExecutionContext) -> Value {
    match signal {
        ActionSignal::Block { message } => json!({ "decision": "block", "message": message }),
        ActionSignal::Allow => json!({ "decision": "allow" }),
        ActionSignal::Warn { warning } => json!({ "decision": "warn", "warning": warning }),
        ActionSignal::RequireApproval { approvers } => {
            json!({ "decision": "require_approval", "approvers": approvers })
        }
        ActionSignal::Log {
            level,
            include_message,
        } => {
            let mut payload = json!({ "decision": "log", "level": level });
            if *include_message {
                payload["message"] = Value::String(context.message.clone());
            }
            payload
        }
    }
}

/// The prompt sent to the model: the block's instructions plus the subject text.
pub(crate) fn model_prompt(instructions: &str, subject: &str) -> String {
    format!("{}\n\nMessage:\n{}", instructions.trim_end(), subject)
}

/// Turns a model verdict into a branch outcome.
pub(crate) fn model_outcome(verdict: ModelVerdict, min_confidence: f64) -> BlockOutcome {
    let activated = verdict.activated && verdict.confidence >= min_confidence;
    let mut outcome = BlockOutcome::branch(activated);
    let handle = if activated { "true" } else { "false" };
    outcome.output.insert(
        handle.to_string(),
        json!({ "activated": activated, "confidence": verdict.confidence }),
    );
    outcome
}
