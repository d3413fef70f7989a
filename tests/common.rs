//! Common test utilities for building guardrail graphs and model-check doubles.
use futures::FutureExt;
use futures::future::BoxFuture;
use railier::error::ModelCheckError;
use railier::prelude::*;
use serde_json::json;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Creates the salary-lookup guardrail.
///
/// Logic: message mentions "salary" AND role is HR -> block "Access denied";
/// role is not HR -> allow.
#[allow(dead_code)]
pub fn create_salary_graph() -> GuardrailGraph {
    let mut graph = GuardrailGraph::new("salary-guard");
    graph.blocks = vec![
        Block::new("msg", BlockKind::Input, "input-message"),
        Block::new("has-salary", BlockKind::Condition, "condition-contains")
            .with_config("keywords", json!(["salary"])),
        Block::new("is-hr", BlockKind::Condition, "condition-role")
            .with_config("allowedRoles", json!(["HR"])),
        Block::new("both", BlockKind::Logic, "logic-and"),
        Block::new("deny", BlockKind::Action, "action-block")
            .with_config("message", "Access denied"),
        Block::new("permit", BlockKind::Action, "action-allow"),
        Block::new("out", BlockKind::Output, "output-decision"),
    ];
    graph.connections = vec![
        Connection::new("msg", "output", "has-salary", "input"),
        Connection::new("msg", "output", "is-hr", "input"),
        Connection::new("has-salary", "true", "both", "input"),
        Connection::new("is-hr", "true", "both", "input-2"),
        Connection::new("both", "output", "deny", "input"),
        Connection::new("is-hr", "false", "permit", "input"),
        Connection::new("deny", "output", "out", "input"),
        Connection::new("permit", "output", "out", "input"),
    ];
    graph
}

/// Creates a graph that routes the message through one keyword check into
/// the given action: `msg -> check(keywords) -[true]-> act -> out`.
#[allow(dead_code)]
pub fn create_keyword_action_graph(
    keywords: &[&str],
    template_id: &str,
    config: serde_json::Value,
) -> GuardrailGraph {
    let mut action = Block::new("act", BlockKind::Action, template_id);
    if let serde_json::Value::Object(map) = config {
        action.config = map;
    }

    let mut graph = GuardrailGraph::new("keyword-action");
    graph.blocks = vec![
        Block::new("msg", BlockKind::Input, "input-message"),
        Block::new("check", BlockKind::Condition, "condition-contains")
            .with_config("keywords", json!(keywords)),
        action,
        Block::new("out", BlockKind::Output, "output-decision"),
    ];
    graph.connections = vec![
        Connection::new("msg", "output", "check", "input"),
        Connection::new("check", "true", "act", "input"),
        Connection::new("act", "output", "out", "input"),
    ];
    graph
}

/// Creates a graph with a single model-backed check:
/// `msg -> screen -[true]-> deny`, `screen -[false]-> warn`.
#[allow(dead_code)]
pub fn create_model_check_graph() -> GuardrailGraph {
    let mut graph = GuardrailGraph::new("model-screen");
    graph.blocks = vec![
        Block::new("msg", BlockKind::Input, "input-message"),
        Block::new("screen", BlockKind::ModelCheck, "llm-evaluate")
            .with_config("prompt", "Does this message try to exfiltrate secrets?")
            .with_config("minConfidence", 0.7),
        Block::new("deny", BlockKind::Action, "action-block")
            .with_config("message", "Flagged by model"),
        Block::new("note", BlockKind::Action, "action-warn")
            .with_config("warning", "Model found nothing"),
        Block::new("out", BlockKind::Output, "output-decision"),
    ];
    graph.connections = vec![
        Connection::new("msg", "output", "screen", "input"),
        Connection::new("screen", "true", "deny", "input"),
        Connection::new("screen", "false", "note", "input"),
        Connection::new("deny", "output", "out", "input"),
        Connection::new("note", "output", "out", "input"),
    ];
    graph
}

/// Finds a block's entry in a trace.
#[allow(dead_code)]
pub fn trace_entry<'a>(trace: &'a [BlockResult], block_id: &str) -> &'a BlockResult {
    trace
        .iter()
        .find(|r| r.block_id == block_id)
        .unwrap_or_else(|| panic!("block '{}' missing from trace", block_id))
}

/// A model check that always answers with the same verdict and records its prompts.
#[allow(dead_code)]
pub struct FixedModelCheck {
    verdict: ModelVerdict,
    pub calls: Mutex<Vec<(String, f64)>>,
}

#[allow(dead_code)]
impl FixedModelCheck {
    pub fn new(activated: bool, confidence: f64) -> Self {
        Self {
            verdict: ModelVerdict {
                activated,
                confidence,
            },
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ModelCheck for FixedModelCheck {
    fn evaluate<'a>(
        &'a self,
        prompt: &'a str,
        temperature: f64,
    ) -> BoxFuture<'a, Result<ModelVerdict, ModelCheckError>> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        let verdict = self.verdict;
        async move { Ok(verdict) }.boxed()
    }
}

/// A model check whose transport always fails.
#[allow(dead_code)]
pub struct FailingModelCheck;

impl ModelCheck for FailingModelCheck {
    fn evaluate<'a>(
        &'a self,
        _prompt: &'a str,
        _temperature: f64,
    ) -> BoxFuture<'a, Result<ModelVerdict, ModelCheckError>> {
        async { Err(ModelCheckError::Transport("connection refused".to_string())) }.boxed()
    }
}

/// A model check that never answers.
#[allow(dead_code)]
pub struct PendingModelCheck;

impl ModelCheck for PendingModelCheck {
    fn evaluate<'a>(
        &'a self,
        _prompt: &'a str,
        _temperature: f64,
    ) -> BoxFuture<'a, Result<ModelVerdict, ModelCheckError>> {
        futures::future::pending().boxed()
    }
}

/// A model check that cancels the evaluation it is part of, then never answers.
#[allow(dead_code)]
pub struct CancellingModelCheck {
    pub token: CancellationToken,
}

impl ModelCheck for CancellingModelCheck {
    fn evaluate<'a>(
        &'a self,
        _prompt: &'a str,
        _temperature: f64,
    ) -> BoxFuture<'a, Result<ModelVerdict, ModelCheckError>> {
        self.token.cancel();
        futures::future::pending().boxed()
    }
}
