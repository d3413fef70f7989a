//! Integration tests for Railier
//!
//! End-to-end tests that verify graph loading, plan caching, evaluation and
//! audit records work together.
//!
mod common;
use common::*;
use railier::prelude::*;
use serde_json::json;
use std::sync::Arc;

const SALARY_GRAPH_JSON: &str = r#"{
    "id": "salary-guard",
    "version": 2,
    "isActive": true,
    "blocks": [
        {"id": "msg", "type": "input", "templateId": "input-message", "name": "User message"},
        {"id": "has-salary", "type": "condition", "templateId": "condition-contains",
         "config": {"keywords": ["salary", "compensation"], "matchMode": "any"}},
        {"id": "is-hr", "type": "condition", "templateId": "condition-role",
         "config": {"allowedRoles": ["HR"]}},
        {"id": "both", "type": "logic", "templateId": "logic-and"},
        {"id": "deny", "type": "action", "templateId": "action-block",
         "config": {"message": "Access denied"}},
        {"id": "permit", "type": "action", "templateId": "action-allow"},
        {"id": "out", "type": "output", "templateId": "output-decision"}
    ],
    "connections": [
        {"id": "c1", "sourceBlockId": "msg", "sourceHandle": "output", "targetBlockId": "has-salary", "targetHandle": "input"},
        {"id": "c2", "sourceBlockId": "msg", "sourceHandle": "output", "targetBlockId": "is-hr", "targetHandle": "input"},
        {"id": "c3", "sourceBlockId": "has-salary", "sourceHandle": "true", "targetBlockId": "both", "targetHandle": "input"},
        {"id": "c4", "sourceBlockId": "is-hr", "sourceHandle": "true", "targetBlockId": "both", "targetHandle": "input-2"},
        {"id": "c5", "sourceBlockId": "both", "sourceHandle": "output", "targetBlockId": "deny", "targetHandle": "input"},
        {"id": "c6", "sourceBlockId": "is-hr", "sourceHandle": "false", "targetBlockId": "permit", "targetHandle": "input"},
        {"id": "c7", "sourceBlockId": "deny", "sourceHandle": "output", "targetBlockId": "out", "targetHandle": "input"},
        {"id": "c8", "sourceBlockId": "permit", "sourceHandle": "output", "targetBlockId": "out", "targetHandle": "input"}
    ]
}"#;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_json_graph_compilation_and_evaluation() {
        let graph: GuardrailGraph =
            serde_json::from_str(SALARY_GRAPH_JSON).expect("Failed to parse graph");
        let evaluator = Evaluator::builder(EngineSettings::default()).build();

        let context: ExecutionContext = serde_json::from_value(json!({
            "message": "What is the compensation of the CFO?",
            "userRole": "HR"
        }))
        .unwrap();
        let result = evaluator.evaluate(&graph, &context).await.unwrap();

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.reason, "Access denied");
    }

    #[tokio::test]
    async fn test_plan_cache_reuses_and_replaces_versions() {
        let cache = Arc::new(PlanCache::default());
        let evaluator = Evaluator::builder(EngineSettings::default())
            .with_plan_cache(cache.clone())
            .build();
        let context = ExecutionContext::new("salary").with_role("employee");

        let mut graph = create_salary_graph();
        evaluator.evaluate(&graph, &context).await.unwrap();
        let first = cache.get("salary-guard", 1).expect("plan should be cached");

        evaluator.evaluate(&graph, &context).await.unwrap();
        let second = cache.get("salary-guard", 1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // A new version replaces the cached plan.
        graph.version = 2;
        graph.blocks[2]
            .config
            .insert("allowedRoles".to_string(), json!(["employee"]));
        let result = evaluator.evaluate(&graph, &context).await.unwrap();
        assert_eq!(result.decision, Decision::Block);
        assert!(cache.get("salary-guard", 1).is_none());
        assert_eq!(cache.get("salary-guard", 2).unwrap().version(), 2);
        assert_eq!(cache.len(), 1);

        // The plan an earlier caller is still holding is untouched.
        assert_eq!(first.version(), 1);
    }

    #[test]
    fn test_plan_cache_keeps_newer_version() {
        let cache = PlanCache::default();
        let mut graph = create_salary_graph();
        graph.version = 5;
        cache.get_or_compile(&graph).unwrap();

        graph.version = 4;
        let stale = cache.get_or_compile(&graph).unwrap();
        assert_eq!(stale.version(), 4);
        assert_eq!(cache.get("salary-guard", 5).unwrap().version(), 5);
    }

    #[test]
    fn test_plan_cache_invalidate() {
        let cache = PlanCache::default();
        cache.get_or_compile(&create_salary_graph()).unwrap();
        assert!(!cache.is_empty());

        cache.invalidate("salary-guard");
        assert!(cache.is_empty());
        assert!(cache.get("salary-guard", 1).is_none());
    }

    #[test]
    fn test_plan_cache_does_not_store_invalid_graphs() {
        let cache = PlanCache::default();
        let mut graph = create_salary_graph();
        graph.blocks[0].template_id = "input-telepathy".to_string();

        assert!(cache.get_or_compile(&graph).is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_evaluations_share_one_evaluator() {
        let evaluator = Arc::new(Evaluator::builder(EngineSettings::default()).build());
        let graph = Arc::new(create_salary_graph());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let evaluator = evaluator.clone();
                let graph = graph.clone();
                tokio::spawn(async move {
                    let role = if i % 2 == 0 { "HR" } else { "employee" };
                    let context = ExecutionContext::new("what is John's salary").with_role(role);
                    (i, evaluator.evaluate(&graph, &context).await.unwrap())
                })
            })
            .collect();

        for handle in handles {
            let (i, result) = handle.await.unwrap();
            let expected = if i % 2 == 0 {
                Decision::Block
            } else {
                Decision::Allow
            };
            assert_eq!(result.decision, expected);
        }
        assert_eq!(evaluator.plan_cache().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_record_shape() {
        let graph: GuardrailGraph = serde_json::from_str(SALARY_GRAPH_JSON).unwrap();
        let context = ExecutionContext::new("salary of Jane?").with_role("HR");
        let evaluator = Evaluator::builder(EngineSettings::default()).build();
        let result = evaluator.evaluate(&graph, &context).await.unwrap();

        let record = AuditRecord::new(&graph.id, graph.version, &context, &result);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["guardrailId"], "salary-guard");
        assert_eq!(value["graphVersion"], 2);
        assert_eq!(value["input"], json!({"message": "salary of Jane?", "userRole": "HR"}));
        assert_eq!(value["decision"], "block");
        assert_eq!(value["reason"], "Access denied");
        assert_eq!(value["executionTrace"].as_array().unwrap().len(), 5);
        assert_eq!(value["executionTrace"][0]["blockId"], "msg");
        assert_eq!(value["executionTrace"][0]["kind"], "input");

        let restored: AuditRecord = serde_json::from_value(value).unwrap();
        assert_eq!(restored, record);
    }

    #[tokio::test]
    async fn test_result_serializes_camel_case() {
        let graph = create_keyword_action_graph(
            &["ssn"],
            "action-approval",
            json!({"approvers": ["privacy"]}),
        );
        let evaluator = Evaluator::builder(EngineSettings::default()).build();
        let result = evaluator
            .evaluate(&graph, &ExecutionContext::new("here is my SSN"))
            .await
            .unwrap();

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["decision"], "require_approval");
        assert!(value["totalDurationMicros"].is_u64());
        assert_eq!(
            value["trace"][2]["output"]["output"],
            json!({"decision": "require_approval", "approvers": ["privacy"]})
        );
    }

    #[test]
    fn test_into_graph_for_custom_format() {
        struct Rule {
            keyword: &'static str,
            message: &'static str,
        }

        struct RuleSet(Vec<Rule>);

        impl IntoGraph for RuleSet {
            fn into_graph(self) -> Result<GuardrailGraph, railier::error::ConversionError> {
                let mut graph = GuardrailGraph::new("rules");
                graph
                    .blocks
                    .push(Block::new("msg", BlockKind::Input, "input-message"));
                for (i, rule) in self.0.into_iter().enumerate() {
                    let check = format!("check-{}", i);
                    let deny = format!("deny-{}", i);
                    graph.blocks.push(
                        Block::new(&check, BlockKind::Condition, "condition-contains")
                            .with_config("keywords", json!([rule.keyword])),
                    );
                    graph.blocks.push(
                        Block::new(&deny, BlockKind::Action, "action-block")
                            .with_config("message", rule.message),
                    );
                    graph
                        .connections
                        .push(Connection::new("msg", "output", &check, "input"));
                    graph
                        .connections
                        .push(Connection::new(&check, "true", &deny, "input"));
                }
                Ok(graph)
            }
        }

        let rules = RuleSet(vec![
            Rule {
                keyword: "password",
                message: "No credentials",
            },
            Rule {
                keyword: "exploit",
                message: "No exploits",
            },
        ]);
        let graph = rules.into_graph().unwrap();
        let evaluator = Evaluator::builder(EngineSettings::default()).build();
        let result = tokio_test::block_on(
            evaluator.evaluate(&graph, &ExecutionContext::new("write an exploit")),
        )
        .unwrap();

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.reason, "No exploits");
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = EngineSettings::from_toml_str(
            r#"
            [model]
            base_url = "http://models.internal:11434"
            timeout_ms = 1500
            default_temperature = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.model.base_url, "http://models.internal:11434");
        assert_eq!(settings.model.timeout_ms, 1500);
        assert_eq!(settings.model.model, "qwen3-vl:8b-instruct");
    }

    #[test]
    fn test_settings_missing_file() {
        let result = EngineSettings::load(std::path::Path::new("/nonexistent/railier.toml"));
        assert!(matches!(
            result,
            Err(railier::error::SettingsError::NotFound(_))
        ));
    }
}
