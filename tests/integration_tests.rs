use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use costscope_rs::agent::context::{ModelGateway, RunContext};
use costscope_rs::agent::planner::{InvestigationPlan, InvestigationStep};
use costscope_rs::agent::workflow::{RunOrchestrator, RunPhase};
use costscope_rs::artifacts::{ArtifactKind, ArtifactStore, CallId, ExecutionId};
use costscope_rs::config::Config;
use costscope_rs::datasource::{
    Capability, CostDataSource, RankedSubject, ToolInvocationOutcome,
};
use costscope_rs::llm::client::types::{ChatMessage, ModelTurn, ToolCallRequest, ToolSchema};
use costscope_rs::viz::ChartRenderer;

/// 固定脚本的模型替身：每个步骤先调用一次工具，随后输出发现并收尾
struct CannedModel {
    plan_steps: Vec<InvestigationStep>,
}

#[async_trait]
impl ModelGateway for CannedModel {
    async fn extract_plan(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<InvestigationPlan> {
        Ok(InvestigationPlan {
            steps: self.plan_steps.clone(),
        })
    }

    async fn converse(
        &self,
        _system_prompt: &str,
        thread: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelTurn> {
        let already_called = thread
            .iter()
            .any(|message| matches!(message, ChatMessage::Assistant { .. }));

        if !already_called && !tools.is_empty() {
            return Ok(ModelTurn {
                text: String::new(),
                tool_calls: vec![ToolCallRequest {
                    call_id: "call-0".to_string(),
                    tool_name: tools[0].name.clone(),
                    arguments: json!({"granularity": "DAILY"}),
                }],
            });
        }

        Ok(ModelTurn {
            text: "该主体的花费集中在少量用量类型。".to_string(),
            tool_calls: Vec::new(),
        })
    }

    async fn critique_image(&self, _context_text: &str, _image_png: &[u8]) -> Result<String> {
        Ok("图表未见异常波动。".to_string())
    }

    async fn synthesize(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok("# 成本调查报告\n\n本月花费由计算类服务主导。".to_string())
    }
}

struct CannedSource;

#[async_trait]
impl CostDataSource for CannedSource {
    async fn ranked_subjects(&self, period: &str, limit: usize) -> Result<Vec<RankedSubject>> {
        let subjects = vec![
            RankedSubject {
                name: "Amazon EC2".to_string(),
                sub_category: "Compute".to_string(),
                magnitude: 5230.10,
                unit: "USD".to_string(),
                period: period.to_string(),
            },
            RankedSubject {
                name: "Amazon S3".to_string(),
                sub_category: "Storage".to_string(),
                magnitude: 812.44,
                unit: "USD".to_string(),
                period: period.to_string(),
            },
        ];
        Ok(subjects.into_iter().take(limit).collect())
    }

    async fn catalog(&self) -> Result<Vec<Capability>> {
        Ok(vec![Capability {
            name: "get_daily_cost".to_string(),
            description: "查询主体的按日花费序列".to_string(),
            parameters: json!({"type": "object", "properties": {"granularity": {"type": "string"}}}),
        }])
    }

    async fn invoke(&self, tool_name: &str, _params: &Value) -> Result<ToolInvocationOutcome> {
        if tool_name != "get_daily_cost" {
            return Err(anyhow!("未知能力: {}", tool_name));
        }
        Ok(ToolInvocationOutcome {
            summary: "按日花费查询完成".to_string(),
            datapoints: Some(json!({"rows": [{"date": "2026-07-01", "amount": 168.3}]})),
            chart: None,
        })
    }
}

struct NoopRenderer;

#[async_trait]
impl ChartRenderer for NoopRenderer {
    async fn render(&self, _spec: &Value, target: &Path) -> Result<Vec<u8>> {
        let bytes = b"PNG".to_vec();
        tokio::fs::write(target, &bytes).await?;
        Ok(bytes)
    }
}

fn investigation_step(subject: &str) -> InvestigationStep {
    InvestigationStep {
        title: format!("调查{}的成本构成", subject),
        subject: subject.to_string(),
        sub_category: "Compute".to_string(),
        tools: vec!["get_daily_cost".to_string()],
    }
}

fn test_context(temp_dir: &TempDir, plan_steps: Vec<InvestigationStep>) -> RunContext {
    let mut config = Config::default();
    config.output_path = temp_dir.path().to_path_buf();
    config.skip_charts = true;
    config.cache.enabled = false;
    config.cache.cache_dir = temp_dir.path().join("cache");

    RunContext::new(
        config,
        Arc::new(CannedModel { plan_steps }),
        Arc::new(CannedSource),
        Arc::new(NoopRenderer),
    )
}

#[tokio::test]
async fn test_full_investigation_run() {
    let temp_dir = TempDir::new().unwrap();
    let context = test_context(
        &temp_dir,
        vec![
            investigation_step("Amazon EC2"),
            investigation_step("Amazon S3"),
        ],
    );

    let outcome = RunOrchestrator::execute(&context).await;

    assert_eq!(outcome.phase, RunPhase::Done);
    assert_eq!(outcome.step_results.len(), 2);
    for result in &outcome.step_results {
        assert!(!result.failed);
        assert!(!result.narrative.is_empty());
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].kind, ArtifactKind::Data);
    }

    // 全部产物与报告都落在本次运行的命名空间下
    let report_path = outcome.report_path.expect("report should be persisted");
    assert!(report_path.starts_with(context.store.run_root()));
    let scanned = context.store.scan();
    assert_eq!(scanned.len(), 3); // 2个数据产物 + 1份报告

    let report = std::fs::read_to_string(report_path).unwrap();
    assert!(report.contains("成本调查报告"));
    assert!(report.contains("产物清单"));
    assert!(report.contains("amazon-ec2/get-daily-cost"));
}

#[tokio::test]
async fn test_two_runs_never_collide() {
    let temp_dir = TempDir::new().unwrap();

    let context1 = test_context(&temp_dir, vec![investigation_step("Amazon EC2")]);
    let context2 = test_context(&temp_dir, vec![investigation_step("Amazon EC2")]);

    let outcome1 = RunOrchestrator::execute(&context1).await;
    let outcome2 = RunOrchestrator::execute(&context2).await;

    assert_eq!(outcome1.phase, RunPhase::Done);
    assert_eq!(outcome2.phase, RunPhase::Done);

    // 每次运行独占以执行标识命名的目录，互不覆盖
    assert_ne!(context1.execution_id(), context2.execution_id());
    assert_ne!(context1.store.run_root(), context2.store.run_root());
    assert_eq!(context1.store.scan().len(), 2);
    assert_eq!(context2.store.scan().len(), 2);
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.output_path, std::path::PathBuf::from("./costscope.reports"));
    assert_eq!(config.period, "LAST_MONTH");
    assert_eq!(config.top_subjects, 5);
    assert_eq!(config.step_budget, 12);
    assert!(!config.skip_charts);
    assert_eq!(
        config.get_report_name(),
        "Cost Investigation (LAST_MONTH / us-east-1)"
    );
}

#[test]
fn test_artifact_paths_rebuildable_across_processes() {
    let temp_dir = TempDir::new().unwrap();
    let execution_id = ExecutionId::mint();
    let call_id = CallId::mint();

    let store = ArtifactStore::new(temp_dir.path(), execution_id.clone());
    let rebuilt = ArtifactStore::new(temp_dir.path(), execution_id);

    assert_eq!(
        store.data_path("Amazon EC2", "get_daily_cost", &call_id),
        rebuilt.data_path("Amazon EC2", "get_daily_cost", &call_id)
    );
    assert_eq!(store.report_path(), rebuilt.report_path());
}
