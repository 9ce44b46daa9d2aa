//! 步骤执行器 - 单个调查步骤的完整生命周期
//!
//! 绑定适配器 -> 运行工具调用循环 -> 汇总产物引用。
//! 执行失败被折叠进StepResult而不是向上抛出，单步失败不阻断后续步骤。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agent::adapters::AdapterRegistry;
use crate::agent::context::RunContext;
use crate::agent::planner::InvestigationStep;
use crate::agent::tool_loop::run_tool_loop;
use crate::artifacts::ArtifactReference;
use crate::datasource::RankedSubject;

/// 步骤执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// 调查主体名称
    pub subject: String,
    /// 步骤标题
    pub step: String,
    /// 模型产出的叙述文本
    pub narrative: String,
    /// 本步骤产生的全部产物引用
    pub artifacts: Vec<ArtifactReference>,
    /// 本次运行的执行标识
    pub execution_id: String,
    /// 步骤是否失败
    pub failed: bool,
}

impl StepResult {
    fn failure(context: &RunContext, step: &InvestigationStep, reason: String) -> Self {
        Self {
            subject: step.subject.clone(),
            step: step.title.clone(),
            narrative: format!("⚠️ 本步骤执行失败: {}", reason),
            artifacts: Vec::new(),
            execution_id: context.execution_id().to_string(),
            failed: true,
        }
    }
}

/// 执行一个调查步骤
/// 计划中的主体若在排名列表中找不到（模型偏离了列表），用零量级的合成主体兜底继续
pub async fn execute_step(
    context: &RunContext,
    registry: &AdapterRegistry,
    subjects: &[RankedSubject],
    step: &InvestigationStep,
) -> StepResult {
    println!("🔍 调查步骤: {} [{}]", step.title, step.subject);

    let subject = subjects
        .iter()
        .find(|s| s.name == step.subject)
        .cloned()
        .unwrap_or_else(|| RankedSubject {
            name: step.subject.clone(),
            sub_category: step.sub_category.clone(),
            magnitude: 0.0,
            unit: "USD".to_string(),
            period: context.config.period.clone(),
        });

    let sink = Arc::new(RwLock::new(Vec::new()));

    // 绑定即校验：未知能力名在进入循环前失败，错误信息完整列出无效名与有效目录
    let adapters = match registry.bind(&step.tools, context, &subject, sink.clone()) {
        Ok(adapters) => adapters,
        Err(e) => {
            eprintln!("❌ 步骤 {} 工具绑定失败: {}", step.title, e);
            return StepResult::failure(context, step, e.to_string());
        }
    };

    let system_prompt = build_step_system_prompt(context);
    let opening_prompt = build_step_opening_prompt(context, &subject, step);

    let outcome = match run_tool_loop(
        context.model.clone(),
        &system_prompt,
        opening_prompt,
        &adapters,
        context.config.step_budget,
        context.config.verbose,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("❌ 步骤 {} 执行失败: {}", step.title, e);
            let artifacts = sink.read().await.clone();
            let mut result = StepResult::failure(context, step, e.to_string());
            // 失败前已落盘的产物仍然保留在结果中
            result.artifacts = artifacts;
            return result;
        }
    };

    let artifacts = sink.read().await.clone();
    println!(
        "✅ 步骤完成: {} ({}轮, {}次工具调用, {}个产物)",
        step.title,
        outcome.turns_used,
        outcome.tool_calls,
        artifacts.len()
    );

    StepResult {
        subject: step.subject.clone(),
        step: step.title.clone(),
        narrative: outcome.narrative,
        artifacts,
        execution_id: context.execution_id().to_string(),
        failed: false,
    }
}

fn build_step_system_prompt(context: &RunContext) -> String {
    format!(
        r#"你是一名云成本调查员，正在对单个成本主体做深入分析。

工作方式:
1. 通过提供的工具查询成本数据，每次查询的结果摘要会回传给你
2. 原始数据与图表已持久化为产物文件，工具响应中只包含引用路径
3. 查询应聚焦于定位花费构成、趋势变化与异常点
4. 当你掌握足够信息后，停止调用工具，输出本主体的调查发现

统计周期: {}
区域: {}"#,
        context.config.period, context.config.datasource.region
    )
}

fn build_step_opening_prompt(
    context: &RunContext,
    subject: &RankedSubject,
    step: &InvestigationStep,
) -> String {
    format!(
        r#"调查任务: {}

主体: {}
子类目: {}
周期内花费: {:.2} {}
统计周期: {}

请使用可用工具调查该主体的成本构成，完成后输出调查发现。"#,
        step.title, subject.name, subject.sub_category, subject.magnitude, subject.unit, context.config.period
    )
}
