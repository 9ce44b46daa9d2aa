//! 运行编排 - 一次成本调查的完整状态机
//!
//! 运行阶段单向推进：Init -> FetchingSubjects -> Planning -> ExecutingSteps
//! -> Compiling -> Done，任何前置阶段失败进入Aborted终态。
//! 步骤失败不终止运行，编排前置失败（取主体、取目录、规划）才终止。

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::adapters::AdapterRegistry;
use crate::agent::compiler::{CompiledReport, ReportCompiler};
use crate::agent::context::RunContext;
use crate::agent::outlet::ReportOutlet;
use crate::agent::planner::Planner;
use crate::agent::step::{StepResult, execute_step};
use crate::config::Config;
use crate::datasource::HttpCostDataSource;
use crate::llm::client::LLMClient;
use crate::viz::CommandChartRenderer;

/// 运行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Init,
    FetchingSubjects,
    Planning,
    ExecutingSteps,
    Compiling,
    Done,
    Aborted,
}

/// 一次运行的最终状态
#[derive(Debug)]
pub struct RunOutcome {
    /// 终态阶段（Done或Aborted）
    pub phase: RunPhase,
    /// Aborted时的原因
    pub abort_reason: Option<String>,
    /// 已执行步骤的结果（Aborted于规划前则为空）
    pub step_results: Vec<StepResult>,
    /// 报告落盘路径（落盘失败时为None）
    pub report_path: Option<PathBuf>,
}

impl RunOutcome {
    fn aborted(phase_reason: String) -> Self {
        Self {
            phase: RunPhase::Aborted,
            abort_reason: Some(phase_reason),
            step_results: Vec::new(),
            report_path: None,
        }
    }
}

/// 运行编排器
pub struct RunOrchestrator;

impl RunOrchestrator {
    /// 执行一次完整的成本调查
    pub async fn execute(context: &RunContext) -> RunOutcome {
        println!("🚀 开始成本调查 (执行标识: {})", context.execution_id());

        // 阶段: FetchingSubjects
        println!("🔄 正在获取排名成本主体...");
        let subjects = match context
            .source
            .ranked_subjects(&context.config.period, context.config.top_subjects)
            .await
        {
            Ok(subjects) => subjects,
            Err(e) => {
                eprintln!("❌ 获取排名成本主体失败: {}", e);
                return RunOutcome::aborted(format!("获取排名成本主体失败: {}", e));
            }
        };
        println!("✅ 获取到{}个排名成本主体", subjects.len());

        let catalog = match context.source.catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("❌ 获取能力目录失败: {}", e);
                return RunOutcome::aborted(format!("获取能力目录失败: {}", e));
            }
        };
        let registry = AdapterRegistry::new(catalog);

        // 无主体可查：产出确定性的空报告，运行正常结束
        if subjects.is_empty() {
            println!("⚠️ 本周期内没有可调查的成本主体");
            let report = ReportCompiler::compile(context, &[]).await;
            let report_path = Self::save_report(context, &report).await;
            return RunOutcome {
                phase: RunPhase::Done,
                abort_reason: None,
                step_results: Vec::new(),
                report_path,
            };
        }

        // 阶段: Planning
        let plan = match Planner::plan(context, &subjects, &registry.capabilities()).await {
            Ok(plan) => plan,
            Err(e) => {
                eprintln!("❌ 调查规划失败，运行中止: {}", e);
                return RunOutcome::aborted(format!("调查规划失败: {}", e));
            }
        };

        // 阶段: ExecutingSteps（严格串行，每个计划步骤恰好产出一个StepResult）
        let mut step_results = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let result = execute_step(context, &registry, &subjects, step).await;
            step_results.push(result);
        }

        // 阶段: Compiling（编译与落盘失败都不再回退到Aborted，调查本身已经完成）
        let report = ReportCompiler::compile(context, &step_results).await;
        let report_path = Self::save_report(context, &report).await;

        let failed = step_results.iter().filter(|r| r.failed).count();
        println!(
            "🎉 成本调查完成: {}个步骤 ({}个失败)",
            step_results.len(),
            failed
        );

        RunOutcome {
            phase: RunPhase::Done,
            abort_reason: None,
            step_results,
            report_path,
        }
    }

    async fn save_report(context: &RunContext, report: &CompiledReport) -> Option<PathBuf> {
        match ReportOutlet::save(context, report).await {
            Ok(path) => Some(path),
            Err(e) => {
                eprintln!("❌ 报告落盘失败: {}", e);
                None
            }
        }
    }
}

/// 装配全部协作者并执行一次成本调查
pub async fn launch(config: &Config) -> Result<()> {
    let llm_client = LLMClient::new(config.clone()).context("初始化LLM客户端失败")?;
    llm_client.check_connection().await?;

    if config.force_regenerate {
        println!("🧹 清空LLM响应缓存...");
        llm_client.clear_cache().await?;
    }

    let source = HttpCostDataSource::new(config.datasource.clone())?;
    let renderer = CommandChartRenderer::new(config.renderer.clone());

    let context = RunContext::new(
        config.clone(),
        Arc::new(llm_client),
        Arc::new(source),
        Arc::new(renderer),
    );

    let outcome = RunOrchestrator::execute(&context).await;
    match outcome.phase {
        RunPhase::Aborted => Err(anyhow!(
            "成本调查中止: {}",
            outcome
                .abort_reason
                .unwrap_or_else(|| "未知原因".to_string())
        )),
        _ => {
            if let Some(path) = &outcome.report_path {
                println!("📄 调查报告: {}", path.display());
            }
            Ok(())
        }
    }
}
