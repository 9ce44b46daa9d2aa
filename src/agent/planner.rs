//! 调查规划器 - 将排名主体与能力目录转化为结构化调查计划
//!
//! 一次结构化提取调用产出全部步骤，计划解析失败即整次运行中止，
//! 绝不跳进没有计划的调查循环。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use anyhow::{Context, Result};

use crate::agent::context::RunContext;
use crate::datasource::{Capability, RankedSubject};

/// 单个调查步骤
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvestigationStep {
    /// 步骤标题
    pub title: String,
    /// 调查主体名称（必须来自排名主体列表）
    pub subject: String,
    /// 主体子类目
    pub sub_category: String,
    /// 本步骤要使用的工具名称列表（必须来自能力目录）
    pub tools: Vec<String>,
}

/// 结构化调查计划
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvestigationPlan {
    /// 按执行顺序排列的调查步骤
    pub steps: Vec<InvestigationStep>,
}

/// 调查规划器
pub struct Planner;

impl Planner {
    /// 生成调查计划
    pub async fn plan(
        context: &RunContext,
        subjects: &[RankedSubject],
        catalog: &[&Capability],
    ) -> Result<InvestigationPlan> {
        println!("📋 正在生成调查计划...");

        let system_prompt = Self::build_system_prompt();
        let user_prompt = Self::build_user_prompt(context, subjects, catalog);

        let plan = context
            .model
            .extract_plan(&system_prompt, &user_prompt)
            .await
            .context("调查计划生成失败")?;

        println!("✅ 调查计划已生成，共{}个步骤", plan.steps.len());
        if context.config.verbose {
            for (i, step) in plan.steps.iter().enumerate() {
                println!("   {}. {} [{}] -> {:?}", i + 1, step.title, step.subject, step.tools);
            }
        }
        Ok(plan)
    }

    fn build_system_prompt() -> String {
        r#"你是一名云成本分析专家，负责为一次成本调查制定结构化计划。

规划策略:
1. 为每个排名主体安排一个调查步骤，按花费量级从高到低排列
2. 每个步骤只选用与该主体类目相关的工具，不要堆砌全部工具
3. 避免无信息量的查询组合，例如分组维度与过滤维度相同的查询
4. 工具名称必须逐字取自能力目录，主体名称必须逐字取自排名主体列表
5. 步骤标题应描述调查意图，而不是复述工具名称"#
            .to_string()
    }

    fn build_user_prompt(
        context: &RunContext,
        subjects: &[RankedSubject],
        catalog: &[&Capability],
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "请为以下成本调查制定计划。\n\n统计周期: {}\n\n## 排名主体（按花费降序）\n\n",
            context.config.period
        ));
        for (i, subject) in subjects.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {} (子类目: {}, 花费: {:.2} {})\n",
                i + 1,
                subject.name,
                subject.sub_category,
                subject.magnitude,
                subject.unit
            ));
        }

        prompt.push_str("\n## 能力目录\n\n");
        for capability in catalog {
            prompt.push_str(&format!("- {}: {}\n", capability.name, capability.description));
        }

        prompt.push_str("\n请输出结构化的调查计划。");
        prompt
    }
}
