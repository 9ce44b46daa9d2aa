//! 报告编译器 - 将全部步骤结果合成为最终调查报告
//!
//! 合成调用失败时降级为确定性模板报告，编译阶段绝不让整次运行失败：
//! 步骤已经执行、产物已经落盘，报告必须产出。

use crate::agent::context::RunContext;
use crate::agent::step::StepResult;
use crate::artifacts::{ArtifactKind, ArtifactReference};

/// 编译产出的报告
#[derive(Debug, Clone)]
pub struct CompiledReport {
    /// 报告正文（Markdown）
    pub narrative: String,
    /// 本次运行的执行标识
    pub execution_id: String,
}

/// 报告编译器
pub struct ReportCompiler;

impl ReportCompiler {
    /// 编译最终报告，内部错误一律降级为模板报告
    pub async fn compile(context: &RunContext, results: &[StepResult]) -> CompiledReport {
        println!("📊 正在编译调查报告...");

        if results.is_empty() {
            return CompiledReport {
                narrative: Self::empty_report(context),
                execution_id: context.execution_id().to_string(),
            };
        }

        let system_prompt = Self::build_system_prompt(context);
        let user_prompt = Self::build_user_prompt(context, results);

        let narrative = match context.model.synthesize(&system_prompt, &user_prompt).await {
            Ok(text) => {
                let mut report = text;
                report.push_str(&Self::artifact_appendix(context, results));
                report
            }
            Err(e) => {
                eprintln!("⚠️ 报告合成失败，降级为模板报告: {}", e);
                Self::fallback_report(context, results)
            }
        };

        println!("✅ 调查报告编译完成");
        CompiledReport {
            narrative,
            execution_id: context.execution_id().to_string(),
        }
    }

    /// 确定性模板报告 - 不依赖模型，不含时间戳，相同输入产出相同文本
    pub fn fallback_report(context: &RunContext, results: &[StepResult]) -> String {
        let mut report = format!("# {}\n\n", context.config.get_report_name());
        report.push_str("## 调查步骤\n\n");

        for result in results {
            let status = if result.failed { "❌" } else { "✅" };
            report.push_str(&format!("### {} {} [{}]\n\n", status, result.step, result.subject));
            report.push_str(&result.narrative);
            report.push_str("\n\n");
        }

        report.push_str(&Self::artifact_appendix(context, results));
        report
    }

    fn empty_report(context: &RunContext) -> String {
        format!(
            "# {}\n\n本周期内未发现可调查的成本主体。\n",
            context.config.get_report_name()
        )
    }

    fn build_system_prompt(context: &RunContext) -> String {
        format!(
            r#"你是一名云成本分析报告撰写人，需要将多个调查步骤的发现合成为一份连贯的Markdown报告。

报告要求:
1. 以报告标题开头: # {}
2. 先给出整体结论与最重要的优化建议
3. 按主体组织各步骤发现，保留关键数字
4. 失败的步骤如实说明，不要虚构其发现
5. 引用产物时使用提供的相对路径，不要改写路径"#,
            context.config.get_report_name()
        )
    }

    fn build_user_prompt(context: &RunContext, results: &[StepResult]) -> String {
        let mut prompt = String::from("## 各步骤调查发现\n\n");

        for result in results {
            if result.failed {
                prompt.push_str(&format!(
                    "### {} [{}] (执行失败)\n\n{}\n\n",
                    result.step, result.subject, result.narrative
                ));
                continue;
            }

            prompt.push_str(&format!("### {} [{}]\n\n{}\n\n", result.step, result.subject, result.narrative));
            if !result.artifacts.is_empty() {
                prompt.push_str("产物文件:\n");
                for artifact in &result.artifacts {
                    prompt.push_str(&format!(
                        "- {} ({})\n",
                        Self::relative_path(context, artifact),
                        Self::kind_label(artifact.kind)
                    ));
                }
                prompt.push('\n');
            }
        }

        prompt.push_str("请合成最终调查报告。");
        prompt
    }

    /// 产物附录 - 报告末尾的完整产物清单
    fn artifact_appendix(context: &RunContext, results: &[StepResult]) -> String {
        let mut artifacts: Vec<(&StepResult, &ArtifactReference)> = Vec::new();
        for result in results {
            for artifact in &result.artifacts {
                artifacts.push((result, artifact));
            }
        }

        if artifacts.is_empty() {
            return String::new();
        }

        let mut appendix = String::from("\n## 产物清单\n\n");
        for (result, artifact) in artifacts {
            appendix.push_str(&format!(
                "- [{} / {}]({}) ({})\n",
                result.subject,
                artifact.tool_name,
                Self::relative_path(context, artifact),
                Self::kind_label(artifact.kind)
            ));
        }
        appendix
    }

    /// 报告中的产物路径相对于运行根目录，报告与产物一起搬移后链接依然有效
    fn relative_path(context: &RunContext, artifact: &ArtifactReference) -> String {
        pathdiff::diff_paths(&artifact.path, context.store.run_root())
            .unwrap_or_else(|| artifact.path.clone())
            .display()
            .to_string()
    }

    fn kind_label(kind: ArtifactKind) -> &'static str {
        match kind {
            ArtifactKind::Data => "数据",
            ArtifactKind::Chart => "图表",
        }
    }
}
