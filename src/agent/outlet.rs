//! 报告出口 - 最终报告的落盘

use anyhow::Result;
use std::path::PathBuf;

use crate::agent::compiler::CompiledReport;
use crate::agent::context::RunContext;

/// 报告出口
pub struct ReportOutlet;

impl ReportOutlet {
    /// 将编译好的报告写入运行命名空间的固定路径
    pub async fn save(context: &RunContext, report: &CompiledReport) -> Result<PathBuf> {
        println!("🖊️ 报告存储中...");
        let path = context.store.persist_report(&report.narrative).await?;
        println!("✅ 报告已保存: {}", path.display());
        Ok(path)
    }
}
