//! 可视化管线 - 声明式图表渲染与图表解读
//!
//! 渲染引擎是外部协作者：这里只定义接口边界、规格校验与子进程封装，
//! 不涉及图表编译算法本身。

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::agent::context::ModelGateway;
use crate::config::RendererConfig;

/// 图表渲染器接口：声明式规格 + 目标路径 -> 写入该路径的PNG图片
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, spec: &Value, target: &Path) -> Result<Vec<u8>>;
}

/// 校验声明式图表规格的基本形态
/// 不合规的规格必须被拒绝，而不是静默渲染出空白图片
pub fn validate_chart_spec(spec: &Value) -> Result<()> {
    let object = spec
        .as_object()
        .ok_or_else(|| anyhow!("图表规格必须是JSON对象"))?;

    if !object.contains_key("mark") {
        return Err(anyhow!("图表规格缺少mark字段"));
    }
    if !object.contains_key("encoding") {
        return Err(anyhow!("图表规格缺少encoding字段"));
    }
    Ok(())
}

/// 通过外部转换命令渲染图表（vl-convert风格的CLI）
pub struct CommandChartRenderer {
    config: RendererConfig,
}

impl CommandChartRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChartRenderer for CommandChartRenderer {
    async fn render(&self, spec: &Value, target: &Path) -> Result<Vec<u8>> {
        validate_chart_spec(spec)?;

        // 规格落为临时文件，交给外部命令转换
        let spec_path: PathBuf = target.with_extension("vl.json");
        tokio::fs::write(&spec_path, serde_json::to_string(spec)?)
            .await
            .context("写入图表规格临时文件失败")?;

        let output = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg("--input")
            .arg(&spec_path)
            .arg("--output")
            .arg(target)
            .output()
            .await
            .context(format!("启动图表渲染器失败: {}", self.config.command))?;

        let _ = tokio::fs::remove_file(&spec_path).await;

        if !output.status.success() {
            return Err(anyhow!(
                "图表渲染器执行失败: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let bytes = tokio::fs::read(target)
            .await
            .context(format!("读取渲染产物失败: {}", target.display()))?;
        if bytes.is_empty() {
            return Err(anyhow!("图表渲染器产出了空图片: {}", target.display()));
        }
        Ok(bytes)
    }
}

/// 可视化管线：渲染图表并请求模型解读
pub struct VisualizationPipeline {
    renderer: Arc<dyn ChartRenderer>,
    model: Arc<dyn ModelGateway>,
}

impl VisualizationPipeline {
    pub fn new(renderer: Arc<dyn ChartRenderer>, model: Arc<dyn ModelGateway>) -> Self {
        Self { renderer, model }
    }

    /// 渲染图表到目标路径，并返回模型对渲染结果的解读文本
    pub async fn render_and_critique(
        &self,
        spec: &Value,
        target: &Path,
        context_text: &str,
    ) -> Result<String> {
        let image = self.renderer.render(spec, target).await?;

        let critique_context = format!(
            "以下是成本调查过程中渲染的图表，请解读其中的花费模式、异常点与优化线索。\n\n调查上下文：{}",
            context_text
        );
        self.model.critique_image(&critique_context, &image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_chart_spec_accepts_minimal_spec() {
        let spec = json!({
            "mark": "bar",
            "encoding": {
                "x": {"field": "date", "type": "temporal"},
                "y": {"field": "amount", "type": "quantitative"}
            },
            "data": {"values": []}
        });
        assert!(validate_chart_spec(&spec).is_ok());
    }

    #[test]
    fn test_validate_chart_spec_rejects_non_object() {
        assert!(validate_chart_spec(&json!("bar")).is_err());
        assert!(validate_chart_spec(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_validate_chart_spec_rejects_missing_fields() {
        assert!(validate_chart_spec(&json!({"mark": "bar"})).is_err());
        assert!(validate_chart_spec(&json!({"encoding": {}})).is_err());
    }
}
