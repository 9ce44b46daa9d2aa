//! 工具适配器注册表 - 将外部能力包装为绑定了运行上下文的可调用单元
//!
//! 绑定阶段做快速失败的能力名校验；调用阶段执行完整的副作用管线：
//! 持久化数据 -> 渲染图表 -> 图表解读 -> 以产物引用替换原始负载返回。

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agent::context::RunContext;
use crate::artifacts::{ArtifactReference, ArtifactStore, CallId};
use crate::datasource::{Capability, CostDataSource, RankedSubject};
use crate::llm::client::types::ToolSchema;
use crate::viz::VisualizationPipeline;

/// 步骤范围内共享的产物引用收集器
pub type ArtifactSink = Arc<RwLock<Vec<ArtifactReference>>>;

/// 工具调用结果 - 负载字段已被产物引用替换，原始字节不进入模型上下文
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocationResult {
    /// 结果摘要
    pub summary: String,
    /// 数据产物引用
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_artifact: Option<ArtifactReference>,
    /// 图表产物引用
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_artifact: Option<ArtifactReference>,
    /// 图表解读
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_commentary: Option<String>,
    /// 本次调用是否失败
    pub failed: bool,
}

impl ToolInvocationResult {
    fn failure(summary: String) -> Self {
        Self {
            summary,
            data_artifact: None,
            chart_artifact: None,
            chart_commentary: None,
            failed: true,
        }
    }

    /// 序列化为回传给模型的工具响应文本
    pub fn to_model_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.summary.clone())
    }
}

/// 工具适配器注册表 - 持有只读的能力目录
pub struct AdapterRegistry {
    catalog: HashMap<String, Capability>,
}

impl AdapterRegistry {
    pub fn new(catalog: Vec<Capability>) -> Self {
        let catalog = catalog
            .into_iter()
            .map(|capability| (capability.name.clone(), capability))
            .collect();
        Self { catalog }
    }

    /// 目录中的全部能力（名称升序）
    pub fn capabilities(&self) -> Vec<&Capability> {
        let mut capabilities: Vec<_> = self.catalog.values().collect();
        capabilities.sort_by(|a, b| a.name.cmp(&b.name));
        capabilities
    }

    /// 校验能力名集合是否全部存在于目录中
    /// 快速失败：任何一个未知名称都会导致绑定整体失败，并完整列出无效名称与有效目录
    pub fn validate(&self, capability_names: &[String]) -> Result<()> {
        let mut invalid: Vec<&str> = capability_names
            .iter()
            .filter(|name| !self.catalog.contains_key(name.as_str()))
            .map(|name| name.as_str())
            .collect();

        if invalid.is_empty() {
            return Ok(());
        }

        invalid.sort();
        let mut valid: Vec<&str> = self.catalog.keys().map(|k| k.as_str()).collect();
        valid.sort();

        Err(anyhow!(
            "未知的能力名称: [{}]，可用能力目录: [{}]",
            invalid.join(", "),
            valid.join(", ")
        ))
    }

    /// 参数schema必须是JSON对象，畸形目录条目在绑定阶段就被拒绝
    fn check_parameter_schema(capability: &Capability) -> Result<()> {
        if !capability.parameters.is_object() {
            return Err(anyhow!(
                "能力 {} 的参数schema不是JSON对象",
                capability.name
            ));
        }
        Ok(())
    }

    /// 为一个调查步骤绑定适配器集合
    /// 返回的适配器携带运行范围的凭证、区域、产物命名空间与主体上下文
    pub fn bind(
        &self,
        capability_names: &[String],
        context: &RunContext,
        subject: &RankedSubject,
        artifacts: ArtifactSink,
    ) -> Result<HashMap<String, BoundToolAdapter>> {
        self.validate(capability_names)?;

        let viz = if context.config.skip_charts {
            None
        } else {
            Some(Arc::new(VisualizationPipeline::new(
                context.renderer.clone(),
                context.model.clone(),
            )))
        };

        let mut adapters = HashMap::new();
        for name in capability_names {
            // validate已保证存在
            let capability = match self.catalog.get(name) {
                Some(capability) => capability.clone(),
                None => continue,
            };
            Self::check_parameter_schema(&capability)?;
            adapters.insert(
                name.clone(),
                BoundToolAdapter {
                    capability,
                    subject: subject.name.clone(),
                    source: context.source.clone(),
                    store: context.store.clone(),
                    viz: viz.clone(),
                    artifacts: artifacts.clone(),
                    verbose: context.config.verbose,
                },
            );
        }
        Ok(adapters)
    }
}

/// 绑定后的工具适配器
pub struct BoundToolAdapter {
    capability: Capability,
    subject: String,
    source: Arc<dyn CostDataSource>,
    store: ArtifactStore,
    viz: Option<Arc<VisualizationPipeline>>,
    artifacts: ArtifactSink,
    verbose: bool,
}

impl BoundToolAdapter {
    /// 喂给模型的工具目录条目
    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.capability.name.clone(),
            description: self.capability.description.clone(),
            parameters: self.capability.parameters.clone(),
        }
    }

    /// 执行一次工具调用
    /// 任何内部错误都折叠进结果摘要，绝不向工具调用循环抛出 -
    /// 单个工具调用失败不能中止整个调查步骤
    pub async fn invoke(&self, arguments: &Value) -> ToolInvocationResult {
        println!(
            "   🔧 tool called...{}@{}",
            self.capability.name, self.subject
        );

        match self.invoke_inner(arguments).await {
            Ok(result) => result,
            Err(e) => {
                eprintln!("   ⚠️ 工具 {} 调用失败: {}", self.capability.name, e);
                ToolInvocationResult::failure(format!(
                    "工具 {} 调用失败: {}",
                    self.capability.name, e
                ))
            }
        }
    }

    async fn invoke_inner(&self, arguments: &Value) -> Result<ToolInvocationResult> {
        let outcome = self.source.invoke(&self.capability.name, arguments).await?;

        // 每次调用铸造独立的调用标识，同一 工具+主体 的重复调用也不会相互覆盖
        let call_id = CallId::mint();

        let mut data_artifact = None;
        if let Some(datapoints) = &outcome.datapoints {
            let reference = self
                .store
                .persist_data(&self.subject, &self.capability.name, &call_id, datapoints)
                .await?;
            self.artifacts.write().await.push(reference.clone());
            if self.verbose {
                println!("   💾 数据产物: {}", reference.path.display());
            }
            data_artifact = Some(reference);
        }

        let mut chart_artifact = None;
        let mut chart_commentary = None;
        if let Some(chart) = &outcome.chart {
            match &self.viz {
                Some(viz) => {
                    let target = self
                        .store
                        .reserve_chart(&self.subject, &self.capability.name, &call_id)
                        .await?;
                    let critique_context = format!(
                        "主体: {}，工具: {}，摘要: {}",
                        self.subject, self.capability.name, outcome.summary
                    );
                    let commentary = viz
                        .render_and_critique(chart, &target, &critique_context)
                        .await?;

                    let reference =
                        self.store
                            .chart_reference(&self.subject, &self.capability.name, &call_id);
                    self.artifacts.write().await.push(reference.clone());
                    if self.verbose {
                        println!("   📈 图表产物: {}", reference.path.display());
                    }
                    chart_artifact = Some(reference);
                    chart_commentary = Some(commentary);
                }
                None => {
                    chart_commentary =
                        Some("（已按配置跳过图表渲染与解读）".to_string());
                }
            }
        }

        Ok(ToolInvocationResult {
            summary: outcome.summary,
            data_artifact,
            chart_artifact,
            chart_commentary,
            failed: false,
        })
    }
}
