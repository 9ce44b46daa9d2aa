use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::agent::planner::InvestigationPlan;
use crate::artifacts::{ArtifactStore, ExecutionId};
use crate::config::Config;
use crate::datasource::CostDataSource;
use crate::llm::client::LLMClient;
use crate::llm::client::types::{ChatMessage, ModelTurn, ToolSchema};
use crate::viz::ChartRenderer;

/// 模型网关 - 编排层消费的模型能力边界
/// 规划提取、工具调用对话、图表解读与报告合成各自独立成方法，便于测试替身注入
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// 规划调用：结构化输出，直接解析为调查计划
    async fn extract_plan(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<InvestigationPlan>;

    /// 工具调用对话的一轮：消息线程 + 工具目录 -> 叙述文本和/或工具调用请求
    async fn converse(
        &self,
        system_prompt: &str,
        thread: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelTurn>;

    /// 图表解读：图片字节 + 上下文 -> 解读文本
    async fn critique_image(&self, context_text: &str, image_png: &[u8]) -> Result<String>;

    /// 报告合成：单轮推理文本
    async fn synthesize(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[async_trait]
impl ModelGateway for LLMClient {
    async fn extract_plan(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<InvestigationPlan> {
        self.extract::<InvestigationPlan>("plan", system_prompt, user_prompt)
            .await
    }

    async fn converse(
        &self,
        system_prompt: &str,
        thread: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelTurn> {
        LLMClient::converse(self, system_prompt, thread, tools).await
    }

    async fn critique_image(&self, context_text: &str, image_png: &[u8]) -> Result<String> {
        LLMClient::critique_image(self, context_text, image_png).await
    }

    async fn synthesize(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        LLMClient::synthesize(self, system_prompt, user_prompt).await
    }
}

/// 运行上下文 - 运行范围内的显式依赖集合，不使用任何进程级单例
#[derive(Clone)]
pub struct RunContext {
    /// 配置
    pub config: Config,
    /// 模型网关
    pub model: Arc<dyn ModelGateway>,
    /// 成本数据源
    pub source: Arc<dyn CostDataSource>,
    /// 图表渲染器
    pub renderer: Arc<dyn ChartRenderer>,
    /// 产物存储（独占本次运行的磁盘命名空间）
    pub store: ArtifactStore,
}

impl RunContext {
    /// 创建新的运行上下文，铸造本次运行的执行标识
    pub fn new(
        config: Config,
        model: Arc<dyn ModelGateway>,
        source: Arc<dyn CostDataSource>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        let store = ArtifactStore::new(config.output_path.clone(), ExecutionId::mint());
        Self {
            config,
            model,
            source,
            renderer,
            store,
        }
    }

    /// 本次运行的执行标识
    pub fn execution_id(&self) -> &ExecutionId {
        self.store.execution_id()
    }
}
