//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::Result;
use rig::OneOrMany;
use rig::completion::Message;
use rig::message::{ImageMediaType, UserContent};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::config::{Config, LLMConfig};

mod providers;
pub mod types;

use providers::ProviderClient;
use types::{ChatMessage, ModelTurn, ToolSchema, split_thread};

/// 根据prompt规模挑选模型：常规任务走高能效模型并保留高质量模型兜底
fn evaluate_befitting_model(
    llm_config: &LLMConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> (String, Option<String>) {
    if system_prompt.len() + user_prompt.len() <= 32 * 1024 {
        return (
            llm_config.model_efficient.clone(),
            Some(llm_config.model_powerful.clone()),
        );
    }
    (llm_config.model_powerful.clone(), None)
}

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
    cache: Arc<CacheManager>,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        let cache = Arc::new(CacheManager::new(config.cache.clone()));
        Ok(Self {
            client,
            config,
            cache,
        })
    }

    /// 清空LLM响应缓存（force_regenerate时使用）
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        // 使用一个简单的prompt来测试连接
        match self
            .prompt_plain("System: You are a helpful assistant.", "Hello")
            .await
        {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }

    /// 通用重试逻辑，用于处理异步操作的重试机制
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let llm_config = &self.config.llm;
        let max_retries = llm_config.retry_attempts;
        let retry_delay_ms = llm_config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 结构化数据提取方法（带缓存）
    pub async fn extract<T>(&self, category: &str, system_prompt: &str, user_prompt: &str) -> Result<T>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        let cache_key = format!("{}\n---\n{}", system_prompt, user_prompt);
        if let Some(cached) = self.cache.get::<T>(category, &cache_key).await? {
            if self.config.verbose {
                println!("   📦 命中缓存: {}", category);
            }
            return Ok(cached);
        }

        let (befitting_model, fallover_model) =
            evaluate_befitting_model(&self.config.llm, system_prompt, user_prompt);

        let result = self
            .extract_inner(system_prompt, user_prompt, befitting_model.clone(), fallover_model)
            .await?;

        self.cache
            .store(category, &cache_key, &result, Some(befitting_model))
            .await?;
        Ok(result)
    }

    async fn extract_inner<T>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        befitting_model: String,
        fallover_model: Option<String>,
    ) -> Result<T>
    where
        T: JsonSchema + for<'a> Deserialize<'a> + Serialize + Send + Sync + 'static,
    {
        let llm_config = &self.config.llm;

        let extractor =
            self.client
                .create_extractor::<T>(&befitting_model, system_prompt, llm_config);

        self.retry_with_backoff(|| async {
            match extractor.extract(user_prompt).await {
                Ok(r) => Ok(r),
                Err(e) => match fallover_model {
                    Some(ref model) => {
                        eprintln!(
                            "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
                            llm_config.retry_attempts, model, e
                        );
                        let user_prompt_with_fixer = format!("{}\n\n**注意事项**此前我调用大模型过程时存在错误，错误信息为“{}”，你注意你这一次要规避这个错误", user_prompt, e);
                        Box::pin(self.extract_inner(
                            system_prompt,
                            &user_prompt_with_fixer,
                            model.clone(),
                            None,
                        ))
                        .await
                    }
                    None => {
                        eprintln!(
                            "❌ 调用模型服务出错，尝试 {} 次均失败...{}",
                            llm_config.retry_attempts, e
                        );
                        Err(e)
                    }
                },
            }
        })
        .await
    }

    /// 执行工具调用循环中的一轮对话：完整线程 + 本轮可用的工具目录
    pub async fn converse(
        &self,
        system_prompt: &str,
        thread: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ModelTurn> {
        let agent =
            self.client
                .create_agent(&self.config.llm.model_efficient, system_prompt, &self.config.llm);

        let definitions: Vec<_> = tools.iter().map(|t| t.to_definition()).collect();

        let choice = self
            .retry_with_backoff(|| async {
                let (history, prompt) = split_thread(thread)
                    .ok_or_else(|| anyhow::anyhow!("对话线程为空，无法发起模型调用"))?;
                agent.converse(history, prompt, definitions.clone()).await
            })
            .await?;

        Ok(ModelTurn::from_choice(&choice))
    }

    /// 图表解读：渲染产物图片 + 上下文说明 -> 解读文本
    pub async fn critique_image(&self, context_text: &str, image_png: &[u8]) -> Result<String> {
        let agent = self.client.create_agent(
            &self.config.llm.model_efficient,
            "你是一个专业的云成本分析师，擅长从成本图表中发现花费模式、异常波动和优化机会。",
            &self.config.llm,
        );

        let prompt = Message::User {
            content: OneOrMany::many(vec![
                UserContent::text(context_text),
                UserContent::image_raw(image_png.to_vec(), Some(ImageMediaType::PNG), None),
            ])
            .map_err(|e| anyhow::anyhow!("构建图片消息失败: {}", e))?,
        };

        let choice = self
            .retry_with_backoff(|| async {
                agent.converse(Vec::new(), prompt.clone(), Vec::new()).await
            })
            .await?;

        Ok(ModelTurn::from_choice(&choice).text)
    }

    /// 综合推理方法（单轮、无工具、带缓存），用于最终报告合成
    pub async fn synthesize(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let cache_key = format!("{}\n---\n{}", system_prompt, user_prompt);
        if let Some(cached) = self.cache.get::<String>("synthesis", &cache_key).await? {
            if self.config.verbose {
                println!("   📦 命中缓存: synthesis");
            }
            return Ok(cached);
        }

        let (befitting_model, _) =
            evaluate_befitting_model(&self.config.llm, system_prompt, user_prompt);
        let agent = self
            .client
            .create_agent(&befitting_model, system_prompt, &self.config.llm);

        let result = self
            .retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await?;

        self.cache
            .store("synthesis", &cache_key, &result, Some(befitting_model))
            .await?;
        Ok(result)
    }

    /// 简化的单轮对话方法（不使用工具、不走缓存）
    pub async fn prompt_plain(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self.client.create_agent(
            &self.config.llm.model_efficient,
            system_prompt,
            &self.config.llm,
        );

        self.retry_with_backoff(|| async { agent.prompt(user_prompt).await })
            .await
    }
}
