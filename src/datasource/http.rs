//! 成本数据源的HTTP实现

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::DataSourceConfig;

use super::{Capability, CostDataSource, RankedSubject, ToolInvocationOutcome};

/// HTTP成本数据源客户端
/// 凭证与区域在构造时绑定，整个运行周期内只读共享
#[derive(Clone)]
pub struct HttpCostDataSource {
    config: DataSourceConfig,
    client: reqwest::Client,
}

/// invoke请求体
#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    tool: &'a str,
    params: &'a Value,
    region: &'a str,
}

/// 排名主体响应体
#[derive(Debug, Deserialize)]
struct RankedSubjectsResponse {
    subjects: Vec<RankedSubject>,
}

/// 能力目录响应体
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    capabilities: Vec<Capability>,
}

impl HttpCostDataSource {
    pub fn new(config: DataSourceConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!(
                "成本数据源API KEY未配置，请设置COSTSCOPE_DATA_API_KEY或在配置文件中提供datasource.api_key"
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build http client")?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// 非2xx响应一律转为错误，避免把失败伪装成空成功
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("成本数据源请求失败: {} {}", status, body))
    }
}

#[async_trait]
impl CostDataSource for HttpCostDataSource {
    async fn ranked_subjects(&self, period: &str, limit: usize) -> Result<Vec<RankedSubject>> {
        let response = self
            .client
            .get(self.endpoint("subjects/ranked"))
            .header("x-api-key", &self.config.api_key)
            .query(&[("period", period), ("limit", &limit.to_string())])
            .send()
            .await
            .context("请求排名成本主体失败")?;

        let response = Self::ensure_success(response).await?;
        let parsed: RankedSubjectsResponse =
            response.json().await.context("解析排名成本主体响应失败")?;
        Ok(parsed.subjects)
    }

    async fn catalog(&self) -> Result<Vec<Capability>> {
        let response = self
            .client
            .get(self.endpoint("capabilities"))
            .header("x-api-key", &self.config.api_key)
            .send()
            .await
            .context("请求能力目录失败")?;

        let response = Self::ensure_success(response).await?;
        let parsed: CatalogResponse = response.json().await.context("解析能力目录响应失败")?;
        Ok(parsed.capabilities)
    }

    async fn invoke(&self, tool_name: &str, params: &Value) -> Result<ToolInvocationOutcome> {
        let request = InvokeRequest {
            tool: tool_name,
            params,
            region: &self.config.region,
        };

        let response = self
            .client
            .post(self.endpoint("invoke"))
            .header("x-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .context(format!("调用能力 {} 失败", tool_name))?;

        let response = Self::ensure_success(response).await?;
        let outcome: ToolInvocationOutcome = response
            .json()
            .await
            .context(format!("解析能力 {} 的响应失败", tool_name))?;
        Ok(outcome)
    }
}
