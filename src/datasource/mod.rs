//! 成本数据源 - 外部数据检索能力的接口边界

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod http;

pub use http::HttpCostDataSource;

/// 排名成本主体 - 由外部数据源产出，按花费金额降序排列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSubject {
    /// 主体名称（例如服务名）
    pub name: String,
    /// 子维度（例如用量类型、资源组）
    pub sub_category: String,
    /// 花费金额
    pub magnitude: f64,
    /// 金额单位（例如 USD）
    pub unit: String,
    /// 统计周期标签
    pub period: String,
}

/// 能力定义（工具定义）- 由外部工具目录提供，编排过程只读不写
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// 能力名称，目录内唯一
    pub name: String,
    /// 能力说明
    pub description: String,
    /// 参数schema（JSON Schema对象）
    pub parameters: Value,
}

/// 单次工具调用的原始结果
/// 所有负载字段均为可选：只有摘要没有数据或图表同样是合法结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationOutcome {
    /// 结果摘要文本
    pub summary: String,
    /// 原始数据负载
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datapoints: Option<Value>,
    /// 声明式图表负载（Vega-Lite规格）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<Value>,
}

/// 成本数据源接口
/// 实现方必须以错误形式拒绝失败的调用，不得返回含糊的空成功
#[async_trait]
pub trait CostDataSource: Send + Sync {
    /// 获取按花费金额降序排列的成本主体列表
    async fn ranked_subjects(&self, period: &str, limit: usize) -> Result<Vec<RankedSubject>>;

    /// 获取可用能力目录
    async fn catalog(&self) -> Result<Vec<Capability>>;

    /// 以绑定的凭证与区域调用指定能力
    async fn invoke(&self, tool_name: &str, params: &Value) -> Result<ToolInvocationOutcome>;
}
