use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 报告名称
    pub report_name: Option<String>,

    /// 产物输出根目录
    pub output_path: PathBuf,

    /// 内部工作目录路径 (.costscope)
    pub internal_path: PathBuf,

    /// 成本统计周期标签（传递给成本数据源，例如 "LAST_MONTH"）
    pub period: String,

    /// 最多调查的成本主体数量
    pub top_subjects: usize,

    /// 单个调查步骤内工具调用循环的轮次上限
    pub step_budget: usize,

    /// 是否跳过图表渲染与图表解读
    pub skip_charts: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 成本数据源配置
    pub datasource: DataSourceConfig,

    /// 图表渲染器配置
    pub renderer: RendererConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 强制重新生成（清除缓存）
    pub force_regenerate: bool,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，优先用于CostScope引擎的常规推理任务
    pub model_efficient: String,

    /// 高质量模型，优先用于CostScope引擎的复杂推理任务，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 成本数据源配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DataSourceConfig {
    /// 数据源API基地址
    pub api_base_url: String,

    /// 数据源API KEY
    pub api_key: String,

    /// 数据源区域
    pub region: String,
}

/// 图表渲染器配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RendererConfig {
    /// 外部渲染器可执行程序
    pub command: String,

    /// 渲染器子命令与固定参数
    pub args: Vec<String>,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 获取报告名称，优先使用配置的report_name，否则根据周期与区域推断
    pub fn get_report_name(&self) -> String {
        if let Some(ref name) = self.report_name
            && !name.trim().is_empty()
        {
            return name.clone();
        }

        format!(
            "Cost Investigation ({} / {})",
            self.period, self.datasource.region
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_name: None,
            output_path: PathBuf::from("./costscope.reports"),
            internal_path: PathBuf::from("./.costscope"),
            period: String::from("LAST_MONTH"),
            top_subjects: 5,
            step_budget: 12,
            skip_charts: false,
            llm: LLMConfig::default(),
            datasource: DataSourceConfig::default(),
            renderer: RendererConfig::default(),
            cache: CacheConfig::default(),
            force_regenerate: false,
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("COSTSCOPE_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_efficient: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            model_powerful: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            max_tokens: 131072,
            temperature: 0.1,
            retry_attempts: 5,
            retry_delay_ms: 5000,
            timeout_seconds: 300,
        }
    }
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("http://127.0.0.1:8630"),
            api_key: std::env::var("COSTSCOPE_DATA_API_KEY").unwrap_or_default(),
            region: String::from("us-east-1"),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: String::from("vl-convert"),
            args: vec![String::from("vl2png")],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".costscope/cache"),
            expire_hours: 8760,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
