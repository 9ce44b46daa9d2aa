use crate::config::{Config, LLMProvider};
use clap::Parser;
use std::path::PathBuf;

/// CostScope - 由Rust与AI驱动的云成本调查引擎
#[derive(Parser, Debug)]
#[command(name = "CostScope (costscope-rs)")]
#[command(
    about = "AI-based agentic investigation engine for cloud spend. It fetches ranked cost subjects, plans multi-step investigations, drives LLM tool-calling loops and compiles an optimization report."
)]
#[command(version)]
pub struct Args {
    /// 产物输出根目录
    #[arg(short, long, default_value = "./costscope.reports")]
    pub output_path: PathBuf,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 报告名称
    #[arg(short, long)]
    pub name: Option<String>,

    /// 成本统计周期标签（例如 LAST_MONTH）
    #[arg(long)]
    pub period: Option<String>,

    /// 最多调查的成本主体数量
    #[arg(long)]
    pub top_subjects: Option<usize>,

    /// 单个调查步骤内工具调用循环的轮次上限
    #[arg(long)]
    pub step_budget: Option<usize>,

    /// 是否跳过图表渲染与图表解读
    #[arg(long)]
    pub skip_charts: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 高能效模型，优先用于CostScope引擎的常规推理任务
    #[arg(long)]
    pub model_efficient: Option<String>,

    /// 高质量模型，优先用于CostScope引擎的复杂推理任务，以及作为efficient失效情况下的兜底
    #[arg(long)]
    pub model_powerful: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// LLM Provider (openai, mistral, openrouter, anthropic, deepseek)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 成本数据源API基地址
    #[arg(long)]
    pub data_api_base_url: Option<String>,

    /// 成本数据源API KEY
    #[arg(long)]
    pub data_api_key: Option<String>,

    /// 成本数据源区域
    #[arg(long)]
    pub region: Option<String>,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 强制重新生成（清除缓存）
    #[arg(long)]
    pub force_regenerate: bool,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Config {
        let (mut config, config_from_file) = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            let config = Config::from_file(config_path).unwrap_or_else(|_| {
                panic!("⚠️ 警告: 无法读取配置文件 {:?}", config_path)
            });
            (config, true)
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join("costscope.toml");

            if default_config_path.exists() {
                let config = Config::from_file(&default_config_path).unwrap_or_else(|_| {
                    panic!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}",
                        default_config_path
                    )
                });
                (config, true)
            } else {
                // 默认配置文件不存在，使用默认值
                (Config::default(), false)
            }
        };

        // 覆盖配置文件中的设置
        config.output_path = self.output_path;

        // 报告名称处理：CLI参数优先级最高
        if let Some(name) = self.name {
            config.report_name = Some(name);
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(top_subjects) = self.top_subjects {
            config.top_subjects = top_subjects;
        }
        if let Some(step_budget) = self.step_budget {
            config.step_budget = step_budget;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        } else if !config_from_file {
            // 配置文件里显式设置的兜底模型不被覆盖，只有纯默认配置时才跟随efficient
            config.llm.model_powerful = config.llm.model_efficient.to_string();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 覆盖数据源配置
        if let Some(data_api_base_url) = self.data_api_base_url {
            config.datasource.api_base_url = data_api_base_url;
        }
        if let Some(data_api_key) = self.data_api_key {
            config.datasource.api_key = data_api_key;
        }
        if let Some(region) = self.region {
            config.datasource.region = region;
        }

        // 缓存配置
        if self.no_cache {
            config.cache.enabled = false;
        }

        // 其他配置
        config.force_regenerate = self.force_regenerate;
        config.skip_charts = self.skip_charts;
        config.verbose = self.verbose;

        config
    }
}

// Include tests
#[cfg(test)]
mod tests;
