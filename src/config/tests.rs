#[cfg(test)]
mod tests {
    use crate::config::{CacheConfig, Config, DataSourceConfig, LLMConfig, LLMProvider};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.report_name.is_none());
        assert_eq!(config.output_path, PathBuf::from("./costscope.reports"));
        assert_eq!(config.internal_path, PathBuf::from("./.costscope"));
        assert_eq!(config.period, "LAST_MONTH");
        assert_eq!(config.top_subjects, 5);
        assert_eq!(config.step_budget, 12);
        assert!(!config.skip_charts);
        assert!(!config.force_regenerate);
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_provider_default() {
        let provider = LLMProvider::default();
        assert_eq!(provider, LLMProvider::OpenAI);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "moonshot".parse::<LLMProvider>().unwrap(),
            LLMProvider::Moonshot
        );
        assert_eq!(
            "deepseek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "OpenRouter".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenRouter
        );
        assert!("nonexistent".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::OpenAI.to_string(), "openai");
        assert_eq!(LLMProvider::Gemini.to_string(), "gemini");
        assert_eq!(LLMProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_llm_config_default() {
        let llm = LLMConfig::default();

        assert_eq!(llm.provider, LLMProvider::OpenAI);
        assert_eq!(llm.max_tokens, 131072);
        assert_eq!(llm.temperature, 0.1);
        assert_eq!(llm.retry_attempts, 5);
        assert_eq!(llm.retry_delay_ms, 5000);
        assert_eq!(llm.timeout_seconds, 300);
    }

    #[test]
    fn test_datasource_config_default() {
        let ds = DataSourceConfig::default();
        assert_eq!(ds.region, "us-east-1");
        assert!(!ds.api_base_url.is_empty());
    }

    #[test]
    fn test_cache_config_default() {
        let cache = CacheConfig::default();
        assert!(cache.enabled);
        assert_eq!(cache.cache_dir, PathBuf::from(".costscope/cache"));
        assert_eq!(cache.expire_hours, 8760);
    }

    #[test]
    fn test_report_name_fallback() {
        let config = Config::default();
        let name = config.get_report_name();
        assert!(name.contains("LAST_MONTH"));
        assert!(name.contains("us-east-1"));
    }

    #[test]
    fn test_report_name_configured() {
        let config = Config {
            report_name: Some("FY26 Spend Review".to_string()),
            ..Default::default()
        };
        assert_eq!(config.get_report_name(), "FY26 Spend Review");

        // 空白名称等同于未配置
        let config = Config {
            report_name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.get_report_name().contains("Cost Investigation"));
    }

    #[test]
    fn test_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("costscope.toml");

        let config = Config {
            report_name: Some("from-file".to_string()),
            step_budget: 7,
            ..Default::default()
        };
        fs::write(&config_path, toml::to_string(&config).unwrap()).unwrap();

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.report_name.as_deref(), Some("from-file"));
        assert_eq!(loaded.step_budget, 7);
    }

    #[test]
    fn test_config_from_missing_file() {
        let path = PathBuf::from("/definitely/not/here/costscope.toml");
        assert!(Config::from_file(&path).is_err());
    }
}
