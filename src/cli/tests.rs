#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::Config;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(&["costscope-rs"]).unwrap();

        assert_eq!(args.output_path, PathBuf::from("./costscope.reports"));
        assert!(args.period.is_none());
        assert!(args.top_subjects.is_none());
        assert!(args.step_budget.is_none());
        assert!(!args.skip_charts);
        assert!(!args.verbose);
        assert!(!args.force_regenerate);
        assert!(!args.no_cache);
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from(&[
            "costscope-rs",
            "-o", "/test/output",
            "-n", "Spend Review",
            "-v"
        ]).unwrap();

        assert_eq!(args.output_path, PathBuf::from("/test/output"));
        assert_eq!(args.name, Some("Spend Review".to_string()));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_long_options() {
        let args = Args::try_parse_from(&[
            "costscope-rs",
            "--output-path", "/test/output",
            "--period", "LAST_QUARTER",
            "--top-subjects", "3",
            "--step-budget", "8",
            "--skip-charts",
            "--force-regenerate",
            "--verbose"
        ]).unwrap();

        assert_eq!(args.output_path, PathBuf::from("/test/output"));
        assert_eq!(args.period, Some("LAST_QUARTER".to_string()));
        assert_eq!(args.top_subjects, Some(3));
        assert_eq!(args.step_budget, Some(8));
        assert!(args.skip_charts);
        assert!(args.force_regenerate);
        assert!(args.verbose);
    }

    #[test]
    fn test_args_llm_options() {
        let args = Args::try_parse_from(&[
            "costscope-rs",
            "--llm-provider", "deepseek",
            "--llm-api-base-url", "https://llm.example.com/v1",
            "--llm-api-key", "sk-test",
            "--model-efficient", "model-a",
            "--model-powerful", "model-b",
            "--max-tokens", "4096",
            "--temperature", "0.3",
        ]).unwrap();

        assert_eq!(args.llm_provider, Some("deepseek".to_string()));
        assert_eq!(args.llm_api_base_url, Some("https://llm.example.com/v1".to_string()));
        assert_eq!(args.llm_api_key, Some("sk-test".to_string()));
        assert_eq!(args.model_efficient, Some("model-a".to_string()));
        assert_eq!(args.model_powerful, Some("model-b".to_string()));
        assert_eq!(args.max_tokens, Some(4096));
        assert_eq!(args.temperature, Some(0.3));
    }

    #[test]
    fn test_into_config_overrides() {
        let args = Args::try_parse_from(&[
            "costscope-rs",
            "--output-path", "/tmp/costscope-out",
            "--period", "LAST_WEEK",
            "--step-budget", "4",
            "--region", "eu-west-1",
            "--data-api-key", "ds-key",
            "--llm-provider", "anthropic",
            "--no-cache",
            "--skip-charts",
        ]).unwrap();

        let config = args.into_config();

        assert_eq!(config.output_path, PathBuf::from("/tmp/costscope-out"));
        assert_eq!(config.period, "LAST_WEEK");
        assert_eq!(config.step_budget, 4);
        assert_eq!(config.datasource.region, "eu-west-1");
        assert_eq!(config.datasource.api_key, "ds-key");
        assert_eq!(
            config.llm.provider,
            crate::config::LLMProvider::Anthropic
        );
        assert!(!config.cache.enabled);
        assert!(config.skip_charts);
    }

    #[test]
    fn test_into_config_unknown_provider_keeps_default() {
        let args = Args::try_parse_from(&[
            "costscope-rs",
            "--llm-provider", "galaxybrain",
        ]).unwrap();

        let config = args.into_config();
        assert_eq!(config.llm.provider, crate::config::LLMProvider::OpenAI);
    }

    #[test]
    fn test_into_config_powerful_falls_back_to_efficient() {
        let args = Args::try_parse_from(&[
            "costscope-rs",
            "--model-efficient", "model-a",
        ]).unwrap();

        let config = args.into_config();
        assert_eq!(config.llm.model_efficient, "model-a");
        assert_eq!(config.llm.model_powerful, "model-a");
    }

    #[test]
    fn test_into_config_keeps_powerful_from_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("costscope.toml");

        let mut file_config = Config::default();
        file_config.llm.model_efficient = "file-efficient".to_string();
        file_config.llm.model_powerful = "file-powerful".to_string();
        std::fs::write(&config_path, toml::to_string(&file_config).unwrap()).unwrap();

        let args = Args::try_parse_from(&[
            "costscope-rs",
            "-c", config_path.to_str().unwrap(),
            "--model-efficient", "cli-efficient",
        ]).unwrap();

        let config = args.into_config();
        // 只覆盖efficient时，配置文件里的兜底模型不被顶掉
        assert_eq!(config.llm.model_efficient, "cli-efficient");
        assert_eq!(config.llm.model_powerful, "file-powerful");
    }
}
