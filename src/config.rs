use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::weather::WeatherCondition;
use crate::llm::provider::LlmProviderKind;

/// Structured configuration bundle overlaying CLI flags onto compiled-in
/// defaults, per the configuration key table.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_retries: u32,
    pub forecast_hours_ahead: i64,
    pub trend_hours_ahead: i64,
    pub heat_warning_threshold: f64,
    pub cold_warning_threshold: f64,
    pub thunder_severe_precipitation: f64,
    pub weather_scores: HashMap<WeatherCondition, i8>,
    pub llm_provider: LlmProviderKind,
    pub llm_model: String,
    pub weather_api_timeout: Duration,
    pub llm_api_timeout: Duration,
    pub worker_pool_size: usize,
    pub corpus_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub validator_rules_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            forecast_hours_ahead: 12,
            trend_hours_ahead: 12,
            heat_warning_threshold: 30.0,
            cold_warning_threshold: 15.0,
            thunder_severe_precipitation: 5.0,
            weather_scores: HashMap::new(),
            llm_provider: LlmProviderKind::Null,
            llm_model: "default".to_string(),
            weather_api_timeout: Duration::from_secs(30),
            llm_api_timeout: Duration::from_secs(30),
            worker_pool_size: 8,
            corpus_dir: PathBuf::from("corpus"),
            cache_dir: PathBuf::from("cache"),
            validator_rules_path: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let mut config = Self::default();
        if let Some(max_retries) = cli.max_retries {
            config.max_retries = max_retries;
        }
        config.llm_provider = LlmProviderKind::from_config_str(&cli.llm_provider);
        if let Some(model) = cli.llm_model.clone() {
            config.llm_model = model;
        }
        config.worker_pool_size = cli.worker_pool_size;
        config.corpus_dir = cli.corpus_dir.clone();
        config.cache_dir = cli.cache_dir.clone();
        config.validator_rules_path = cli.validator_rules.clone();
        config
    }
}
