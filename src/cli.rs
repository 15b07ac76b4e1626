use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "commentweave",
    version,
    about = "Generates short Japanese weather-advisory comments"
)]
pub struct Cli {
    /// Target location name (falls back to the built-in gazetteer default)
    pub location: Option<String>,

    /// Target time as an RFC3339 timestamp; defaults to now + forecast-hours-ahead
    #[arg(long)]
    pub target_time: Option<String>,

    /// Directory of per-season historical comment CSV files
    #[arg(long, default_value = "corpus")]
    pub corpus_dir: PathBuf,

    /// Directory for the append-only forecast cache
    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Override path for the validator's rule-matrix YAML document
    #[arg(long)]
    pub validator_rules: Option<PathBuf>,

    /// Weather provider base URL
    #[arg(long, env = "COMMENTWEAVE_WEATHER_URL", default_value = "https://example-weather-provider.test/forecast")]
    pub weather_url: String,

    /// LLM provider: openai | gemini | anthropic | null
    #[arg(long, default_value = "null")]
    pub llm_provider: String,

    /// LLM model id override
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Upper bound on pair-selection retries
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Number of concurrent pipeline workers for multi-location runs
    #[arg(long, default_value_t = 8)]
    pub worker_pool_size: usize,

    /// One or more additional locations to process in the same run
    #[arg(long = "also")]
    pub additional_locations: Vec<String>,
}

impl Cli {
    #[must_use]
    pub fn default_location(&self) -> String {
        self.location.clone().unwrap_or_else(|| "東京".to_string())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(raw) = &self.target_time {
            chrono::DateTime::parse_from_rfc3339(raw)
                .map_err(|_| anyhow::anyhow!("--target-time must be RFC3339"))?;
        }
        if self.worker_pool_size == 0 {
            anyhow::bail!("--worker-pool-size must be at least 1");
        }
        Ok(())
    }

    #[must_use]
    pub fn locations(&self) -> Vec<String> {
        let mut locations = vec![self.default_location()];
        locations.extend(self.additional_locations.iter().cloned());
        locations
    }
}
