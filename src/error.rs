use thiserror::Error;

/// Classified sub-kinds of a weather-provider failure, surfaced separately so
/// callers can decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherProviderErrorKind {
    ApiKeyInvalid,
    RateLimit,
    NetworkError,
    Timeout,
    ServerError,
    NotFound,
}

impl std::fmt::Display for WeatherProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ApiKeyInvalid => "api_key_invalid",
            Self::RateLimit => "rate_limit",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::ServerError => "server_error",
            Self::NotFound => "not_found",
        };
        f.write_str(label)
    }
}

/// Fatal pipeline errors. Non-fatal conditions (location fallback, LLM
/// failure, evaluation failure) never materialise as this type: they are
/// recorded onto `CommentGenerationState` and execution continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("weather provider error ({kind}): {message}")]
    WeatherProvider {
        kind: WeatherProviderErrorKind,
        message: String,
    },

    #[error("no forecast data available for {location}")]
    NoForecastData { location: String },

    #[error("historical comment corpus unavailable: {0}")]
    CorpusUnavailable(String),

    #[error("no valid candidate remained after validation for pool `{pool}`")]
    NoValidCandidate { pool: String },

    #[error("pipeline cancelled at stage `{stage}`")]
    Cancelled { stage: String },
}

impl PipelineError {
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "input_normaliser",
            Self::WeatherProvider { .. } => "forecast_fetcher",
            Self::NoForecastData { .. } => "priority_selector",
            Self::CorpusUnavailable(_) => "comment_retriever",
            Self::NoValidCandidate { .. } => "validator",
            Self::Cancelled { stage } => stage,
        }
    }
}

/// A non-fatal condition recorded onto pipeline state rather than propagated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StageNotice {
    pub message: String,
    pub stage: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StageNotice {
    #[must_use]
    pub fn new(stage: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage: stage.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }
}
