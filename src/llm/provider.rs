use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm provider not configured")]
    NotConfigured,
    #[error("llm request timed out")]
    Timeout,
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm returned an unparseable response")]
    Unparseable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Gemini,
    Anthropic,
    Null,
}

impl LlmProviderKind {
    #[must_use]
    pub fn from_config_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "gemini" => Self::Gemini,
            "anthropic" => Self::Anthropic,
            _ => Self::Null,
        }
    }
}

/// A single, minimal contract every provider must satisfy: prompt in, text
/// out. Selection of which implementation backs this trait object is a
/// runtime configuration value, never a generic type parameter, so the pair
/// selector is written once against `&dyn LlmProvider`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    fn name(&self) -> &'static str;
}

/// Always-available provider that never calls out. Used by tests and as the
/// zero-config default, driving the deterministic fallback path without a
/// live API key.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProvider;

#[async_trait]
impl LlmProvider for NullProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

macro_rules! http_provider {
    ($name:ident, $label:literal, $env_key:literal, $endpoint:literal) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            client: reqwest::Client,
            api_key: Option<String>,
            model: String,
            timeout: Duration,
        }

        impl $name {
            #[must_use]
            pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
                Self {
                    client: reqwest::Client::new(),
                    api_key: std::env::var($env_key).ok(),
                    model: model.into(),
                    timeout,
                }
            }
        }

        #[async_trait]
        impl LlmProvider for $name {
            async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
                let Some(api_key) = self.api_key.as_ref() else {
                    return Err(LlmError::NotConfigured);
                };
                let body = serde_json::json!({
                    "model": self.model,
                    "prompt": prompt,
                });
                let response = self
                    .client
                    .post($endpoint)
                    .bearer_auth(api_key)
                    .json(&body)
                    .timeout(self.timeout)
                    .send()
                    .await
                    .map_err(|err| {
                        if err.is_timeout() {
                            LlmError::Timeout
                        } else {
                            LlmError::Transport(err.to_string())
                        }
                    })?;
                let payload: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|_| LlmError::Unparseable)?;
                payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .ok_or(LlmError::Unparseable)
            }

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

http_provider!(OpenAiProvider, "openai", "OPENAI_API_KEY", "https://api.openai.com/v1/responses");
http_provider!(GeminiProvider, "gemini", "GEMINI_API_KEY", "https://generativelanguage.googleapis.com/v1/models:generate");
http_provider!(AnthropicProvider, "anthropic", "ANTHROPIC_API_KEY", "https://api.anthropic.com/v1/messages");

/// Builds the provider named by configuration. Unknown or unset provider
/// names resolve to `NullProvider`, which always fails over to the
/// deterministic fallback path.
#[must_use]
pub fn build_provider(kind: LlmProviderKind, model: &str, timeout: Duration) -> Box<dyn LlmProvider> {
    match kind {
        LlmProviderKind::OpenAi => Box::new(OpenAiProvider::new(model, timeout)),
        LlmProviderKind::Gemini => Box::new(GeminiProvider::new(model, timeout)),
        LlmProviderKind::Anthropic => Box::new(AnthropicProvider::new(model, timeout)),
        LlmProviderKind::Null => Box::new(NullProvider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_always_fails_over() {
        let provider = NullProvider;
        let err = provider.generate("pick one").await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(LlmProviderKind::from_config_str("OpenAI"), LlmProviderKind::OpenAi);
        assert_eq!(LlmProviderKind::from_config_str("unknown"), LlmProviderKind::Null);
    }
}
