use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    WeatherComment,
    Advice,
    Unknown,
}

/// One row of the historical comment corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastComment {
    pub location: String,
    pub datetime: DateTime<Utc>,
    pub weather_condition: String,
    pub comment_text: String,
    pub comment_type: CommentType,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_code: Option<String>,
    pub source_file: Option<String>,
    pub usage_count: Option<u32>,
    #[serde(default)]
    pub raw_data: Value,
}

impl PastComment {
    pub fn new(
        location: impl Into<String>,
        datetime: DateTime<Utc>,
        weather_condition: impl Into<String>,
        comment_text: impl Into<String>,
        comment_type: CommentType,
    ) -> Result<Self, PipelineError> {
        let comment_text = comment_text.into();
        if comment_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "comment_text must not be empty".to_string(),
            ));
        }
        Ok(Self {
            location: location.into(),
            datetime,
            weather_condition: weather_condition.into(),
            comment_text,
            comment_type,
            temperature: None,
            humidity: None,
            precipitation: None,
            wind_speed: None,
            weather_code: None,
            source_file: None,
            usage_count: None,
            raw_data: Value::Null,
        })
    }

    #[must_use]
    pub fn with_usage_count(mut self, count: u32) -> Self {
        self.usage_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_humidity(mut self, humidity: f64) -> Self {
        self.humidity = Some(humidity);
        self
    }

    #[must_use]
    pub fn with_precipitation(mut self, precipitation: f64) -> Self {
        self.precipitation = Some(precipitation);
        self
    }
}

/// A selected weather/advice pair, the pair selector's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPair {
    pub weather_comment: PastComment,
    pub advice_comment: PastComment,
    pub similarity_score: f64,
    pub selection_reason: String,
    #[serde(default)]
    pub metadata: Value,
}

impl CommentPair {
    pub fn new(
        weather_comment: PastComment,
        advice_comment: PastComment,
        similarity_score: f64,
        selection_reason: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        if weather_comment.comment_type != CommentType::WeatherComment {
            return Err(PipelineError::InvalidInput(
                "weather_comment must have comment_type WeatherComment".to_string(),
            ));
        }
        if advice_comment.comment_type != CommentType::Advice {
            return Err(PipelineError::InvalidInput(
                "advice_comment must have comment_type Advice".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&similarity_score) {
            return Err(PipelineError::InvalidInput(
                "similarity_score must be within [0,1]".to_string(),
            ));
        }
        Ok(Self {
            weather_comment,
            advice_comment,
            similarity_score,
            selection_reason: selection_reason.into(),
            metadata: Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wc() -> PastComment {
        PastComment::new("東京", Utc::now(), "rain", "傘が必要です", CommentType::WeatherComment).unwrap()
    }

    fn ac() -> PastComment {
        PastComment::new("東京", Utc::now(), "rain", "傘をお持ちください", CommentType::Advice).unwrap()
    }

    #[test]
    fn rejects_empty_comment_text() {
        assert!(PastComment::new("東京", Utc::now(), "rain", "  ", CommentType::Advice).is_err());
    }

    #[test]
    fn rejects_mismatched_pair_types() {
        assert!(CommentPair::new(ac(), wc(), 0.5, "test").is_err());
    }

    #[test]
    fn accepts_well_typed_pair() {
        assert!(CommentPair::new(wc(), ac(), 0.5, "test").is_ok());
    }
}
