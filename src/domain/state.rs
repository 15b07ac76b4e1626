use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StageNotice;

use super::comment::{CommentPair, PastComment};
use super::location::Location;
use super::trend::{TemperatureDifference, WeatherTrend};
use super::weather::WeatherForecast;

/// The pipeline's carry-state. Each field is owned by exactly one stage;
/// later stages read it but never mutate it. This mirrors a typed record
/// rather than an untyped key-value bag so every cross-stage read is a
/// compile-time-checked field access.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommentGenerationState {
    // Stage 1 — Input Normaliser
    pub location: Option<Location>,
    pub target_datetime: Option<DateTime<Utc>>,

    // Stage 2 — Forecast Fetcher
    pub slot_forecasts: Vec<WeatherForecast>,

    // Stage 3 — Priority Selector
    pub selected_forecast: Option<WeatherForecast>,
    pub weather_trend: Option<WeatherTrend>,

    // Stage 4 — Comment Retriever
    pub weather_candidates: Vec<PastComment>,
    pub advice_candidates: Vec<PastComment>,

    // Stage 5 — Validator (annotates candidate pools in place via retained subsets)
    pub rejected_candidate_reasons: Vec<String>,

    // Stage 6 — Pair Selector: set once cross-season widening has been attempted,
    // so a second NoValidCandidate after widening is fatal rather than looping.
    pub widened_corpus: bool,

    // Stage 6 — Pair Selector
    pub selected_pair: Option<CommentPair>,
    pub llm_provider_used: Option<String>,

    // Stage 7 — Evaluator
    pub retry_count: u32,
    pub evaluation_total_score: Option<f64>,
    pub evaluation_suggestions: Vec<String>,

    // Stage 8 — Composer
    pub final_comment: Option<String>,

    // Stage 9 — Output Assembler
    pub temperature_difference: Option<TemperatureDifference>,
    pub started_at: Option<DateTime<Utc>>,

    // Cross-cutting
    pub errors: Vec<StageNotice>,
    pub warnings: Vec<StageNotice>,
}

impl CommentGenerationState {
    #[must_use]
    pub fn new(location: Location, target_datetime: DateTime<Utc>) -> Self {
        Self {
            location: Some(location),
            target_datetime: Some(target_datetime),
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn record_warning(&mut self, stage: &str, message: impl Into<String>) {
        self.warnings.push(StageNotice::new(stage, message));
    }

    pub fn record_error(&mut self, stage: &str, message: impl Into<String>) {
        self.errors.push(StageNotice::new(stage, message));
    }

    #[must_use]
    pub fn has_fatal_errors(&self) -> bool {
        !self.errors.is_empty() && self.final_comment.is_none()
    }

    #[must_use]
    pub fn location_name(&self) -> &str {
        self.location.as_ref().map_or("unknown", |l| l.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn new_state_seeds_location_and_time() {
        let state = CommentGenerationState::new(Location::new("東京"), Utc::now());
        assert_eq!(state.location_name(), "東京");
        assert_eq!(state.retry_count, 0);
        assert!(state.final_comment.is_none());
    }

    #[test]
    fn fatal_errors_require_missing_final_comment() {
        let mut state = CommentGenerationState::new(Location::new("東京"), Utc::now());
        state.record_error("validator", "no candidates");
        assert!(state.has_fatal_errors());
        state.final_comment = Some("ok".to_string());
        assert!(!state.has_fatal_errors());
    }
}
