use serde::Serialize;

use crate::domain::state::CommentGenerationState;

#[derive(Debug, Serialize)]
pub struct SelectedPastComment {
    pub text: String,
    #[serde(rename = "type")]
    pub comment_type: String,
    pub temperature: Option<f64>,
    pub weather_condition: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationMetadata {
    pub execution_time_ms: i64,
    pub retry_count: u32,
    pub generation_timestamp: chrono::DateTime<chrono::Utc>,
    pub location_name: String,
    pub target_datetime: Option<chrono::DateTime<chrono::Utc>>,
    pub llm_provider: Option<String>,
    pub weather_condition: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_forecast_time: Option<chrono::DateTime<chrono::Utc>>,
    pub selected_past_comments: Vec<SelectedPastComment>,
    pub similarity_score: Option<f64>,
    pub selection_reason: Option<String>,
    pub validation_passed: Option<bool>,
    pub validation_score: Option<f64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OutputEnvelope {
    pub final_comment: Option<String>,
    pub generation_metadata: GenerationMetadata,
}

/// Builds the final output schema from completed pipeline state.
#[must_use]
pub fn assemble(state: &CommentGenerationState) -> OutputEnvelope {
    let execution_time_ms = state
        .started_at
        .map(|start| (chrono::Utc::now() - start).num_milliseconds())
        .unwrap_or_default();

    let selected_past_comments = state
        .selected_pair
        .as_ref()
        .map(|pair| {
            vec![
                SelectedPastComment {
                    text: pair.weather_comment.comment_text.clone(),
                    comment_type: "weather_comment".to_string(),
                    temperature: pair.weather_comment.temperature,
                    weather_condition: Some(pair.weather_comment.weather_condition.clone()),
                },
                SelectedPastComment {
                    text: pair.advice_comment.comment_text.clone(),
                    comment_type: "advice".to_string(),
                    temperature: pair.advice_comment.temperature,
                    weather_condition: Some(pair.advice_comment.weather_condition.clone()),
                },
            ]
        })
        .unwrap_or_default();

    let metadata = GenerationMetadata {
        execution_time_ms,
        retry_count: state.retry_count,
        generation_timestamp: chrono::Utc::now(),
        location_name: state.location_name().to_string(),
        target_datetime: state.target_datetime,
        llm_provider: state.llm_provider_used.clone(),
        weather_condition: state.selected_forecast.as_ref().map(|f| format!("{:?}", f.weather_condition)),
        temperature: state.selected_forecast.as_ref().map(|f| f.temperature),
        humidity: state.selected_forecast.as_ref().map(|f| f.humidity),
        wind_speed: state.selected_forecast.as_ref().map(|f| f.wind_speed),
        weather_forecast_time: state.selected_forecast.as_ref().map(|f| f.datetime),
        selected_past_comments,
        similarity_score: state.selected_pair.as_ref().map(|p| p.similarity_score),
        selection_reason: state.selected_pair.as_ref().map(|p| p.selection_reason.clone()),
        validation_passed: state.evaluation_total_score.map(|score| score >= 0.6),
        validation_score: state.evaluation_total_score,
        errors: state.errors.iter().map(|e| e.message.clone()).collect(),
        warnings: state.warnings.iter().map(|w| w.message.clone()).collect(),
    };

    OutputEnvelope {
        final_comment: state.final_comment.clone(),
        generation_metadata: metadata,
    }
}

/// Batch envelope returned by multi-location fan-out.
#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub success_count: usize,
    pub total_count: usize,
    pub results: Vec<OutputEnvelope>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::Location;

    #[test]
    fn round_trips_through_json() {
        let state = CommentGenerationState::new(Location::new("東京"), chrono::Utc::now());
        let envelope = assemble(&state);
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("generation_metadata").is_some());
    }
}
