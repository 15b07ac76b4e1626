use chrono::{DateTime, Duration, Utc};

use crate::config::PipelineConfig;
use crate::domain::location::{Location, LocationTable};
use crate::domain::state::CommentGenerationState;
use crate::error::PipelineError;

const MAX_LOCATION_NAME_LEN: usize = 64;

/// Validates the requested location name and resolves it against the
/// gazetteer, falling back to a default with a warning on a miss. Also
/// resolves the target time, defaulting to `now + forecast_hours_ahead`.
pub fn normalize(
    location_name: &str,
    target_time: Option<DateTime<Utc>>,
    table: &LocationTable,
    config: &PipelineConfig,
) -> Result<CommentGenerationState, PipelineError> {
    let trimmed = location_name.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidInput("location name must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_LOCATION_NAME_LEN {
        return Err(PipelineError::InvalidInput("location name too long".to_string()));
    }

    let (location, fallback_warning) = match table.resolve(trimmed) {
        Some(loc) => (loc, None),
        None => (
            Location::new(trimmed),
            Some(format!("location `{trimmed}` not found in gazetteer, using default coordinates")),
        ),
    };

    let target = target_time.unwrap_or_else(|| Utc::now() + Duration::hours(config.forecast_hours_ahead));
    let mut state = CommentGenerationState::new(location, target);
    if let Some(warning) = fallback_warning {
        state.record_warning("input_normaliser", warning);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        let table = LocationTable::with_defaults();
        let config = PipelineConfig::default();
        assert!(normalize("   ", None, &table, &config).is_err());
    }

    #[test]
    fn unknown_location_falls_back_with_warning() {
        let table = LocationTable::with_defaults();
        let config = PipelineConfig::default();
        let state = normalize("未知の町", None, &table, &config).unwrap();
        assert_eq!(state.warnings.len(), 1);
    }

    #[test]
    fn known_location_has_no_warning() {
        let table = LocationTable::with_defaults();
        let config = PipelineConfig::default();
        let state = normalize("那覇", None, &table, &config).unwrap();
        assert!(state.warnings.is_empty());
    }

    #[test]
    fn target_time_defaults_forward_by_config_hours() {
        let table = LocationTable::with_defaults();
        let config = PipelineConfig::default();
        let state = normalize("東京", None, &table, &config).unwrap();
        let target = state.target_datetime.unwrap();
        assert!(target > Utc::now() + Duration::hours(config.forecast_hours_ahead - 1));
    }
}
