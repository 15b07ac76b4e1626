use crate::cache::ForecastCache;
use crate::domain::state::CommentGenerationState;
use crate::domain::trend::TemperatureDifference;

/// Computes the previous-day, twelve-hours-ago, and daily-range temperature
/// differences from the cache. Any cache miss is tolerated: the
/// corresponding field is simply `None`.
pub async fn analyse(state: &mut CommentGenerationState, cache: &ForecastCache) {
    let Some(forecast) = state.selected_forecast.clone() else {
        return;
    };
    let location = forecast.location_name.clone();

    let previous_day_diff = cache
        .previous_day(&location, forecast.datetime)
        .await
        .ok()
        .flatten()
        .map(|entry| forecast.temperature - entry.temperature);

    let twelve_hours_ago_diff = cache
        .twelve_hours_ago(&location, forecast.datetime)
        .await
        .ok()
        .flatten()
        .map(|entry| forecast.temperature - entry.temperature);

    let daily_range = if state.slot_forecasts.is_empty() {
        None
    } else {
        let max = state.slot_forecasts.iter().map(|f| f.temperature).fold(f64::NEG_INFINITY, f64::max);
        let min = state.slot_forecasts.iter().map(|f| f.temperature).fold(f64::INFINITY, f64::min);
        Some(max - min)
    };

    state.temperature_difference = Some(TemperatureDifference {
        previous_day_diff,
        twelve_hours_ago_diff,
        daily_range,
    });
}
