use crate::cache::{ForecastCache, ForecastCacheEntry};
use crate::data::WeatherClient;
use crate::domain::state::CommentGenerationState;
use crate::domain::weather::WeatherForecast;
use crate::error::PipelineError;

/// Fetches the day's four forecast slots and persists each to the forecast
/// cache. A cache-write failure is advisory: it is recorded as a warning and
/// never aborts the run.
pub async fn fetch(
    state: &mut CommentGenerationState,
    client: &WeatherClient,
    cache: &ForecastCache,
) -> Result<(), PipelineError> {
    let location = state
        .location
        .clone()
        .ok_or_else(|| PipelineError::InvalidInput("state missing location".to_string()))?;
    let target = state
        .target_datetime
        .ok_or_else(|| PipelineError::InvalidInput("state missing target_datetime".to_string()))?;

    let slots = client.fetch_day_slots(&location, target.date_naive()).await?;
    if slots.is_empty() {
        return Err(PipelineError::NoForecastData {
            location: location.name.clone(),
        });
    }

    for forecast in &slots {
        if let Err(err) = cache.write(to_cache_entry(forecast)).await {
            state.record_warning("forecast_fetcher", format!("cache write failed: {err}"));
        }
    }

    state.slot_forecasts = slots;
    Ok(())
}

fn to_cache_entry(forecast: &WeatherForecast) -> ForecastCacheEntry {
    ForecastCacheEntry {
        location: forecast.location_name.clone(),
        forecast_datetime: forecast.datetime,
        cached_at: chrono::Utc::now(),
        temperature: forecast.temperature,
        max_temperature: None,
        min_temperature: None,
        weather_condition: format!("{:?}", forecast.weather_condition),
        weather_description: forecast.weather_description.clone(),
        precipitation: forecast.precipitation,
        humidity: forecast.humidity,
        wind_speed: forecast.wind_speed,
        metadata: String::new(),
    }
}
