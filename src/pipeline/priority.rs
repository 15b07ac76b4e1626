use crate::domain::weather::{PrecipitationSeverity, WeatherCondition, WeatherForecast};
use crate::error::PipelineError;

/// Deterministic selection of one representative forecast from a day's
/// forecast slots. Rules are applied in order; the first that matches wins.
pub fn select_priority_forecast(
    forecasts: &[WeatherForecast],
) -> Result<WeatherForecast, PipelineError> {
    if forecasts.is_empty() {
        return Err(PipelineError::NoForecastData {
            location: "unknown".to_string(),
        });
    }

    // Rule 1: extreme conditions take precedence over everything else.
    if let Some(extreme) = forecasts
        .iter()
        .filter(|f| f.weather_condition.is_extreme())
        .max_by(|a, b| {
            a.weather_condition
                .priority()
                .cmp(&b.weather_condition.priority())
                .then(b.datetime.cmp(&a.datetime))
        })
    {
        return Ok(extreme.clone());
    }

    // Rule 2: heavy rain (>10mm/h) dominates by precipitation amount.
    if let Some(heavy) = forecasts
        .iter()
        .filter(|f| f.precipitation > 10.0)
        .max_by(|a, b| a.precipitation.total_cmp(&b.precipitation))
    {
        return Ok(heavy.clone());
    }

    // Rule 3: extreme heat, split by how much rain accompanies it.
    let hot: Vec<&WeatherForecast> = forecasts.iter().filter(|f| f.temperature >= 35.0).collect();
    if !hot.is_empty() {
        let rainy: Vec<&WeatherForecast> =
            forecasts.iter().filter(|f| f.precipitation > 0.1).collect();
        let rain_ratio = rainy.len() as f64 / forecasts.len() as f64;
        let light_rain_in_hot = hot
            .iter()
            .any(|f| f.precipitation > 0.1 && f.precipitation <= 10.0);

        if light_rain_in_hot && rain_ratio <= 0.5 {
            if let Some(best) = hot.iter().max_by(|a, b| a.temperature.total_cmp(&b.temperature)) {
                return Ok((*best).clone());
            }
        } else if rain_ratio > 0.5 {
            if let Some(best) = rainy
                .iter()
                .max_by(|a, b| a.precipitation.total_cmp(&b.precipitation))
            {
                return Ok((*best).clone());
            }
        }
        if let Some(best) = hot.iter().max_by(|a, b| a.temperature.total_cmp(&b.temperature)) {
            return Ok((*best).clone());
        }
    }

    // Rule 4: any remaining severe weather, by precipitation.
    if let Some(severe) = forecasts
        .iter()
        .filter(|f| f.weather_condition.is_severe())
        .max_by(|a, b| a.precipitation.total_cmp(&b.precipitation))
    {
        return Ok(severe.clone());
    }

    // Rule 5: plain rain, by precipitation.
    if let Some(rainy) = forecasts
        .iter()
        .filter(|f| f.precipitation > 0.1)
        .max_by(|a, b| a.precipitation.total_cmp(&b.precipitation))
    {
        return Ok(rainy.clone());
    }

    // Rule 6: any non-clear sky, by condition severity.
    if let Some(non_clear) = forecasts
        .iter()
        .filter(|f| f.weather_condition != WeatherCondition::Clear)
        .max_by_key(|f| f.weather_condition.priority())
    {
        return Ok(non_clear.clone());
    }

    // Rule 7: fallback, hottest slot.
    forecasts
        .iter()
        .max_by(|a, b| a.temperature.total_cmp(&b.temperature))
        .cloned()
        .ok_or(PipelineError::NoForecastData {
            location: "unknown".to_string(),
        })
}

/// Thunder below the severe-precipitation threshold is treated as a milder
/// warning category by the validator; at or above it, the heavy-rain
/// keyword lists apply instead.
#[must_use]
pub fn thunder_uses_heavy_rain_list(precipitation_mm: f64, threshold: f64) -> bool {
    precipitation_mm >= threshold
        || PrecipitationSeverity::classify(precipitation_mm).is_heavy_class()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn forecast(hour: u32, temp: f64, precip: f64, code: &str) -> WeatherForecast {
        let dt = Utc.with_ymd_and_hms(2026, 8, 1, hour, 0, 0).unwrap();
        WeatherForecast::new("東京", dt, temp, precip, 60.0, 2.0, 90.0, code, "desc").unwrap()
    }

    #[test]
    fn empty_input_is_error() {
        assert!(select_priority_forecast(&[]).is_err());
    }

    #[test]
    fn s1_light_rain_picks_max_precipitation_slot() {
        let forecasts = vec![
            forecast(9, 20.0, 0.5, "300"),
            forecast(12, 20.0, 0.8, "300"),
            forecast(15, 20.0, 0.3, "300"),
            forecast(18, 20.0, 0.2, "300"),
        ];
        let chosen = select_priority_forecast(&forecasts).unwrap();
        assert_eq!(chosen.datetime.format("%H").to_string(), "12");
    }

    #[test]
    fn s2_thunder_dominates_low_precipitation() {
        let forecasts = vec![
            forecast(9, 30.0, 0.0, "100"),
            forecast(12, 30.0, 0.0, "100"),
            forecast(15, 28.0, 1.0, "350"),
            forecast(18, 30.0, 0.0, "100"),
        ];
        let chosen = select_priority_forecast(&forecasts).unwrap();
        assert_eq!(chosen.weather_condition, WeatherCondition::Thunder);
    }

    #[test]
    fn s3_hot_with_intermittent_rain_picks_hottest() {
        let forecasts = vec![
            forecast(9, 36.0, 0.0, "100"),
            forecast(12, 36.0, 2.0, "300"),
            forecast(15, 36.0, 0.0, "100"),
            forecast(18, 36.0, 1.0, "300"),
        ];
        let chosen = select_priority_forecast(&forecasts).unwrap();
        assert!((chosen.temperature - 36.0).abs() < f64::EPSILON);
    }

    #[test]
    fn s4_hot_with_persistent_rain_picks_max_precipitation() {
        let forecasts = vec![
            forecast(9, 36.0, 5.0, "300"),
            forecast(12, 36.0, 6.0, "300"),
            forecast(15, 36.0, 5.0, "300"),
            forecast(18, 36.0, 4.0, "300"),
        ];
        let chosen = select_priority_forecast(&forecasts).unwrap();
        assert!((chosen.precipitation - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn selection_is_deterministic() {
        let forecasts = vec![
            forecast(9, 22.0, 0.0, "200"),
            forecast(12, 24.0, 0.0, "100"),
            forecast(15, 23.0, 0.0, "200"),
            forecast(18, 21.0, 0.0, "200"),
        ];
        let first = select_priority_forecast(&forecasts).unwrap();
        let second = select_priority_forecast(&forecasts).unwrap();
        assert_eq!(first.datetime, second.datetime);
    }
}
