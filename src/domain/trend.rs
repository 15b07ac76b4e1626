use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::weather::{WeatherCondition, WeatherForecast};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Worsening,
    Fluctuating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherChange {
    pub time: DateTime<Utc>,
    pub before: String,
    pub after: String,
}

/// Derived from a sequence of two or more forecasts covering a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherTrend {
    pub temperature_change: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub precipitation_total: f64,
    pub weather_changes: Vec<WeatherChange>,
    pub direction: TrendDirection,
}

impl WeatherTrend {
    /// Builds a trend from a chronologically-ordered forecast window.
    /// Returns `None` for fewer than two forecasts, per the data model.
    /// `scores` overrides `WeatherCondition::trend_score()` per condition when
    /// present, falling back to the built-in ordinal otherwise.
    #[must_use]
    pub fn from_forecasts(forecasts: &[WeatherForecast], scores: &HashMap<WeatherCondition, i8>) -> Option<Self> {
        if forecasts.len() < 2 {
            return None;
        }
        let first = forecasts.first()?;
        let last = forecasts.last()?;
        let temperature_change = last.temperature - first.temperature;
        let min_temperature = forecasts
            .iter()
            .map(|f| f.temperature)
            .fold(f64::INFINITY, f64::min);
        let max_temperature = forecasts
            .iter()
            .map(|f| f.temperature)
            .fold(f64::NEG_INFINITY, f64::max);
        let precipitation_total = forecasts.iter().map(|f| f.precipitation).sum();

        let mut weather_changes = Vec::new();
        for window in forecasts.windows(2) {
            let (before, after) = (&window[0], &window[1]);
            if before.weather_condition != after.weather_condition {
                weather_changes.push(WeatherChange {
                    time: after.datetime,
                    before: format!("{:?}", before.weather_condition),
                    after: format!("{:?}", after.weather_condition),
                });
            }
        }

        let score_of = |condition: WeatherCondition| {
            scores.get(&condition).copied().unwrap_or_else(|| condition.trend_score())
        };
        let start_score = score_of(first.weather_condition);
        let end_score = score_of(last.weather_condition);
        let direction = if weather_changes.len() > 2 {
            TrendDirection::Fluctuating
        } else if end_score > start_score {
            TrendDirection::Improving
        } else if end_score < start_score {
            TrendDirection::Worsening
        } else {
            TrendDirection::Stable
        };

        Some(Self {
            temperature_change,
            min_temperature,
            max_temperature,
            precipitation_total,
            weather_changes,
            direction,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceMagnitude {
    Large,
    Moderate,
    Small,
    Negligible,
}

impl DifferenceMagnitude {
    #[must_use]
    pub fn classify(delta_celsius: f64) -> Self {
        let magnitude = delta_celsius.abs();
        if magnitude >= 10.0 {
            Self::Large
        } else if magnitude >= 7.0 {
            Self::Moderate
        } else if magnitude >= 5.0 {
            Self::Small
        } else {
            Self::Negligible
        }
    }
}

/// Output of the temperature-difference analyser (design §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureDifference {
    pub previous_day_diff: Option<f64>,
    pub twelve_hours_ago_diff: Option<f64>,
    pub daily_range: Option<f64>,
}

impl TemperatureDifference {
    #[must_use]
    pub fn magnitude(&self) -> Option<DifferenceMagnitude> {
        self.previous_day_diff.map(DifferenceMagnitude::classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weather::WeatherForecast;
    use chrono::TimeZone;

    fn dt(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn trend_needs_at_least_two_forecasts() {
        let single = vec![
            WeatherForecast::new("東京", dt(9), 20.0, 0.0, 50.0, 1.0, 0.0, "100", "晴れ").unwrap(),
        ];
        assert!(WeatherTrend::from_forecasts(&single, &HashMap::new()).is_none());
    }

    #[test]
    fn improving_direction_when_condition_score_rises() {
        let forecasts = vec![
            WeatherForecast::new("東京", dt(9), 18.0, 2.0, 70.0, 2.0, 0.0, "300", "雨").unwrap(),
            WeatherForecast::new("東京", dt(12), 22.0, 0.0, 50.0, 1.0, 0.0, "100", "晴れ").unwrap(),
        ];
        let trend = WeatherTrend::from_forecasts(&forecasts, &HashMap::new()).unwrap();
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert!((trend.temperature_change - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_scores_override_builtin_ordinal() {
        let forecasts = vec![
            WeatherForecast::new("東京", dt(9), 18.0, 0.0, 50.0, 1.0, 0.0, "100", "晴れ").unwrap(),
            WeatherForecast::new("東京", dt(12), 20.0, 2.0, 60.0, 1.0, 0.0, "300", "雨").unwrap(),
        ];
        let mut scores = HashMap::new();
        scores.insert(WeatherCondition::Clear, 0);
        scores.insert(WeatherCondition::Rain, 5);
        let trend = WeatherTrend::from_forecasts(&forecasts, &scores).unwrap();
        assert_eq!(trend.direction, TrendDirection::Improving);
    }

    #[test]
    fn magnitude_buckets() {
        assert_eq!(DifferenceMagnitude::classify(11.0), DifferenceMagnitude::Large);
        assert_eq!(DifferenceMagnitude::classify(8.0), DifferenceMagnitude::Moderate);
        assert_eq!(DifferenceMagnitude::classify(5.5), DifferenceMagnitude::Small);
        assert_eq!(DifferenceMagnitude::classify(1.0), DifferenceMagnitude::Negligible);
    }
}
