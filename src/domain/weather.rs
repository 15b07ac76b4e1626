use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// The twelve weather conditions the rest of the pipeline reasons about.
/// Several variants subsume others (`HeavyRain` vs `Rain`); precedence between
/// them is fully owned by the priority selector's rule order, never by an
/// is-a relationship on the enum itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    HeavyRain,
    Snow,
    HeavySnow,
    Thunder,
    Fog,
    Storm,
    SevereStorm,
    ExtremeHeat,
    Unknown,
}

impl WeatherCondition {
    /// Ordinal used by the priority selector and the trend scorer. Higher is
    /// more severe / attention-worthy.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::SevereStorm => 12,
            Self::Thunder => 11,
            Self::Storm => 10,
            Self::ExtremeHeat => 9,
            Self::HeavySnow => 8,
            Self::HeavyRain => 7,
            Self::Fog => 6,
            Self::Snow => 5,
            Self::Rain => 4,
            Self::Cloudy => 3,
            Self::PartlyCloudy => 2,
            Self::Clear => 1,
            Self::Unknown => 0,
        }
    }

    /// Ordinal for trend direction, where a higher number is a "better" sky.
    #[must_use]
    pub fn trend_score(self) -> i8 {
        match self {
            Self::Clear => 5,
            Self::PartlyCloudy => 4,
            Self::Cloudy => 3,
            Self::Fog => 2,
            Self::Rain | Self::Snow => 2,
            Self::ExtremeHeat => 1,
            Self::Thunder | Self::Storm | Self::SevereStorm => 0,
            Self::HeavyRain | Self::HeavySnow => 0,
            Self::Unknown => 0,
        }
    }

    #[must_use]
    pub fn is_severe(self) -> bool {
        matches!(
            self,
            Self::HeavyRain
                | Self::HeavySnow
                | Self::Storm
                | Self::SevereStorm
                | Self::Thunder
        )
    }

    #[must_use]
    pub fn is_extreme(self) -> bool {
        matches!(
            self,
            Self::Thunder | Self::Fog | Self::Storm | Self::SevereStorm | Self::ExtremeHeat
        )
    }

    #[must_use]
    pub fn is_rainy(self) -> bool {
        matches!(self, Self::Rain | Self::HeavyRain | Self::Storm | Self::SevereStorm)
    }

    /// Maps a provider weather-code string onto a condition. Unrecognised
    /// codes fall back to `Unknown` rather than failing the fetch.
    #[must_use]
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "100" | "晴" => Self::Clear,
            "101" | "晴時々曇" => Self::PartlyCloudy,
            "200" | "曇" => Self::Cloudy,
            "300" | "雨" => Self::Rain,
            "302" | "大雨" => Self::HeavyRain,
            "400" | "雪" => Self::Snow,
            "405" | "大雪" => Self::HeavySnow,
            "350" | "雷" => Self::Thunder,
            "240" | "霧" => Self::Fog,
            "308" | "嵐" => Self::Storm,
            "309" | "暴風雨" => Self::SevereStorm,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindDirection {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
    Calm,
}

impl WindDirection {
    #[must_use]
    pub fn from_provider_index(index: i64) -> Self {
        match index.rem_euclid(8) {
            0 => Self::N,
            1 => Self::Ne,
            2 => Self::E,
            3 => Self::Se,
            4 => Self::S,
            5 => Self::Sw,
            6 => Self::W,
            7 => Self::Nw,
            _ => Self::Calm,
        }
    }
}

/// A single forecast observation for one instant at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub location_name: String,
    pub datetime: DateTime<Utc>,
    pub temperature: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: WindDirection,
    pub wind_direction_degrees: f64,
    pub weather_code: String,
    pub weather_condition: WeatherCondition,
    pub weather_description: String,
}

impl WeatherForecast {
    /// Constructs a forecast, enforcing the data-model invariants. Returns
    /// `InvalidInput` rather than panicking on out-of-range provider data.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location_name: impl Into<String>,
        datetime: DateTime<Utc>,
        temperature: f64,
        precipitation: f64,
        humidity: f64,
        wind_speed: f64,
        wind_direction_degrees: f64,
        weather_code: impl Into<String>,
        weather_description: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        if !(-50.0..=60.0).contains(&temperature) {
            return Err(PipelineError::InvalidInput(format!(
                "temperature {temperature} out of range"
            )));
        }
        if !(0.0..=100.0).contains(&humidity) {
            return Err(PipelineError::InvalidInput(format!(
                "humidity {humidity} out of range"
            )));
        }
        if precipitation < 0.0 {
            return Err(PipelineError::InvalidInput(
                "precipitation must be non-negative".to_string(),
            ));
        }
        if !(0.0..=360.0).contains(&wind_direction_degrees) {
            return Err(PipelineError::InvalidInput(format!(
                "wind_direction_degrees {wind_direction_degrees} out of range"
            )));
        }
        let weather_code = weather_code.into();
        let weather_condition = WeatherCondition::from_provider_code(&weather_code);
        Ok(Self {
            location_name: location_name.into(),
            datetime,
            temperature,
            precipitation,
            humidity,
            wind_speed,
            wind_direction: WindDirection::from_provider_index(
                (wind_direction_degrees / 45.0).round() as i64,
            ),
            wind_direction_degrees,
            weather_code,
            weather_condition,
            weather_description: weather_description.into(),
        })
    }

    /// `light` (<1mm) / `moderate` (1-10mm) / `heavy` (10-30mm) / `very_heavy` (>30mm).
    #[must_use]
    pub fn precipitation_severity(&self) -> PrecipitationSeverity {
        PrecipitationSeverity::classify(self.precipitation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecipitationSeverity {
    Light,
    Moderate,
    Heavy,
    VeryHeavy,
}

impl PrecipitationSeverity {
    #[must_use]
    pub fn classify(precipitation_mm: f64) -> Self {
        if precipitation_mm > 30.0 {
            Self::VeryHeavy
        } else if precipitation_mm > 10.0 {
            Self::Heavy
        } else if precipitation_mm >= 1.0 {
            Self::Moderate
        } else {
            Self::Light
        }
    }

    #[must_use]
    pub fn is_heavy_class(self) -> bool {
        matches!(self, Self::Heavy | Self::VeryHeavy)
    }
}

/// An ordered sequence of forecasts for one location, with nearest-instant
/// lookup used by the temperature-difference analyser and trend window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherForecastCollection {
    pub location_name: String,
    pub forecasts: Vec<WeatherForecast>,
    pub generated_at: DateTime<Utc>,
}

impl WeatherForecastCollection {
    #[must_use]
    pub fn new(location_name: impl Into<String>, forecasts: Vec<WeatherForecast>) -> Self {
        Self {
            location_name: location_name.into(),
            forecasts,
            generated_at: Utc::now(),
        }
    }

    /// Returns the forecast nearest `target`, provided the gap is within
    /// `tolerance_hours`.
    #[must_use]
    pub fn nearest(
        &self,
        target: DateTime<Utc>,
        tolerance_hours: i64,
    ) -> Option<&WeatherForecast> {
        self.forecasts
            .iter()
            .map(|f| (f, (f.datetime - target).num_minutes().abs()))
            .min_by_key(|&(_, diff)| diff)
            .filter(|&(_, diff)| diff <= tolerance_hours * 60)
            .map(|(f, _)| f)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }
}
