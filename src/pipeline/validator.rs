use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::comment::CommentType;
use crate::domain::location::Location;
use crate::domain::weather::{PrecipitationSeverity, WeatherCondition, WeatherForecast};

/// Forbidden-keyword lists, keyed exactly as documented so an operator can
/// loosen or tighten a single axis without touching code. Loaded from a YAML
/// document at startup; falls back to compiled-in defaults on any failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorRules {
    pub weather_forbidden: HashMap<String, Vec<String>>,
    pub temperature_forbidden: HashMap<String, Vec<String>>,
    pub humidity_high_forbidden: Vec<String>,
    pub humidity_low_forbidden: Vec<String>,
    pub okinawa_forbidden: Vec<String>,
    pub hokkaido_forbidden: Vec<String>,
    pub heatstroke_word: String,
    pub heatstroke_ceiling_celsius: f64,
    pub heavy_rain_required_weather: Vec<String>,
    pub heavy_rain_required_advice: Vec<String>,
    pub storm_required_weather: Vec<String>,
    pub storm_required_advice: Vec<String>,
    pub rain_contradiction_words: Vec<String>,
    pub thunder_warning_words: Vec<String>,
    pub thunder_severe_precipitation_threshold: f64,
}

impl Default for ValidatorRules {
    fn default() -> Self {
        let mut weather_forbidden = HashMap::new();
        weather_forbidden.insert(
            "sunny".to_string(),
            vec!["雨".to_string(), "傘".to_string()],
        );
        weather_forbidden.insert(
            "cloudy".to_string(),
            vec!["快晴".to_string(), "青空".to_string()],
        );
        weather_forbidden.insert(
            "rain".to_string(),
            strings(&["中休み", "晴れ間", "回復", "からっと", "乾燥"]),
        );
        weather_forbidden.insert(
            "heavy_rain".to_string(),
            strings(&["穏やか", "過ごしやすい", "快適", "爽やか", "心地良い"]),
        );
        weather_forbidden.insert(
            "thunder".to_string(),
            strings(&["穏やか", "快晴", "日差し", "青空"]),
        );
        weather_forbidden.insert(
            "snow".to_string(),
            strings(&["暑い", "猛暑", "熱中症"]),
        );

        let mut temperature_forbidden = HashMap::new();
        temperature_forbidden.insert("extreme_hot".to_string(), strings(&["肌寒い", "冷え込み", "防寒"]));
        temperature_forbidden.insert("very_hot".to_string(), strings(&["肌寒い", "防寒"]));
        temperature_forbidden.insert("moderate_warm".to_string(), strings(&["極寒", "真冬日"]));
        temperature_forbidden.insert("mild".to_string(), strings(&["猛暑", "酷暑"]));
        temperature_forbidden.insert("cold".to_string(), strings(&["猛暑", "熱中症", "日焼け"]));

        Self {
            weather_forbidden,
            temperature_forbidden,
            humidity_high_forbidden: strings(&["乾燥注意", "肌の乾燥"]),
            humidity_low_forbidden: strings(&["除湿", "ジメジメ"]),
            okinawa_forbidden: strings(&["雪", "雪景色", "積雪", "極寒", "凍える"]),
            hokkaido_forbidden: strings(&["猛暑日", "酷暑", "真夏日"]),
            heatstroke_word: "熱中症".to_string(),
            heatstroke_ceiling_celsius: 32.0,
            heavy_rain_required_weather: strings(&["注意", "警戒", "危険", "荒れ", "激しい", "強い", "本格的"]),
            heavy_rain_required_advice: strings(&["傘", "雨具", "安全", "注意", "室内", "控え", "警戒", "備え", "準備"]),
            storm_required_weather: strings(&["注意", "警戒", "危険", "荒れ", "激しい", "強い", "本格的"]),
            storm_required_advice: strings(&["安全", "注意", "室内", "控え", "警戒", "備え", "準備"]),
            rain_contradiction_words: strings(&[
                "中休み",
                "晴れ間",
                "回復",
                "一時的な晴れ",
                "梅雨の中休み",
                "梅雨明け",
                "からっと",
                "さっぽり",
                "乾燥",
                "湿度低下",
                "晴天",
                "好天",
                "快晴の",
                "青空が",
            ]),
            thunder_warning_words: strings(&["激しい", "警戒", "危険", "大荒れ", "本格的", "強雨"]),
            thunder_severe_precipitation_threshold: 5.0,
        }
    }
}

impl ValidatorRules {
    /// Attempts to load an override document; falls back to defaults with a
    /// logged warning when the path is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_yaml::from_str::<Self>(&raw) {
                Ok(rules) => rules,
                Err(err) => {
                    tracing::warn!(error = %err, path = %path.display(), "validator rule document failed to parse, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(path = %path.display(), "no validator rule override found, using defaults");
                Self::default()
            }
        }
    }

    fn temperature_bucket(&self, temperature: f64) -> &'static str {
        if temperature >= 37.0 {
            "extreme_hot"
        } else if temperature >= 34.0 {
            "very_hot"
        } else if temperature >= 25.0 {
            "moderate_warm"
        } else if temperature >= 12.0 {
            "mild"
        } else {
            "cold"
        }
    }

    fn weather_axis_key(&self, forecast: &WeatherForecast) -> &'static str {
        match forecast.weather_condition {
            WeatherCondition::Clear | WeatherCondition::PartlyCloudy => "sunny",
            WeatherCondition::Cloudy => "cloudy",
            WeatherCondition::HeavyRain | WeatherCondition::Storm | WeatherCondition::SevereStorm => {
                "heavy_rain"
            }
            WeatherCondition::Rain => {
                if forecast.precipitation_severity().is_heavy_class() {
                    "heavy_rain"
                } else {
                    "rain"
                }
            }
            WeatherCondition::Snow | WeatherCondition::HeavySnow => "snow",
            WeatherCondition::Thunder => {
                if crate::pipeline::priority::thunder_uses_heavy_rain_list(
                    forecast.precipitation,
                    self.thunder_severe_precipitation_threshold,
                ) {
                    "heavy_rain"
                } else {
                    "thunder"
                }
            }
            WeatherCondition::Fog | WeatherCondition::ExtremeHeat | WeatherCondition::Unknown => "cloudy",
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Validates one candidate's text against the current forecast. Pure on its
/// inputs; always returns a human-readable reason on rejection.
#[must_use]
pub fn validate(
    text: &str,
    comment_type: CommentType,
    forecast: &WeatherForecast,
    location: Option<&Location>,
    rules: &ValidatorRules,
) -> (bool, Option<String>) {
    let weather_key = rules.weather_axis_key(forecast);
    if weather_key == "thunder" {
        if let Some(hit) = find_any(text, &rules.thunder_warning_words) {
            return (false, Some(format!("thunder warning word `{hit}` forbidden at low precipitation")));
        }
    } else if let Some(list) = rules.weather_forbidden.get(weather_key) {
        if let Some(hit) = find_any(text, list) {
            return (false, Some(format!("weather axis `{weather_key}` forbids `{hit}`")));
        }
    }

    let temp_bucket = rules.temperature_bucket(forecast.temperature);
    if let Some(list) = rules.temperature_forbidden.get(temp_bucket) {
        if let Some(hit) = find_any(text, list) {
            return (false, Some(format!("temperature bucket `{temp_bucket}` forbids `{hit}`")));
        }
    }
    if forecast.temperature < rules.heatstroke_ceiling_celsius
        && text.to_ascii_lowercase().contains(rules.heatstroke_word.to_ascii_lowercase().as_str())
    {
        return (
            false,
            Some(format!("heatstroke word forbidden below {}C", rules.heatstroke_ceiling_celsius)),
        );
    }

    if forecast.humidity >= 80.0 {
        if let Some(hit) = find_any(text, &rules.humidity_high_forbidden) {
            return (false, Some(format!("high humidity forbids `{hit}`")));
        }
    } else if forecast.humidity < 30.0 {
        if let Some(hit) = find_any(text, &rules.humidity_low_forbidden) {
            return (false, Some(format!("low humidity forbids `{hit}`")));
        }
    }

    if let Some(loc) = location {
        if loc.is_okinawa_family() {
            if let Some(hit) = find_any(text, &rules.okinawa_forbidden) {
                return (false, Some(format!("okinawa region forbids `{hit}`")));
            }
        }
        if loc.is_hokkaido_family() {
            if let Some(hit) = find_any(text, &rules.hokkaido_forbidden) {
                return (false, Some(format!("hokkaido region forbids `{hit}`")));
            }
        }
    }

    match forecast.weather_condition {
        WeatherCondition::HeavyRain => {
            if !required_keyword_satisfied(text, comment_type, &rules.heavy_rain_required_weather, &rules.heavy_rain_required_advice) {
                return (false, Some("heavy rain requires a caution keyword".to_string()));
            }
        }
        WeatherCondition::Storm | WeatherCondition::SevereStorm => {
            if !required_keyword_satisfied(text, comment_type, &rules.storm_required_weather, &rules.storm_required_advice) {
                return (false, Some("storm requires a caution keyword".to_string()));
            }
        }
        _ => {}
    }

    if forecast.weather_condition.is_rainy() {
        if let Some(hit) = find_any(text, &rules.rain_contradiction_words) {
            return (false, Some(format!("rainy forecast contradicts `{hit}`")));
        }
    }

    (true, None)
}

fn required_keyword_satisfied(
    text: &str,
    comment_type: CommentType,
    weather_required: &[String],
    advice_required: &[String],
) -> bool {
    let required = match comment_type {
        CommentType::WeatherComment => weather_required,
        CommentType::Advice | CommentType::Unknown => advice_required,
    };
    find_any(text, required).is_some()
}

/// Substring search, case-insensitive for ASCII (Japanese keyword lists are
/// unaffected; an ASCII forbidden word or YAML-override loanword is matched
/// regardless of case).
fn find_any(text: &str, candidates: &[String]) -> Option<String> {
    let haystack = text.to_ascii_lowercase();
    candidates
        .iter()
        .find(|w| haystack.contains(w.to_ascii_lowercase().as_str()))
        .cloned()
}

/// §8 invariant 6: monotonicity in severity. A comment rejected under
/// `heavy_rain` settings must remain rejected under `very_heavy`.
#[must_use]
pub fn severity_is_monotonic(precipitation_mm: f64) -> bool {
    let heavy = PrecipitationSeverity::classify(precipitation_mm).is_heavy_class();
    let very_heavy = PrecipitationSeverity::classify(precipitation_mm + 20.0).is_heavy_class();
    !heavy || very_heavy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::Location;
    use chrono::{TimeZone, Utc};

    fn forecast(temp: f64, precip: f64, humidity: f64, code: &str) -> WeatherForecast {
        let dt = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        WeatherForecast::new("東京", dt, temp, precip, humidity, 2.0, 90.0, code, "desc").unwrap()
    }

    #[test]
    fn rejects_seasonal_break_words_in_rain() {
        let rules = ValidatorRules::default();
        let f = forecast(20.0, 2.0, 60.0, "300");
        let (ok, reason) = validate("梅雨の中休みで過ごしやすい一日", CommentType::WeatherComment, &f, None, &rules);
        assert!(!ok);
        assert!(reason.is_some());
    }

    #[test]
    fn heavy_rain_requires_caution_keyword() {
        let rules = ValidatorRules::default();
        let f = forecast(24.0, 15.0, 70.0, "302");
        let (ok, _) = validate("今日も良い天気です", CommentType::WeatherComment, &f, None, &rules);
        assert!(!ok);
        let (ok, _) = validate("大雨に警戒してください", CommentType::WeatherComment, &f, None, &rules);
        assert!(ok);
    }

    #[test]
    fn okinawa_rejects_snow_words() {
        let rules = ValidatorRules::default();
        let f = forecast(28.0, 0.0, 60.0, "100");
        let loc = Location::new("那覇").with_region("沖縄");
        let (ok, _) = validate("雪景色が広がる朝です", CommentType::Advice, &f, Some(&loc), &rules);
        assert!(!ok);
    }

    #[test]
    fn heatstroke_word_forbidden_below_ceiling() {
        let rules = ValidatorRules::default();
        let f = forecast(25.0, 0.0, 50.0, "100");
        let (ok, _) = validate("熱中症に注意しましょう", CommentType::Advice, &f, None, &rules);
        assert!(!ok);
    }

    #[test]
    fn monotonic_severity_invariant() {
        assert!(severity_is_monotonic(12.0));
        assert!(severity_is_monotonic(0.5));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// §8 invariant 6 over the full precipitation range, not just the
        /// handful of boundary points the unit tests happen to cover.
        #[test]
        fn severity_is_monotonic_for_any_precipitation(precip in 0.0f64..500.0) {
            prop_assert!(severity_is_monotonic(precip));
        }

        /// A forecast's computed bucket never falls outside the five fixed
        /// temperature buckets, whatever temperature the provider reports.
        #[test]
        fn temperature_bucket_is_always_one_of_the_five(temp in -50.0f64..60.0) {
            let rules = ValidatorRules::default();
            let bucket = rules.temperature_bucket(temp);
            prop_assert!(["extreme_hot", "very_hot", "moderate_warm", "mild", "cold"].contains(&bucket));
        }
    }
}
