use crate::domain::comment::CommentPair;
use crate::domain::weather::WeatherForecast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationAxis {
    Relevance,
    Creativity,
    Naturalness,
    Appropriateness,
    Engagement,
    Clarity,
    Consistency,
    Originality,
}

impl EvaluationAxis {
    const ALL: [Self; 8] = [
        Self::Relevance,
        Self::Creativity,
        Self::Naturalness,
        Self::Appropriateness,
        Self::Engagement,
        Self::Clarity,
        Self::Consistency,
        Self::Originality,
    ];

    fn weight(self) -> f64 {
        0.125
    }

    fn is_critical(self) -> bool {
        matches!(self, Self::Appropriateness | Self::Relevance)
    }
}

const INAPPROPRIATE_TERMS: &[&str] = &["死ね", "最悪", "クソ"];

/// Result of scoring one pair. `valid` is the gate used by the retry loop.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub total_score: f64,
    pub axis_scores: Vec<(EvaluationAxis, f64)>,
    pub valid: bool,
    pub suggestions: Vec<String>,
}

/// Scores a pair along the eight fixed axes using deterministic substring
/// and keyword rules, then checks the 0.6 total / 0.5-critical-axis gate.
#[must_use]
pub fn evaluate(pair: &CommentPair, forecast: &WeatherForecast) -> EvaluationResult {
    let combined = format!("{}　{}", pair.weather_comment.comment_text, pair.advice_comment.comment_text);
    let mut axis_scores = Vec::with_capacity(8);
    let mut suggestions = Vec::new();

    for axis in EvaluationAxis::ALL {
        let score = score_axis(axis, &combined, pair, forecast);
        if score < 0.5 && axis.is_critical() {
            suggestions.push(format!("{axis:?} scored {score:.2}, below critical threshold"));
        }
        axis_scores.push((axis, score));
    }

    let total_score: f64 = axis_scores.iter().map(|(axis, score)| axis.weight() * score).sum();
    let critical_ok = axis_scores
        .iter()
        .filter(|(axis, _)| axis.is_critical())
        .all(|(_, score)| *score >= 0.5);
    let valid = total_score >= 0.6 && critical_ok;

    if !valid && suggestions.is_empty() {
        suggestions.push(format!("total score {total_score:.2} below 0.6 threshold"));
    }

    EvaluationResult {
        total_score,
        axis_scores,
        valid,
        suggestions,
    }
}

fn score_axis(axis: EvaluationAxis, combined: &str, pair: &CommentPair, forecast: &WeatherForecast) -> f64 {
    match axis {
        EvaluationAxis::Relevance => {
            let mentions_condition = combined.contains(condition_word(forecast));
            let temp_word_ok = !(forecast.temperature >= 35.0 && combined.contains("寒い"));
            score_bool_pair(mentions_condition, temp_word_ok)
        }
        EvaluationAxis::Appropriateness => {
            if INAPPROPRIATE_TERMS.iter().any(|t| combined.contains(t)) {
                0.0
            } else {
                0.9
            }
        }
        EvaluationAxis::Naturalness => {
            if combined.chars().count() < 4 {
                0.3
            } else {
                0.8
            }
        }
        EvaluationAxis::Consistency => {
            if pair.weather_comment.comment_text == pair.advice_comment.comment_text {
                0.0
            } else {
                0.85
            }
        }
        EvaluationAxis::Clarity => {
            if combined.contains('？') || combined.contains('?') {
                0.4
            } else {
                0.8
            }
        }
        EvaluationAxis::Creativity | EvaluationAxis::Engagement | EvaluationAxis::Originality => 0.7,
    }
}

fn score_bool_pair(a: bool, b: bool) -> f64 {
    match (a, b) {
        (true, true) => 0.9,
        (true, false) | (false, true) => 0.6,
        (false, false) => 0.3,
    }
}

fn condition_word(forecast: &WeatherForecast) -> &'static str {
    use crate::domain::weather::WeatherCondition as C;
    match forecast.weather_condition {
        C::Clear => "晴",
        C::PartlyCloudy | C::Cloudy => "曇",
        C::Rain | C::HeavyRain => "雨",
        C::Snow | C::HeavySnow => "雪",
        C::Thunder => "雷",
        C::Fog => "霧",
        C::Storm | C::SevereStorm => "嵐",
        C::ExtremeHeat => "暑",
        C::Unknown => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comment::{CommentType, PastComment};
    use chrono::{TimeZone, Utc};

    fn forecast() -> WeatherForecast {
        let dt = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        WeatherForecast::new("東京", dt, 20.0, 2.0, 60.0, 2.0, 90.0, "300", "雨").unwrap()
    }

    fn pair(weather: &str, advice: &str) -> CommentPair {
        let w = PastComment::new("東京", Utc::now(), "rain", weather, CommentType::WeatherComment).unwrap();
        let a = PastComment::new("東京", Utc::now(), "rain", advice, CommentType::Advice).unwrap();
        CommentPair::new(w, a, 0.5, "test").unwrap()
    }

    #[test]
    fn relevant_pair_passes() {
        let result = evaluate(&pair("雨が降る一日です", "傘をお持ちください"), &forecast());
        assert!(result.valid);
    }

    #[test]
    fn inappropriate_terms_fail_critical_axis() {
        let result = evaluate(&pair("クソ天気です", "傘をお持ちください"), &forecast());
        assert!(!result.valid);
        assert!(!result.suggestions.is_empty());
    }

    #[test]
    fn low_scoring_pair_surfaces_a_suggestion_per_failing_axis() {
        let result = evaluate(&pair("クソ天気です", "死ね"), &forecast());
        assert!(!result.valid);
        assert!(result.suggestions.iter().any(|s| s.contains("Appropriateness")));
    }
}
