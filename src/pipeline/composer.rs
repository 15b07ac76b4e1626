use crate::domain::comment::CommentPair;
use crate::domain::weather::WeatherCondition;

const JOIN_SEPARATOR: char = '\u{3000}';

/// Combines the pair and applies the final safety layer: a check that the
/// advice half carries the required vocabulary for the forecast's severity,
/// repairing it (never the raw selection) when it doesn't.
#[must_use]
pub fn compose(pair: &CommentPair, condition: WeatherCondition, precipitation_mm: f64) -> String {
    let mut composite = format!(
        "{}{}{}",
        pair.weather_comment.comment_text, JOIN_SEPARATOR, pair.advice_comment.comment_text
    );

    if let Some(repair) = safety_repair(&composite, condition) {
        composite.push_str(&repair);
    }

    if condition.is_rainy() {
        let triggered = contains_any(&composite, CONTEXT_WORDS);
        composite = apply_rain_word_substitutions(&composite);
        if triggered {
            composite.push_str("（雨天のため）");
        }
    }

    let _ = precipitation_mm;
    composite
}

fn safety_repair(composite: &str, condition: WeatherCondition) -> Option<&'static str> {
    match condition {
        WeatherCondition::Thunder if !contains_any(composite, &["雷", "屋内", "危険", "注意"]) => {
            Some("（雷注意・屋内へ）")
        }
        WeatherCondition::Fog if !contains_any(composite, &["霧", "視界", "運転", "注意"]) => {
            Some("（視界注意）")
        }
        WeatherCondition::Storm | WeatherCondition::SevereStorm
            if !contains_any(composite, &["嵐", "暴風", "強風", "危険"]) =>
        {
            Some("（強風危険・外出注意）")
        }
        WeatherCondition::HeavyRain if !contains_any(composite, &["大雨", "洪水", "冠水", "危険"]) => {
            Some("（大雨・冠水注意）")
        }
        _ => None,
    }
}

const CONTEXT_WORDS: &[&str] = &[
    "花粉", "日焼け", "紫外線", "散歩", "ピクニック", "外遊び", "熱中症", "暑い", "ムシムシ",
];

const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("熱中症", "雨模様"),
    ("暑い", "涼しい"),
    ("ムシムシ", "しっとり"),
    ("花粉", "雨"),
    ("日焼け", "雨"),
    ("紫外線", "雨"),
];

fn apply_rain_word_substitutions(text: &str) -> String {
    let mut result = text.to_string();
    for (from, to) in SUBSTITUTIONS {
        result = result.replace(from, to);
    }
    result
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comment::{CommentType, PastComment};
    use chrono::Utc;

    fn pair(weather: &str, advice: &str) -> CommentPair {
        let w = PastComment::new("東京", Utc::now(), "rain", weather, CommentType::WeatherComment).unwrap();
        let a = PastComment::new("東京", Utc::now(), "rain", advice, CommentType::Advice).unwrap();
        CommentPair::new(w, a, 0.5, "test").unwrap()
    }

    #[test]
    fn thunder_repair_appended_when_missing_keyword() {
        let composed = compose(&pair("今夜は荒れ模様です", "お出かけの際はご注意を"), WeatherCondition::Thunder, 1.0);
        assert!(composed.contains("雷注意"));
    }

    #[test]
    fn thunder_repair_skipped_when_already_present() {
        let composed = compose(&pair("雷の心配があります", "屋内で安全にお過ごしください"), WeatherCondition::Thunder, 1.0);
        assert!(!composed.contains("（雷注意・屋内へ）"));
    }

    #[test]
    fn rainy_pair_substitutes_heat_words() {
        let composed = compose(&pair("雨が降る予報です", "熱中症に注意しましょう"), WeatherCondition::Rain, 5.0);
        assert!(!composed.contains("熱中症"));
        assert!(composed.contains("雨模様"));
    }

    #[test]
    fn separator_is_ideographic_space() {
        let composed = compose(&pair("晴れています", "日焼け対策を"), WeatherCondition::Clear, 0.0);
        assert!(composed.contains('\u{3000}'));
    }
}
