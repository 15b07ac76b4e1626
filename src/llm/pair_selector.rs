use std::collections::HashSet;

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::comment::{CommentPair, CommentType, PastComment};
use crate::domain::location::Location;
use crate::domain::weather::WeatherForecast;
use crate::error::PipelineError;
use crate::pipeline::validator::{self, ValidatorRules};

use super::provider::LlmProvider;

const MAX_CANDIDATES: usize = 50;
const CRITICAL_KEYWORDS: &[&str] = &[
    "にわか雨", "熱中症", "紫外線", "雷", "強風", "大雨", "猛暑", "酷暑",
];

/// Fixed phrase pairs treated as semantically duplicate even though they
/// share no single critical keyword and may exceed the short-string
/// character-overlap threshold.
const SIMILARITY_PATTERNS: &[(&[&str], &[&str])] = &[
    (&["雨が心配", "雨に注意"], &["雨", "注意"]),
    (&["傘が必要", "傘をお忘れなく"], &["傘"]),
    (&["暑さに注意", "熱中症に注意"], &["熱中症", "暑さ"]),
    (&["風が強い", "強風に注意"], &["強風"]),
    (&["肌寒い", "冷え込み"], &["寒"]),
];

/// Ranks a candidate pool: severe-weather-appropriate first, then
/// condition-matched, then the remainder; stable-sorted by descending
/// usage_count within each bucket, truncated to `MAX_CANDIDATES`.
#[must_use]
pub fn prepare_candidates(pool: &[PastComment], forecast: &WeatherForecast) -> Vec<PastComment> {
    let condition_label = format!("{:?}", forecast.weather_condition);
    let mut indexed: Vec<(&PastComment, u8)> = pool
        .iter()
        .map(|c| {
            let bucket = if forecast.weather_condition.is_severe() && looks_severe_appropriate(c) {
                0
            } else if c.weather_condition.eq_ignore_ascii_case(&condition_label) {
                1
            } else {
                2
            };
            (c, bucket)
        })
        .collect();
    indexed.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then(b.0.usage_count.unwrap_or(0).cmp(&a.0.usage_count.unwrap_or(0)))
    });
    indexed
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|(c, _)| c.clone())
        .collect()
}

fn looks_severe_appropriate(comment: &PastComment) -> bool {
    const MARKERS: &[&str] = &["警戒", "注意", "危険", "安全"];
    MARKERS.iter().any(|m| comment.comment_text.contains(m))
}

/// Builds one arbitration prompt for a single candidate pool. The weather
/// and advice halves are arbitrated by two independent LLM calls, each
/// returning its own index into its own pool — never a single combined call
/// whose one parsed digit is reused for both.
#[must_use]
pub fn build_prompt(forecast: &WeatherForecast, pool_label: &str, candidates: &[PastComment]) -> String {
    let template = "現在の天気: {condition}\n気温: {temperature}度 降水量: {precipitation}mm 湿度: {humidity}%\n\n{pool_label}候補:\n{candidate_list}\n\n最も適切なもののインデックス番号のみを答えてください。";
    template
        .replace("{condition}", &format!("{:?}", forecast.weather_condition))
        .replace("{temperature}", &format!("{:.1}", forecast.temperature))
        .replace("{precipitation}", &format!("{:.1}", forecast.precipitation))
        .replace("{humidity}", &format!("{:.0}", forecast.humidity))
        .replace("{pool_label}", pool_label)
        .replace("{candidate_list}", &numbered_list(candidates))
}

fn numbered_list(candidates: &[PastComment]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}: {} (使用回数: {})", i, c.comment_text, c.usage_count.unwrap_or(0)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn labelled_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:答え|選択)\s*[:：]\s*(\d+)").unwrap())
}

fn leading_digits_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)").unwrap())
}

fn any_digit_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").unwrap())
}

/// Parses an LLM response into a candidate index, trying progressively
/// looser patterns: full numeric match, leading digits, a labelled pattern
/// ("答え: N" / "選択: N"), and finally any digit found in the text.
#[must_use]
pub fn parse_response_index(response: &str, pool_len: usize) -> Option<usize> {
    if pool_len == 0 {
        return None;
    }
    let trimmed = response.trim();
    let candidate = trimmed
        .parse::<usize>()
        .ok()
        .or_else(|| leading_digits_pattern().captures(trimmed).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok()))
        .or_else(|| labelled_pattern().captures(trimmed).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok()))
        .or_else(|| any_digit_pattern().captures(trimmed).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok()));
    candidate.filter(|&idx| idx < pool_len)
}

/// True when two texts are too similar to pair together, per the duplication
/// predicate (exact match, shared critical keyword, or high character
/// overlap on short strings).
#[must_use]
pub fn is_duplicate_content(weather_text: &str, advice_text: &str) -> bool {
    if weather_text == advice_text {
        return true;
    }
    for keyword in CRITICAL_KEYWORDS {
        if weather_text.contains(keyword) && advice_text.contains(keyword) {
            return true;
        }
    }
    if weather_text.chars().count() <= 10 && advice_text.chars().count() <= 10 {
        let a: HashSet<char> = weather_text.chars().collect();
        let b: HashSet<char> = advice_text.chars().collect();
        if !a.is_empty() && !b.is_empty() {
            let intersection = a.intersection(&b).count() as f64;
            let union = a.union(&b).count() as f64;
            if union > 0.0 && intersection / union > 0.7 {
                return true;
            }
        }
    }
    for (weather_markers, advice_markers) in SIMILARITY_PATTERNS {
        let weather_hit = weather_markers.iter().any(|m| weather_text.contains(m));
        let advice_hit = advice_markers.iter().any(|m| advice_text.contains(m));
        if weather_hit && advice_hit {
            return true;
        }
    }
    false
}

/// Returns the rejection reason for whichever half fails validation, so
/// callers can record it onto the pipeline state.
fn individually_valid(
    weather: &PastComment,
    advice: &PastComment,
    forecast: &WeatherForecast,
    location: Option<&Location>,
    rules: &ValidatorRules,
) -> Result<(), String> {
    let (weather_ok, weather_reason) =
        validator::validate(&weather.comment_text, CommentType::WeatherComment, forecast, location, rules);
    if !weather_ok {
        return Err(weather_reason.unwrap_or_else(|| "weather candidate rejected".to_string()));
    }
    let (advice_ok, advice_reason) = validator::validate(&advice.comment_text, CommentType::Advice, forecast, location, rules);
    if !advice_ok {
        return Err(advice_reason.unwrap_or_else(|| "advice candidate rejected".to_string()));
    }
    Ok(())
}

/// Arbitrates one pool independently: builds a pool-scoped prompt, calls the
/// LLM, and parses its own index out of its own response. Never shares a
/// parsed digit with the other pool's arbitration.
async fn select_index(
    llm: &dyn LlmProvider,
    pool_label: &str,
    forecast: &WeatherForecast,
    ranked: &[PastComment],
) -> (usize, &'static str) {
    let prompt = build_prompt(forecast, pool_label, ranked);
    match llm.generate(&prompt).await {
        Ok(response) => match parse_response_index(&response, ranked.len()) {
            Some(idx) => (idx, "llm"),
            None => (0, "unparseable"),
        },
        Err(err) => {
            tracing::warn!(error = %err, pool = pool_label, "llm arbitration failed, using deterministic fallback");
            (0, "llm_error")
        }
    }
}

/// Selects one weather/advice pair, each half arbitrated by its own LLM call
/// with an exhaustive chain of deterministic fallbacks. The LLM is never
/// trusted blindly: its output is parsed, bounds-checked, and replaced on
/// any anomaly. Returns the pair plus every rejection reason collected along
/// the way, for the caller to record onto pipeline state.
pub async fn select_pair(
    llm: &dyn LlmProvider,
    weather_pool: &[PastComment],
    advice_pool: &[PastComment],
    forecast: &WeatherForecast,
    location: Option<&Location>,
    rules: &ValidatorRules,
) -> Result<(CommentPair, Vec<String>), PipelineError> {
    if weather_pool.is_empty() {
        return Err(PipelineError::NoValidCandidate {
            pool: "weather".to_string(),
        });
    }
    if advice_pool.is_empty() {
        return Err(PipelineError::NoValidCandidate {
            pool: "advice".to_string(),
        });
    }

    let mut reasons = Vec::new();
    let weather_ranked = prepare_candidates(weather_pool, forecast);
    let advice_ranked = prepare_candidates(advice_pool, forecast);

    let (weather_idx, weather_source) = select_index(llm, "天気コメント", forecast, &weather_ranked).await;
    let (advice_idx, advice_source) = select_index(llm, "アドバイス", forecast, &advice_ranked).await;
    let reason = if weather_source == "llm" && advice_source == "llm" {
        format!("llm:{}", llm.name())
    } else {
        format!("fallback:{weather_source}+{advice_source}")
    };

    let primary_weather = &weather_ranked[weather_idx];
    let primary_advice = &advice_ranked[advice_idx];
    if is_duplicate_content(&primary_weather.comment_text, &primary_advice.comment_text) {
        reasons.push("primary pair rejected: duplicate content".to_string());
    } else {
        match individually_valid(primary_weather, primary_advice, forecast, location, rules) {
            Ok(()) => return Ok((CommentPair::new(primary_weather.clone(), primary_advice.clone(), 0.0, reason)?, reasons)),
            Err(why) => reasons.push(format!("primary pair rejected: {why}")),
        }
    }

    let offsets = weather_ranked.len().min(advice_ranked.len()).min(10);
    for i in 0..offsets {
        let w = &weather_ranked[i];
        let a = &advice_ranked[i];
        if is_duplicate_content(&w.comment_text, &a.comment_text) {
            reasons.push(format!("offset pair {i} rejected: duplicate content"));
            continue;
        }
        match individually_valid(w, a, forecast, location, rules) {
            Ok(()) => return Ok((CommentPair::new(w.clone(), a.clone(), 0.0, "fallback:offset_pair")?, reasons)),
            Err(why) => reasons.push(format!("offset pair {i} rejected: {why}")),
        }
    }

    let rainy_weather = weather_pool
        .iter()
        .find(|c| c.comment_text.contains('雨'))
        .or_else(|| weather_pool.first())
        .ok_or(PipelineError::NoValidCandidate {
            pool: "weather".to_string(),
        })?;
    let rainy_advice = advice_pool
        .iter()
        .find(|c| c.comment_text.contains('傘') || c.comment_text.contains("注意"))
        .or_else(|| advice_pool.first())
        .ok_or(PipelineError::NoValidCandidate {
            pool: "advice".to_string(),
        })?;
    reasons.push("fell through to rainy-keyword-scan fallback".to_string());
    Ok((
        CommentPair::new(rainy_weather.clone(), rainy_advice.clone(), 0.0, "fallback:rainy_keyword_scan")?,
        reasons,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::NullProvider;
    use chrono::{TimeZone, Utc};

    fn forecast() -> WeatherForecast {
        let dt = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        WeatherForecast::new("東京", dt, 20.0, 2.0, 60.0, 2.0, 90.0, "300", "雨").unwrap()
    }

    fn weather_comment(text: &str, usage: u32) -> PastComment {
        PastComment::new("東京", Utc::now(), "rain", text, CommentType::WeatherComment)
            .unwrap()
            .with_usage_count(usage)
    }

    fn advice_comment(text: &str, usage: u32) -> PastComment {
        PastComment::new("東京", Utc::now(), "rain", text, CommentType::Advice)
            .unwrap()
            .with_usage_count(usage)
    }

    #[test]
    fn duplicate_detection_on_exact_match() {
        assert!(is_duplicate_content("雨が降ります", "雨が降ります"));
    }

    #[test]
    fn duplicate_detection_on_shared_critical_keyword() {
        assert!(is_duplicate_content("大雨に注意です", "大雨が心配です"));
    }

    #[test]
    fn duplicate_detection_on_fixed_similarity_pattern() {
        assert!(is_duplicate_content("明日は雨が心配な空模様です", "外出時は雨に注意しましょう"));
    }

    #[test]
    fn parse_index_accepts_labelled_pattern() {
        assert_eq!(parse_response_index("答え: 2", 5), Some(2));
    }

    #[test]
    fn parse_index_rejects_out_of_range() {
        assert_eq!(parse_response_index("99", 5), None);
    }

    #[tokio::test]
    async fn s6_out_of_range_llm_response_falls_back_to_index_zero() {
        struct FixedResponder;
        #[async_trait::async_trait]
        impl LlmProvider for FixedResponder {
            async fn generate(&self, _prompt: &str) -> Result<String, crate::llm::provider::LlmError> {
                Ok("99".to_string())
            }
            fn name(&self) -> &'static str {
                "fixed"
            }
        }

        let weather_pool = vec![weather_comment("傘が必要な一日です", 10), weather_comment("雨が心配です", 1)];
        let advice_pool = vec![advice_comment("傘をお持ちください", 10), advice_comment("安全に注意", 1)];
        let rules = ValidatorRules::default();

        let (pair, _reasons) = select_pair(&FixedResponder, &weather_pool, &advice_pool, &forecast(), None, &rules)
            .await
            .unwrap();
        assert_eq!(pair.weather_comment.comment_text, "傘が必要な一日です");
    }

    #[tokio::test]
    async fn null_provider_path_still_yields_a_valid_pair() {
        let weather_pool = vec![weather_comment("雨に警戒してください", 5)];
        let advice_pool = vec![advice_comment("傘をお持ちください", 5)];
        let rules = ValidatorRules::default();
        let (pair, _reasons) = select_pair(&NullProvider, &weather_pool, &advice_pool, &forecast(), None, &rules)
            .await
            .unwrap();
        assert_eq!(pair.selection_reason, "fallback:llm_error+llm_error");
    }

    #[tokio::test]
    async fn independent_calls_can_pick_different_indices_per_pool() {
        struct PerPromptResponder;
        #[async_trait::async_trait]
        impl LlmProvider for PerPromptResponder {
            async fn generate(&self, prompt: &str) -> Result<String, crate::llm::provider::LlmError> {
                if prompt.contains("天気コメント") {
                    Ok("1".to_string())
                } else {
                    Ok("0".to_string())
                }
            }
            fn name(&self) -> &'static str {
                "per-prompt"
            }
        }

        let weather_pool = vec![weather_comment("曇りがちな一日です", 10), weather_comment("雨に警戒してください", 1)];
        let advice_pool = vec![advice_comment("傘をお持ちください", 10), advice_comment("折りたたみ傘があると安心です", 1)];
        let rules = ValidatorRules::default();

        let (pair, _reasons) = select_pair(&PerPromptResponder, &weather_pool, &advice_pool, &forecast(), None, &rules)
            .await
            .unwrap();
        assert_eq!(pair.weather_comment.comment_text, "雨に警戒してください");
        assert_eq!(pair.advice_comment.comment_text, "傘をお持ちください");
    }
}
