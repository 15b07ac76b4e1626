use std::sync::Arc;

use chrono::{TimeZone, Utc};
use commentweave::cache::ForecastCache;
use commentweave::config::PipelineConfig;
use commentweave::data::{CommentRepository, WeatherClient};
use commentweave::domain::location::{Location, LocationTable};
use commentweave::llm::provider::NullProvider;
use commentweave::pipeline::runner::{run_pipeline, PipelineContext};
use commentweave::pipeline::validator::ValidatorRules;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Seeds a corpus whose only weather/advice pair evaluates as invalid on
/// every pass (the weather comment carries a term evaluator::evaluate
/// treats as critically inappropriate), so the retry loop in
/// `runner::run_pipeline` must run to `max_retries` before giving up.
fn seed_always_rejected_repo(dir: &std::path::Path) -> CommentRepository {
    std::fs::write(
        dir.join("summer_weather_comment_enhanced100.csv"),
        "location,weather_condition,comment_text,usage_count\n東京,rain,クソ天気が続きます,5\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("summer_advice_enhanced100.csv"),
        "location,weather_condition,comment_text,usage_count\n東京,rain,傘をお持ちください,5\n",
    )
    .unwrap();
    CommentRepository::new(dir)
}

fn wxdata_body() -> serde_json::Value {
    let srf = |hour: u32| {
        serde_json::json!({
            "date": format!("2026-08-15T{hour:02}:00:00Z"),
            "wx": "300",
            "temp": 20.0,
            "prec": 2.0,
            "rhum": 60.0,
            "wndspd": 2.0,
            "wnddir": 2,
        })
    };
    serde_json::json!({
        "wxdata": [{
            "srf": [srf(9), srf(12), srf(15), srf(18)],
            "mrf": [],
        }]
    })
}

#[tokio::test]
async fn retry_loop_runs_to_bound_when_every_candidate_pair_fails_evaluation() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wxdata_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        max_retries: 3,
        ..PipelineConfig::default()
    };
    let ctx = Arc::new(PipelineContext {
        weather_client: WeatherClient::new(format!("{}/forecast", mock_server.uri())),
        cache: ForecastCache::new(dir.path().join("cache")),
        repository: seed_always_rejected_repo(dir.path()),
        llm: Box::new(NullProvider),
        location_table: LocationTable::with_defaults(),
        validator_rules: ValidatorRules::default(),
        config,
    });

    let target = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
    let state = run_pipeline("東京", Some(target), ctx, CancellationToken::new()).await;

    assert_eq!(state.retry_count, 3, "loop must stop exactly at max_retries, not run forever");
    assert!(state.final_comment.is_some(), "the last (still-invalid) pair is composed once the bound is hit");
    assert!(!state.evaluation_suggestions.is_empty(), "the final evaluation must have recorded why it failed");
}

/// Exercises `resilience::backoff::RetryBackoff` through the real HTTP path:
/// the provider answers 429 on every attempt, so the client must exhaust its
/// retry budget and surface a classified rate-limit error rather than hang
/// or panic. Time is paused so the exponential delays resolve instantly.
#[tokio::test(start_paused = true)]
async fn persistent_rate_limit_exhausts_backoff_and_surfaces_classified_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = WeatherClient::new(format!("{}/forecast", mock_server.uri()));
    let location = Location::new("東京").with_coords(35.6895, 139.6917);
    let day = Utc.with_ymd_and_hms(2026, 8, 15, 0, 0, 0).unwrap().date_naive();

    let err = client.fetch_day_slots(&location, day).await.unwrap_err();
    assert!(
        err.to_string().contains("rate limit"),
        "expected a rate-limit error after exhausting retries, got: {err}"
    );
}
