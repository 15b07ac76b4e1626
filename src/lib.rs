#![allow(clippy::missing_errors_doc)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod resilience;
#[cfg(test)]
mod test_support;
pub mod worker_pool;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use cli::Cli;
use config::PipelineConfig;
use domain::location::LocationTable;
use llm::provider::build_provider;
use pipeline::runner::PipelineContext;
use pipeline::validator::ValidatorRules;

/// Builds the shared pipeline context from parsed CLI flags: weather client,
/// forecast cache, comment corpus, LLM provider, and rule matrices.
#[must_use]
pub fn build_context(cli: &Cli) -> PipelineContext {
    let config = PipelineConfig::from_cli(cli);
    let validator_rules = config
        .validator_rules_path
        .as_ref()
        .map_or_else(ValidatorRules::default, |path| ValidatorRules::load_or_default(path));

    PipelineContext {
        weather_client: data::WeatherClient::new(cli.weather_url.clone()).with_timeout(config.weather_api_timeout),
        cache: cache::ForecastCache::new(config.cache_dir.clone()),
        repository: data::CommentRepository::new(config.corpus_dir.clone()),
        llm: build_provider(config.llm_provider, &config.llm_model, config.llm_api_timeout),
        location_table: LocationTable::with_defaults(),
        validator_rules,
        config,
    }
}

/// Runs the pipeline for every requested location and prints one JSON
/// envelope (or a batch envelope for multiple locations) to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;
    let locations = cli.locations();
    let target_time = cli
        .target_time
        .as_ref()
        .map(|raw| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&chrono::Utc)))
        .transpose()?;

    let ctx = Arc::new(build_context(&cli));
    let token = CancellationToken::new();

    if locations.len() == 1 {
        let state = pipeline::runner::run_pipeline(&locations[0], target_time, ctx, token).await;
        let envelope = pipeline::runner::to_envelope(&state);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        let batch = worker_pool::run_many(locations, ctx, token).await;
        println!("{}", serde_json::to_string_pretty(&batch)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::test_support::{reference_location, sample_advice_comment, sample_forecast, sample_weather_comment};
    use crate::pipeline::{composer, evaluator};

    #[test]
    fn composed_output_survives_evaluation_for_a_well_formed_pair() {
        let forecast = sample_forecast(12, 20.0, 2.0, "300");
        let weather = sample_weather_comment("雨に警戒してください");
        let advice = sample_advice_comment("傘をお持ちください");
        let pair = crate::domain::comment::CommentPair::new(weather, advice, 0.4, "fixture").unwrap();

        let evaluation = evaluator::evaluate(&pair, &forecast);
        assert!(evaluation.valid);

        let composed = composer::compose(&pair, forecast.weather_condition, forecast.precipitation);
        assert!(composed.contains('\u{3000}'));

        let _ = reference_location();
    }
}
