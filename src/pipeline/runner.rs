use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::ForecastCache;
use crate::config::PipelineConfig;
use crate::data::{CommentRepository, WeatherClient};
use crate::domain::location::LocationTable;
use crate::domain::state::CommentGenerationState;
use crate::error::PipelineError;
use crate::llm::provider::LlmProvider;

use super::{assembler, composer, evaluator, forecast_fetcher, normalizer, priority, retriever, temperature_diff, validator};

/// Shared, read-only collaborators threaded through every stage. Cloned
/// cheaply (an `Arc` around each I/O client) so the worker pool can fan this
/// out across concurrent pipeline runs.
pub struct PipelineContext {
    pub weather_client: WeatherClient,
    pub cache: ForecastCache,
    pub repository: CommentRepository,
    pub llm: Box<dyn LlmProvider>,
    pub location_table: LocationTable,
    pub validator_rules: validator::ValidatorRules,
    pub config: PipelineConfig,
}

fn check_cancelled(token: &CancellationToken, stage: &str) -> Result<(), PipelineError> {
    if token.is_cancelled() {
        Err(PipelineError::Cancelled { stage: stage.to_string() })
    } else {
        Ok(())
    }
}

/// Runs the full nine-stage pipeline for one location, returning a state
/// object whose `final_comment` is populated on success and whose `errors`
/// carry the failure reason otherwise. Cancellation is observed at each of
/// the four suspension points named in the concurrency model.
pub async fn run_pipeline(
    location_name: &str,
    target_time: Option<chrono::DateTime<chrono::Utc>>,
    ctx: Arc<PipelineContext>,
    token: CancellationToken,
) -> CommentGenerationState {
    let mut state = match normalizer::normalize(location_name, target_time, &ctx.location_table, &ctx.config) {
        Ok(state) => state,
        Err(err) => {
            let mut state = CommentGenerationState::default();
            state.record_error(err.stage(), err.to_string());
            return state;
        }
    };

    if let Err(err) = check_cancelled(&token, "forecast_fetcher") {
        state.record_error(err.stage(), err.to_string());
        return state;
    }
    if let Err(err) = forecast_fetcher::fetch(&mut state, &ctx.weather_client, &ctx.cache).await {
        state.record_error(err.stage(), err.to_string());
        return state;
    }

    match priority::select_priority_forecast(&state.slot_forecasts) {
        Ok(forecast) => {
            state.weather_trend =
                crate::domain::trend::WeatherTrend::from_forecasts(&state.slot_forecasts, &ctx.config.weather_scores);
            state.selected_forecast = Some(forecast);
        }
        Err(err) => {
            state.record_error(err.stage(), err.to_string());
            return state;
        }
    }

    if let Err(err) = check_cancelled(&token, "comment_retriever") {
        state.record_error(err.stage(), err.to_string());
        return state;
    }
    if let Err(err) = retriever::retrieve(&mut state, &ctx.repository) {
        state.record_error(err.stage(), err.to_string());
        return state;
    }

    let forecast = state
        .selected_forecast
        .clone()
        .expect("selected_forecast set above");
    let location = state.location.clone();

    loop {
        if let Err(err) = check_cancelled(&token, "pair_selector") {
            state.record_error(err.stage(), err.to_string());
            return state;
        }

        let pair_result = crate::llm::pair_selector::select_pair(
            ctx.llm.as_ref(),
            &state.weather_candidates,
            &state.advice_candidates,
            &forecast,
            location.as_ref(),
            &ctx.validator_rules,
        )
        .await;

        let pair = match pair_result {
            Ok((pair, reasons)) => {
                state.rejected_candidate_reasons.extend(reasons);
                pair
            }
            Err(PipelineError::NoValidCandidate { pool }) if !state.widened_corpus => {
                state.record_warning("pair_selector", format!("no valid candidate in pool {pool}, widening to all seasons"));
                state.widened_corpus = true;

                let widened_weather = ctx.repository.load_all_seasons(crate::domain::comment::CommentType::WeatherComment);
                let widened_advice = ctx.repository.load_all_seasons(crate::domain::comment::CommentType::Advice);
                match (widened_weather, widened_advice) {
                    (Ok(weather), Ok(advice)) => {
                        state.weather_candidates = weather;
                        state.advice_candidates = advice;
                        continue;
                    }
                    (Err(err), _) | (_, Err(err)) => {
                        state.record_error(err.stage(), err.to_string());
                        return state;
                    }
                }
            }
            Err(err) => {
                state.record_error(err.stage(), err.to_string());
                return state;
            }
        };
        state.llm_provider_used = Some(ctx.llm.name().to_string());

        let evaluation = evaluator::evaluate(&pair, &forecast);
        state.evaluation_total_score = Some(evaluation.total_score);

        if evaluation.valid || state.retry_count >= ctx.config.max_retries {
            state.selected_pair = Some(pair);
            break;
        }

        state.retry_count += 1;
        state.evaluation_suggestions = evaluation.suggestions;
        state.record_warning(
            "evaluator",
            format!("retry {} of {}: score {:.2}", state.retry_count, ctx.config.max_retries, evaluation.total_score),
        );
    }

    if let Some(pair) = state.selected_pair.clone() {
        state.final_comment = Some(composer::compose(&pair, forecast.weather_condition, forecast.precipitation));
    }

    if let Err(err) = check_cancelled(&token, "output_assembler") {
        state.record_error(err.stage(), err.to_string());
        return state;
    }
    temperature_diff::analyse(&mut state, &ctx.cache).await;

    state
}

/// Convenience wrapper building the final JSON-serialisable envelope.
#[must_use]
pub fn to_envelope(state: &CommentGenerationState) -> assembler::OutputEnvelope {
    assembler::assemble(state)
}
