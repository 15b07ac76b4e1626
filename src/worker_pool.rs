use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::pipeline::assembler::{BatchResult, OutputEnvelope};
use crate::pipeline::runner::{run_pipeline, to_envelope, PipelineContext};

/// Runs one pipeline instance per location, bounded to `worker_pool_size`
/// concurrent tasks via a semaphore, mirroring how the rest of the crate
/// gates a fixed fan-out width rather than spawning unbounded tasks.
pub async fn run_many(
    locations: Vec<String>,
    ctx: Arc<PipelineContext>,
    token: CancellationToken,
) -> BatchResult {
    let semaphore = Arc::new(Semaphore::new(ctx.config.worker_pool_size));
    let mut tasks = JoinSet::new();

    for location in locations {
        let ctx = Arc::clone(&ctx);
        let token = token.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let state = run_pipeline(&location, None, ctx, token).await;
            to_envelope(&state)
        });
    }

    let mut results: Vec<OutputEnvelope> = Vec::new();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(envelope) => {
                if !envelope.generation_metadata.errors.is_empty() && envelope.final_comment.is_none() {
                    errors.extend(envelope.generation_metadata.errors.clone());
                }
                results.push(envelope);
            }
            Err(join_err) => errors.push(join_err.to_string()),
        }
    }

    let success_count = results.iter().filter(|r| r.final_comment.is_some()).count();
    let total_count = results.len();
    BatchResult {
        success_count,
        total_count,
        results,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ForecastCache;
    use crate::config::PipelineConfig;
    use crate::data::{CommentRepository, WeatherClient};
    use crate::domain::location::LocationTable;
    use crate::llm::provider::NullProvider;
    use crate::pipeline::validator::ValidatorRules;
    use tempfile::tempdir;

    #[tokio::test]
    async fn pool_respects_worker_count_bound() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.worker_pool_size = 2;
        let ctx = Arc::new(PipelineContext {
            weather_client: WeatherClient::new("https://example-weather-provider.test/forecast"),
            cache: ForecastCache::new(dir.path().join("cache")),
            repository: CommentRepository::new(dir.path()),
            llm: Box::new(NullProvider),
            location_table: LocationTable::with_defaults(),
            validator_rules: ValidatorRules::default(),
            config,
        });
        let batch = run_many(vec!["東京".to_string(), "大阪".to_string()], ctx, CancellationToken::new()).await;
        assert_eq!(batch.total_count, 2);
    }
}
