use crate::data::CommentRepository;
use crate::domain::comment::CommentType;
use crate::domain::state::CommentGenerationState;
use crate::error::PipelineError;

/// Loads the historical comment pools relevant to the current month into
/// state, widening to related seasons when the primary season is empty.
pub fn retrieve(
    state: &mut CommentGenerationState,
    repository: &CommentRepository,
) -> Result<(), PipelineError> {
    let now = state.target_datetime.unwrap_or_else(chrono::Utc::now);
    state.weather_candidates = repository.load_for_month(CommentType::WeatherComment, now)?;
    state.advice_candidates = repository.load_for_month(CommentType::Advice, now)?;
    Ok(())
}
