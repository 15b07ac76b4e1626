use std::path::{Path, PathBuf};

use chrono::Datelike;

use crate::domain::comment::{CommentType, PastComment};
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    RainySeason,
    Summer,
    Typhoon,
    Autumn,
    Winter,
}

impl Season {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::RainySeason => "rainy",
            Self::Summer => "summer",
            Self::Typhoon => "typhoon",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }

    /// Current season from local month, per the retrieval table.
    #[must_use]
    pub fn for_month(month: u32) -> Self {
        match month {
            3 | 4 | 5 => Self::Spring,
            6 => Self::RainySeason,
            7 | 8 => Self::Summer,
            9 => Self::Typhoon,
            10 | 11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    /// The breadth of seasons retrieval should also consider for this month.
    #[must_use]
    pub fn related_for_month(month: u32) -> Vec<Self> {
        match month {
            1 | 2 => vec![Self::Winter],
            3 => vec![Self::Winter, Self::Spring],
            4 => vec![Self::Spring],
            5 => vec![Self::Spring, Self::RainySeason],
            6 => vec![Self::Spring, Self::RainySeason, Self::Summer],
            7 => vec![Self::RainySeason, Self::Summer],
            8 => vec![Self::Summer, Self::Typhoon],
            9 => vec![Self::Summer, Self::Typhoon, Self::Autumn],
            10 => vec![Self::Typhoon, Self::Autumn],
            11 => vec![Self::Autumn, Self::Winter],
            _ => vec![Self::Winter],
        }
    }
}

/// Loads the historical comment corpus from a local directory of
/// `{season}_{weather_comment|advice}_enhanced100.csv` files.
pub struct CommentRepository {
    corpus_dir: PathBuf,
}

impl CommentRepository {
    #[must_use]
    pub fn new(corpus_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
        }
    }

    /// Loads comments relevant to `now`'s month, widening to related seasons
    /// when the primary season's file is missing or yields nothing.
    pub fn load_for_month(
        &self,
        comment_type: CommentType,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<PastComment>, PipelineError> {
        let primary = Season::for_month(now.month());
        let mut comments = self.load_season(primary, comment_type)?;
        if comments.is_empty() {
            for season in Season::related_for_month(now.month()) {
                comments.extend(self.load_season(season, comment_type).unwrap_or_default());
            }
        }
        if comments.is_empty() {
            return Err(PipelineError::CorpusUnavailable(format!(
                "no comments found for season {:?}",
                primary
            )));
        }
        Ok(comments)
    }

    /// Loads every season's file for `comment_type`, used when the validator
    /// rejects every candidate drawn from the month-appropriate pool and the
    /// pipeline must widen retrieval beyond the related-season table.
    pub fn load_all_seasons(&self, comment_type: CommentType) -> Result<Vec<PastComment>, PipelineError> {
        let all = [
            Season::Spring,
            Season::RainySeason,
            Season::Summer,
            Season::Typhoon,
            Season::Autumn,
            Season::Winter,
        ];
        let mut comments = Vec::new();
        for season in all {
            comments.extend(self.load_season(season, comment_type).unwrap_or_default());
        }
        if comments.is_empty() {
            return Err(PipelineError::CorpusUnavailable(
                "no comments found across any season".to_string(),
            ));
        }
        Ok(comments)
    }

    fn load_season(
        &self,
        season: Season,
        comment_type: CommentType,
    ) -> Result<Vec<PastComment>, PipelineError> {
        let kind = match comment_type {
            CommentType::WeatherComment => "weather_comment",
            CommentType::Advice => "advice",
            CommentType::Unknown => "weather_comment",
        };
        let path = self
            .corpus_dir
            .join(format!("{}_{}_enhanced100.csv", season.label(), kind));
        load_csv(&path, comment_type)
    }
}

fn load_csv(path: &Path, comment_type: CommentType) -> Result<Vec<PastComment>, PipelineError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(PipelineError::CorpusUnavailable(err.to_string())),
    };

    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if idx == 0 || line.trim().is_empty() {
            continue; // header
        }
        let fields: Vec<&str> = line.splitn(5, ',').collect();
        let [location, weather_condition, comment_text, usage_count, ..] = fields.as_slice() else {
            continue;
        };
        if let Ok(comment) = PastComment::new(
            (*location).to_string(),
            chrono::Utc::now(),
            (*weather_condition).to_string(),
            (*comment_text).to_string(),
            comment_type,
        ) {
            rows.push(comment.with_usage_count(usage_count.parse().unwrap_or(0)));
        }
    }
    Ok(rows)
}
