use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

const RETENTION: i64 = 7; // days
const CSV_HEADER: &str = "location,forecast_datetime,cached_at,temperature,max_temperature,min_temperature,weather_condition,weather_description,precipitation,humidity,wind_speed,metadata";

/// One row of the append-only, per-location forecast cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastCacheEntry {
    pub location: String,
    pub forecast_datetime: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
    pub temperature: f64,
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub weather_condition: String,
    pub weather_description: String,
    pub precipitation: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub metadata: String,
}

impl ForecastCacheEntry {
    fn to_csv_row(&self) -> String {
        [
            escape(&self.location),
            self.forecast_datetime.to_rfc3339(),
            self.cached_at.to_rfc3339(),
            self.temperature.to_string(),
            self.max_temperature.map(|v| v.to_string()).unwrap_or_default(),
            self.min_temperature.map(|v| v.to_string()).unwrap_or_default(),
            escape(&self.weather_condition),
            escape(&self.weather_description),
            self.precipitation.to_string(),
            self.humidity.to_string(),
            self.wind_speed.to_string(),
            escape(&self.metadata),
        ]
        .join(",")
    }

    fn from_csv_row(row: &str) -> Option<Self> {
        let fields = split_csv_row(row);
        if fields.len() != 12 {
            return None;
        }
        Some(Self {
            location: fields[0].clone(),
            forecast_datetime: DateTime::parse_from_rfc3339(&fields[1]).ok()?.with_timezone(&Utc),
            cached_at: DateTime::parse_from_rfc3339(&fields[2]).ok()?.with_timezone(&Utc),
            temperature: fields[3].parse().ok()?,
            max_temperature: fields[4].parse().ok(),
            min_temperature: fields[5].parse().ok(),
            weather_condition: fields[6].clone(),
            weather_description: fields[7].clone(),
            precipitation: fields[8].parse().ok()?,
            humidity: fields[9].parse().ok()?,
            wind_speed: fields[10].parse().ok()?,
            metadata: fields[11].clone(),
        })
    }
}

fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

/// Append-only forecast cache with per-location write serialisation, atomic
/// cleanup via write-to-temp-then-rename, and an in-memory LRU fronting disk
/// reads within one process. The cache is advisory: a miss never aborts the
/// pipeline.
pub struct ForecastCache {
    base_dir: PathBuf,
    location_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    read_through: StdMutex<LruCache<String, Vec<ForecastCacheEntry>>>,
}

impl ForecastCache {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            location_locks: StdMutex::new(HashMap::new()),
            read_through: StdMutex::new(LruCache::new(std::num::NonZeroUsize::new(32).unwrap())),
        }
    }

    fn path_for(&self, location: &str) -> PathBuf {
        self.base_dir.join(format!("{}.csv", sanitize_filename(location)))
    }

    fn lock_for(&self, location: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.location_locks.lock().expect("lock poisoned");
        locks
            .entry(location.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Appends `entry`, pruning rows older than the retention window and
    /// rewriting the file atomically.
    pub async fn write(&self, entry: ForecastCacheEntry) -> std::io::Result<()> {
        let location = entry.location.clone();
        let lock = self.lock_for(&location);
        let _guard = lock.lock().await;

        let path = self.path_for(&location);
        let mut rows = read_rows(&path)?;
        rows.push(entry);
        let cutoff = Utc::now() - Duration::days(RETENTION);
        rows.retain(|r| r.cached_at >= cutoff);

        write_rows_atomically(&path, &rows)?;
        self.read_through.lock().expect("lock poisoned").put(location, rows);
        Ok(())
    }

    /// Returns the entry nearest `target` within `tolerance_hours`, reading
    /// through the in-memory LRU before touching disk.
    pub async fn read(
        &self,
        location: &str,
        target: DateTime<Utc>,
        tolerance_hours: i64,
    ) -> std::io::Result<Option<ForecastCacheEntry>> {
        if let Some(rows) = self.read_through.lock().expect("lock poisoned").get(location) {
            return Ok(nearest(rows, target, tolerance_hours));
        }
        let path = self.path_for(location);
        let rows = read_rows(&path)?;
        let found = nearest(&rows, target, tolerance_hours);
        self.read_through
            .lock()
            .expect("lock poisoned")
            .put(location.to_string(), rows);
        Ok(found)
    }

    pub async fn previous_day(
        &self,
        location: &str,
        target: DateTime<Utc>,
    ) -> std::io::Result<Option<ForecastCacheEntry>> {
        self.read(location, target - Duration::days(1), 6).await
    }

    pub async fn twelve_hours_ago(
        &self,
        location: &str,
        target: DateTime<Utc>,
    ) -> std::io::Result<Option<ForecastCacheEntry>> {
        self.read(location, target - Duration::hours(12), 3).await
    }
}

fn nearest(rows: &[ForecastCacheEntry], target: DateTime<Utc>, tolerance_hours: i64) -> Option<ForecastCacheEntry> {
    rows.iter()
        .map(|r| (r, (r.forecast_datetime - target).num_minutes().abs()))
        .min_by_key(|&(_, diff)| diff)
        .filter(|&(_, diff)| diff <= tolerance_hours * 60)
        .map(|(r, _)| r.clone())
}

fn read_rows(path: &Path) -> std::io::Result<Vec<ForecastCacheEntry>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .skip(1)
            .filter_map(ForecastCacheEntry::from_csv_row)
            .collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

fn write_rows_atomically(path: &Path, rows: &[ForecastCacheEntry]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut contents = String::from(CSV_HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(&row.to_csv_row());
        contents.push('\n');
    }
    let tmp_path = path.with_extension("csv.tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn sanitize_filename(location: &str) -> String {
    location
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(hour: u32) -> ForecastCacheEntry {
        let dt = Utc::now() - Duration::hours(i64::from(hour));
        ForecastCacheEntry {
            location: "東京".to_string(),
            forecast_datetime: dt,
            cached_at: Utc::now(),
            temperature: 20.0,
            max_temperature: Some(22.0),
            min_temperature: Some(18.0),
            weather_condition: "rain".to_string(),
            weather_description: "雨".to_string(),
            precipitation: 1.0,
            humidity: 60.0,
            wind_speed: 2.0,
            metadata: "note,with,commas".to_string(),
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let e = entry(0);
        let target = e.forecast_datetime;
        cache.write(e.clone()).await.unwrap();
        let found = cache.read("東京", target, 0).await.unwrap().unwrap();
        assert_eq!(found.location, e.location);
        assert_eq!(found.metadata, "note,with,commas");
    }

    #[tokio::test]
    async fn read_outside_tolerance_misses() {
        let dir = tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        cache.write(entry(0)).await.unwrap();
        let far_future = Utc::now() + Duration::days(3);
        assert!(cache.read("東京", far_future, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn old_entries_are_pruned_on_write() {
        let dir = tempdir().unwrap();
        let cache = ForecastCache::new(dir.path());
        let mut stale = entry(0);
        stale.cached_at = Utc::now() - Duration::days(10);
        cache.write(stale).await.unwrap();
        cache.write(entry(1)).await.unwrap();
        let rows = read_rows(&dir.path().join("東京.csv")).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
