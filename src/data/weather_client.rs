use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::domain::location::Location;
use crate::domain::weather::WeatherForecast;
use crate::error::{PipelineError, WeatherProviderErrorKind};
use crate::resilience::backoff::RetryBackoff;

const TARGET_LOCAL_HOURS: [u32; 4] = [9, 12, 15, 18];

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    wxdata: Vec<WxBlock>,
}

#[derive(Debug, Deserialize)]
struct WxBlock {
    #[serde(default)]
    srf: Vec<SrfEntry>,
    #[serde(default)]
    #[allow(dead_code)]
    mrf: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SrfEntry {
    date: String,
    wx: String,
    #[serde(default)]
    temp: Option<f64>,
    #[serde(default)]
    prec: Option<f64>,
    #[serde(default)]
    rhum: Option<f64>,
    #[serde(default)]
    wndspd: Option<f64>,
    #[serde(default)]
    wnddir: Option<i64>,
}

/// HTTP client for the weather provider's `{"wxdata":[{"srf":[...]}]}`
/// contract. Enforces a minimum inter-request delay and retries on HTTP 429
/// with exponential backoff, mirroring the resilience module's backoff
/// primitive used across the rest of the pipeline's external calls.
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    rate_limit_base_secs: u64,
    rate_limit_max_secs: u64,
    max_attempts: u32,
}

impl WeatherClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            rate_limit_base_secs: 3,
            rate_limit_max_secs: 24,
            max_attempts: 3,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches the four target-day local-time slots (09/12/15/18) for
    /// `location`, retrying transient provider errors and classifying the
    /// rest.
    pub async fn fetch_day_slots(
        &self,
        location: &Location,
        day: NaiveDate,
    ) -> Result<Vec<WeatherForecast>, PipelineError> {
        let payload = self.fetch_with_retry(location).await?;
        let location_name = location.name.clone();

        let mut slots = Vec::new();
        for target_hour in TARGET_LOCAL_HOURS {
            if let Some(entry) = find_nearest_slot(&payload, day, target_hour) {
                if let Some(forecast) = build_forecast(&location_name, entry) {
                    slots.push(forecast);
                }
            }
        }
        Ok(slots)
    }

    async fn fetch_with_retry(&self, location: &Location) -> Result<ProviderResponse, PipelineError> {
        let mut backoff = RetryBackoff::new(self.rate_limit_base_secs, self.rate_limit_max_secs, self.max_attempts);
        loop {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("lat", location.latitude.unwrap_or_default().to_string()),
                    ("lon", location.longitude.unwrap_or_default().to_string()),
                ])
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().as_u16() == 429 => match backoff.advance() {
                    Some(delay) => {
                        tracing::warn!(attempt = backoff.attempt(), delay, "weather provider rate-limited, backing off");
                        tokio::time::sleep(Duration::from_secs(delay)).await;
                        continue;
                    }
                    None => {
                        return Err(PipelineError::WeatherProvider {
                            kind: WeatherProviderErrorKind::RateLimit,
                            message: "rate limit exceeded after max attempts".to_string(),
                        });
                    }
                },
                Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(PipelineError::WeatherProvider {
                        kind: WeatherProviderErrorKind::ApiKeyInvalid,
                        message: "provider rejected credentials".to_string(),
                    });
                }
                Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Err(PipelineError::WeatherProvider {
                        kind: WeatherProviderErrorKind::NotFound,
                        message: "location not found".to_string(),
                    });
                }
                Ok(resp) if resp.status().is_server_error() => {
                    return Err(PipelineError::WeatherProvider {
                        kind: WeatherProviderErrorKind::ServerError,
                        message: format!("provider returned {}", resp.status()),
                    });
                }
                Ok(resp) => {
                    return resp.json::<ProviderResponse>().await.map_err(|err| {
                        PipelineError::WeatherProvider {
                            kind: WeatherProviderErrorKind::ServerError,
                            message: format!("malformed payload: {err}"),
                        }
                    });
                }
                Err(err) if err.is_timeout() => {
                    return Err(PipelineError::WeatherProvider {
                        kind: WeatherProviderErrorKind::Timeout,
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    return Err(PipelineError::WeatherProvider {
                        kind: WeatherProviderErrorKind::NetworkError,
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

fn find_nearest_slot(payload: &ProviderResponse, day: NaiveDate, target_hour: u32) -> Option<&SrfEntry> {
    let target = Utc.from_utc_datetime(&day.and_hms_opt(target_hour, 0, 0)?);
    payload
        .wxdata
        .iter()
        .flat_map(|block| block.srf.iter())
        .filter_map(|entry| parse_entry_time(entry).map(|dt| (entry, dt)))
        .min_by_key(|(_, dt)| (*dt - target).num_minutes().abs())
        .map(|(entry, _)| entry)
}

fn parse_entry_time(entry: &SrfEntry) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&entry.date)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn build_forecast(location_name: &str, entry: &SrfEntry) -> Option<WeatherForecast> {
    let datetime = parse_entry_time(entry)?;
    WeatherForecast::new(
        location_name,
        datetime,
        entry.temp.unwrap_or(0.0),
        entry.prec.unwrap_or(0.0).max(0.0),
        entry.rhum.unwrap_or(0.0).clamp(0.0, 100.0),
        entry.wndspd.unwrap_or(0.0),
        ((entry.wnddir.unwrap_or(0) * 45) as f64).rem_euclid(360.0),
        entry.wx.clone(),
        entry.wx.clone(),
    )
    .ok()
}
