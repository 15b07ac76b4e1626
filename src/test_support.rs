use chrono::{TimeZone, Utc};

use crate::domain::comment::{CommentType, PastComment};
use crate::domain::location::Location;
use crate::domain::weather::WeatherForecast;

pub(crate) fn reference_location() -> Location {
    Location::new("東京").with_coords(35.6895, 139.6917).with_region("関東")
}

pub(crate) fn sample_forecast(hour: u32, temp: f64, precip: f64, code: &str) -> WeatherForecast {
    let dt = Utc.with_ymd_and_hms(2026, 8, 1, hour, 0, 0).unwrap();
    WeatherForecast::new("東京", dt, temp, precip, 60.0, 2.0, 90.0, code, "desc").expect("valid fixture forecast")
}

pub(crate) fn sample_weather_comment(text: &str) -> PastComment {
    PastComment::new("東京", Utc::now(), "rain", text, CommentType::WeatherComment)
        .expect("valid fixture comment")
        .with_usage_count(3)
}

pub(crate) fn sample_advice_comment(text: &str) -> PastComment {
    PastComment::new("東京", Utc::now(), "rain", text, CommentType::Advice)
        .expect("valid fixture comment")
        .with_usage_count(3)
}
