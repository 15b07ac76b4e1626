pub mod comment;
pub mod location;
pub mod state;
pub mod trend;
pub mod weather;

pub use comment::{CommentPair, CommentType, PastComment};
pub use location::Location;
pub use state::CommentGenerationState;
pub use trend::{TemperatureDifference, TrendDirection, WeatherTrend};
pub use weather::{WeatherCondition, WeatherForecast, WeatherForecastCollection, WindDirection};
