pub mod comment_repository;
pub mod weather_client;

pub use comment_repository::CommentRepository;
pub use weather_client::WeatherClient;
