//! Weather forecasts for the selected date and the day after

use async_trait::async_trait;

use crate::CompassError;
use crate::models::WeatherData;
use crate::providers::SearchQuery;

pub mod condition;
pub mod openweather;

pub use condition::normalize;
pub use openweather::OpenWeatherClient;

/// An adapter producing a two-day forecast for a query
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, query: &SearchQuery) -> Result<WeatherData, CompassError>;
}
