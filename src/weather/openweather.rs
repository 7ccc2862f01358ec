//! OpenWeatherMap 5 day / 3 hour forecast client

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use super::{WeatherProvider, normalize};
use crate::CompassError;
use crate::config::ProviderConfig;
use crate::models::{NormalizedCondition, WeatherData, fill_day_parts};
use crate::providers::{SearchQuery, fetch_json, http_client, require_key};

const PROVIDER: &str = "openweathermap";

pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

/// Forecast response from OpenWeatherMap
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
    pub city: Option<City>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastEntry {
    /// Local slot start, e.g. "2025-06-14 09:00:00"
    #[serde(default)]
    pub dt_txt: String,
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub weather: Vec<WeatherDescription>,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherDescription {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct City {
    pub name: Option<String>,
    pub country: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, CompassError> {
        Ok(Self {
            client: http_client(config.timeout_seconds, concat!("leisure-compass/", env!("CARGO_PKG_VERSION")))?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn fetch(&self, query: &SearchQuery) -> Result<WeatherData, CompassError> {
        let api_key = require_key(PROVIDER, self.api_key.as_deref())?;

        let request = self.client.get(format!("{}/forecast", self.base_url)).query(&[
            ("lat", query.coordinate.latitude.to_string()),
            ("lon", query.coordinate.longitude.to_string()),
            ("units", "metric".to_string()),
            ("appid", api_key.to_string()),
        ]);
        let response: ForecastResponse = fetch_json(PROVIDER, request).await?;

        info!(
            "Received {} forecast entries for {}",
            response.list.len(),
            query.location_name
        );
        Ok(response.into_weather_data(query.date, &query.location_name))
    }
}

impl ForecastResponse {
    /// Bucket entries into the given date and the day after, four periods each
    #[must_use]
    pub fn into_weather_data(self, date: NaiveDate, fallback_name: &str) -> WeatherData {
        let tomorrow = date.checked_add_days(Days::new(1));

        let mut today_entries = Vec::new();
        let mut tomorrow_entries = Vec::new();
        for entry in &self.list {
            let Some(day) = entry.date() else {
                continue;
            };
            if day == date {
                today_entries.push(entry.reading());
            } else if Some(day) == tomorrow {
                tomorrow_entries.push(entry.reading());
            }
        }

        let location = match self.city {
            Some(City {
                name: Some(name),
                country: Some(country),
            }) if !country.is_empty() => format!("{name}, {country}"),
            Some(City { name: Some(name), .. }) => name,
            _ => fallback_name.to_string(),
        };

        WeatherData {
            location,
            date,
            today: fill_day_parts(&today_entries),
            tomorrow: fill_day_parts(&tomorrow_entries),
        }
    }
}

impl ForecastEntry {
    fn date(&self) -> Option<NaiveDate> {
        let day = self.dt_txt.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    fn reading(&self) -> (i32, NormalizedCondition) {
        #[allow(clippy::cast_possible_truncation)]
        let temperature = self
            .main
            .as_ref()
            .and_then(|main| main.temp)
            .filter(|t| t.is_finite())
            .map_or(0, |t| t.round() as i32);

        let condition = self.weather.first().map_or(NormalizedCondition::Cloudy, |w| {
            if w.description.is_empty() {
                normalize(&w.main)
            } else {
                normalize(&w.description)
            }
        });

        (temperature, condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayPart, WeatherPeriod};

    const SAMPLE: &str = r#"{
        "cod": "200",
        "list": [
            {"dt": 1, "dt_txt": "2025-06-13 21:00:00", "main": {"temp": 12.0}, "weather": [{"main": "Clear", "description": "clear sky"}]},
            {"dt": 2, "dt_txt": "2025-06-14 09:00:00", "main": {"temp": 17.6}, "weather": [{"main": "Clouds", "description": "broken clouds"}]},
            {"dt": 3, "dt_txt": "2025-06-14 12:00:00", "main": {"temp": 21.4}, "weather": [{"main": "Rain", "description": "light rain"}]},
            {"dt": 4, "dt_txt": "2025-06-14 15:00:00", "main": {"temp": 23.5}, "weather": [{"main": "Clear", "description": ""}]},
            {"dt": 5, "dt_txt": "2025-06-15 09:00:00", "main": {"temp": -0.4}, "weather": [{"main": "Snow", "description": "light snow"}]},
            {"dt": 6, "dt_txt": "2025-06-15 12:00:00", "main": {"temp": 2.0}, "weather": [{"main": "Snow", "description": "snow"}]},
            {"dt": 7, "dt_txt": "2025-06-15 15:00:00", "main": {"temp": 3.0}, "weather": []},
            {"dt": 8, "dt_txt": "2025-06-15 18:00:00", "main": {"temp": 1.0}, "weather": [{"main": "Clouds", "description": "overcast clouds"}]},
            {"dt": 9, "dt_txt": "2025-06-15 21:00:00", "main": {"temp": 0.0}, "weather": [{"main": "Clear", "description": "clear sky"}]},
            {"dt": 10, "dt_txt": "2025-06-16 09:00:00", "main": {"temp": 14.0}, "weather": [{"main": "Clear", "description": "clear sky"}]}
        ],
        "city": {"name": "Lörrach", "country": "DE"}
    }"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    #[test]
    fn test_bucketing_by_date() {
        let response: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let weather = response.into_weather_data(date(), "Lörrach");

        assert_eq!(weather.location, "Lörrach, DE");
        assert_eq!(weather.date, date());
        assert_eq!(weather.today.len(), 4);
        assert_eq!(weather.tomorrow.len(), 4);

        let today: Vec<(i32, NormalizedCondition)> = weather
            .today
            .iter()
            .map(|p| (p.temperature_celsius, p.condition))
            .collect();
        assert_eq!(
            today,
            vec![
                (18, NormalizedCondition::Cloudy),
                (21, NormalizedCondition::Rainy),
                (24, NormalizedCondition::Sunny),
                (0, NormalizedCondition::Cloudy),
            ]
        );
        assert_eq!(weather.today[3], WeatherPeriod::placeholder(DayPart::Evening));
    }

    #[test]
    fn test_tomorrow_keeps_first_four_entries() {
        let response: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let weather = response.into_weather_data(date(), "Lörrach");

        let labels: Vec<DayPart> = weather.tomorrow.iter().map(|p| p.label).collect();
        assert_eq!(labels, DayPart::ALL.to_vec());
        assert_eq!(weather.tomorrow[0].temperature_celsius, 0);
        assert_eq!(weather.tomorrow[0].condition, NormalizedCondition::Snowy);
        assert_eq!(weather.tomorrow[2].condition, NormalizedCondition::Cloudy);
        assert_eq!(weather.tomorrow[3].temperature_celsius, 1);
    }

    #[test]
    fn test_empty_forecast_is_padded() {
        let response: ForecastResponse = serde_json::from_str(r#"{"list": []}"#).unwrap();
        let weather = response.into_weather_data(date(), "Basel");

        assert_eq!(weather.location, "Basel");
        assert!(
            weather
                .today
                .iter()
                .chain(weather.tomorrow.iter())
                .all(|p| p.temperature_celsius == 0 && p.condition == NormalizedCondition::Cloudy)
        );
    }

    #[test]
    fn test_city_without_country() {
        let response: ForecastResponse =
            serde_json::from_str(r#"{"list": [], "city": {"name": "Basel"}}"#).unwrap();
        assert_eq!(response.into_weather_data(date(), "x").location, "Basel");
    }
}
