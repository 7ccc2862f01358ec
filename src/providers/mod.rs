//! Provider adapters
//!
//! Each adapter turns one external source into [`DisplayItem`]s:
//! - Ticketmaster: ticketed music events
//! - Eventbrite: generic events with optional description and free flag
//! - Backend: activities ingested into the managed data store
//! - Curated: the built-in regional activity set, listed ahead of the backend rows

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::CompassError;
use crate::config::CompassConfig;
use crate::models::{Coordinate, DisplayItem, ItemSource};
use crate::weather::{OpenWeatherClient, WeatherProvider};

pub mod backend;
pub mod curated;
pub mod eventbrite;
pub mod ticketmaster;

pub use backend::BackendActivityClient;
pub use curated::{CuratedActivities, WithCurated, curated_activities};
pub use eventbrite::EventbriteClient;
pub use ticketmaster::TicketmasterClient;

/// The (location, date, radius) tuple a fetch refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub location_name: String,
    pub coordinate: Coordinate,
    pub date: NaiveDate,
    pub radius_km: f64,
}

impl SearchQuery {
    #[must_use]
    pub fn new(location_name: impl Into<String>, coordinate: Coordinate, date: NaiveDate, radius_km: f64) -> Self {
        Self {
            location_name: location_name.into(),
            coordinate,
            date,
            radius_km,
        }
    }

    /// Stable key for snapshot caching
    #[must_use]
    pub fn cache_key(&self, source: &str) -> String {
        let (lat, lon) = self.coordinate.rounded(2);
        format!("{source}:{lat:.2}:{lon:.2}:{}:{:.0}", self.date, self.radius_km)
    }
}

/// An adapter producing display items for a query
#[async_trait]
pub trait ItemProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &'static str;

    /// Which slot of the merged list this provider feeds
    fn source(&self) -> ItemSource;

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<DisplayItem>, CompassError>;
}

/// Build the shared HTTP client for one provider
pub fn http_client(timeout_seconds: u32, user_agent: &str) -> Result<Client, CompassError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(user_agent)
        .build()
        .map_err(|e| CompassError::config(format!("Failed to create HTTP client: {e}")))
}

/// Send a request and decode a JSON body, mapping every failure to a provider error
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, CompassError> {
    let response = request
        .send()
        .await
        .map_err(|e| CompassError::from_transport(provider, &e))?;

    let status = response.status();
    debug!("{} responded with {}", provider, status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        warn!("{} request failed with {}: {}", provider, status, snippet);
        return Err(CompassError::provider(
            provider,
            Some(status.as_u16()),
            format!(
                "request failed: {}",
                status.canonical_reason().unwrap_or("Unknown error")
            ),
        ));
    }

    response.json::<T>().await.map_err(|e| {
        CompassError::provider(provider, Some(status.as_u16()), format!("malformed response: {e}"))
    })
}

/// Reject a missing or blank credential before any network I/O
pub(crate) fn require_key<'a>(provider: &str, key: Option<&'a str>) -> Result<&'a str, CompassError> {
    key.map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| CompassError::config(format!("No {provider} API key configured")))
}

/// All adapters a discovery session drives
#[derive(Clone)]
pub struct ProviderSet {
    pub weather: Arc<dyn WeatherProvider>,
    pub activities: Arc<dyn ItemProvider>,
    pub ticketed: Arc<dyn ItemProvider>,
    pub generic: Arc<dyn ItemProvider>,
}

impl ProviderSet {
    /// Wire up the real HTTP adapters from configuration
    pub fn from_config(config: &CompassConfig) -> Result<Self, CompassError> {
        Ok(Self {
            weather: Arc::new(OpenWeatherClient::new(&config.weather)?),
            activities: Arc::new(WithCurated::new(Arc::new(BackendActivityClient::new(
                &config.backend,
            )?))),
            ticketed: Arc::new(TicketmasterClient::new(
                &config.ticketmaster,
                config.defaults.max_results,
            )?),
            generic: Arc::new(EventbriteClient::new(
                &config.eventbrite,
                config.defaults.max_results,
            )?),
        })
    }
}
