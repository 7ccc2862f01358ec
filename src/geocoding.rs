//! Nominatim geocoding client

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::CompassError;
use crate::config::GeocodingConfig;
use crate::models::{Coordinate, Location};
use crate::providers::{fetch_json, http_client};

const PROVIDER: &str = "nominatim";

pub struct NominatimClient {
    client: Client,
    base_url: String,
}

/// One entry of a Nominatim search result; coordinates arrive as strings
#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
}

impl NominatimClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self, CompassError> {
        Ok(Self {
            client: http_client(config.timeout_seconds, &config.user_agent)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve free text to the best matching place
    #[instrument(skip(self), fields(provider = PROVIDER))]
    pub async fn geocode(&self, text: &str) -> Result<Location, CompassError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CompassError::validation("location must not be empty"));
        }

        let url = format!(
            "{}/search?format=json&limit=1&q={}",
            self.base_url,
            urlencoding::encode(text)
        );
        let places: Vec<NominatimPlace> = fetch_json(PROVIDER, self.client.get(url)).await?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| CompassError::validation(format!("location not found: {text}")))?;
        let location = place.into_location()?;
        debug!(
            "Geocoded '{}' to {}",
            text,
            location.coordinate.format_coordinates()
        );
        Ok(location)
    }
}

impl NominatimPlace {
    pub fn into_location(self) -> Result<Location, CompassError> {
        let coordinate = Coordinate::parse(Some(&self.lat), Some(&self.lon)).ok_or_else(|| {
            CompassError::provider(
                PROVIDER,
                None,
                format!("invalid coordinates for {}: {},{}", self.display_name, self.lat, self.lon),
            )
        })?;
        Ok(Location::new(self.display_name, coordinate))
    }
}
