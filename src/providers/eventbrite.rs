//! Eventbrite adapter for generic local events

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{ItemProvider, SearchQuery, fetch_json, http_client, require_key};
use crate::CompassError;
use crate::config::ProviderConfig;
use crate::geo::distance_km;
use crate::models::{Category, Coordinate, DisplayItem, ItemSource};

const PROVIDER: &str = "eventbrite";
const OUTDOOR_HINTS: [&str; 3] = ["outdoor", "sports", "travel"];

pub struct EventbriteClient {
    client: Client,
    token: Option<String>,
    base_url: String,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
pub struct EventSearchResponse {
    #[serde(default)]
    pub events: Vec<EventbriteEvent>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub has_more_items: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventbriteEvent {
    #[serde(default)]
    pub id: String,
    pub name: Option<TextField>,
    pub description: Option<TextField>,
    pub url: Option<String>,
    pub start: Option<EventStart>,
    #[serde(default)]
    pub is_free: bool,
    pub venue: Option<Venue>,
    pub logo: Option<Logo>,
    pub category: Option<EventCategory>,
    pub ticket_availability: Option<TicketAvailability>,
}

#[derive(Debug, Deserialize)]
pub struct TextField {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventStart {
    pub local: Option<String>,
    pub utc: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Venue {
    pub name: Option<String>,
    pub address: Option<Address>,
}

/// Eventbrite sends coordinates as strings
#[derive(Debug, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Logo {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventCategory {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TicketAvailability {
    pub minimum_ticket_price: Option<TicketPrice>,
}

#[derive(Debug, Deserialize)]
pub struct TicketPrice {
    pub display: Option<String>,
}

impl EventbriteClient {
    pub fn new(config: &ProviderConfig, max_results: u32) -> Result<Self, CompassError> {
        Ok(Self {
            client: http_client(config.timeout_seconds, concat!("leisure-compass/", env!("CARGO_PKG_VERSION")))?,
            token: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
        })
    }

    async fn fetch_page(
        &self,
        token: &str,
        query: &SearchQuery,
        page: u32,
    ) -> Result<EventSearchResponse, CompassError> {
        let url = format!("{}/events/search/", self.base_url);
        let request = self.client.get(url).bearer_auth(token).query(&[
            ("location.latitude", query.coordinate.latitude.to_string()),
            ("location.longitude", query.coordinate.longitude.to_string()),
            ("location.within", format!("{:.0}km", query.radius_km.max(1.0))),
            ("start_date.range_start", format!("{}T00:00:00", query.date)),
            ("start_date.range_end", format!("{}T23:59:59", query.date)),
            ("expand", "venue,category,logo,ticket_availability".to_string()),
            ("sort_by", "date".to_string()),
            ("page", page.to_string()),
        ]);

        debug!("Requesting Eventbrite page {}", page);
        fetch_json(PROVIDER, request).await
    }
}

#[async_trait]
impl ItemProvider for EventbriteClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> ItemSource {
        ItemSource::GenericEvent
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<DisplayItem>, CompassError> {
        let token = require_key(PROVIDER, self.token.as_deref())?;
        let limit = self.max_results as usize;

        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let response = self.fetch_page(token, query, page).await?;
            let received = response.events.len();
            items.extend(
                response
                    .events
                    .into_iter()
                    .map(|event| event.into_display_item(&query.coordinate)),
            );

            let has_more = response.pagination.is_some_and(|p| p.has_more_items);
            if received == 0 || !has_more || items.len() >= limit {
                break;
            }
            page += 1;
        }
        items.truncate(limit);

        info!("Found {} events from Eventbrite", items.len());
        Ok(items)
    }
}

impl EventbriteEvent {
    #[must_use]
    pub fn into_display_item(self, origin: &Coordinate) -> DisplayItem {
        let category_name = self
            .category
            .and_then(|c| c.name)
            .unwrap_or_default()
            .to_lowercase();
        let category = if OUTDOOR_HINTS.iter().any(|hint| category_name.contains(hint)) {
            Category::Outdoor
        } else {
            Category::Indoor
        };

        let (venue_name, city, venue_coordinate) = match self.venue {
            Some(venue) => {
                let address = venue.address;
                let coordinate = address.as_ref().and_then(|a| {
                    Coordinate::parse(a.latitude.as_deref(), a.longitude.as_deref())
                });
                (
                    venue.name.unwrap_or_default(),
                    address.and_then(|a| a.city).unwrap_or_default(),
                    coordinate,
                )
            }
            None => (String::new(), String::new(), None),
        };

        let price = if self.is_free {
            None
        } else {
            self.ticket_availability
                .and_then(|t| t.minimum_ticket_price)
                .and_then(|p| p.display)
                .filter(|display| !display.trim().is_empty())
        };

        let mut item = DisplayItem::generic_event(
            self.id,
            self.name.and_then(|n| n.text).unwrap_or_default(),
            category,
        )
        .at(venue_name, city)
        .starting(self.start.and_then(|s| s.local.or(s.utc)))
        .linked(self.url)
        .with_distance(venue_coordinate.map(|venue| distance_km(origin, &venue)))
        .with_price(price.unwrap_or_else(|| "Free".to_string()))
        .family_friendly(category_name.contains("family"));
        item.description = self.description.and_then(|d| d.text).filter(|t| !t.is_empty());
        item.image_url = self.logo.and_then(|l| l.url);
        item
    }
}
