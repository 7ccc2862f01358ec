//! Ticketmaster Discovery API adapter for ticketed music events

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{ItemProvider, SearchQuery, fetch_json, http_client, require_key};
use crate::CompassError;
use crate::config::ProviderConfig;
use crate::geo::distance_km;
use crate::models::{Coordinate, DisplayItem, ItemSource};

const PROVIDER: &str = "ticketmaster";
const CLASSIFICATION: &str = "music";
/// Largest page the Discovery API serves
const MAX_PAGE_SIZE: u32 = 200;

pub struct TicketmasterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_results: u32,
}

/// Discovery API event search response
#[derive(Debug, Deserialize)]
pub struct EventSearchResponse {
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedEvents>,
    pub page: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedEvents {
    #[serde(default)]
    pub events: Vec<TicketmasterEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub number: u32,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketmasterEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub dates: Option<Dates>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
    #[serde(default)]
    pub price_ranges: Vec<PriceRangeInfo>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<EmbeddedVenues>,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Dates {
    pub start: Option<StartDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDate {
    pub local_date: Option<String>,
    pub local_time: Option<String>,
    pub date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Classification {
    pub family: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PriceRangeInfo {
    pub min: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedVenues {
    #[serde(default)]
    pub venues: Vec<Venue>,
}

#[derive(Debug, Deserialize)]
pub struct Venue {
    pub name: Option<String>,
    pub city: Option<NamedValue>,
    pub location: Option<VenueLocation>,
}

#[derive(Debug, Deserialize)]
pub struct NamedValue {
    pub name: Option<String>,
}

/// Ticketmaster sends coordinates as strings
#[derive(Debug, Deserialize)]
pub struct VenueLocation {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl TicketmasterClient {
    pub fn new(config: &ProviderConfig, max_results: u32) -> Result<Self, CompassError> {
        Ok(Self {
            client: http_client(config.timeout_seconds, concat!("leisure-compass/", env!("CARGO_PKG_VERSION")))?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
        })
    }

    async fn fetch_page(
        &self,
        api_key: &str,
        query: &SearchQuery,
        page: u32,
        size: u32,
    ) -> Result<EventSearchResponse, CompassError> {
        let url = format!("{}/events.json", self.base_url);
        let day_start = format!("{}T00:00:00Z", query.date);
        let day_end = format!("{}T23:59:59Z", query.date);
        let request = self.client.get(url).query(&[
            ("apikey", api_key.to_string()),
            ("latlong", query.coordinate.format_coordinates()),
            ("radius", format!("{:.0}", query.radius_km.max(1.0))),
            ("unit", "km".to_string()),
            ("startDateTime", day_start),
            ("endDateTime", day_end),
            ("classificationName", CLASSIFICATION.to_string()),
            ("size", size.to_string()),
            ("page", page.to_string()),
        ]);

        debug!("Requesting Ticketmaster page {}", page);
        fetch_json(PROVIDER, request).await
    }
}

#[async_trait]
impl ItemProvider for TicketmasterClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> ItemSource {
        ItemSource::TicketedEvent
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<DisplayItem>, CompassError> {
        let api_key = require_key(PROVIDER, self.api_key.as_deref())?;
        let limit = self.max_results as usize;
        let size = self.max_results.min(MAX_PAGE_SIZE);

        let mut items = Vec::new();
        let mut page = 0;
        loop {
            let response = self.fetch_page(api_key, query, page, size).await?;
            let events = response.embedded.map(|e| e.events).unwrap_or_default();
            let received = events.len();
            items.extend(events.into_iter().map(|event| event.into_display_item(&query.coordinate)));

            let more_pages = response
                .page
                .is_some_and(|info| info.number + 1 < info.total_pages);
            if received == 0 || !more_pages || items.len() >= limit {
                break;
            }
            page += 1;
        }
        items.truncate(limit);

        info!("Found {} ticketed events from Ticketmaster", items.len());
        Ok(items)
    }
}

impl TicketmasterEvent {
    /// Convert to the unified display item, measuring from `origin` when the venue has coordinates
    #[must_use]
    pub fn into_display_item(self, origin: &Coordinate) -> DisplayItem {
        let venue = self
            .embedded
            .and_then(|embedded| embedded.venues.into_iter().next());

        let (venue_name, city, venue_coordinate) = match venue {
            Some(venue) => (
                venue.name.unwrap_or_default(),
                venue.city.and_then(|c| c.name).unwrap_or_default(),
                venue.location.and_then(|location| {
                    Coordinate::parse(location.latitude.as_deref(), location.longitude.as_deref())
                }),
            ),
            None => (String::new(), String::new(), None),
        };

        let start_time = self.dates.and_then(|d| d.start).and_then(|start| {
            start.date_time.or(match (start.local_date, start.local_time) {
                (Some(date), Some(time)) => Some(format!("{date}T{time}")),
                (date, _) => date,
            })
        });

        let price = self
            .price_ranges
            .first()
            .and_then(|range| range.min.map(|min| price_label(min, range.currency.as_deref())))
            .unwrap_or_else(|| "Free".to_string());

        let family_friendly = self
            .classifications
            .iter()
            .any(|classification| classification.family == Some(true));

        let mut item = DisplayItem::ticketed_event(self.id, self.name)
            .at(venue_name, city)
            .starting(start_time)
            .linked(self.url)
            .with_distance(venue_coordinate.map(|venue| distance_km(origin, &venue)))
            .with_price(price)
            .family_friendly(family_friendly);
        item.image_url = self.images.into_iter().find_map(|image| image.url);
        item
    }
}

/// Render a minimum ticket price such as `€45` or `12.50 CHF`
fn price_label(amount: f64, currency: Option<&str>) -> String {
    if amount <= 0.0 {
        return "Free".to_string();
    }
    let number = if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    };
    match currency.map(str::to_uppercase).as_deref() {
        Some("EUR") => format!("€{number}"),
        Some("USD") => format!("${number}"),
        Some("GBP") => format!("£{number}"),
        Some(other) => format!("{number} {other}"),
        None => number,
    }
}
