//! Activities stored in the managed backend
//!
//! A fetch first asks the backend's refresh functions to ingest fresh data
//! for the query, then reads the activity table back through the REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{ItemProvider, SearchQuery, fetch_json, http_client, require_key};
use crate::CompassError;
use crate::config::BackendConfig;
use crate::geo::distance_km;
use crate::models::{Category, Coordinate, DisplayItem, ItemSource};

const PROVIDER: &str = "backend";

pub struct BackendActivityClient {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
    table: String,
    order: &'static str,
    refresh_functions: Vec<String>,
}

/// Body sent to every refresh function
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    location: &'a str,
    radius: f64,
}

/// One row of the activity table
#[derive(Debug, Deserialize)]
pub struct ActivityRow {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub price_range: Option<String>,
    pub rating: Option<f32>,
    pub is_indoor: Option<bool>,
    pub is_outdoor: Option<bool>,
    pub family_friendly: Option<bool>,
    /// Postgres point rendered as "(lat,lng)"
    pub coordinates: Option<String>,
    pub distance: Option<f64>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

/// Row ids are uuids in practice but integer keys are accepted too
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

impl BackendActivityClient {
    pub fn new(config: &BackendConfig) -> Result<Self, CompassError> {
        let order = match config.order_by.as_str() {
            "recency" => "created_at.desc",
            _ => "rating.desc",
        };
        Ok(Self {
            client: http_client(config.timeout_seconds, concat!("leisure-compass/", env!("CARGO_PKG_VERSION")))?,
            base_url: config
                .base_url
                .as_deref()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            order,
            refresh_functions: config.refresh_functions.clone(),
        })
    }

    /// Invoke one refresh function; failures are reported to the caller to log
    async fn invoke_refresh(
        &self,
        base_url: &str,
        api_key: &str,
        function: &str,
        query: &SearchQuery,
    ) -> Result<(), CompassError> {
        let request = self
            .client
            .post(format!("{base_url}/functions/v1/{function}"))
            .bearer_auth(api_key)
            .json(&RefreshRequest {
                location: &query.location_name,
                radius: query.radius_km,
            });
        let _: serde_json::Value = fetch_json(PROVIDER, request).await?;
        Ok(())
    }
}

#[async_trait]
impl ItemProvider for BackendActivityClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> ItemSource {
        ItemSource::Activity
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<DisplayItem>, CompassError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| CompassError::config("No backend URL configured"))?;
        let api_key = require_key(PROVIDER, self.api_key.as_deref())?;

        for function in &self.refresh_functions {
            if let Err(e) = self.invoke_refresh(base_url, api_key, function, query).await {
                warn!("Refresh function {} failed: {}", function, e);
            }
        }

        let request = self
            .client
            .get(format!("{base_url}/rest/v1/{}", self.table))
            .header("apikey", api_key)
            .bearer_auth(api_key)
            .query(&[("select", "*"), ("order", self.order)]);
        let rows: Vec<ActivityRow> = fetch_json(PROVIDER, request).await?;

        info!("Read {} activities from the backend", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| row.into_display_item(&query.coordinate))
            .collect())
    }
}

impl ActivityRow {
    #[must_use]
    pub fn into_display_item(self, origin: &Coordinate) -> DisplayItem {
        let category = match self.category.as_deref().map(str::to_lowercase).as_deref() {
            Some("indoor") => Category::Indoor,
            Some("outdoor") => Category::Outdoor,
            _ if self.is_indoor == Some(true) && self.is_outdoor != Some(true) => Category::Indoor,
            _ => Category::Outdoor,
        };

        let price = match self.price_range.as_deref().map(str::to_lowercase).as_deref() {
            Some("budget") => "Budget",
            Some("premium") => "Premium",
            _ => "Free",
        };

        let distance = parse_point(self.coordinates.as_deref())
            .map(|point| distance_km(origin, &point))
            .or(self.distance)
            .unwrap_or(0.0);

        let mut item = DisplayItem::activity(self.id, self.title, category)
            .at(self.location.unwrap_or_default(), String::new())
            .with_distance(Some(distance))
            .with_price(price)
            .family_friendly(self.family_friendly.unwrap_or(false))
            .linked(self.url);
        item.description = self.description.filter(|d| !d.is_empty());
        item.image_url = self.image_url.filter(|u| !u.is_empty());
        item.rating = self.rating;
        item
    }
}

/// Parse a point such as "(47.61,7.66)"
fn parse_point(raw: Option<&str>) -> Option<Coordinate> {
    let inner = raw?.trim().trim_start_matches('(').trim_end_matches(')');
    let (lat, lon) = inner.split_once(',')?;
    Coordinate::parse(Some(lat), Some(lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn origin() -> Coordinate {
        Coordinate::new(47.6149, 7.6647).unwrap()
    }

    #[test]
    fn test_row_conversion() {
        let rows: Vec<ActivityRow> = serde_json::from_str(
            r#"[
                {"id": "a1", "title": "Feldberg Loop", "category": "outdoor", "location": "Feldberg",
                 "price_range": "free", "rating": 4.7, "is_indoor": false, "is_outdoor": true,
                 "coordinates": "(47.8740,8.0043)", "description": "Summit hike"},
                {"id": 7, "title": "Kunstmuseum", "location": "Basel", "price_range": "premium",
                 "is_indoor": true, "is_outdoor": false, "distance": 9.5},
                {"id": "a3", "title": "Mystery", "price_range": null}
            ]"#,
        )
        .unwrap();
        let items: Vec<DisplayItem> = rows.into_iter().map(|r| r.into_display_item(&origin())).collect();

        assert_eq!(items[0].id, "a1");
        assert_eq!(items[0].category, Category::Outdoor);
        assert_eq!(items[0].price_label.as_deref(), Some("Free"));
        assert_eq!(items[0].rating, Some(4.7));
        assert_eq!(items[0].venue, "Feldberg");
        assert!(items[0].distance_km.is_some_and(|d| d > 30.0 && d < 45.0));

        assert_eq!(items[1].id, "7");
        assert_eq!(items[1].category, Category::Indoor);
        assert_eq!(items[1].price_label.as_deref(), Some("Premium"));
        assert_eq!(items[1].distance_km, Some(9.5));

        assert_eq!(items[2].distance_km, Some(0.0));
        assert_eq!(items[2].price_label.as_deref(), Some("Free"));
        assert!(!items[2].family_friendly);
    }

    #[rstest]
    #[case(Some("(47.61,7.66)"), true)]
    #[case(Some(" (47.61, 7.66) "), true)]
    #[case(Some("47.61,7.66"), true)]
    #[case(Some("(95.0,7.66)"), false)]
    #[case(Some("nonsense"), false)]
    #[case(None, false)]
    fn test_parse_point(#[case] raw: Option<&str>, #[case] valid: bool) {
        assert_eq!(parse_point(raw).is_some(), valid);
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let client = BackendActivityClient::new(&BackendConfig {
            api_key: Some("key".to_string()),
            ..BackendConfig::default()
        })
        .unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let query = SearchQuery::new("Lörrach", origin(), date, 50.0);

        assert!(matches!(client.fetch(&query).await, Err(CompassError::Config { .. })));
    }
}
