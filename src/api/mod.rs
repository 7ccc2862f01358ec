//! JSON HTTP API rendered by the UI

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::CompassError;
use crate::cache::PersistentCache;
use crate::config::CompassConfig;
use crate::geocoding::NominatimClient;
use crate::location_resolver::{LocationResolver, suggestions};
use crate::models::{CategoryFilter, Coordinate, DisplayItem, FilterCriteria, Location, PriceRange, WeatherData};
use crate::providers::{ProviderSet, SearchQuery};
use crate::session::{DiscoverySession, Sections, SourceStatus};

/// Shared handles every request works with
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CompassConfig>,
    pub providers: ProviderSet,
    pub cache: Option<Arc<PersistentCache>>,
    pub geocoder: Arc<NominatimClient>,
}

impl AppState {
    pub fn new(
        config: CompassConfig,
        providers: ProviderSet,
        cache: Option<Arc<PersistentCache>>,
    ) -> Result<Self, CompassError> {
        let geocoder = Arc::new(NominatimClient::new(&config.geocoding)?);
        Ok(Self {
            config: Arc::new(config),
            providers,
            cache,
            geocoder,
        })
    }
}

/// Error body `{"error": ...}` with a status derived from the domain error
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CompassError> for ApiError {
    fn from(error: CompassError) -> Self {
        let status = match &error {
            CompassError::Validation { message } if message.contains("not found") => StatusCode::NOT_FOUND,
            CompassError::Validation { .. } => StatusCode::BAD_REQUEST,
            CompassError::Provider { .. } => StatusCode::BAD_GATEWAY,
            CompassError::Config { .. } | CompassError::Cache { .. } | CompassError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: error.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/suggestions", get(get_suggestions))
        .route("/geocode", get(geocode))
        .route("/discover", get(discover))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

async fn get_suggestions() -> Json<Vec<&'static str>> {
    Json(suggestions())
}

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    pub q: String,
}

async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeocodeParams>,
) -> Result<Json<Location>, ApiError> {
    let location = LocationResolver::resolve(&state.geocoder, &params.q).await?;
    Ok(Json(location))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverParams {
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub radius_km: Option<f64>,
    pub category: Option<CategoryFilter>,
    pub family_friendly: Option<bool>,
    pub max_distance_km: Option<f64>,
    pub price_range: Option<PriceRange>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct WeatherSection {
    pub status: SourceStatus,
    pub data: Option<WeatherData>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub location: Location,
    pub date: NaiveDate,
    pub weather: WeatherSection,
    pub sections: Sections,
    pub items: Vec<DisplayItem>,
    pub total_matching: usize,
    pub has_more: bool,
}

async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<DiscoverResponse>, ApiError> {
    let defaults = &state.config.defaults;

    let location = match params.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(input) => LocationResolver::resolve(&state.geocoder, input).await?,
        None => {
            let coordinate = Coordinate::new(defaults.latitude, defaults.longitude)
                .ok_or_else(|| CompassError::config("default location is invalid"))?;
            Location::new(defaults.location_name.clone(), coordinate)
        }
    };

    let radius_km = params.radius_km.unwrap_or(f64::from(defaults.search_radius_km));
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > 500.0 {
        return Err(ApiError::bad_request("radius_km must be between 0 and 500"));
    }

    let max_distance_km = params.max_distance_km.unwrap_or(radius_km);
    if !max_distance_km.is_finite() || max_distance_km < 0.0 {
        return Err(ApiError::bad_request("max_distance_km must not be negative"));
    }

    let page_size = params
        .page_size
        .unwrap_or(defaults.page_size as usize)
        .clamp(1, 100);
    let date = params.date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let criteria = FilterCriteria {
        category: params.category.unwrap_or_default(),
        family_friendly: params.family_friendly.unwrap_or(false),
        max_distance_km,
        price_range: params.price_range.unwrap_or_default(),
    };

    info!(
        "Discovering around {} on {} within {} km",
        location.name, date, radius_km
    );

    let session = DiscoverySession::new(
        state.providers.clone(),
        state.cache.clone(),
        Duration::from_secs(defaults.fetch_timeout_seconds.into()),
        page_size,
    );
    let query = SearchQuery::new(location.name.clone(), location.coordinate, date, radius_km);
    session.refresh(query).wait().await;

    session.set_criteria(criteria);
    let view = session.set_page(params.page.unwrap_or(1));
    let (weather_status, weather) = session.weather();
    let sections = session.sections();

    for (name, status) in [
        ("activities", &sections.activities),
        ("ticketed events", &sections.ticketed_events),
        ("generic events", &sections.generic_events),
    ] {
        if let SourceStatus::Failed { message } = status {
            warn!("No {} available: {}", name, message);
        }
    }

    Ok(Json(DiscoverResponse {
        location,
        date,
        weather: WeatherSection {
            status: weather_status,
            data: weather,
        },
        sections,
        items: view.items,
        total_matching: view.total_matching,
        has_more: view.has_more,
    }))
}
