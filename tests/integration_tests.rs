//! Integration tests for the provider adapters, the discovery session and the
//! HTTP API, run against in-process stub providers

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tower::ServiceExt;

use leisure_compass::api::AppState;
use leisure_compass::config::{BackendConfig, CompassConfig, GeocodingConfig, ProviderConfig};
use leisure_compass::geocoding::NominatimClient;
use leisure_compass::models::{Category, ItemSource, NormalizedCondition};
use leisure_compass::providers::{
    BackendActivityClient, EventbriteClient, ItemProvider, ProviderSet, TicketmasterClient,
};
use leisure_compass::weather::{OpenWeatherClient, WeatherProvider};
use leisure_compass::{CompassError, Coordinate, DiscoverySession, SearchQuery, SourceStatus, web};

/// Refresh functions invoked on the stub backend, in call order
type Invocations = Arc<Mutex<Vec<String>>>;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
}

fn query() -> SearchQuery {
    SearchQuery::new("Lörrach", Coordinate::new(47.6149, 7.6647).unwrap(), date(), 50.0)
}

fn provider_config(base_url: &str, api_key: Option<&str>) -> ProviderConfig {
    ProviderConfig {
        api_key: api_key.map(str::to_string),
        base_url: base_url.to_string(),
        timeout_seconds: 5,
    }
}

async fn forecast(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("appid").map(String::as_str) != Some("ow-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"cod": 401, "message": "Invalid API key"})))
            .into_response();
    }
    assert_eq!(params.get("units").map(String::as_str), Some("metric"));

    Json(json!({
        "list": [
            {"dt_txt": "2025-06-14 09:00:00", "main": {"temp": 18.4}, "weather": [{"main": "Clear", "description": "clear sky"}]},
            {"dt_txt": "2025-06-14 12:00:00", "main": {"temp": 22.5}, "weather": [{"main": "Clouds", "description": "few clouds"}]},
            {"dt_txt": "2025-06-15 09:00:00", "main": {"temp": 15.0}, "weather": [{"main": "Rain", "description": "moderate rain"}]}
        ],
        "city": {"name": "Basel", "country": "CH"}
    }))
    .into_response()
}

async fn ticketmaster(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("apikey").map(String::as_str) != Some("tm-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"fault": {"faultstring": "Invalid ApiKey"}})))
            .into_response();
    }
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let (id, name) = if page == 0 {
        ("tm-1", "Jazz Night")
    } else {
        ("tm-2", "Rock Night")
    };

    Json(json!({
        "_embedded": {"events": [{
            "id": id,
            "name": name,
            "url": format!("https://tickets.example/{id}"),
            "dates": {"start": {"localDate": "2025-06-14", "localTime": "20:00:00"}},
            "priceRanges": [{"min": 25.0, "max": 60.0, "currency": "EUR"}],
            "_embedded": {"venues": [{
                "name": "Kaserne",
                "city": {"name": "Basel"},
                "location": {"latitude": "47.5656", "longitude": "7.5936"}
            }]}
        }]},
        "page": {"size": 1, "totalElements": 2, "totalPages": 2, "number": page}
    }))
    .into_response()
}

async fn eventbrite(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer eb-token");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "INVALID_AUTH"}))).into_response();
    }

    Json(json!({
        "pagination": {"page_number": 1, "has_more_items": false},
        "events": [{
            "id": "eb-1",
            "name": {"text": "Riverside Yoga"},
            "start": {"local": "2025-06-14T08:00:00"},
            "is_free": true,
            "category": {"name": "Health & Outdoor"},
            "venue": {"name": "Rheinpark", "address": {"city": "Lörrach"}}
        }]
    }))
    .into_response()
}

async fn refresh_function(State(calls): State<Invocations>, Path(name): Path<String>) -> Response {
    calls.lock().unwrap().push(name.clone());
    if name == "fetch-places" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "places upstream down").into_response();
    }
    Json(json!({"success": true})).into_response()
}

async fn activities(
    headers: HeaderMap,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if headers.get("apikey").is_none() || table != "activities" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "No API key found"}))).into_response();
    }
    assert_eq!(params.get("order").map(String::as_str), Some("rating.desc"));

    Json(json!([
        {"id": "row-1", "title": "Tüllinger Hill Walk", "category": "outdoor", "location": "Tüllingen",
         "price_range": "free", "rating": 4.4, "coordinates": "(47.5951,7.6440)"},
        {"id": "row-2", "title": "Dreiländermuseum", "category": "indoor", "location": "Lörrach",
         "price_range": "budget", "rating": 4.2, "distance": 1.0}
    ]))
    .into_response()
}

async fn nominatim(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    assert!(headers.get("user-agent").is_some());
    match params.get("q").map(String::as_str) {
        Some("Riehen") => Json(json!([
            {"place_id": 7, "display_name": "Riehen, Basel-Stadt, Schweiz", "lat": "47.5788", "lon": "7.6468"}
        ]))
        .into_response(),
        Some("Broken") => (StatusCode::OK, "<html>not json</html>").into_response(),
        _ => Json(json!([])).into_response(),
    }
}

/// Serve every provider from one listener and return its base URL
async fn spawn_stub() -> (String, Invocations) {
    let calls: Invocations = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/forecast", get(forecast))
        .route("/events.json", get(ticketmaster))
        .route("/events/search/", get(eventbrite))
        .route("/functions/v1/{name}", post(refresh_function))
        .route("/rest/v1/{table}", get(activities))
        .route("/search", get(nominatim))
        .with_state(Arc::clone(&calls));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

fn stub_config(base: &str) -> CompassConfig {
    let mut config = CompassConfig::default();
    config.weather = provider_config(base, Some("ow-key"));
    config.ticketmaster = provider_config(base, Some("tm-key"));
    config.eventbrite = provider_config(base, Some("eb-token"));
    config.backend = BackendConfig {
        base_url: Some(base.to_string()),
        api_key: Some("anon-key".to_string()),
        ..BackendConfig::default()
    };
    config.geocoding = GeocodingConfig {
        base_url: base.to_string(),
        ..GeocodingConfig::default()
    };
    config.cache.enabled = false;
    config
}

#[tokio::test]
async fn test_openweather_forecast() {
    let (base, _) = spawn_stub().await;
    let client = OpenWeatherClient::new(&provider_config(&base, Some("ow-key"))).unwrap();

    let weather = client.fetch(&query()).await.unwrap();

    assert_eq!(weather.location, "Basel, CH");
    assert_eq!(weather.today.len(), 4);
    assert_eq!(weather.tomorrow.len(), 4);
    assert_eq!(weather.today[0].temperature_celsius, 18);
    assert_eq!(weather.today[0].condition, NormalizedCondition::Sunny);
    assert_eq!(weather.today[1].temperature_celsius, 23);
    assert_eq!(weather.tomorrow[0].condition, NormalizedCondition::Rainy);
    assert_eq!(weather.tomorrow[1].temperature_celsius, 0);
}

#[tokio::test]
async fn test_openweather_rejected_key_carries_status() {
    let (base, _) = spawn_stub().await;
    let client = OpenWeatherClient::new(&provider_config(&base, Some("wrong"))).unwrap();

    let error = client.fetch(&query()).await.unwrap_err();
    assert!(matches!(error, CompassError::Provider { .. }));
    assert_eq!(error.status(), Some(401));
}

#[tokio::test]
async fn test_ticketmaster_follows_pages() {
    let (base, _) = spawn_stub().await;
    let client = TicketmasterClient::new(&provider_config(&base, Some("tm-key")), 10).unwrap();

    let items = client.fetch(&query()).await.unwrap();

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["tm-1", "tm-2"]);
    assert_eq!(items[0].price_label.as_deref(), Some("€25"));
    assert_eq!(items[0].start_time.as_deref(), Some("2025-06-14T20:00:00"));
    assert!(items[0].distance_km.is_some_and(|d| d > 5.0 && d < 10.0));
}

#[tokio::test]
async fn test_ticketmaster_stops_at_max_results() {
    let (base, _) = spawn_stub().await;
    let client = TicketmasterClient::new(&provider_config(&base, Some("tm-key")), 1).unwrap();

    let items = client.fetch(&query()).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_ticketmaster_without_key_makes_no_request() {
    let (base, _) = spawn_stub().await;
    let client = TicketmasterClient::new(&provider_config(&base, None), 10).unwrap();

    assert!(matches!(
        client.fetch(&query()).await,
        Err(CompassError::Config { .. })
    ));
}

#[tokio::test]
async fn test_eventbrite_uses_bearer_token() {
    let (base, _) = spawn_stub().await;

    let client = EventbriteClient::new(&provider_config(&base, Some("eb-token")), 10).unwrap();
    let items = client.fetch(&query()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source, ItemSource::GenericEvent);
    assert_eq!(items[0].category, Category::Outdoor);
    assert_eq!(items[0].price_label.as_deref(), Some("Free"));

    let rejected = EventbriteClient::new(&provider_config(&base, Some("stale")), 10).unwrap();
    let error = rejected.fetch(&query()).await.unwrap_err();
    assert_eq!(error.status(), Some(401));
}

#[tokio::test]
async fn test_backend_refreshes_then_reads() {
    let (base, calls) = spawn_stub().await;
    let client = BackendActivityClient::new(&BackendConfig {
        base_url: Some(base.clone()),
        api_key: Some("anon-key".to_string()),
        ..BackendConfig::default()
    })
    .unwrap();

    let items = client.fetch(&query()).await.unwrap();

    // the failing fetch-places refresh does not abort the read
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["fetch-events", "fetch-komoot-activities", "fetch-places"]
    );
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Tüllinger Hill Walk");
    assert_eq!(items[0].price_label.as_deref(), Some("Free"));
    assert!(items[0].distance_km.is_some_and(|d| d < 5.0));
    assert_eq!(items[1].category, Category::Indoor);
    assert_eq!(items[1].price_label.as_deref(), Some("Budget"));
}

#[tokio::test]
async fn test_nominatim_geocoding() {
    let (base, _) = spawn_stub().await;
    let client = NominatimClient::new(&GeocodingConfig {
        base_url: base,
        ..GeocodingConfig::default()
    })
    .unwrap();

    let riehen = client.geocode("Riehen").await.unwrap();
    assert_eq!(riehen.name, "Riehen, Basel-Stadt, Schweiz");
    assert_eq!(riehen.coordinate, Coordinate::new(47.5788, 7.6468).unwrap());

    assert!(matches!(
        client.geocode("Atlantis").await,
        Err(CompassError::Validation { .. })
    ));

    let malformed = client.geocode("Broken").await.unwrap_err();
    assert!(matches!(malformed, CompassError::Provider { .. }));
}

#[tokio::test]
async fn test_session_against_stub_providers() {
    let (base, _) = spawn_stub().await;
    let mut config = stub_config(&base);
    config.eventbrite.api_key = None;
    let providers = ProviderSet::from_config(&config).unwrap();

    let session = DiscoverySession::new(providers, None, Duration::from_secs(5), 3);
    session.refresh(query()).wait().await;

    let sections = session.sections();
    assert_eq!(sections.activities, SourceStatus::Ready);
    assert_eq!(sections.ticketed_events, SourceStatus::Ready);
    assert!(matches!(sections.generic_events, SourceStatus::Failed { .. }));

    // five curated activities within 50 km, two backend rows, two concerts
    let view = session.view();
    assert_eq!(view.total_matching, 9);
    assert_eq!(view.items.len(), 3);
    assert!(view.has_more);
    assert_eq!(view.items[0].title, "Rhine River SUP Tour");
    assert_eq!(session.load_more().items.len(), 6);
    let view = session.load_more();
    assert_eq!(view.items.len(), 9);
    assert!(!view.has_more);
    assert_eq!(view.items[5].title, "Tüllinger Hill Walk");
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn stub_app() -> Router {
    let (base, _) = spawn_stub().await;
    let mut config = stub_config(&base);
    config.eventbrite.api_key = None;
    let providers = ProviderSet::from_config(&config).unwrap();
    web::app(AppState::new(config, providers, None).unwrap())
}

#[tokio::test]
async fn test_api_health() {
    let (status, body) = get_json(stub_app().await, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], leisure_compass::VERSION);
}

#[tokio::test]
async fn test_api_discover() {
    let app = stub_app().await;
    let (status, body) = get_json(
        app,
        "/api/discover?location=Riehen&date=2025-06-14&radius_km=50&page_size=10",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["name"], "Riehen, Basel-Stadt, Schweiz");
    assert_eq!(body["date"], "2025-06-14");
    assert_eq!(body["weather"]["status"]["state"], "ready");
    assert_eq!(body["weather"]["data"]["today"].as_array().unwrap().len(), 4);
    assert_eq!(body["sections"]["activities"]["state"], "ready");
    assert_eq!(body["sections"]["ticketed_events"]["state"], "ready");
    assert_eq!(body["sections"]["generic_events"]["state"], "failed");
    assert!(body["sections"]["generic_events"]["message"].is_string());
    assert_eq!(body["total_matching"], 9);
    assert_eq!(body["has_more"], false);

    let sources: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["source"].as_str().unwrap())
        .collect();
    let mut expected = vec!["activity"; 7];
    expected.extend(["ticketed_event", "ticketed_event"]);
    assert_eq!(sources, expected);
}

#[tokio::test]
async fn test_api_discover_filters() {
    let app = stub_app().await;
    let (status, body) = get_json(
        app,
        "/api/discover?location=47.6149,7.6647&date=2025-06-14&price_range=free",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Black Forest Hiking Trail", "Tüllinger Hill Walk"]);
}

#[tokio::test]
async fn test_api_geocode() {
    let app = stub_app().await;
    let (status, body) = get_json(app.clone(), "/api/geocode?q=Riehen").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Riehen, Basel-Stadt, Schweiz");

    let (status, body) = get_json(app.clone(), "/api/geocode?q=colmar").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Colmar");

    let (status, body) = get_json(app, "/api/geocode?q=Atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_api_rejects_bad_radius() {
    let (status, _) = get_json(stub_app().await, "/api/discover?radius_km=900").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
