use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::cache::PersistentCache;
use crate::config::CompassConfig;
use crate::providers::ProviderSet;

/// The full application: the API under `/api` with CORS and request tracing
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Open the snapshot cache; a cache that cannot be opened is skipped, not fatal
pub fn open_cache(config: &CompassConfig) -> Option<Arc<PersistentCache>> {
    if !config.cache.enabled {
        return None;
    }
    let ttl = Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600);
    match PersistentCache::open(&config.cache.location, ttl) {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!("Running without snapshot cache at {}: {}", config.cache.location, e);
            None
        }
    }
}

pub async fn run(config: CompassConfig) -> Result<()> {
    let providers = ProviderSet::from_config(&config).context("Failed to set up providers")?;
    let cache = open_cache(&config);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, providers, cache).context("Failed to set up geocoding")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{}", addr);
    axum::serve(listener, app(state))
        .await
        .context("Web server stopped unexpectedly")?;
    Ok(())
}
