//! Leisure Compass - regional leisure discovery
//!
//! Given a place and a date, gathers the weather, stored and curated
//! activities, and live events from several providers, and serves them as one
//! filterable list.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod geocoding;
pub mod location_resolver;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod session;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use cache::PersistentCache;
pub use config::CompassConfig;
pub use error::CompassError;
pub use location_resolver::{LocationInput, LocationParser, LocationResolver};
pub use models::{Coordinate, DisplayItem, FilterCriteria, Location, WeatherData};
pub use pipeline::{View, build_view, merge};
pub use providers::{ItemProvider, ProviderSet, SearchQuery};
pub use session::{DiscoverySession, SourceStatus};
pub use weather::WeatherProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CompassError>;
