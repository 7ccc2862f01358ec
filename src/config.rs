//! Configuration management for the Leisure Compass service
//!
//! Handles loading configuration from files and environment variables
//! and validates every setting before the service starts.

use crate::CompassError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompassConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Weather forecast provider
    pub weather: ProviderConfig,
    /// Ticketed events provider
    pub ticketmaster: ProviderConfig,
    /// Generic events provider
    pub eventbrite: ProviderConfig,
    /// Managed backend holding ingested activities
    pub backend: BackendConfig,
    /// Geocoding provider
    pub geocoding: GeocodingConfig,
    /// Fallback snapshot cache
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Default search settings
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings shared by the keyed third-party providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key or token; the adapter refuses to run without one
    pub api_key: Option<String>,
    /// Empty means the provider's public endpoint
    #[serde(default)]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL of the managed backend, e.g. `https://xyz.supabase.co`
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Table the activities are read from
    pub table: String,
    /// Order of the read-back: "rating" or "recency"
    pub order_by: String,
    /// Functions invoked to refresh the store before reading
    pub refresh_functions: Vec<String>,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    /// Nominatim rejects anonymous clients
    pub user_agent: String,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache TTL in hours
    pub ttl_hours: u32,
    /// Cache directory location
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Default search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in kilometers
    pub search_radius_km: u32,
    /// Upper bound of events fetched per provider
    pub max_results: u32,
    /// Items per "load more" step
    pub page_size: u32,
    /// Bound on a single adapter fetch
    pub fetch_timeout_seconds: u32,
}

// Default value functions
fn default_provider_timeout() -> u32 {
    10
}

fn default_weather() -> ProviderConfig {
    ProviderConfig {
        api_key: None,
        base_url: "https://api.openweathermap.org/data/2.5".to_string(),
        timeout_seconds: default_provider_timeout(),
    }
}

fn default_ticketmaster() -> ProviderConfig {
    ProviderConfig {
        api_key: None,
        base_url: "https://app.ticketmaster.com/discovery/v2".to_string(),
        timeout_seconds: default_provider_timeout(),
    }
}

fn default_eventbrite() -> ProviderConfig {
    ProviderConfig {
        api_key: None,
        base_url: "https://www.eventbriteapi.com/v3".to_string(),
        timeout_seconds: default_provider_timeout(),
    }
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("leisure-compass"))
        .unwrap_or_else(|| PathBuf::from(".cache/leisure-compass"))
        .to_string_lossy()
        .into_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            table: "activities".to_string(),
            order_by: "rating".to_string(),
            refresh_functions: vec![
                "fetch-events".to_string(),
                "fetch-komoot-activities".to_string(),
                "fetch-places".to_string(),
            ],
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("leisure-compass/{}", crate::VERSION),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 6,
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location_name: "Lörrach, Germany".to_string(),
            latitude: 47.6149,
            longitude: 7.6647,
            search_radius_km: 50,
            max_results: 20,
            page_size: 6,
            fetch_timeout_seconds: 15,
        }
    }
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            weather: default_weather(),
            ticketmaster: default_ticketmaster(),
            eventbrite: default_eventbrite(),
            backend: BackendConfig::default(),
            geocoding: GeocodingConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl CompassConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let path = env::var("COMPASS_CONFIG").ok().map(PathBuf::from);
        Self::load_from_path(path)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. COMPASS_TICKETMASTER__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("COMPASS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CompassConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.apply_conventional_keys();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("leisure-compass").join("config.toml"))
    }

    /// Apply default values to empty or zeroed fields
    pub fn apply_defaults(&mut self) {
        for (provider, fallback) in [
            (&mut self.weather, default_weather()),
            (&mut self.ticketmaster, default_ticketmaster()),
            (&mut self.eventbrite, default_eventbrite()),
        ] {
            if provider.base_url.is_empty() {
                provider.base_url = fallback.base_url;
            }
            if provider.timeout_seconds == 0 {
                provider.timeout_seconds = default_provider_timeout();
            }
            if provider.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
                provider.api_key = None;
            }
        }

        let defaults = DefaultsConfig::default();
        if self.defaults.search_radius_km == 0 {
            self.defaults.search_radius_km = defaults.search_radius_km;
        }
        if self.defaults.max_results == 0 {
            self.defaults.max_results = defaults.max_results;
        }
        if self.defaults.page_size == 0 {
            self.defaults.page_size = defaults.page_size;
        }
        if self.defaults.fetch_timeout_seconds == 0 {
            self.defaults.fetch_timeout_seconds = defaults.fetch_timeout_seconds;
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = CacheConfig::default().ttl_hours;
        }
        if self.logging.level.is_empty() {
            self.logging.level = LoggingConfig::default().level;
        }
        if self.logging.format.is_empty() {
            self.logging.format = LoggingConfig::default().format;
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = GeocodingConfig::default().user_agent;
        }
    }

    /// Fill missing credentials from the conventional provider variables
    pub fn apply_conventional_keys(&mut self) {
        let fill = |slot: &mut Option<String>, var: &str| {
            if slot.is_none() {
                *slot = env::var(var).ok().filter(|value| !value.trim().is_empty());
            }
        };
        fill(&mut self.weather.api_key, "OPENWEATHERMAP_API_KEY");
        fill(&mut self.ticketmaster.api_key, "TICKETMASTER_API_KEY");
        fill(&mut self.eventbrite.api_key, "EVENTBRITE_TOKEN");
        fill(&mut self.backend.api_key, "BACKEND_API_KEY");
        fill(&mut self.backend.base_url, "BACKEND_URL");
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            ("weather", self.weather.timeout_seconds),
            ("ticketmaster", self.ticketmaster.timeout_seconds),
            ("eventbrite", self.eventbrite.timeout_seconds),
            ("backend", self.backend.timeout_seconds),
            ("geocoding", self.geocoding.timeout_seconds),
            ("fetch", self.defaults.fetch_timeout_seconds),
        ];
        for (name, seconds) in timeouts {
            if seconds > 300 {
                return Err(
                    CompassError::config(format!("{name} timeout cannot exceed 300 seconds")).into(),
                );
            }
        }

        if self.cache.ttl_hours > 168 {
            return Err(CompassError::config("Cache TTL cannot exceed 168 hours (1 week)").into());
        }

        if self.defaults.search_radius_km > 500 {
            return Err(CompassError::config("Search radius cannot exceed 500 km").into());
        }

        if self.defaults.max_results > 200 {
            return Err(CompassError::config("Maximum results cannot exceed 200").into());
        }

        if self.defaults.page_size > 100 {
            return Err(CompassError::config("Page size cannot exceed 100").into());
        }

        if crate::models::Coordinate::new(self.defaults.latitude, self.defaults.longitude).is_none() {
            return Err(CompassError::config(format!(
                "Default location coordinates are out of range: {}, {}",
                self.defaults.latitude, self.defaults.longitude
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CompassError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(CompassError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_orders = ["rating", "recency"];
        if !valid_orders.contains(&self.backend.order_by.as_str()) {
            return Err(CompassError::config(format!(
                "Invalid backend order '{}'. Must be one of: {}",
                self.backend.order_by,
                valid_orders.join(", ")
            ))
            .into());
        }

        let urls = [
            ("weather", Some(self.weather.base_url.as_str())),
            ("ticketmaster", Some(self.ticketmaster.base_url.as_str())),
            ("eventbrite", Some(self.eventbrite.base_url.as_str())),
            ("geocoding", Some(self.geocoding.base_url.as_str())),
            ("backend", self.backend.base_url.as_deref()),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(CompassError::config(format!(
                        "{name} base URL must be a valid HTTP or HTTPS URL"
                    ))
                    .into());
                }
            }
        }

        Ok(())
    }
}
