//! Error types and handling for the Leisure Compass service

use thiserror::Error;

/// Main error type for the Leisure Compass service
#[derive(Error, Debug)]
pub enum CompassError {
    /// Missing or invalid configuration, e.g. an absent API key
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A provider answered with a non-success status, a malformed body, or timed out
    #[error("{provider} error{}: {message}", status_suffix(.status))]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Input or item validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl CompassError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<P: Into<String>, S: Into<String>>(
        provider: P,
        status: Option<u16>,
        message: S,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Status code reported by a provider, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CompassError::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CompassError::Config { .. } => {
                "This source is not configured. Please check your config file and API keys."
                    .to_string()
            }
            CompassError::Provider { provider, .. } => {
                format!("Couldn't load data from {provider}. Please try again later.")
            }
            CompassError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            CompassError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            CompassError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl CompassError {
    /// Wrap a transport-level failure as an error of the named provider
    pub fn from_transport(provider: &str, err: &reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_decode() {
            format!("malformed response: {err}")
        } else {
            err.to_string()
        };
        CompassError::provider(provider, status, message)
    }
}
