//! Data models for the Leisure Compass service
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates and resolved places
//! - Weather: normalized conditions and day-part forecasts
//! - Item: the unified activity/event record
//! - Filter: user filter criteria

pub mod filter;
pub mod item;
pub mod location;
pub mod weather;

// Re-export all public types for convenient access
pub use filter::{CategoryFilter, FilterCriteria, PriceRange};
pub use item::{Category, DisplayItem, ItemSource};
pub use location::{Coordinate, Location};
pub use weather::{DayPart, NormalizedCondition, WeatherData, WeatherPeriod, fill_day_parts};
