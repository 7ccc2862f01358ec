//! Location Resolution Module
//!
//! Turns user input (literal coordinates, a known regional place, or free
//! text) into a [`Location`] to search around.

use tracing::debug;

use crate::CompassError;
use crate::geocoding::NominatimClient;
use crate::models::{Coordinate, Location};

/// Places offered as suggestions, matched case-insensitively by name
const KNOWN_PLACES: [(&str, &str, f64, f64); 6] = [
    ("Lörrach", "Germany", 47.6149, 7.6647),
    ("Basel", "Switzerland", 47.5596, 7.5886),
    ("Freiburg", "Germany", 47.9990, 7.8421),
    ("Strasbourg", "France", 48.5734, 7.7521),
    ("Colmar", "France", 48.0792, 7.3585),
    ("Baden-Baden", "Germany", 48.7606, 8.2398),
];

/// Parsed location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(Coordinate),
    Known(Location),
    Name(String),
}

pub struct LocationParser;

impl LocationParser {
    /// Classify raw input without any network access
    pub fn parse(input: &str) -> Result<LocationInput, CompassError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CompassError::validation("location must not be empty"));
        }

        if let Some(coordinate) = Self::parse_coordinates(input) {
            return Ok(LocationInput::Coordinates(coordinate));
        }

        if let Some(location) = known_place(input) {
            return Ok(LocationInput::Known(location));
        }

        Ok(LocationInput::Name(input.to_string()))
    }

    /// Parse "lat,lon" or "lat lon"; out-of-range values are not coordinates
    fn parse_coordinates(input: &str) -> Option<Coordinate> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        match parts.as_slice() {
            [lat, lon] => Coordinate::parse(Some(*lat), Some(*lon)),
            _ => None,
        }
    }
}

/// Look up one of the suggested places
#[must_use]
pub fn known_place(name: &str) -> Option<Location> {
    let name = name.trim();
    KNOWN_PLACES
        .iter()
        .find(|(known, ..)| known.to_lowercase() == name.to_lowercase())
        .and_then(|&(known, country, lat, lon)| {
            Coordinate::new(lat, lon).map(|c| Location::with_country(known, c, country))
        })
}

/// Names of the suggested places, in display order
#[must_use]
pub fn suggestions() -> Vec<&'static str> {
    KNOWN_PLACES.iter().map(|(name, ..)| *name).collect()
}

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    pub async fn resolve(geocoder: &NominatimClient, input: &str) -> Result<Location, CompassError> {
        let location = match LocationParser::parse(input)? {
            LocationInput::Coordinates(coordinate) => {
                Location::new(coordinate.format_coordinates(), coordinate)
            }
            LocationInput::Known(location) => location,
            LocationInput::Name(name) => {
                debug!("Geocoding location name: {}", name);
                geocoder.geocode(&name).await?
            }
        };

        debug!(
            "Resolved location: {} at {}",
            location.name,
            location.coordinate.format_coordinates()
        );
        Ok(location)
    }
}
