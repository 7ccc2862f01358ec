//! Weather model: normalized conditions and four-slot day forecasts

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closed set of conditions every provider string is mapped onto
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NormalizedCondition {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

/// Fixed slots a day is split into, in display order
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Noon,
    Afternoon,
    Evening,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::Morning,
        DayPart::Noon,
        DayPart::Afternoon,
        DayPart::Evening,
    ];
}

/// Weather for one slot of a day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherPeriod {
    pub label: DayPart,
    /// Temperature in Celsius, rounded to whole degrees
    pub temperature_celsius: i32,
    pub condition: NormalizedCondition,
}

impl WeatherPeriod {
    /// Zero-degree cloudy filler for slots the provider did not cover
    #[must_use]
    pub fn placeholder(label: DayPart) -> Self {
        Self {
            label,
            temperature_celsius: 0,
            condition: NormalizedCondition::Cloudy,
        }
    }
}

/// Forecast for the selected date and the day after
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherData {
    /// Place label, e.g. "Lörrach, DE"
    pub location: String,
    pub date: NaiveDate,
    pub today: Vec<WeatherPeriod>,
    pub tomorrow: Vec<WeatherPeriod>,
}

/// Lay provider entries onto the four day parts, padding missing slots.
///
/// Entries past the fourth are ignored; the result always has exactly four periods.
#[must_use]
pub fn fill_day_parts(entries: &[(i32, NormalizedCondition)]) -> Vec<WeatherPeriod> {
    DayPart::ALL
        .iter()
        .enumerate()
        .map(|(slot, &label)| match entries.get(slot) {
            Some(&(temperature_celsius, condition)) => WeatherPeriod {
                label,
                temperature_celsius,
                condition,
            },
            None => WeatherPeriod::placeholder(label),
        })
        .collect()
}
