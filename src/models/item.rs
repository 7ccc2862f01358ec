//! Unified activity/event record shown to the user

use serde::{Deserialize, Serialize};

use crate::error::CompassError;

/// Which adapter produced an item
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Curated or backend-stored activity
    Activity,
    /// Event from the ticketing provider
    TicketedEvent,
    /// Event from the generic events provider
    GenericEvent,
}

impl ItemSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Activity => "activity",
            ItemSource::TicketedEvent => "ticketed_event",
            ItemSource::GenericEvent => "generic_event",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Outdoor,
    Indoor,
}

/// One activity or event, converted from its provider's shape at the adapter boundary
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DisplayItem {
    pub source: ItemSource,
    /// Unique within `source`
    pub id: String,
    pub title: String,
    /// Venue name or free-text location
    pub venue: String,
    pub city: String,
    /// ISO-8601 start, date-only for some providers
    pub start_time: Option<String>,
    pub distance_km: Option<f64>,
    pub category: Category,
    pub family_friendly: bool,
    pub url: Option<String>,
    pub price_label: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f32>,
}

impl DisplayItem {
    fn base(source: ItemSource, id: impl Into<String>, title: impl Into<String>, category: Category) -> Self {
        Self {
            source,
            id: id.into(),
            title: title.into(),
            venue: String::new(),
            city: String::new(),
            start_time: None,
            distance_km: None,
            category,
            family_friendly: false,
            url: None,
            price_label: None,
            description: None,
            image_url: None,
            rating: None,
        }
    }

    /// A curated or stored activity; distance defaults to 0 until known
    #[must_use]
    pub fn activity(id: impl Into<String>, title: impl Into<String>, category: Category) -> Self {
        Self {
            distance_km: Some(0.0),
            ..Self::base(ItemSource::Activity, id, title, category)
        }
    }

    /// An event from the ticketing provider
    #[must_use]
    pub fn ticketed_event(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::base(ItemSource::TicketedEvent, id, title, Category::Indoor)
    }

    /// An event from the generic events provider
    #[must_use]
    pub fn generic_event(id: impl Into<String>, title: impl Into<String>, category: Category) -> Self {
        Self::base(ItemSource::GenericEvent, id, title, category)
    }

    #[must_use]
    pub fn at(mut self, venue: impl Into<String>, city: impl Into<String>) -> Self {
        self.venue = venue.into();
        self.city = city.into();
        self
    }

    #[must_use]
    pub fn with_distance(mut self, distance_km: Option<f64>) -> Self {
        self.distance_km = distance_km.map(|d| d.max(0.0));
        self
    }

    #[must_use]
    pub fn with_price(mut self, price_label: impl Into<String>) -> Self {
        self.price_label = Some(price_label.into());
        self
    }

    #[must_use]
    pub fn family_friendly(mut self, family_friendly: bool) -> Self {
        self.family_friendly = family_friendly;
        self
    }

    #[must_use]
    pub fn starting(mut self, start_time: Option<String>) -> Self {
        self.start_time = start_time.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn linked(mut self, url: Option<String>) -> Self {
        self.url = url.filter(|s| !s.is_empty());
        self
    }

    /// Key used for deduplication across refreshes
    #[must_use]
    pub fn key(&self) -> (ItemSource, &str) {
        (self.source, self.id.as_str())
    }

    /// Reject items the pipeline cannot address
    pub fn validate(&self) -> Result<(), CompassError> {
        if self.id.trim().is_empty() {
            return Err(CompassError::validation(format!(
                "{} item '{}' has no id",
                self.source.as_str(),
                self.title
            )));
        }
        Ok(())
    }
}
