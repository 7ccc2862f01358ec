//! Built-in regional activities around the Upper Rhine
//!
//! Always listed ahead of the backend rows, and served alone when the
//! backend is unavailable and no snapshot is cached. Distances are measured
//! from Lörrach.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ItemProvider, SearchQuery};
use crate::CompassError;
use crate::models::{Category, DisplayItem, ItemSource};

struct Curated {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    category: Category,
    location: &'static str,
    distance_km: f64,
    price: &'static str,
    family_friendly: bool,
    rating: f32,
}

const CURATED: [Curated; 6] = [
    Curated {
        id: "1",
        title: "Rhine River SUP Tour",
        description: "Stand-up paddleboarding along the Rhine with views of the Black Forest.",
        category: Category::Outdoor,
        location: "Rheinfelden",
        distance_km: 12.0,
        price: "€45",
        family_friendly: true,
        rating: 4.8,
    },
    Curated {
        id: "2",
        title: "Vitra Design Museum",
        description: "Design exhibitions in the Frank Gehry building in Weil am Rhein.",
        category: Category::Indoor,
        location: "Weil am Rhein",
        distance_km: 8.0,
        price: "€16",
        family_friendly: true,
        rating: 4.6,
    },
    Curated {
        id: "3",
        title: "Black Forest Hiking Trail",
        description: "Forest trail with waterfalls and panoramic viewpoints.",
        category: Category::Outdoor,
        location: "Todtnau",
        distance_km: 35.0,
        price: "Free",
        family_friendly: true,
        rating: 4.9,
    },
    Curated {
        id: "4",
        title: "Basel Jazz Festival",
        description: "Weekend jazz performances in the heart of Basel.",
        category: Category::Indoor,
        location: "Basel, Switzerland",
        distance_km: 15.0,
        price: "€35",
        family_friendly: false,
        rating: 4.7,
    },
    Curated {
        id: "5",
        title: "Lake Schluchsee Swimming",
        description: "Clear mountain lake with sandy beaches.",
        category: Category::Outdoor,
        location: "Schluchsee",
        distance_km: 45.0,
        price: "€8",
        family_friendly: true,
        rating: 4.5,
    },
    Curated {
        id: "6",
        title: "Europa-Park Indoor Areas",
        description: "Covered rides and shows at Germany's largest theme park.",
        category: Category::Indoor,
        location: "Rust",
        distance_km: 60.0,
        price: "€56",
        family_friendly: true,
        rating: 4.9,
    },
];

/// The curated activity set as display items
#[must_use]
pub fn curated_activities() -> Vec<DisplayItem> {
    CURATED
        .iter()
        .map(|entry| {
            let mut item = DisplayItem::activity(entry.id, entry.title, entry.category)
                .at(entry.location, entry.location)
                .with_distance(Some(entry.distance_km))
                .with_price(entry.price)
                .family_friendly(entry.family_friendly);
            item.description = Some(entry.description.to_string());
            item.rating = Some(entry.rating);
            item
        })
        .collect()
}

/// Provider serving the curated set regardless of query
#[derive(Debug, Default, Clone, Copy)]
pub struct CuratedActivities;

#[async_trait]
impl ItemProvider for CuratedActivities {
    fn name(&self) -> &'static str {
        "curated"
    }

    fn source(&self) -> ItemSource {
        ItemSource::Activity
    }

    async fn fetch(&self, _query: &SearchQuery) -> Result<Vec<DisplayItem>, CompassError> {
        Ok(curated_activities())
    }
}

/// Activities of another provider, preceded by the curated set.
///
/// A failure of the wrapped provider is passed on so the session can fall
/// back to its snapshot first.
pub struct WithCurated {
    curated: CuratedActivities,
    inner: Arc<dyn ItemProvider>,
}

impl WithCurated {
    #[must_use]
    pub fn new(inner: Arc<dyn ItemProvider>) -> Self {
        Self {
            curated: CuratedActivities,
            inner,
        }
    }
}

#[async_trait]
impl ItemProvider for WithCurated {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn source(&self) -> ItemSource {
        ItemSource::Activity
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<DisplayItem>, CompassError> {
        let mut items = self.curated.fetch(query).await?;
        items.extend(self.inner.fetch(query).await?);
        Ok(items)
    }
}
