//! User filter criteria, passed by value into the pipeline on every recomputation

use serde::{Deserialize, Serialize};

use super::Category;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Outdoor,
    Indoor,
}

impl CategoryFilter {
    #[must_use]
    pub fn accepts(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Outdoor => category == Category::Outdoor,
            CategoryFilter::Indoor => category == Category::Indoor,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    #[default]
    All,
    Free,
    Budget,
    Premium,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct FilterCriteria {
    pub category: CategoryFilter,
    pub family_friendly: bool,
    /// Only enforced for activities
    pub max_distance_km: f64,
    pub price_range: PriceRange,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            category: CategoryFilter::All,
            family_friendly: false,
            max_distance_km: 50.0,
            price_range: PriceRange::All,
        }
    }
}
