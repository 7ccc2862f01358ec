//! Merge, filter and window the items of all sources into one display list

use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::models::{DisplayItem, FilterCriteria, ItemSource, PriceRange};

/// Concatenate activities, ticketed events and generic events in that order.
///
/// Items failing validation are dropped with a warning and the first
/// occurrence of each (source, id) pair wins.
#[must_use]
pub fn merge(
    activities: Vec<DisplayItem>,
    ticketed: Vec<DisplayItem>,
    generic: Vec<DisplayItem>,
) -> Vec<DisplayItem> {
    let mut seen: HashSet<(ItemSource, String)> = HashSet::new();
    let mut merged = Vec::with_capacity(activities.len() + ticketed.len() + generic.len());

    for item in activities.into_iter().chain(ticketed).chain(generic) {
        if let Err(e) = item.validate() {
            warn!("Dropping item: {}", e);
            continue;
        }
        let (source, id) = item.key();
        if seen.insert((source, id.to_owned())) {
            merged.push(item);
        }
    }
    merged
}

/// Whether an item satisfies every criterion
#[must_use]
pub fn passes(item: &DisplayItem, criteria: &FilterCriteria) -> bool {
    if !criteria.category.accepts(item.category) {
        return false;
    }
    if criteria.family_friendly && !item.family_friendly {
        return false;
    }
    // events are never distance-filtered
    if item.source == ItemSource::Activity
        && item
            .distance_km
            .is_some_and(|distance| distance > criteria.max_distance_km)
    {
        return false;
    }
    price_matches(item.price_label.as_deref(), criteria.price_range)
}

/// Bucket a price label. A missing label counts as free.
#[must_use]
pub fn price_matches(label: Option<&str>, range: PriceRange) -> bool {
    let label = label.unwrap_or("Free").to_lowercase();
    let free = label.contains("free");
    let price = first_number(&label);

    match range {
        PriceRange::All => true,
        PriceRange::Free => free,
        PriceRange::Budget => {
            label.contains("budget") || (!free && price.is_some_and(|p| p <= 30.0))
        }
        PriceRange::Premium => label.contains("premium") || price.is_some_and(|p| p >= 40.0),
    }
}

/// First decimal number in a label, e.g. 12.5 in "from €12.50"
fn first_number(label: &str) -> Option<f64> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let rest = &label[start..];
    let mut end = 0;
    let mut seen_separator = false;
    for (idx, c) in rest.char_indices() {
        if c.is_ascii_digit() {
            end = idx + 1;
        } else if (c == '.' || c == ',') && !seen_separator {
            seen_separator = true;
        } else {
            break;
        }
    }
    rest[..end].replace(',', ".").parse().ok()
}

/// The windowed result of a filter pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub items: Vec<DisplayItem>,
    /// Items matching the criteria before windowing
    pub total_matching: usize,
    pub has_more: bool,
}

impl View {
    /// Filter `items` and keep the first `page * page_size`; pages below 1 count as 1
    #[must_use]
    pub fn compute(items: &[DisplayItem], criteria: &FilterCriteria, page_size: usize, page: usize) -> Self {
        let matching: Vec<&DisplayItem> = items.iter().filter(|item| passes(item, criteria)).collect();
        let window = page.max(1).saturating_mul(page_size).min(matching.len());

        Self {
            total_matching: matching.len(),
            has_more: window < matching.len(),
            items: matching.into_iter().take(window).cloned().collect(),
        }
    }
}

/// The visible slice of `items` under `criteria` at `page`
#[must_use]
pub fn build_view(items: &[DisplayItem], criteria: &FilterCriteria, page_size: usize, page: usize) -> Vec<DisplayItem> {
    View::compute(items, criteria, page_size, page).items
}
