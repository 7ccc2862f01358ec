//! Mapping of free-text provider conditions onto [`NormalizedCondition`]

use crate::models::NormalizedCondition;

/// Keyword groups in priority order
const RULES: &[(&[&str], NormalizedCondition)] = &[
    (&["sun", "clear"], NormalizedCondition::Sunny),
    (&["rain", "shower", "drizzle"], NormalizedCondition::Rainy),
    (&["snow"], NormalizedCondition::Snowy),
    (&["cloud", "overcast", "fog", "mist"], NormalizedCondition::Cloudy),
];

/// Normalize an arbitrary, case-insensitive provider string such as "light rain".
///
/// Groups are tested in the order sunny, rainy, snowy, cloudy and the first
/// match wins. Unrecognized text maps to cloudy.
#[must_use]
pub fn normalize(raw: &str) -> NormalizedCondition {
    let text = raw.to_lowercase();

    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| text.contains(needle)))
        .map_or(NormalizedCondition::Cloudy, |&(_, condition)| condition)
}
