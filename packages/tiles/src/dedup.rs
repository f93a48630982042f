//! Set-membership filter for features repeated across overlapping tiles.

use std::collections::BTreeSet;

use crate::LatLon;

/// Decimal places positions are rounded to before comparison.
///
/// Five places is roughly one metre at Baku's latitude, well below the
/// spacing of distinct labelled features.
pub const KEY_PRECISION: i32 = 5;

/// Remembers `(rounded lat, rounded lon, label)` keys and rejects repeats.
///
/// First occurrence wins; there is no ordering or tie-break beyond that.
#[derive(Debug, Default)]
pub struct FeatureDeduplicator {
    seen: BTreeSet<(i64, i64, String)>,
}

impl FeatureDeduplicator {
    /// Creates an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the feature and returns `true` if it had not been seen.
    pub fn insert(&mut self, position: LatLon, label: &str) -> bool {
        self.seen.insert(key(position, label))
    }

    /// Number of distinct features recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn key(position: LatLon, label: &str) -> (i64, i64, String) {
    let scale = 10f64.powi(KEY_PRECISION);
    (
        (position.lat * scale).round() as i64,
        (position.lon * scale).round() as i64,
        label.to_owned(),
    )
}
