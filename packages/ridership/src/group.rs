//! Group-by helpers shared by the rollup queries.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use transit_map_ridership_models::{CountTotals, GroupKey, RidershipRecord, natural_cmp};

/// Route identifier ordered numerically where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey(pub String);

impl Ord for RouteKey {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for RouteKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Summed counters plus the first operator seen for a group.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub totals: CountTotals,
    pub first_operator: Option<String>,
}

impl Group {
    fn add(&mut self, record: &RidershipRecord) {
        self.totals.add(record);
        if self.first_operator.is_none() {
            self.first_operator = Some(record.operator.clone());
        }
    }
}

pub fn by_route<'a>(
    records: impl IntoIterator<Item = &'a RidershipRecord>,
) -> BTreeMap<RouteKey, Group> {
    fold(records, |r| RouteKey(r.route.clone()))
}

pub fn by_hour<'a>(records: impl IntoIterator<Item = &'a RidershipRecord>) -> BTreeMap<u8, Group> {
    fold(records, |r| r.hour)
}

pub fn by_operator<'a>(
    records: impl IntoIterator<Item = &'a RidershipRecord>,
) -> BTreeMap<String, Group> {
    fold(records, |r| r.operator.clone())
}

fn fold<'a, K: Ord>(
    records: impl IntoIterator<Item = &'a RidershipRecord>,
    key: impl Fn(&RidershipRecord) -> K,
) -> BTreeMap<K, Group> {
    let mut groups: BTreeMap<K, Group> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().add(record);
    }
    groups
}

impl From<RouteKey> for GroupKey {
    fn from(key: RouteKey) -> Self {
        Self::Route(key.0)
    }
}
