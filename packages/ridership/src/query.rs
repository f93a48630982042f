//! Listing, summary and rollup queries.

use std::collections::BTreeSet;

use transit_map_ridership_models::{
    DateRange, GroupKey, Listing, OperatorRollup, RecordFilter, RidershipStats, RouteRollup,
    VolumeGrouping, VolumeRow,
};

use crate::group::{self, Group};
use crate::{Page, RidershipTable};

/// Routes returned by [`RidershipTable::top_routes`].
pub const TOP_ROUTES_LIMIT: usize = 20;

impl RidershipTable {
    /// Filters rows and returns one page of them in file order, with the
    /// number of matching rows.
    #[must_use]
    pub fn list(&self, filter: &RecordFilter, page: Page) -> Listing {
        let matching: Vec<_> = self.records().iter().filter(|r| filter.matches(r)).collect();
        let total = matching.len();
        let data = matching
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect();

        Listing { data, total }
    }

    /// First and last service day.
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        let dates = self.records().iter().map(|r| r.date);
        DateRange {
            start: dates.clone().min(),
            end: dates.max(),
        }
    }

    /// Whole-table summary.
    #[must_use]
    pub fn stats(&self) -> RidershipStats {
        let routes: BTreeSet<&str> = self.records().iter().map(|r| r.route.as_str()).collect();

        let mut operators: Vec<String> = Vec::new();
        for record in self.records() {
            if !operators.contains(&record.operator) {
                operators.push(record.operator.clone());
            }
        }

        RidershipStats {
            total_records: self.len(),
            date_range: self.date_range(),
            routes_count: routes.len(),
            operators,
            total_passengers: self.records().iter().map(|r| r.total_count).sum(),
        }
    }

    /// The [`TOP_ROUTES_LIMIT`] busiest routes with their first operator.
    #[must_use]
    pub fn top_routes(&self) -> Vec<RouteRollup> {
        let mut routes: Vec<RouteRollup> = group::by_route(self.records())
            .into_iter()
            .map(|(key, group)| RouteRollup {
                route: key.0,
                total_count: group.totals.total_count,
                bus_count: group.totals.bus_count,
                operator: group.first_operator.unwrap_or_default(),
            })
            .collect();

        routes.sort_by(|a, b| b.total_count.cmp(&a.total_count));
        routes.truncate(TOP_ROUTES_LIMIT);
        routes
    }

    /// Passenger and bus totals per operator, ordered by operator name.
    #[must_use]
    pub fn operators(&self) -> Vec<OperatorRollup> {
        group::by_operator(self.records())
            .into_iter()
            .map(|(operator, group)| OperatorRollup {
                operator,
                total_passengers: group.totals.total_count,
                total_buses: group.totals.bus_count,
            })
            .collect()
    }

    /// Summed counters grouped by the chosen column, ordered by key.
    #[must_use]
    pub fn volume(&self, grouping: VolumeGrouping) -> Vec<VolumeRow> {
        let records = self.records();
        match grouping {
            VolumeGrouping::Route => volume_rows(group::by_route(records), GroupKey::from),
            VolumeGrouping::Hour => volume_rows(group::by_hour(records), GroupKey::Hour),
            VolumeGrouping::Operator => {
                volume_rows(group::by_operator(records), GroupKey::Operator)
            }
        }
    }

    /// Per-hour counters, optionally restricted to one route.
    #[must_use]
    pub fn hourly_trend(&self, route: Option<&str>) -> Vec<VolumeRow> {
        let records = self
            .records()
            .iter()
            .filter(|r| route.is_none_or(|route| r.route == route));
        volume_rows(group::by_hour(records), GroupKey::Hour)
    }
}

fn volume_rows<K>(
    groups: impl IntoIterator<Item = (K, Group)>,
    to_key: impl Fn(K) -> GroupKey,
) -> Vec<VolumeRow> {
    groups
        .into_iter()
        .map(|(key, group)| VolumeRow {
            key: to_key(key),
            totals: group.totals,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use transit_map_ridership_models::CountTotals;

    use super::*;
    use crate::fixtures;

    #[test]
    fn list_filters_then_pages() {
        let table = fixtures::table();
        let filter = RecordFilter {
            route: Some("10".to_string()),
            ..RecordFilter::default()
        };

        let listing = table.list(&filter, Page::new(Some(2), Some(1)).unwrap());
        assert_eq!(listing.total, 3);
        assert_eq!(listing.data.len(), 2);
        assert_eq!(listing.data[0].hour, 8);
        assert_eq!(listing.data[1].hour, 9);
    }

    #[test]
    fn list_offset_past_end_is_empty() {
        let table = fixtures::table();
        let listing = table.list(
            &RecordFilter::default(),
            Page::new(None, Some(100)).unwrap(),
        );
        assert_eq!(listing.total, 6);
        assert!(listing.data.is_empty());
    }

    #[test]
    fn list_by_operator_and_date() {
        let table = fixtures::table();
        let filter = RecordFilter {
            operator: Some("Sahil".to_string()),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 2),
            ..RecordFilter::default()
        };
        let listing = table.list(&filter, Page::default());
        assert_eq!(listing.total, 1);
        assert_eq!(listing.data[0].total_count, 60);
    }

    #[test]
    fn stats_summarise_table() {
        let stats = fixtures::table().stats();
        assert_eq!(stats.total_records, 6);
        assert_eq!(stats.routes_count, 3);
        assert_eq!(stats.operators, vec!["BakuBus", "Sahil", "Ekspress"]);
        assert_eq!(stats.total_passengers, 590);
        assert_eq!(stats.date_range.start, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.date_range.end, NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn stats_on_empty_table() {
        let stats = RidershipTable::default().stats();
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.date_range, DateRange::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["date_range"]["start"].is_null());
    }

    #[test]
    fn top_routes_sorted_by_passengers() {
        let routes = fixtures::table().top_routes();
        let order: Vec<&str> = routes.iter().map(|r| r.route.as_str()).collect();
        assert_eq!(order, vec!["10", "2", "A1"]);
        assert_eq!(routes[1].operator, "Sahil");
        assert_eq!(routes[1].total_count, 150);
    }

    #[test]
    fn operators_rollup() {
        let operators = fixtures::table().operators();
        assert_eq!(operators.len(), 3);
        assert_eq!(operators[0].operator, "BakuBus");
        assert_eq!(operators[0].total_passengers, 400);
        assert_eq!(operators[0].total_buses, 9);
    }

    #[test]
    fn volume_by_hour() {
        let rows = fixtures::table().volume(VolumeGrouping::Hour);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].key, GroupKey::Hour(8));
        assert_eq!(
            rows[1].totals,
            CountTotals {
                total_count: 330,
                by_smartcard: 250,
                by_qr: 80,
                bus_count: 10,
            }
        );
        let json = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(json["Hour"], 8);
        assert_eq!(json["By QR"], 80);
    }

    #[test]
    fn hourly_trend_for_one_route() {
        let rows = fixtures::table().hourly_trend(Some("2"));
        let hours: Vec<GroupKey> = rows.into_iter().map(|r| r.key).collect();
        assert_eq!(hours, vec![GroupKey::Hour(7), GroupKey::Hour(8)]);
    }
}
