//! Multi-facet analytics rollup behind `GET /api/bus/analytics`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use transit_map_ridership_models::{
    AnalyticsFilter, AnalyticsReport, Breakdown, CountTotals, Dropdowns, GroupKey, Kpis,
    RidershipRecord, natural_cmp,
};

use crate::RidershipTable;
use crate::group::{self, Group};

/// Busiest routes listed in [`AnalyticsReport::top_routes`].
pub const TOP_ROUTES: usize = 15;

/// Least efficient routes listed in [`AnalyticsReport::bottom_routes`].
pub const BOTTOM_ROUTES: usize = 5;

/// Placeholder for leader fields when no operator qualifies.
pub const NOT_AVAILABLE: &str = "N/A";

impl RidershipTable {
    /// Builds the analytics rollup over the rows passing `filter`.
    #[must_use]
    pub fn analytics(&self, filter: &AnalyticsFilter) -> AnalyticsReport {
        let rows: Vec<&RidershipRecord> =
            self.records().iter().filter(|r| filter.matches(r)).collect();

        let companies = group::by_operator(rows.iter().copied());
        let routes = group::by_route(rows.iter().copied());
        let hours = group::by_hour(rows.iter().copied());

        let kpis = kpis(&rows, &companies, &hours);

        let by_company: Vec<Breakdown> = companies
            .iter()
            .map(|(name, g)| breakdown(GroupKey::Operator(name.clone()), g, false))
            .collect();
        let by_route: Vec<Breakdown> = routes
            .iter()
            .map(|(key, g)| breakdown(GroupKey::Route(key.0.clone()), g, true))
            .collect();
        let by_hour: Vec<Breakdown> = hours
            .iter()
            .map(|(hour, g)| breakdown(GroupKey::Hour(*hour), g, false))
            .collect();

        let mut top_routes = by_route.clone();
        top_routes.sort_by(|a, b| b.totals.total_count.cmp(&a.totals.total_count));
        top_routes.truncate(TOP_ROUTES);

        let mut bottom_routes: Vec<Breakdown> = by_route
            .iter()
            .filter(|r| r.pass_per_bus.is_some())
            .cloned()
            .collect();
        bottom_routes.sort_by(|a, b| cmp_ratio(a.pass_per_bus, b.pass_per_bus));
        bottom_routes.truncate(BOTTOM_ROUTES);

        AnalyticsReport {
            kpis,
            by_company,
            by_route,
            by_hour,
            top_routes,
            bottom_routes,
            dropdowns: dropdowns(&rows),
        }
    }
}

fn breakdown(key: GroupKey, group: &Group, with_operator: bool) -> Breakdown {
    Breakdown {
        key,
        totals: group.totals,
        operator: if with_operator {
            group.first_operator.clone()
        } else {
            None
        },
        pass_per_bus: group.totals.pass_per_bus(),
    }
}

fn kpis(
    rows: &[&RidershipRecord],
    companies: &BTreeMap<String, Group>,
    hours: &BTreeMap<u8, Group>,
) -> Kpis {
    let mut totals = CountTotals::default();
    for row in rows {
        totals.add(row);
    }

    let avg_pass_per_bus = totals
        .pass_per_bus()
        .map_or(0.0, |ratio| (ratio * 10.0).round() / 10.0);

    // Strictly greater keeps the lowest hour when several tie.
    let peak_hour = hours
        .iter()
        .fold(None::<(u8, u64)>, |best, (hour, g)| match best {
            Some((_, count)) if g.totals.total_count <= count => best,
            _ => Some((*hour, g.totals.total_count)),
        })
        .map_or(0, |(hour, _)| hour);

    Kpis {
        total_passengers: totals.total_count,
        total_buses: totals.bus_count,
        avg_pass_per_bus,
        peak_hour,
        most_efficient_company: leader(companies, CountTotals::pass_per_bus),
        payment_leader: leader(companies, CountTotals::smartcard_pct),
    }
}

/// Name of the group with the largest `metric`, first by key on ties.
fn leader(
    groups: &BTreeMap<String, Group>,
    metric: impl Fn(&CountTotals) -> Option<f64>,
) -> String {
    groups
        .iter()
        .filter_map(|(name, g)| metric(&g.totals).map(|value| (name, value)))
        .fold(None::<(&String, f64)>, |best, (name, value)| match best {
            Some((_, top)) if value <= top => best,
            _ => Some((name, value)),
        })
        .map_or_else(|| NOT_AVAILABLE.to_string(), |(name, _)| name.clone())
}

fn cmp_ratio(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn dropdowns(rows: &[&RidershipRecord]) -> Dropdowns {
    let companies: BTreeSet<&str> = rows.iter().map(|r| r.operator.as_str()).collect();
    let hours: BTreeSet<u8> = rows.iter().map(|r| r.hour).collect();
    let dates: BTreeSet<_> = rows.iter().map(|r| r.date).collect();

    let mut routes: Vec<String> = rows
        .iter()
        .map(|r| r.route.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    routes.sort_by(|a, b| natural_cmp(a, b));

    Dropdowns {
        companies: companies.into_iter().map(str::to_string).collect(),
        routes,
        hours: hours.into_iter().collect(),
        dates: dates
            .into_iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
    }
}
