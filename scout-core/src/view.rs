//! Filtered calendar view: the boundary between filter state and what a
//! calendar cell or its detail overlay shows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::airports::AirportDirectory;
use crate::availability::{AggregatedAvailability, RecordIndex};
use crate::cabin::CabinClass;
use crate::filter::FilterSet;

/// Detail for one surviving flight option, as shown in a cell overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDetail {
    pub id: String,
    pub source: String,
    pub direct: bool,
    pub mileage_cost: Option<u64>,
    pub total_taxes: Option<f64>,
    pub taxes_currency: Option<String>,
    pub airlines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibleClass {
    pub available: bool,
    pub direct: bool,
    pub sources: BTreeSet<String>,
    pub flights: Vec<FlightDetail>,
}

impl VisibleClass {
    /// Cheapest surviving option, for the badge label.
    pub fn lowest_cost(&self) -> Option<u64> {
        self.flights.iter().filter_map(|f| f.mileage_cost).min()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleRoute {
    pub route: String,
    pub classes: BTreeMap<CabinClass, VisibleClass>,
}

pub type CalendarView = BTreeMap<NaiveDate, Vec<VisibleRoute>>;

/// Apply the filter set to aggregated availability.
///
/// Runs the coarse route-level pass first, then re-checks every contributing
/// record against the flight-level predicates. A cabin is shown only if at
/// least one flight survives, and a route/day with no surviving cabin is
/// dropped even when its aggregate flags say available.
pub fn filter_view(
    aggregated: &AggregatedAvailability,
    index: &RecordIndex<'_>,
    valid_routes: &BTreeSet<String>,
    filters: &FilterSet,
    directory: &AirportDirectory,
) -> CalendarView {
    let mut view = CalendarView::new();

    for (date, routes) in aggregated {
        let mut visible = Vec::new();

        for (route, entry) in routes {
            if !valid_routes.contains(route) || !filters.matches_route(entry, directory) {
                continue;
            }

            let mut classes = BTreeMap::new();
            for (class, summary) in &entry.classes {
                let flights: Vec<FlightDetail> = summary
                    .flights
                    .iter()
                    .filter_map(|flight| index.get(&flight.id))
                    .filter_map(|record| {
                        // show the cost and carriers the admitting filter judged
                        let direct_only = filters.admitted_direct_only(record, *class, directory)?;
                        let cabin = record.cabin(*class)?;
                        Some(FlightDetail {
                            id: record.id.clone(),
                            source: record.source.clone(),
                            direct: cabin.direct,
                            mileage_cost: cabin.cost_for(direct_only),
                            total_taxes: cabin.taxes_for(direct_only),
                            taxes_currency: record.taxes_currency.clone(),
                            airlines: cabin
                                .airlines_for(direct_only)
                                .into_iter()
                                .map(str::to_string)
                                .collect(),
                        })
                    })
                    .collect();

                if flights.is_empty() {
                    continue;
                }

                classes.insert(
                    *class,
                    VisibleClass {
                        available: true,
                        direct: flights.iter().any(|f| f.direct),
                        sources: flights
                            .iter()
                            .filter(|f| !f.source.is_empty())
                            .map(|f| f.source.clone())
                            .collect(),
                        flights,
                    },
                );
            }

            if !classes.is_empty() {
                visible.push(VisibleRoute {
                    route: route.clone(),
                    classes,
                });
            }
        }

        if !visible.is_empty() {
            view.insert(*date, visible);
        }
    }

    tracing::debug!(days = view.len(), "Computed filtered calendar view");
    view
}
