use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::airports::AirportDirectory;
use crate::availability::{AggregatedDayRoute, RawAvailabilityRecord};
use crate::cabin::CabinClass;
use crate::route::Route;

// ============================================================================
// Filter primitives
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

/// A multi-value selection with include/exclude semantics.
/// An empty selection never restricts anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionFilter {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub values: BTreeSet<String>,
}

impl SelectionFilter {
    pub fn include<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Include,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exclude<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Exclude,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }

    /// Single-valued field.
    pub fn matches_one(&self, value: &str) -> bool {
        if self.values.is_empty() {
            return true;
        }
        match self.mode {
            FilterMode::Include => self.values.contains(value),
            FilterMode::Exclude => !self.values.contains(value),
        }
    }

    /// Multi-valued field: include keeps the record if any value is selected,
    /// exclude drops it only when every value is excluded. A record with no
    /// values fails a non-empty include and survives exclude.
    pub fn matches_any<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.values.is_empty() {
            return true;
        }
        let mut values = values.into_iter().peekable();
        match self.mode {
            FilterMode::Include => values.any(|v| self.values.contains(v)),
            FilterMode::Exclude => {
                values.peek().is_none() || values.any(|v| !self.values.contains(v))
            }
        }
    }

    fn toggle(&self, value: &str) -> Self {
        let mut next = self.clone();
        if !next.values.remove(value) {
            next.values.insert(value.to_string());
        }
        next
    }
}

/// Inclusive mileage window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRange {
    pub min: u64,
    pub max: u64,
}

impl PointsRange {
    pub fn contains(&self, cost: Option<u64>) -> bool {
        cost.is_some_and(|c| self.min <= c && c <= self.max)
    }
}

// ============================================================================
// Filter state and reducer
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub segments: SelectionFilter,
    pub classes: BTreeSet<CabinClass>,
    pub direct_only: bool,
    pub sources: SelectionFilter,
    pub airlines: SelectionFilter,
    pub points: Option<PointsRange>,
    pub dates: BTreeSet<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterAction {
    SetSegmentMode(FilterMode),
    ToggleSegment(String),
    ToggleClass(CabinClass),
    SetClasses(BTreeSet<CabinClass>),
    SetDirectOnly(bool),
    SetSourceMode(FilterMode),
    ToggleSource(String),
    SetAirlineMode(FilterMode),
    ToggleAirline(String),
    SetPoints(Option<PointsRange>),
    ToggleDate(NaiveDate),
    ClearDates,
    Reset,
}

impl FilterState {
    /// Produce the next state for a UI action. The receiver is left untouched.
    pub fn apply(&self, action: FilterAction) -> FilterState {
        let mut next = self.clone();
        match action {
            FilterAction::SetSegmentMode(mode) => next.segments.mode = mode,
            FilterAction::ToggleSegment(route) => {
                next.segments = self.segments.toggle(&route.trim().to_uppercase())
            }
            FilterAction::ToggleClass(class) => {
                if !next.classes.remove(&class) {
                    next.classes.insert(class);
                }
            }
            FilterAction::SetClasses(classes) => next.classes = classes,
            FilterAction::SetDirectOnly(direct) => next.direct_only = direct,
            FilterAction::SetSourceMode(mode) => next.sources.mode = mode,
            FilterAction::ToggleSource(source) => next.sources = self.sources.toggle(source.trim()),
            FilterAction::SetAirlineMode(mode) => next.airlines.mode = mode,
            FilterAction::ToggleAirline(airline) => {
                next.airlines = self.airlines.toggle(&airline.trim().to_uppercase())
            }
            FilterAction::SetPoints(range) => {
                // a reversed window from a slider drag is normalised
                next.points = range.map(|r| PointsRange {
                    min: r.min.min(r.max),
                    max: r.min.max(r.max),
                })
            }
            FilterAction::ToggleDate(date) => {
                if !next.dates.remove(&date) {
                    next.dates.insert(date);
                }
            }
            FilterAction::ClearDates => next.dates.clear(),
            FilterAction::Reset => next = FilterState::default(),
        }
        next
    }

    fn class_selected(&self, class: CabinClass) -> bool {
        self.classes.is_empty() || self.classes.contains(&class)
    }

    fn date_selected(&self, date: NaiveDate) -> bool {
        self.dates.is_empty() || self.dates.contains(&date)
    }

    /// Coarse pass over an aggregated route/day: segment, date, class and
    /// source filters against the OR'd flags.
    pub fn matches_route(&self, entry: &AggregatedDayRoute) -> bool {
        if !self.segments.matches_one(&entry.route) || !self.date_selected(entry.date) {
            return false;
        }

        entry.classes.iter().any(|(class, summary)| {
            self.class_selected(*class)
                && summary.available
                && (!self.direct_only || summary.direct)
                && self
                    .sources
                    .matches_any(summary.sources.iter().map(String::as_str))
        })
    }

    /// Fine pass over a single contributing record in one cabin.
    pub fn matches_flight(&self, record: &RawAvailabilityRecord, class: CabinClass) -> bool {
        if !self.class_selected(class) || !self.date_selected(record.date) {
            return false;
        }
        if !self.segments.matches_one(&record.route()) {
            return false;
        }
        if !self.sources.matches_one(&record.source) {
            return false;
        }
        let Some(cabin) = record.cabin(class) else {
            return false;
        };
        if !cabin.available || (self.direct_only && !cabin.direct) {
            return false;
        }
        if !self.airlines.matches_any(cabin.airlines_for(self.direct_only)) {
            return false;
        }
        match &self.points {
            Some(range) => range.contains(cabin.cost_for(self.direct_only)),
            None => true,
        }
    }
}

// ============================================================================
// Additional (scoped) filter groups
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterScope {
    /// Origin set x destination set; codes may be group codes. An empty side matches anything.
    Group {
        #[serde(default)]
        origins: BTreeSet<String>,
        #[serde(default)]
        destinations: BTreeSet<String>,
    },
    /// Explicit `ORIGIN-DEST` pairs.
    Segments { routes: BTreeSet<String> },
}

impl FilterScope {
    pub fn covers(&self, route: &str, directory: &AirportDirectory) -> bool {
        match self {
            FilterScope::Group { origins, destinations } => {
                let Ok(route) = route.parse::<Route>() else {
                    return false;
                };
                side_covers(origins, &route.origin, directory)
                    && side_covers(destinations, &route.destination, directory)
            }
            FilterScope::Segments { routes } => routes.contains(route),
        }
    }
}

fn side_covers(codes: &BTreeSet<String>, airport: &str, directory: &AirportDirectory) -> bool {
    codes.is_empty()
        || codes
            .iter()
            .any(|code| directory.expand_segment(code).contains(airport))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalFilter {
    pub name: String,
    pub scope: FilterScope,
    #[serde(default)]
    pub filters: FilterState,
}

/// The global filter plus any number of scoped groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub global: FilterState,
    pub additional: Vec<AdditionalFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSetAction {
    Global { action: FilterAction },
    AddGroup { name: String, scope: FilterScope },
    RemoveGroup { index: usize },
    UpdateGroup { index: usize, action: FilterAction },
    ClearGroups,
}

impl FilterSet {
    pub fn apply(&self, action: FilterSetAction) -> FilterSet {
        let mut next = self.clone();
        match action {
            FilterSetAction::Global { action } => next.global = self.global.apply(action),
            FilterSetAction::AddGroup { name, scope } => next.additional.push(AdditionalFilter {
                name,
                scope,
                filters: FilterState::default(),
            }),
            FilterSetAction::RemoveGroup { index } => {
                if index < next.additional.len() {
                    next.additional.remove(index);
                }
            }
            FilterSetAction::UpdateGroup { index, action } => {
                if let Some(group) = next.additional.get_mut(index) {
                    group.filters = group.filters.apply(action);
                }
            }
            FilterSetAction::ClearGroups => next.additional.clear(),
        }
        next
    }

    /// Groups whose scope covers the route.
    pub fn groups_for<'a>(
        &'a self,
        route: &'a str,
        directory: &'a AirportDirectory,
    ) -> impl Iterator<Item = &'a AdditionalFilter> + 'a {
        self.additional
            .iter()
            .filter(move |g| g.scope.covers(route, directory))
    }

    /// Route-level gate: global AND (no groups OR any covering group).
    pub fn matches_route(&self, entry: &AggregatedDayRoute, directory: &AirportDirectory) -> bool {
        if !self.global.matches_route(entry) {
            return false;
        }
        self.additional.is_empty()
            || self
                .groups_for(&entry.route, directory)
                .any(|g| g.filters.matches_route(entry))
    }

    /// Flight-level gate with the same combination rule.
    pub fn matches_flight(
        &self,
        record: &RawAvailabilityRecord,
        class: CabinClass,
        directory: &AirportDirectory,
    ) -> bool {
        self.admitted_direct_only(record, class, directory).is_some()
    }

    /// Whether an admitted flight should be read as direct service.
    ///
    /// `None` when the flight is filtered out. Otherwise `Some(true)` if the
    /// global filter or the first covering group that admits it is
    /// direct-only, since that filter checked the direct cost and airlines.
    pub fn admitted_direct_only(
        &self,
        record: &RawAvailabilityRecord,
        class: CabinClass,
        directory: &AirportDirectory,
    ) -> Option<bool> {
        if !self.global.matches_flight(record, class) {
            return None;
        }
        if self.additional.is_empty() {
            return Some(self.global.direct_only);
        }
        let route = record.route();
        let matched = self
            .groups_for(&route, directory)
            .find(|g| g.filters.matches_flight(record, class))
            .map(|g| self.global.direct_only || g.filters.direct_only);
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::CabinAvailability;
    use std::collections::BTreeMap;

    fn record(source: &str, airlines: &str, cost: u64) -> RawAvailabilityRecord {
        let mut cabins = BTreeMap::new();
        cabins.insert(
            CabinClass::Business,
            CabinAvailability {
                available: true,
                direct: false,
                airlines: airlines.to_string(),
                mileage_cost: Some(cost),
                ..Default::default()
            },
        );
        RawAvailabilityRecord {
            id: "r1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 28).unwrap(),
            origin_airport: "LHR".to_string(),
            destination_airport: "EWR".to_string(),
            source: source.to_string(),
            taxes_currency: Some("GBP".to_string()),
            cabins,
        }
    }

    #[test]
    fn test_exclude_airlines_removes_only_when_all_excluded() {
        let flight = record("aeroplan", "AA,BA", 60000);
        let state = FilterState {
            airlines: SelectionFilter::exclude(["AA"]),
            ..Default::default()
        };
        assert!(state.matches_flight(&flight, CabinClass::Business));

        let state = FilterState {
            airlines: SelectionFilter::exclude(["AA", "BA"]),
            ..Default::default()
        };
        assert!(!state.matches_flight(&flight, CabinClass::Business));
    }

    #[test]
    fn test_include_airlines_any_match() {
        let flight = record("aeroplan", "AA,BA", 60000);
        let state = FilterState {
            airlines: SelectionFilter::include(["BA", "LH"]),
            ..Default::default()
        };
        assert!(state.matches_flight(&flight, CabinClass::Business));
        let state = FilterState {
            airlines: SelectionFilter::include(["LH"]),
            ..Default::default()
        };
        assert!(!state.matches_flight(&flight, CabinClass::Business));
    }

    #[test]
    fn test_source_include_semantics() {
        let empty = SelectionFilter::include(Vec::<String>::new());
        assert!(empty.matches_one("aeroplan"));
        assert!(empty.matches_one("united"));

        let aeroplan = SelectionFilter::include(["aeroplan"]);
        assert!(aeroplan.matches_one("aeroplan"));
        assert!(!aeroplan.matches_one("united"));
    }

    #[test]
    fn test_exclude_on_empty_set_is_noop() {
        let filter = SelectionFilter::exclude(Vec::<String>::new());
        assert!(filter.matches_one("anything"));
        assert!(filter.matches_any(["AA"]));
    }

    #[test]
    fn test_empty_airline_list() {
        assert!(SelectionFilter::exclude(["AA"]).matches_any(std::iter::empty()));
        assert!(!SelectionFilter::include(["AA"]).matches_any(std::iter::empty()));
    }

    #[test]
    fn test_points_range() {
        let flight = record("aeroplan", "AC", 40000);
        let state = FilterState {
            points: Some(PointsRange { min: 50000, max: 100000 }),
            ..Default::default()
        };
        assert!(!state.matches_flight(&flight, CabinClass::Business));
        assert!(!PointsRange { min: 0, max: 10 }.contains(None));
    }

    #[test]
    fn test_class_filter_rejects_unselected_cabin() {
        let flight = record("aeroplan", "AC", 40000);
        let state = FilterState::default().apply(FilterAction::ToggleClass(CabinClass::First));
        assert!(!state.matches_flight(&flight, CabinClass::Business));
    }

    #[test]
    fn test_reducer_is_pure() {
        let initial = FilterState::default();
        let next = initial
            .apply(FilterAction::ToggleSource("aeroplan".to_string()))
            .apply(FilterAction::SetSourceMode(FilterMode::Exclude))
            .apply(FilterAction::SetPoints(Some(PointsRange { min: 90000, max: 10000 })));

        assert_eq!(initial, FilterState::default());
        assert_eq!(next.sources.mode, FilterMode::Exclude);
        assert!(next.sources.values.contains("aeroplan"));
        assert_eq!(next.points, Some(PointsRange { min: 10000, max: 90000 }));

        let toggled_off = next.apply(FilterAction::ToggleSource("aeroplan".to_string()));
        assert!(toggled_off.sources.values.is_empty());
        assert_eq!(toggled_off.apply(FilterAction::Reset), FilterState::default());
    }

    #[test]
    fn test_group_scope_expands_codes() {
        let mut groups = std::collections::HashMap::new();
        groups.insert("NYC".to_string(), "JFK/EWR".to_string());
        let dir = AirportDirectory::new(Vec::new(), groups);

        let scope = FilterScope::Group {
            origins: ["LHR".to_string()].into_iter().collect(),
            destinations: ["NYC".to_string()].into_iter().collect(),
        };
        assert!(scope.covers("LHR-EWR", &dir));
        assert!(!scope.covers("LHR-SFO", &dir));
        assert!(!scope.covers("CDG-JFK", &dir));

        let wildcard = FilterScope::Group {
            origins: BTreeSet::new(),
            destinations: ["SFO".to_string()].into_iter().collect(),
        };
        assert!(wildcard.covers("LHR-SFO", &dir));
    }

    #[test]
    fn test_filter_set_group_actions() {
        let set = FilterSet::default()
            .apply(FilterSetAction::AddGroup {
                name: "transatlantic".to_string(),
                scope: FilterScope::Segments {
                    routes: ["LHR-EWR".to_string()].into_iter().collect(),
                },
            })
            .apply(FilterSetAction::UpdateGroup {
                index: 0,
                action: FilterAction::SetDirectOnly(true),
            });
        assert_eq!(set.additional.len(), 1);
        assert!(set.additional[0].filters.direct_only);

        let removed = set.apply(FilterSetAction::RemoveGroup { index: 3 });
        assert_eq!(removed.additional.len(), 1);
        assert!(removed.apply(FilterSetAction::ClearGroups).additional.is_empty());
    }

    #[test]
    fn test_flight_must_match_a_covering_group() {
        let dir = AirportDirectory::default();
        let flight = record("aeroplan", "AC", 40000);
        let set = FilterSet {
            global: FilterState::default(),
            additional: vec![AdditionalFilter {
                name: "other".to_string(),
                scope: FilterScope::Segments {
                    routes: ["CDG-JFK".to_string()].into_iter().collect(),
                },
                filters: FilterState::default(),
            }],
        };
        assert!(!set.matches_flight(&flight, CabinClass::Business, &dir));

        let covering = set.apply(FilterSetAction::AddGroup {
            name: "lhr".to_string(),
            scope: FilterScope::Segments {
                routes: ["LHR-EWR".to_string()].into_iter().collect(),
            },
        });
        assert!(covering.matches_flight(&flight, CabinClass::Business, &dir));
    }
}
