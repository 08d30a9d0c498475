use chrono::{NaiveDate, Utc};
use futures_util::future::try_join_all;
use scout_core::airports::AirportDirectory;
use scout_core::availability::{
    aggregate_routes, parse_records, AggregatedAvailability, RawAvailabilityRecord, RecordIndex,
};
use scout_core::filter::FilterSet;
use scout_core::itinerary::{flatten_itineraries, ItineraryRow};
use scout_core::route::{
    contains_group, contains_interior_group, expand_path, generate_permutations, split_path,
};
use scout_core::view::{filter_view, CalendarView};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::access::AccessGate;
use crate::api::{AvailabilityApi, AvailabilityQuery, RouteSearchQuery, RouteSearchType};
use crate::ClientError;

// ============================================================================
// Request / outcome types
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Standard,
    /// UA route-search; a single airport is enough.
    UaDirect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub path: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub mode: SearchMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("Search failed: {message}")]
    Network { message: String },
    #[error("Access has expired, redeem a new code")]
    ExpiredAccess,
}

impl From<ClientError> for SearchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ExpiredAccess | ClientError::InvalidAccessCode => {
                SearchError::ExpiredAccess
            }
            other => SearchError::Network {
                message: other.to_string(),
            },
        }
    }
}

/// Calendar search result: the raw records plus their aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarResult {
    pub path: String,
    pub records: Vec<RawAvailabilityRecord>,
    pub valid_routes: BTreeSet<String>,
    pub aggregated: AggregatedAvailability,
}

impl CalendarResult {
    pub fn view(&self, filters: &FilterSet, directory: &AirportDirectory) -> CalendarView {
        let index = RecordIndex::new(&self.records);
        filter_view(&self.aggregated, &index, &self.valid_routes, filters, directory)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SearchOutcome {
    Calendar(CalendarResult),
    Itineraries(Vec<ItineraryRow>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Success(SearchOutcome),
    Error(SearchError),
}

// ============================================================================
// Session
// ============================================================================

/// Owns one search lifecycle: `Idle -> Loading -> Success | Error`.
///
/// There is no cancellation; a later `submit` simply replaces the phase
/// once it resolves.
pub struct SearchSession {
    api: Arc<dyn AvailabilityApi>,
    directory: Arc<AirportDirectory>,
    access: Option<AccessGate>,
    default_sources: Vec<String>,
    phase: SearchPhase,
    field_errors: BTreeMap<String, String>,
}

impl SearchSession {
    pub fn new(api: Arc<dyn AvailabilityApi>, directory: Arc<AirportDirectory>) -> Self {
        Self {
            api,
            directory,
            access: None,
            default_sources: Vec::new(),
            phase: SearchPhase::Idle,
            field_errors: BTreeMap::new(),
        }
    }

    pub fn with_access_gate(mut self, gate: AccessGate) -> Self {
        self.access = Some(gate);
        self
    }

    pub fn with_default_sources(mut self, sources: Vec<String>) -> Self {
        self.default_sources = sources;
        self
    }

    pub fn phase(&self) -> &SearchPhase {
        &self.phase
    }

    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn into_phase(self) -> SearchPhase {
        self.phase
    }

    pub fn validate(&self, request: &SearchRequest) -> Result<(), SearchError> {
        let segments = split_path(&request.path);
        if segments.is_empty() {
            return Err(field_error("path", "Enter a route path"));
        }
        if request.mode == SearchMode::Standard && segments.len() < 2 {
            return Err(field_error(
                "path",
                "A path needs at least two airports separated by '-'",
            ));
        }
        if request.end_date < request.start_date {
            return Err(field_error("endDate", "End date must not be before the start date"));
        }
        Ok(())
    }

    /// Requests needed for a standard search.
    ///
    /// Paths with a group strictly inside the path are split into one request
    /// per adjacent segment pair; every other path goes out as one request
    /// with its groups expanded.
    pub fn plan(&self, request: &SearchRequest) -> Vec<AvailabilityQuery> {
        let sources = if request.sources.is_empty() {
            self.default_sources.join(",")
        } else {
            request.sources.join(",")
        };
        let query = |route_id: String| AvailabilityQuery {
            route_id,
            start_date: request.start_date,
            end_date: request.end_date,
            sources: sources.clone(),
        };

        let path = &request.path;
        let segments = split_path(path);

        if contains_interior_group(path, &self.directory) {
            segments
                .windows(2)
                .map(|pair| query(expand_path(&pair.join("-"), &self.directory)))
                .collect()
        } else if contains_group(path, &self.directory) {
            vec![query(expand_path(path, &self.directory))]
        } else {
            vec![query(segments.join("-"))]
        }
    }

    pub async fn submit(&mut self, request: &SearchRequest) -> &SearchPhase {
        self.field_errors.clear();

        if let Err(err) = self.validate(request) {
            if let SearchError::Validation { field, message } = err {
                self.field_errors.insert(field, message);
            }
            self.phase = SearchPhase::Idle;
            return &self.phase;
        }

        self.phase = SearchPhase::Loading;
        let result = match request.mode {
            SearchMode::Standard => self.run_calendar(request).await,
            SearchMode::UaDirect => self.run_route_search(request).await,
        };

        self.phase = match result {
            Ok(outcome) => SearchPhase::Success(outcome),
            Err(err) => {
                tracing::error!(path = %request.path, "Search failed: {}", err);
                SearchPhase::Error(err)
            }
        };
        &self.phase
    }

    async fn run_calendar(&self, request: &SearchRequest) -> Result<SearchOutcome, SearchError> {
        let queries = self.plan(request);
        tracing::info!(
            path = %request.path,
            requests = queries.len(),
            "Running availability search"
        );

        // all-or-nothing: the first failure fails the whole search
        let payloads = try_join_all(queries.iter().map(|q| self.api.fetch_availability(q))).await?;

        let records: Vec<RawAvailabilityRecord> = payloads.iter().flat_map(parse_records).collect();
        let valid_routes = generate_permutations(&request.path, &self.directory);
        let aggregated = aggregate_routes(&records, &valid_routes);

        tracing::info!(
            records = records.len(),
            days = aggregated.len(),
            "Availability search complete"
        );
        Ok(SearchOutcome::Calendar(CalendarResult {
            path: request.path.clone(),
            records,
            valid_routes,
            aggregated,
        }))
    }

    async fn run_route_search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchOutcome, SearchError> {
        let gate = self.access.as_ref().ok_or(SearchError::ExpiredAccess)?;
        gate.ensure_valid(Utc::now())?;

        let segments = split_path(&request.path);
        let origins = self.directory.expand_segment(&segments[0]);
        let queries: Vec<RouteSearchQuery> = origins
            .into_iter()
            .map(|airport| RouteSearchQuery {
                search_type: RouteSearchType::Origin,
                airport,
                start_date: request.start_date,
                end_date: request.end_date,
            })
            .collect();

        let payloads = try_join_all(queries.iter().map(|q| self.api.route_search(q))).await?;
        let mut rows: Vec<ItineraryRow> = payloads.iter().flat_map(flatten_itineraries).collect();

        if let Some(destination) = segments.get(1) {
            let destinations = self.directory.expand_segment(destination);
            rows.retain(|row| destinations.contains(&row.destination));
        }

        tracing::info!(rows = rows.len(), "UA route search complete");
        Ok(SearchOutcome::Itineraries(rows))
    }
}

fn field_error(field: &str, message: &str) -> SearchError {
    SearchError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct NoopApi;

    #[async_trait::async_trait]
    impl AvailabilityApi for NoopApi {
        async fn fetch_availability(
            &self,
            _query: &AvailabilityQuery,
        ) -> crate::ClientResult<serde_json::Value> {
            Ok(serde_json::json!([]))
        }

        async fn route_search(
            &self,
            _query: &RouteSearchQuery,
        ) -> crate::ClientResult<serde_json::Value> {
            Ok(serde_json::json!([]))
        }
    }

    fn session() -> SearchSession {
        let mut groups = HashMap::new();
        groups.insert("NYC".to_string(), "JFK/EWR".to_string());
        groups.insert("EUR".to_string(), "LHR/CDG".to_string());
        let directory = Arc::new(AirportDirectory::new(Vec::new(), groups));
        SearchSession::new(Arc::new(NoopApi), directory)
            .with_default_sources(vec!["aeroplan".to_string(), "united".to_string()])
    }

    fn request(path: &str) -> SearchRequest {
        SearchRequest {
            path: path.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            sources: Vec::new(),
            mode: SearchMode::Standard,
        }
    }

    #[test]
    fn test_plan_already_expanded_path() {
        let plan = session().plan(&request("SFO-NRT/HND"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].route_id, "SFO-NRT/HND");
        assert_eq!(plan[0].sources, "aeroplan,united");
    }

    #[test]
    fn test_plan_single_leg_group_is_expanded() {
        let plan = session().plan(&request("NYC-LHR"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].route_id, "EWR/JFK-LHR");
    }

    #[test]
    fn test_plan_interior_group_splits_per_leg() {
        let plan = session().plan(&request("NYC-EUR-DOH"));
        let ids: Vec<_> = plan.iter().map(|q| q.route_id.as_str()).collect();
        assert_eq!(ids, vec!["EWR/JFK-CDG/LHR", "CDG/LHR-DOH"]);
    }

    #[test]
    fn test_explicit_sources_override_defaults() {
        let mut req = request("SFO-NRT");
        req.sources = vec!["alaska".to_string()];
        assert_eq!(session().plan(&req)[0].sources, "alaska");
    }

    #[tokio::test]
    async fn test_validation_keeps_session_idle() {
        let mut session = session();
        assert_eq!(session.submit(&request("  ")).await, &SearchPhase::Idle);
        assert!(session.field_errors().contains_key("path"));

        assert_eq!(session.submit(&request("SFO")).await, &SearchPhase::Idle);

        let mut reversed = request("SFO-NRT");
        reversed.end_date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        session.submit(&reversed).await;
        assert!(session.field_errors().contains_key("endDate"));
    }

    #[tokio::test]
    async fn test_ua_mode_without_gate_is_expired() {
        let mut session = session();
        let mut req = request("SFO");
        req.mode = SearchMode::UaDirect;
        let phase = session.submit(&req).await;
        assert_eq!(phase, &SearchPhase::Error(SearchError::ExpiredAccess));
    }
}
