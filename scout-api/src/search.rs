use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use scout_client::{SearchMode, SearchOutcome, SearchPhase, SearchRequest, SearchSession};
use scout_core::calendar::month_grid;
use scout_core::filter::FilterSet;
use scout_core::route::{expand_path, generate_permutations, reverse_path};
use scout_core::view::CalendarView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CalendarSearchBody {
    #[serde(flatten)]
    pub request: SearchRequest,
    #[serde(default)]
    pub filters: FilterSet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSearchResponse {
    pub path: String,
    pub valid_routes: BTreeSet<String>,
    pub record_count: usize,
    pub calendar: CalendarView,
}

#[derive(Debug, Deserialize)]
pub struct RoutesParams {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: BTreeSet<String>,
    pub expanded: String,
    pub reversed: String,
}

#[derive(Debug, Serialize)]
pub struct MonthResponse {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[Option<NaiveDate>; 7]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyBody {
    pub api_key: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/search", post(search_calendar))
        .route("/v1/routes", get(route_permutations))
        .route("/v1/calendar/{year}/{month}", get(calendar_month))
        .route("/v1/api-key", put(save_api_key))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "OK"
}

/// POST /v1/search
/// Run an availability search and return the filtered calendar
pub async fn search_calendar(
    State(state): State<AppState>,
    Json(body): Json<CalendarSearchBody>,
) -> Result<Json<CalendarSearchResponse>, AppError> {
    if body.request.mode != SearchMode::Standard {
        return Err(AppError::validation("UA searches go through /v1/ua/search"));
    }

    let mut session = SearchSession::new(state.api.clone(), state.directory.clone())
        .with_default_sources(state.default_sources.clone());
    session.submit(&body.request).await;

    if let Some((field, message)) = session.field_errors().iter().next() {
        return Err(AppError::ValidationError {
            field: Some(field.clone()),
            message: message.clone(),
        });
    }

    match session.into_phase() {
        SearchPhase::Success(SearchOutcome::Calendar(result)) => {
            let calendar = result.view(&body.filters, &state.directory);
            Ok(Json(CalendarSearchResponse {
                path: result.path,
                valid_routes: result.valid_routes,
                record_count: result.records.len(),
                calendar,
            }))
        }
        SearchPhase::Error(err) => Err(err.into()),
        other => Err(AppError::InternalServerError(format!(
            "search ended in unexpected phase {:?}",
            other
        ))),
    }
}

/// GET /v1/routes?path=NYC-LHR
pub async fn route_permutations(
    State(state): State<AppState>,
    Query(params): Query<RoutesParams>,
) -> Json<RoutesResponse> {
    Json(RoutesResponse {
        routes: generate_permutations(&params.path, &state.directory),
        expanded: expand_path(&params.path, &state.directory),
        reversed: reverse_path(&params.path),
    })
}

/// GET /v1/calendar/{year}/{month}
pub async fn calendar_month(
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<MonthResponse>, AppError> {
    let weeks = month_grid(year, month)?;
    Ok(Json(MonthResponse { year, month, weeks }))
}

/// PUT /v1/api-key
pub async fn save_api_key(
    State(state): State<AppState>,
    Json(body): Json<ApiKeyBody>,
) -> Result<StatusCode, AppError> {
    if body.api_key.trim().is_empty() {
        return Err(AppError::ValidationError {
            field: Some("apiKey".to_string()),
            message: "API key must not be empty".to_string(),
        });
    }
    state.store.set_api_key(&body.api_key)?;
    tracing::info!("Partner API key updated");
    Ok(StatusCode::NO_CONTENT)
}
