use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use scout_client::currency::price_itineraries;
use scout_client::{
    AccessGrant, SearchMode, SearchOutcome, SearchPhase, SearchRequest, SearchSession,
};
use scout_core::calendar::Page;
use scout_core::itinerary::{query_table, ItineraryRow, TableQuery};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UaSearchBody {
    pub path: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub query: TableQuery,
}

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
    pub code: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/ua/search", post(search_itineraries))
        .route("/v1/ua/access", post(redeem_access))
}

/// POST /v1/ua/search
/// UA route search rendered as a priced, sorted, paginated table
pub async fn search_itineraries(
    State(state): State<AppState>,
    Json(body): Json<UaSearchBody>,
) -> Result<Json<Page<ItineraryRow>>, AppError> {
    let request = SearchRequest {
        path: body.path,
        start_date: body.start_date,
        end_date: body.end_date,
        sources: Vec::new(),
        mode: SearchMode::UaDirect,
    };

    let mut session = SearchSession::new(state.api.clone(), state.directory.clone())
        .with_access_gate(state.access_gate());
    session.submit(&request).await;

    if let Some((field, message)) = session.field_errors().iter().next() {
        return Err(AppError::ValidationError {
            field: Some(field.clone()),
            message: message.clone(),
        });
    }

    let rows = match session.into_phase() {
        SearchPhase::Success(SearchOutcome::Itineraries(rows)) => rows,
        SearchPhase::Error(err) => return Err(err.into()),
        other => {
            return Err(AppError::InternalServerError(format!(
                "UA search ended in unexpected phase {:?}",
                other
            )))
        }
    };

    let rate = state.cloud.rate_config().await?;
    let today = Utc::now().date_naive();
    let priced = price_itineraries(rows, &rate, state.converter.as_ref(), today).await?;

    Ok(Json(query_table(&priced, &body.query)))
}

/// POST /v1/ua/access
pub async fn redeem_access(
    State(state): State<AppState>,
    Json(body): Json<RedeemBody>,
) -> Result<Json<AccessGrant>, AppError> {
    let codes = state.cloud.access_codes().await?;
    let grant = state.access_gate().redeem(&body.code, &codes, Utc::now())?;
    Ok(Json(grant))
}
