use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::local_store::LocalStore;
use crate::{ClientError, ClientResult};

pub const PARTNER_AUTH_HEADER: &str = "Partner-Authorization";

/// Body of `POST /api/availability-v2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub route_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Comma-joined program codenames
    pub sources: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSearchType {
    Origin,
    Destination,
}

impl RouteSearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteSearchType::Origin => "origin",
            RouteSearchType::Destination => "destination",
        }
    }
}

/// Query of `GET /api/route-search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSearchQuery {
    pub search_type: RouteSearchType,
    pub airport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Remote availability backend.
#[async_trait]
pub trait AvailabilityApi: Send + Sync {
    /// Raw `availability-v2` payload; normally an array of records.
    async fn fetch_availability(&self, query: &AvailabilityQuery) -> ClientResult<Value>;

    /// Raw UA `route-search` payload; normally an array of itineraries.
    async fn route_search(&self, query: &RouteSearchQuery) -> ClientResult<Value>;
}

/// `reqwest` implementation. The partner key is read from the local store on
/// every call so a newly saved key applies to the next search.
pub struct HttpAvailabilityApi {
    client: Client,
    base_url: String,
    store: Arc<LocalStore>,
    fallback_key: Option<String>,
}

impl HttpAvailabilityApi {
    pub fn new(
        client: Client,
        base_url: &str,
        store: Arc<LocalStore>,
        fallback_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            fallback_key,
        }
    }

    fn api_key(&self) -> ClientResult<String> {
        self.store
            .api_key()?
            .or_else(|| self.fallback_key.clone())
            .ok_or(ClientError::MissingApiKey)
    }
}

#[async_trait]
impl AvailabilityApi for HttpAvailabilityApi {
    async fn fetch_availability(&self, query: &AvailabilityQuery) -> ClientResult<Value> {
        let url = format!("{}/api/availability-v2", self.base_url);
        tracing::info!(route = %query.route_id, "Requesting availability");

        let response = self
            .client
            .post(&url)
            .header(PARTNER_AUTH_HEADER, self.api_key()?)
            .json(query)
            .send()
            .await?;
        read_json(response).await
    }

    async fn route_search(&self, query: &RouteSearchQuery) -> ClientResult<Value> {
        let url = format!("{}/api/route-search", self.base_url);
        tracing::info!(airport = %query.airport, "Requesting UA route search");

        let start = query.start_date.to_string();
        let end = query.end_date.to_string();
        let response = self
            .client
            .get(&url)
            .header(PARTNER_AUTH_HEADER, self.api_key()?)
            .query(&[
                ("type", query.search_type.as_str()),
                ("airport", query.airport.as_str()),
                ("startDate", start.as_str()),
                ("endDate", end.as_str()),
            ])
            .send()
            .await?;
        read_json(response).await
    }
}

/// Turn a non-2xx status into `ClientError::Status`, otherwise decode JSON.
pub(crate) async fn read_json(response: Response) -> ClientResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "Upstream request failed");
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<Value>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_body_shape() {
        let query = AvailabilityQuery {
            route_id: "LHR-EWR".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            sources: "aeroplan,united".to_string(),
        };
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "routeId": "LHR-EWR",
                "startDate": "2025-03-01",
                "endDate": "2025-03-31",
                "sources": "aeroplan,united"
            })
        );
    }

    #[test]
    fn test_missing_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).unwrap());
        let api = HttpAvailabilityApi::new(Client::new(), "http://localhost", store.clone(), None);
        assert!(matches!(api.api_key(), Err(ClientError::MissingApiKey)));

        let api = HttpAvailabilityApi::new(
            Client::new(),
            "http://localhost",
            store.clone(),
            Some("cfg".into()),
        );
        assert_eq!(api.api_key().unwrap(), "cfg");

        store.set_api_key("stored").unwrap();
        assert_eq!(api.api_key().unwrap(), "stored");
    }
}
