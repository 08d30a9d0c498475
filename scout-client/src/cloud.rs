use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use scout_core::pricing::RateConfig;
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::read_json;
use crate::ClientResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessCode {
    pub code: String,
    #[serde(rename = "expiryDate", deserialize_with = "lenient_expiry")]
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessCodes {
    #[serde(rename = "accessCodes", default)]
    pub access_codes: Vec<AccessCode>,
}

/// Accepts RFC 3339 timestamps or bare dates; a bare date expires at the end of that day (UTC).
fn lenient_expiry<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid expiry date: {}", raw)))
}

/// Static JSON documents published to cloud storage.
#[async_trait]
pub trait CloudDocuments: Send + Sync {
    async fn rate_config(&self) -> ClientResult<RateConfig>;

    async fn access_codes(&self) -> ClientResult<AccessCodes>;
}

#[derive(Clone)]
pub struct CloudStorage {
    client: Client,
    base_url: String,
}

impl CloudStorage {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, file: &str) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url, file);
        tracing::debug!("Fetching {}", url);
        let response = self.client.get(&url).send().await?;
        let value = read_json(response).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl CloudDocuments for CloudStorage {
    async fn rate_config(&self) -> ClientResult<RateConfig> {
        self.fetch("rate.json").await
    }

    async fn access_codes(&self) -> ClientResult<AccessCodes> {
        self.fetch("access-codes.json").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_codes_accept_dates_and_timestamps() {
        let codes: AccessCodes = serde_json::from_str(
            r#"{"accessCodes":[
                {"code":"ALPHA","expiryDate":"2025-12-31","description":"beta"},
                {"code":"BRAVO","expiryDate":"2026-01-15T12:00:00Z"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(codes.access_codes.len(), 2);
        assert_eq!(codes.access_codes[0].expiry_date.to_rfc3339(), "2025-12-31T23:59:59+00:00");
        assert_eq!(codes.access_codes[1].description, "");
    }
}
