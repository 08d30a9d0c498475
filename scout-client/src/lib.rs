pub mod app_config;
pub mod api;
pub mod cloud;
pub mod currency;
pub mod local_store;
pub mod access;
pub mod orchestrator;

pub use api::{AvailabilityApi, AvailabilityQuery, HttpAvailabilityApi, RouteSearchQuery};
pub use access::{AccessGate, AccessGrant};
pub use cloud::{AccessCodes, CloudDocuments, CloudStorage};
pub use currency::{CurrencyConverter, HttpCurrencyConverter};
pub use local_store::LocalStore;
pub use orchestrator::{
    SearchError, SearchMode, SearchOutcome, SearchPhase, SearchRequest, SearchSession,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No API key configured")]
    MissingApiKey,
    #[error("Access code is not recognised")]
    InvalidAccessCode,
    #[error("Access has expired")]
    ExpiredAccess,
    #[error("No exchange rate from {from} to {to}")]
    MissingRate { from: String, to: String },
}

pub type ClientResult<T> = Result<T, ClientError>;
