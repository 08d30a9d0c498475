use std::sync::Arc;
use scout_client::{AccessGate, AvailabilityApi, CloudDocuments, CurrencyConverter, LocalStore};
use scout_core::AirportDirectory;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn AvailabilityApi>,
    pub cloud: Arc<dyn CloudDocuments>,
    pub converter: Arc<dyn CurrencyConverter>,
    pub directory: Arc<AirportDirectory>,
    pub store: Arc<LocalStore>,
    pub default_sources: Vec<String>,
}

impl AppState {
    pub fn access_gate(&self) -> AccessGate {
        AccessGate::new(self.store.clone())
    }
}
