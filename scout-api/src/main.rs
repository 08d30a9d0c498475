use anyhow::Context;
use scout_api::{app, AppState};
use scout_client::{
    app_config::Config, CloudStorage, HttpAvailabilityApi, HttpCurrencyConverter, LocalStore,
};
use scout_core::AirportDirectory;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scout_api=debug,scout_client=debug,scout_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting award scout on port {}", config.server.port);

    let store = Arc::new(
        LocalStore::open(&config.storage.path).context("Failed to open local store")?,
    );
    let directory = Arc::new(AirportDirectory::builtin().context("Failed to load airport data")?);
    let http = reqwest::Client::new();

    let app_state = AppState {
        api: Arc::new(HttpAvailabilityApi::new(
            http.clone(),
            &config.backend.base_url,
            store.clone(),
            config.backend.api_key.clone(),
        )),
        cloud: Arc::new(CloudStorage::new(http.clone(), &config.cloud.base_url)),
        converter: Arc::new(HttpCurrencyConverter::new(http, &config.currency.base_url)),
        directory,
        store,
        default_sources: config.search.default_sources.clone(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(app_state)).await?;
    Ok(())
}
