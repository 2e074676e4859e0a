use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use icepay_provider::api::{self, AppState};
use icepay_provider::config::Config;
use icepay_provider::orders::InMemoryOrderStore;
use icepay_provider::payments::providers::IcepayProvider;
use icepay_provider::payments::ProviderRegistry;
use tracing_subscriber::EnvFilter;

fn init_tracing(production: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if production {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.is_production());

    tracing::info!("Starting ICEPAY payment provider");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Event: {} ({})", config.event.name, config.event.slug);
    tracing::info!("ICEPAY settings: {:?}", config.icepay);

    let store = Arc::new(match config.event.quota {
        Some(quota) => InMemoryOrderStore::with_quota(quota),
        None => InMemoryOrderStore::new(),
    });
    if let Some(path) = &config.event.orders_file {
        store
            .load_json_file(path)
            .await
            .with_context(|| format!("loading orders from {}", path.display()))?;
    }

    let mut registry = ProviderRegistry::new();
    let icepay = IcepayProvider::new(config.icepay.clone(), &config.event, store.clone())
        .context("building ICEPAY provider")?;
    registry.register(Arc::new(icepay));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("HOST and PORT must form a socket address")?;

    let app = api::router(AppState::new(config, registry, store));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
