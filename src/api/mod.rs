pub mod checkout;
pub mod health;
pub mod orders;
pub mod postback;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use http::{header, HeaderMap};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::i18n::Locale;
use crate::orders::OrderStore;
use crate::payments::ProviderRegistry;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: ProviderRegistry,
    pub store: Arc<dyn OrderStore>,
}

impl AppState {
    pub fn new(config: Config, registry: ProviderRegistry, store: Arc<dyn OrderStore>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/:provider/result", get(postback::browser_return))
        .route("/:provider/success", get(postback::browser_return))
        .route("/:provider/failure", get(postback::browser_return))
        .route("/:provider/webhook", post(postback::webhook))
        .route("/:provider/issuers", get(checkout::payment_form))
        .route("/:provider/settings", get(checkout::provider_settings))
        .route("/orders/:code/:secret/log", get(orders::order_log))
        .route(
            "/orders/:code/:secret/pay/:provider",
            post(checkout::start_payment),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

pub(crate) fn request_locale(headers: &HeaderMap) -> Locale {
    Locale::negotiate(
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}

/// `base` with `key=value` appended to its query string
pub(crate) fn with_query(base: &str, key: &str, value: &str) -> String {
    match reqwest::Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(key, value);
            url.to_string()
        }
        Err(_) => base.to_string(),
    }
}

pub(crate) fn with_message(base: &str, message: &str) -> String {
    with_query(base, "message", message)
}
