use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub event: String,
    pub providers: Vec<String>,
    pub icepay_configured: bool,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let config = &state.config;

    let icepay_configured =
        !config.icepay.merchant_id.is_empty() && !config.icepay.secret_code.is_empty();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: config.server.environment.clone(),
        event: config.event.slug.clone(),
        providers: state
            .registry
            .identifiers()
            .into_iter()
            .map(str::to_string)
            .collect(),
        icepay_configured,
    };

    Ok(Json(response))
}
