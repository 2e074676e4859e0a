use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{request_locale, with_message, AppState};
use crate::payments::types::{CheckoutSession, FormField};

#[derive(Debug, Serialize)]
pub struct ProviderSettings {
    pub identifier: &'static str,
    pub name: &'static str,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub issuer: Option<String>,
}

/// Payment form fields for a provider, labelled in the buyer's language
pub async fn payment_form(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<FormField>>, StatusCode> {
    let provider = state
        .registry
        .get(&provider)
        .map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(provider.payment_form_fields(request_locale(&headers))))
}

/// Settings form an organizer fills in to enable the provider
pub async fn provider_settings(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ProviderSettings>, StatusCode> {
    let provider = state
        .registry
        .get(&provider)
        .map_err(|_| StatusCode::NOT_FOUND)?;
    let locale = request_locale(&headers);
    Ok(Json(ProviderSettings {
        identifier: provider.identifier(),
        name: provider.verbose_name(locale),
        fields: provider.settings_form_fields(locale),
    }))
}

/// Start a payment and send the buyer to the gateway's payment page
pub async fn start_payment(
    State(state): State<AppState>,
    Path((code, secret, provider)): Path<(String, String, String)>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<PaymentForm>,
) -> Response {
    let locale = request_locale(&headers);

    let order = match state.store.find_by_code(&code).await {
        Ok(Some(order)) if order.secret == secret => order,
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("Order lookup failed for {}: {}", code, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let provider = match state.registry.get(&provider) {
        Ok(provider) => provider,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let session = CheckoutSession {
        issuer: form.issuer,
        locale,
        client_ip: client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
    };

    let order_url = state.config.event.order_url(&order);
    match provider.checkout(&order, &session).await {
        Ok(redirect) => {
            info!(
                "Redirecting order {} to {} payment page",
                order.code,
                provider.identifier()
            );
            Redirect::to(&redirect.payment_url).into_response()
        }
        Err(e) => {
            warn!("Checkout failed for order {}: {}", order.code, e);
            Redirect::to(&with_message(&order_url, &e.user_message(locale))).into_response()
        }
    }
}

/// First hop of `X-Forwarded-For`, else the peer address
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "127.0.0.1".to_string())
}
