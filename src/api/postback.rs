// Inbound ICEPAY traffic: the buyer's browser coming back and the gateway's
// server-to-server postback.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tracing::{error, info, warn};

use super::{request_locale, with_message, with_query, AppState};
use crate::config::EventConfig;
use crate::error::{AppError, ValidationError};
use crate::i18n::{Locale, Message};
use crate::payments::types::{PostbackChannel, PostbackOutcome, PostbackRequest};

pub async fn browser_return(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let locale = request_locale(&headers);
    let event = &state.config.event;

    let provider = match state.registry.get(&provider) {
        Ok(provider) => provider,
        Err(e) => {
            warn!("Browser return for unknown provider: {}", e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let request = PostbackRequest::new(PostbackChannel::BrowserReturn, params);
    match provider.handle_postback(request).await {
        Ok(outcome) => Redirect::to(&browser_redirect(event, &outcome, locale)).into_response(),
        Err(e) => {
            warn!("Browser return failed: {}", e);
            Redirect::to(&with_message(&event.index_url(), &e.user_message(locale)))
                .into_response()
        }
    }
}

/// Where the buyer lands after a verified return
fn browser_redirect(event: &EventConfig, outcome: &PostbackOutcome, locale: Locale) -> String {
    match outcome {
        PostbackOutcome::Paid { order } | PostbackOutcome::AlreadyPaid { order } => {
            with_query(&event.order_url(order), "paid", "yes")
        }
        PostbackOutcome::QuotaExceeded { order, .. } => with_message(
            &event.order_url(order),
            Message::QuotaExceeded.text(locale),
        ),
        PostbackOutcome::NotPaid { order, .. } => with_message(
            &event.order_url(order),
            Message::PaymentFailed.text(locale),
        ),
        PostbackOutcome::Ignored { order, .. } => with_message(
            &event.order_url(order),
            Message::OrderNotPayable.text(locale),
        ),
        PostbackOutcome::Refunded { order } => event.order_url(order),
        PostbackOutcome::UnknownOrder { .. } => {
            with_message(&event.index_url(), Message::OrderNotFound.text(locale))
        }
        PostbackOutcome::ForeignMerchant { .. } => {
            with_message(&event.index_url(), Message::PaymentFailed.text(locale))
        }
    }
}

pub async fn webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Form(params): Form<HashMap<String, String>>,
) -> StatusCode {
    let provider = match state.registry.get(&provider) {
        Ok(provider) => provider,
        Err(e) => {
            warn!("Webhook for unknown provider: {}", e);
            return StatusCode::NOT_FOUND;
        }
    };

    let request = PostbackRequest::new(PostbackChannel::Webhook, params);
    match provider.handle_postback(request).await {
        Ok(outcome) => {
            info!(
                "Webhook processed: provider={} order={} outcome={}",
                provider.identifier(),
                outcome.order().map(|o| o.code.as_str()).unwrap_or("-"),
                outcome_label(&outcome)
            );
            StatusCode::OK
        }
        Err(e) => error_status(&e),
    }
}

/// Only transient failures ask the gateway to deliver again.
fn error_status(e: &AppError) -> StatusCode {
    if e.is_bad_checksum() {
        StatusCode::BAD_REQUEST
    } else if e.is_retryable() {
        error!("Webhook processing failed, asking for redelivery: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        error!("Webhook cannot be applied, acknowledging: {}", e);
        StatusCode::OK
    }
}

fn outcome_label(outcome: &PostbackOutcome) -> &'static str {
    match outcome {
        PostbackOutcome::Paid { .. } => "paid",
        PostbackOutcome::AlreadyPaid { .. } => "already_paid",
        PostbackOutcome::QuotaExceeded { .. } => "quota_exceeded",
        PostbackOutcome::NotPaid { .. } => "not_paid",
        PostbackOutcome::Refunded { .. } => "refunded",
        PostbackOutcome::Ignored { .. } => "ignored",
        PostbackOutcome::UnknownOrder { .. } => "unknown_order",
        PostbackOutcome::ForeignMerchant { .. } => "foreign_merchant",
    }
}
