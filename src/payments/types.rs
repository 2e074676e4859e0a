//! Payment provider types and data structures
//!
//! Common types passed between the host, the HTTP layer and the providers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ValidationError};
use crate::i18n::Locale;
use crate::orders::Order;

/// Buyer state collected before the payment is started
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Issuer (bank) code picked on the payment form
    pub issuer: Option<String>,
    /// Buyer's language
    pub locale: Locale,
    /// Buyer's IP address as seen by the host
    pub client_ip: String,
}

/// Where to send the buyer to complete the payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    /// Hosted payment page
    pub payment_url: String,
    /// Merchant order reference sent upstream for this attempt
    pub reference: String,
    /// Gateway-side payment identifier, if returned
    pub payment_id: Option<String>,
}

/// How a postback reached us
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostbackChannel {
    /// Buyer's browser came back from the payment page (GET query)
    BrowserReturn,
    /// Gateway called us server to server (POST form)
    Webhook,
}

/// Raw inbound postback parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackRequest {
    pub channel: PostbackChannel,
    pub params: HashMap<String, String>,
}

impl PostbackRequest {
    pub fn new(channel: PostbackChannel, params: HashMap<String, String>) -> Self {
        Self { channel, params }
    }
}

/// What a verified postback did to the order
#[derive(Debug, Clone, PartialEq)]
pub enum PostbackOutcome {
    /// Order moved to paid
    Paid { order: Order },
    /// Order was already paid; nothing changed
    AlreadyPaid { order: Order },
    /// Payment succeeded upstream but the order could not be marked paid
    QuotaExceeded { order: Order, message: String },
    /// Gateway reported a non-successful status
    NotPaid { order: Order, status: String },
    /// Order moved to refunded
    Refunded { order: Order },
    /// The reported status does not fit the order's current status
    Ignored { order: Order, status: String },
    /// No order matches the postback reference
    UnknownOrder { reference: String },
    /// Postback belongs to a different merchant account
    ForeignMerchant { merchant: String },
}

impl PostbackOutcome {
    pub fn order(&self) -> Option<&Order> {
        match self {
            PostbackOutcome::Paid { order }
            | PostbackOutcome::AlreadyPaid { order }
            | PostbackOutcome::QuotaExceeded { order, .. }
            | PostbackOutcome::NotPaid { order, .. }
            | PostbackOutcome::Refunded { order }
            | PostbackOutcome::Ignored { order, .. } => Some(order),
            PostbackOutcome::UnknownOrder { .. } | PostbackOutcome::ForeignMerchant { .. } => None,
        }
    }
}

/// Descriptor of a form field the host renders for a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub required: bool,
    /// `(value, label)` pairs for choice fields; empty for free text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<(String, String)>,
}

impl FormField {
    pub fn text(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: true,
            choices: Vec::new(),
        }
    }

    pub fn choice(name: &str, label: &str, choices: Vec<(String, String)>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: true,
            choices,
        }
    }
}

/// Convert a decimal amount in major units ("12.5") to integer minor units (1250).
pub fn to_minor_units(amount: &str) -> AppResult<i64> {
    let invalid = |reason: &str| ValidationError::InvalidAmount {
        value: amount.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(invalid("amount must not be negative").into());
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("amount is empty").into());
    }
    if fraction.len() > 2 {
        return Err(invalid("more than two decimal places").into());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number").into());
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("amount too large"))?
    };
    let cents: i64 = format!("{:0<2}", fraction)
        .parse()
        .map_err(|_| invalid("not a decimal number"))?;

    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(cents))
        .ok_or_else(|| invalid("amount too large").into())
}
