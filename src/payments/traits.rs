//! Payment provider trait definitions
//!
//! Defines the capability every payment method registers with the host.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::i18n::Locale;
use crate::orders::Order;
use crate::payments::types::{
    CheckoutRedirect, CheckoutSession, FormField, PostbackOutcome, PostbackRequest,
};

/// Trait for payment provider implementations
///
/// A provider instance is bound to one event's settings; the host keeps
/// instances in a [`ProviderRegistry`](crate::payments::registry::ProviderRegistry).
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Stable identifier, also used as URL segment and as the `provider`
    /// recorded on paid orders
    fn identifier(&self) -> &'static str;

    /// Human readable name shown on the payment method list
    fn verbose_name(&self, locale: Locale) -> &'static str;

    /// Fields the organizer fills in on the event settings page
    fn settings_form_fields(&self, locale: Locale) -> Vec<FormField>;

    /// Fields the buyer fills in when choosing this payment method
    fn payment_form_fields(&self, locale: Locale) -> Vec<FormField>;

    /// Check that the buyer's session holds everything `checkout` needs
    fn validate_session(&self, session: &CheckoutSession) -> AppResult<()>;

    /// Start a payment for the order
    ///
    /// Returns the URL of the gateway's hosted payment page. The order is
    /// never marked paid here; that happens when the postback arrives.
    async fn checkout(&self, order: &Order, session: &CheckoutSession)
        -> AppResult<CheckoutRedirect>;

    /// Validate an inbound postback and apply it to the referenced order
    ///
    /// A postback that fails validation returns an error and never touches
    /// an order. Repeated delivery of the same postback is safe.
    async fn handle_postback(&self, request: PostbackRequest) -> AppResult<PostbackOutcome>;
}
