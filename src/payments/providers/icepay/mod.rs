//! ICEPAY payment provider implementation
//!
//! Lets buyers pay with iDEAL through ICEPAY's hosted payment page. A checkout
//! bumps the order's attempt counter, signs a checkout request and hands back
//! the payment page URL. The buyer's return and ICEPAY's server postback are
//! both checksum-verified before they may touch the order.

pub mod checksum;
pub mod client;
pub mod issuer;
pub mod postback;
pub mod reconcile;
pub mod settings;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::EventConfig;
use crate::error::{AppError, AppResult, DomainError, ValidationError};
use crate::i18n::{Locale, Message};
use crate::orders::{Order, OrderStore, PaymentInfo};
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    to_minor_units, CheckoutRedirect, CheckoutSession, FormField, PostbackOutcome,
    PostbackRequest,
};

pub use client::{CheckoutRequest, IcepayClient};
pub use issuer::Issuer;
pub use postback::{IcepayStatus, Postback, Unverified, Verified};
pub use settings::IcepaySettings;

pub const IDENTIFIER: &str = "icepay";

/// ICEPAY provider bound to one event
pub struct IcepayProvider {
    settings: IcepaySettings,
    client: IcepayClient,
    store: Arc<dyn OrderStore>,
    event_name: String,
    currency: String,
    result_url: String,
}

impl IcepayProvider {
    pub fn new(
        settings: IcepaySettings,
        event: &EventConfig,
        store: Arc<dyn OrderStore>,
    ) -> AppResult<Self> {
        let client = IcepayClient::new(&settings)?;
        Ok(Self {
            client,
            store,
            event_name: event.name.clone(),
            currency: event.currency.to_uppercase(),
            result_url: event.url(&format!("{}/result", IDENTIFIER)),
            settings,
        })
    }

    /// Bump and persist the attempt counter, returning the new reference.
    async fn next_reference(&self, order: &Order) -> AppResult<String> {
        let order_pk = order.id;
        let updated = self
            .store
            .update_payment_info(
                &order.code,
                Box::new(move |info: &mut PaymentInfo| {
                    info.next_attempt(order_pk);
                }),
            )
            .await?;
        PaymentInfo::from_order(&updated)?.order_id.ok_or_else(|| {
            AppError::storage(format!("attempt reference not stored for {}", order.code))
        })
    }

    fn build_request(
        &self,
        order: &Order,
        session: &CheckoutSession,
        issuer: Issuer,
        amount: i64,
        order_id: String,
    ) -> CheckoutRequest {
        CheckoutRequest {
            amount,
            country: self.settings.country.to_uppercase(),
            currency: self.currency.clone(),
            description: self.event_name.clone(),
            end_user_ip: session.client_ip.clone(),
            issuer: issuer.code().to_string(),
            language: session.locale.code().to_uppercase(),
            order_id,
            payment_method: "IDEAL".to_string(),
            reference: order.code.clone(),
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            url_completed: self.result_url.clone(),
            url_error: self.result_url.clone(),
        }
    }
}

#[async_trait]
impl PaymentProvider for IcepayProvider {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn verbose_name(&self, locale: Locale) -> &'static str {
        Message::VerboseName.text(locale)
    }

    fn settings_form_fields(&self, locale: Locale) -> Vec<FormField> {
        vec![
            FormField::text("merchant_id", Message::MerchantIdLabel.text(locale)),
            FormField::text("secret_code", Message::SecretCodeLabel.text(locale)),
        ]
    }

    fn payment_form_fields(&self, locale: Locale) -> Vec<FormField> {
        let mut choices = vec![(String::new(), Message::YourBank.text(locale).to_string())];
        choices.extend(
            Issuer::choices()
                .into_iter()
                .map(|(code, name)| (code.to_string(), name.to_string())),
        );
        vec![FormField::choice(
            "issuer",
            Message::IdealBankLabel.text(locale),
            choices,
        )]
    }

    fn validate_session(&self, session: &CheckoutSession) -> AppResult<()> {
        match session.issuer.as_deref().map(str::trim) {
            None | Some("") => Err(ValidationError::MissingField {
                field: "issuer".to_string(),
            }
            .into()),
            Some(code) => code.parse::<Issuer>().map(|_| ()).map_err(AppError::from),
        }
    }

    async fn checkout(
        &self,
        order: &Order,
        session: &CheckoutSession,
    ) -> AppResult<CheckoutRedirect> {
        if !order.status.is_payable() {
            return Err(DomainError::OrderNotPayable {
                code: order.code.clone(),
                status: order.status.to_string(),
            }
            .into());
        }

        self.validate_session(session)?;
        let issuer: Issuer = session
            .issuer
            .as_deref()
            .unwrap_or_default()
            .parse()?;
        let amount = to_minor_units(&order.total)?;

        // Every request sent upstream, retries included, gets its own
        // persisted attempt and therefore its own merchant reference.
        let mut retry = 0;
        let (reference, response) = loop {
            let reference = self.next_reference(order).await?;
            info!(
                "Initiating ICEPAY checkout: order={} reference={} amount={} {} issuer={}",
                order.code, reference, amount, self.currency, issuer
            );

            let request = self.build_request(order, session, issuer, amount, reference.clone());
            match self.client.checkout(&request).await {
                Ok(response) => break (reference, response),
                Err(e) if e.is_retryable() && retry < self.client.max_retries() => {
                    let backoff = self.client.backoff(retry);
                    warn!(
                        "ICEPAY checkout {} failed, retrying after {:?}: {}",
                        reference, backoff, e
                    );
                    retry += 1;
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    error!("ICEPAY checkout failed for order {}: {}", order.code, e);
                    return Err(e);
                }
            }
        };

        let payment_id = response.payment_id();
        if let Some(id) = payment_id.clone() {
            if let Err(e) = self
                .store
                .update_payment_info(
                    &order.code,
                    Box::new(move |info: &mut PaymentInfo| {
                        info.payment_id = Some(id);
                    }),
                )
                .await
            {
                warn!("Could not record ICEPAY payment id for {}: {}", order.code, e);
            }
        }

        info!(
            "ICEPAY checkout created: order={} reference={}",
            order.code, reference
        );

        Ok(CheckoutRedirect {
            payment_url: response.payment_screen_url,
            reference,
            payment_id,
        })
    }

    async fn handle_postback(&self, request: PostbackRequest) -> AppResult<PostbackOutcome> {
        let channel = request.channel;
        let postback = Postback::new(request)
            .verify(&self.settings.secret_code)
            .map_err(|e| {
                error!("Rejected ICEPAY {:?} postback: {}", channel, e);
                e
            })?;

        reconcile::reconcile(
            self.store.as_ref(),
            IDENTIFIER,
            &self.settings.merchant_id,
            &postback,
        )
        .await
    }
}
