//! ICEPAY REST client
//!
//! Every call is a JSON POST signed with the `MerchantID` and `Checksum`
//! headers. Errors say whether a fresh attempt may succeed; the provider
//! owns the retry loop because every attempt needs its own `OrderID`.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AppError, AppErrorKind, AppResult, ExternalError};
use crate::payments::providers::icepay::checksum::request_checksum;
use crate::payments::providers::icepay::settings::IcepaySettings;

const PROVIDER: &str = "ICEPAY";

/// Body of `POST /payment/checkout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Amount in minor units
    #[serde(rename = "Amount")]
    pub amount: i64,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "EndUserIP")]
    pub end_user_ip: String,
    #[serde(rename = "Issuer")]
    pub issuer: String,
    #[serde(rename = "Language")]
    pub language: String,
    /// Merchant order reference, unique per attempt
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    /// Host order code, echoed back on postbacks
    #[serde(rename = "Reference")]
    pub reference: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "URLCompleted")]
    pub url_completed: String,
    #[serde(rename = "URLError")]
    pub url_error: String,
}

/// Response of `POST /payment/checkout`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    #[serde(rename = "PaymentScreenURL")]
    pub payment_screen_url: String,
    #[serde(rename = "PaymentID", default)]
    payment_id: Option<serde_json::Value>,
}

impl CheckoutResponse {
    /// ICEPAY sends the payment ID as a number; keep it as text.
    pub fn payment_id(&self) -> Option<String> {
        match &self.payment_id {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

pub struct IcepayClient {
    merchant_id: String,
    secret_code: String,
    api_url: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_backoff_ms: u64,
    client: Client,
}

impl IcepayClient {
    pub fn new(settings: &IcepaySettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            merchant_id: settings.merchant_id.clone(),
            secret_code: settings.secret_code.clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            max_retries: settings.max_retries,
            retry_backoff_ms: settings.retry_backoff_ms,
            client,
        })
    }

    /// Create a hosted checkout and return where to send the buyer.
    pub async fn checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResponse> {
        self.post("payment/checkout", request).await
    }

    /// How many times a failed checkout may be started again
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (zero based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(2_u64.pow(attempt)))
    }

    fn provider_error(message: String, is_retryable: bool) -> AppError {
        AppError::new(AppErrorKind::External(ExternalError::PaymentProvider {
            provider: PROVIDER.to_string(),
            message,
            is_retryable,
        }))
    }

    /// Make one signed request to the ICEPAY API
    ///
    /// Never retried here: a checkout body carries a single-use `OrderID`, so
    /// a retry needs a new request from the caller.
    async fn post<B, T>(&self, endpoint: &str, body: &B) -> AppResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_url, endpoint);
        // The checksum covers these exact bytes, so serialize once.
        let body = serde_json::to_string(body)?;
        let checksum = request_checksum(&url, "POST", &self.merchant_id, &self.secret_code, &body);

        let sent = self
            .client
            .post(&url)
            .header("MerchantID", &self.merchant_id)
            .header("Checksum", &checksum)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("ICEPAY request timed out: {}", e);
                return Err(ExternalError::Timeout {
                    service: PROVIDER.to_string(),
                    seconds: self.timeout_secs,
                }
                .into());
            }
            Err(e) => {
                error!("ICEPAY request failed: {}", e);
                return Err(Self::provider_error(format!("Request failed: {}", e), true));
            }
        };

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if status.is_success() {
            debug!("ICEPAY {} answered {}", endpoint, status);
            return serde_json::from_str::<T>(&response_text).map_err(|e| {
                error!("Failed to parse ICEPAY response: {}: {}", e, response_text);
                Self::provider_error(format!("Invalid response format: {}", e), false)
            });
        }

        error!("ICEPAY Error: HTTP {}: {}", status, response_text);
        if status.as_u16() == 429 {
            return Err(ExternalError::RateLimit {
                service: PROVIDER.to_string(),
                retry_after: None,
            }
            .into());
        }
        Err(Self::provider_error(
            format!("HTTP {}: {}", status, response_text),
            status.is_server_error(),
        ))
    }
}
