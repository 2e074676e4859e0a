use std::fmt;

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "https://connect.icepay.com/webservice/api/v1";

/// Per-event ICEPAY settings
#[derive(Clone, PartialEq, Eq)]
pub struct IcepaySettings {
    /// ICEPAY merchant ID
    pub merchant_id: String,
    /// ICEPAY secret code, used for every checksum
    pub secret_code: String,
    /// REST API base URL
    pub api_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of retries for failed requests
    pub max_retries: u32,
    /// First retry delay in milliseconds, doubled on each retry
    pub retry_backoff_ms: u64,
    /// Country sent with checkouts (iDEAL is NL only)
    pub country: String,
}

impl Default for IcepaySettings {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            secret_code: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 1000,
            country: "NL".to_string(),
        }
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for IcepaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcepaySettings")
            .field("merchant_id", &self.merchant_id)
            .field("secret_code", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("country", &self.country)
            .finish()
    }
}

impl IcepaySettings {
    /// Create settings from environment variables
    pub fn from_env() -> AppResult<Self> {
        let merchant_id = std::env::var("ICEPAY_MERCHANT_ID").map_err(|_| {
            AppError::configuration("ICEPAY_MERCHANT_ID environment variable is required")
        })?;

        let secret_code = std::env::var("ICEPAY_SECRET_CODE").map_err(|_| {
            AppError::configuration("ICEPAY_SECRET_CODE environment variable is required")
        })?;

        let defaults = Self::default();

        let api_url = std::env::var("ICEPAY_API_URL").unwrap_or(defaults.api_url);

        let timeout_secs = std::env::var("ICEPAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        let max_retries = std::env::var("ICEPAY_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries);

        let retry_backoff_ms = std::env::var("ICEPAY_RETRY_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.retry_backoff_ms);

        let country = std::env::var("ICEPAY_COUNTRY").unwrap_or(defaults.country);

        let settings = Self {
            merchant_id,
            secret_code,
            api_url,
            timeout_secs,
            max_retries,
            retry_backoff_ms,
            country,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.merchant_id.trim().is_empty() {
            return Err(AppError::configuration("ICEPAY merchant ID cannot be empty"));
        }
        if self.secret_code.trim().is_empty() {
            return Err(AppError::configuration("ICEPAY secret code cannot be empty"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(AppError::configuration(format!(
                "ICEPAY API URL must be http(s), got {}",
                self.api_url
            )));
        }
        if self.country.len() != 2 {
            return Err(AppError::configuration(format!(
                "ICEPAY country must be a two-letter code, got {}",
                self.country
            )));
        }
        Ok(())
    }
}
