//! Application error types
//!
//! Errors are grouped by where they come from: the payment gateway, inbound
//! validation, order/business rules, and infrastructure. Each group is a
//! `thiserror` enum; `AppError` wraps one of them together with optional context.

use std::fmt;
use thiserror::Error;

use crate::i18n::{Locale, Message};

/// Result type used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Failures talking to an external service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    #[error("{provider} error: {message}")]
    PaymentProvider {
        provider: String,
        message: String,
        is_retryable: bool,
    },

    #[error("{service} rate limit exceeded")]
    RateLimit {
        service: String,
        retry_after: Option<u64>,
    },

    #[error("{service} timed out after {seconds} seconds")]
    Timeout { service: String, seconds: u64 },
}

/// Rejected inbound data
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid checksum on postback: {reason}")]
    BadChecksum { reason: String },

    #[error("Missing field '{field}'")]
    MissingField { field: String },

    #[error("Unsupported issuer '{code}'")]
    UnsupportedIssuer { code: String },

    #[error("Invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Invalid payment info: {message}")]
    InvalidPaymentInfo { message: String },
}

/// Order and business-rule failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Order '{code}' not found")]
    OrderNotFound { code: String },

    #[error("Order '{code}' cannot be paid in status {status}")]
    OrderNotPayable { code: String, status: String },

    #[error("Quota exceeded for order '{code}': {message}")]
    QuotaExceeded { code: String, message: String },

    #[error("Unknown payment provider '{identifier}'")]
    UnknownProvider { identifier: String },
}

/// Local infrastructure failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InfrastructureError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Order storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    External(ExternalError),
    Validation(ValidationError),
    Domain(DomainError),
    Infrastructure(InfrastructureError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn bad_checksum(reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::BadChecksum {
            reason: reason.into(),
        }))
    }

    pub fn order_not_found(code: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::OrderNotFound { code: code.into() }))
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(InfrastructureError::Storage {
            message: message.into(),
        }))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    /// Whether trying the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::External(ExternalError::PaymentProvider { is_retryable, .. }) => {
                *is_retryable
            }
            AppErrorKind::External(_) => true,
            AppErrorKind::Infrastructure(InfrastructureError::Storage { .. }) => true,
            _ => false,
        }
    }

    pub fn is_bad_checksum(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::Validation(ValidationError::BadChecksum { .. })
        )
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self.kind, AppErrorKind::Domain(DomainError::QuotaExceeded { .. }))
    }

    /// Text that may be shown to the end user.
    ///
    /// Gateway and infrastructure details never leak; the user gets a generic,
    /// translated sentence instead.
    pub fn user_message(&self, locale: Locale) -> String {
        match &self.kind {
            AppErrorKind::External(_) => Message::GatewayUnavailable.text(locale).to_string(),
            AppErrorKind::Validation(ValidationError::UnsupportedIssuer { .. })
            | AppErrorKind::Validation(ValidationError::MissingField { .. }) => {
                Message::ChooseIssuer.text(locale).to_string()
            }
            AppErrorKind::Validation(_) => Message::PaymentFailed.text(locale).to_string(),
            AppErrorKind::Domain(DomainError::QuotaExceeded { .. }) => {
                Message::QuotaExceeded.text(locale).to_string()
            }
            AppErrorKind::Domain(DomainError::OrderNotPayable { .. }) => {
                Message::OrderNotPayable.text(locale).to_string()
            }
            AppErrorKind::Domain(_) => Message::OrderNotFound.text(locale).to_string(),
            AppErrorKind::Infrastructure(_) => Message::TryAgainLater.text(locale).to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.kind {
            AppErrorKind::External(e) => e.to_string(),
            AppErrorKind::Validation(e) => e.to_string(),
            AppErrorKind::Domain(e) => e.to_string(),
            AppErrorKind::Infrastructure(e) => e.to_string(),
        };

        if let Some(context) = &self.context {
            write!(f, "{} ({})", message, context)
        } else {
            write!(f, "{}", message)
        }
    }
}

impl std::error::Error for AppError {}

impl From<ExternalError> for AppError {
    fn from(e: ExternalError) -> Self {
        Self::new(AppErrorKind::External(e))
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::new(AppErrorKind::Validation(e))
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        Self::new(AppErrorKind::Domain(e))
    }
}

impl From<InfrastructureError> for AppError {
    fn from(e: InfrastructureError) -> Self {
        Self::new(AppErrorKind::Infrastructure(e))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Serialization {
                message: e.to_string(),
            },
        ))
    }
}
