use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppResult, ValidationError};

/// Lifecycle status of an order as kept by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Pending,
    Paid,
    Refunded,
    Canceled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Expired => "expired",
        }
    }

    /// Whether a buyer may still start a payment for the order.
    ///
    /// Expired orders are not; a postback for one that was already under
    /// way is settled by `OrderStore::mark_paid` against the quota.
    pub fn is_payable(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::Pending)
    }

    /// Whether the order currently holds a seat in the event quota.
    pub fn holds_quota(&self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Pending | OrderStatus::Paid
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order record owned by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Numeric primary key
    pub id: u64,
    /// Public order code, unique per event
    pub code: String,
    /// Secret token that grants access to the order page
    pub secret: String,
    /// Total in major currency units as a decimal string, e.g. "10.00"
    pub total: String,
    pub status: OrderStatus,
    /// Identifier of the provider that settled the order
    #[serde(default)]
    pub payment_provider: Option<String>,
    /// Opaque gateway data, JSON text
    #[serde(default)]
    pub payment_info: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A freshly placed order waiting for payment.
    pub fn pending(
        id: u64,
        code: impl Into<String>,
        secret: impl Into<String>,
        total: impl Into<String>,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            secret: secret.into(),
            total: total.into(),
            status: OrderStatus::Pending,
            payment_provider: None,
            payment_info: None,
            paid_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Typed view of `Order::payment_info`
///
/// Keys this crate does not know about are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// Number of checkout requests sent for this order
    #[serde(default)]
    pub attempts: u32,
    /// Merchant order reference of the latest attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Last status reported by the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaymentInfo {
    pub fn from_order(order: &Order) -> AppResult<Self> {
        match order.payment_info.as_deref().map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                ValidationError::InvalidPaymentInfo {
                    message: format!("order {}: {}", order.code, e),
                }
                .into()
            }),
        }
    }

    /// Bump the attempt counter and return the merchant reference for it.
    pub fn next_attempt(&mut self, order_id: u64) -> String {
        self.attempts += 1;
        let reference = format!("{}-{}", order_id, self.attempts);
        self.order_id = Some(reference.clone());
        reference
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Result of asking the host to move an order to a new status
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The order changed status
    Applied(Order),
    /// The order already was in the target status
    AlreadyApplied(Order),
    /// The order is in a status from which the move is not allowed
    Ignored(Order),
}

impl Transition {
    pub fn order(&self) -> &Order {
        match self {
            Transition::Applied(o) | Transition::AlreadyApplied(o) | Transition::Ignored(o) => o,
        }
    }
}

/// Audit record attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub order_code: String,
    pub action_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(order_code: &str, action_type: &str, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_code: order_code.to_string(),
            action_type: action_type.to_string(),
            data,
            created_at: Utc::now(),
        }
    }
}
