use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, DomainError};
use crate::orders::model::{LogEntry, Order, OrderStatus, PaymentInfo, Transition};

/// In-place edit of an order's `payment_info`, applied atomically by the store
pub type PaymentInfoUpdate = Box<dyn FnOnce(&mut PaymentInfo) + Send>;

/// Operations the host exposes to payment providers
///
/// Implementations must apply each call atomically for a single order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Find an order by its public code
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Order>>;

    /// Read-modify-write the order's `payment_info` blob
    async fn update_payment_info(&self, code: &str, update: PaymentInfoUpdate)
        -> AppResult<Order>;

    /// Mark the order paid
    ///
    /// Marking an already paid order is not an error and returns
    /// `Transition::AlreadyApplied`. Fails with `DomainError::QuotaExceeded`
    /// when the order no longer holds a seat and none is free.
    async fn mark_paid(&self, code: &str, provider: &str) -> AppResult<Transition>;

    /// Mark a paid order refunded; any other status is left alone
    async fn mark_refunded(&self, code: &str) -> AppResult<Transition>;

    /// Attach an audit entry to the order
    async fn log_action(
        &self,
        code: &str,
        action_type: &str,
        data: serde_json::Value,
    ) -> AppResult<LogEntry>;

    /// Audit entries of the order, oldest first
    async fn log_entries(&self, code: &str) -> AppResult<Vec<LogEntry>>;
}

#[derive(Default)]
struct StoreState {
    orders: HashMap<String, Order>,
    log: Vec<LogEntry>,
}

/// Order store kept in process memory
///
/// Backs the standalone server and the tests. `quota` caps how many orders
/// may hold a seat at once; `None` means unlimited.
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: RwLock<StoreState>,
    quota: Option<usize>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            state: RwLock::default(),
            quota: Some(quota),
        }
    }

    pub async fn insert(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.insert(order.code.clone(), order);
    }

    /// Load a JSON array of orders, replacing orders with the same code.
    pub async fn load_json_file(&self, path: &Path) -> AppResult<usize> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::storage(format!("cannot read {}: {}", path.display(), e))
        })?;
        let orders: Vec<Order> = serde_json::from_str(&raw)?;
        let count = orders.len();

        let mut state = self.state.write().await;
        for order in orders {
            state.orders.insert(order.code.clone(), order);
        }

        info!("Loaded {} orders from {}", count, path.display());
        Ok(count)
    }
}

impl StoreState {
    fn order_mut(&mut self, code: &str) -> AppResult<&mut Order> {
        self.orders
            .get_mut(code)
            .ok_or_else(|| AppError::order_not_found(code))
    }

    fn seats_taken_by_others(&self, code: &str) -> usize {
        self.orders
            .values()
            .filter(|o| o.code != code && o.status.holds_quota())
            .count()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(code).cloned())
    }

    async fn update_payment_info(
        &self,
        code: &str,
        update: PaymentInfoUpdate,
    ) -> AppResult<Order> {
        let mut state = self.state.write().await;
        let order = state.order_mut(code)?;

        let mut info = PaymentInfo::from_order(order)?;
        update(&mut info);
        order.payment_info = Some(info.to_json()?);

        debug!("Updated payment info: order={}", code);
        Ok(order.clone())
    }

    async fn mark_paid(&self, code: &str, provider: &str) -> AppResult<Transition> {
        let mut state = self.state.write().await;
        let quota = self.quota;
        let seats_taken = state.seats_taken_by_others(code);
        let order = state.order_mut(code)?;

        match order.status {
            OrderStatus::Paid => return Ok(Transition::AlreadyApplied(order.clone())),
            OrderStatus::Refunded | OrderStatus::Canceled => {
                warn!(
                    "Refusing to mark order {} paid from status {}",
                    code, order.status
                );
                return Ok(Transition::Ignored(order.clone()));
            }
            OrderStatus::Expired => {
                if let Some(quota) = quota {
                    if seats_taken >= quota {
                        return Err(DomainError::QuotaExceeded {
                            code: code.to_string(),
                            message: format!("all {} seats are taken", quota),
                        }
                        .into());
                    }
                }
            }
            OrderStatus::Created | OrderStatus::Pending => {}
        }

        order.status = OrderStatus::Paid;
        order.paid_at = Some(Utc::now());
        order.payment_provider = Some(provider.to_string());

        info!("Order {} marked paid via {}", code, provider);
        Ok(Transition::Applied(order.clone()))
    }

    async fn mark_refunded(&self, code: &str) -> AppResult<Transition> {
        let mut state = self.state.write().await;
        let order = state.order_mut(code)?;

        match order.status {
            OrderStatus::Paid => {
                order.status = OrderStatus::Refunded;
                info!("Order {} marked refunded", code);
                Ok(Transition::Applied(order.clone()))
            }
            OrderStatus::Refunded => Ok(Transition::AlreadyApplied(order.clone())),
            _ => Ok(Transition::Ignored(order.clone())),
        }
    }

    async fn log_action(
        &self,
        code: &str,
        action_type: &str,
        data: serde_json::Value,
    ) -> AppResult<LogEntry> {
        let mut state = self.state.write().await;
        if !state.orders.contains_key(code) {
            return Err(AppError::order_not_found(code));
        }

        let entry = LogEntry::new(code, action_type, data);
        state.log.push(entry.clone());
        Ok(entry)
    }

    async fn log_entries(&self, code: &str) -> AppResult<Vec<LogEntry>> {
        let state = self.state.read().await;
        Ok(state
            .log
            .iter()
            .filter(|entry| entry.order_code == code)
            .cloned()
            .collect())
    }
}
