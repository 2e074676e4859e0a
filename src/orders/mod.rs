//! Orders as seen by the payment plugin
//!
//! The host application owns orders and their persistence. This module
//! defines the record shape, the `payment_info` blob the plugin keeps on each
//! order, and the `OrderStore` seam through which the plugin reads and
//! transitions them.

pub mod model;
pub mod store;

pub use model::{LogEntry, Order, OrderStatus, PaymentInfo, Transition};
pub use store::{InMemoryOrderStore, OrderStore, PaymentInfoUpdate};
