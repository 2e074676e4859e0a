//! Payment provider integration module
//!
//! This module provides the interface payment methods implement to plug into
//! the ticket shop, the registry the host looks them up in, and the concrete
//! providers.

pub mod providers;
pub mod registry;
pub mod traits;
pub mod types;

pub use registry::ProviderRegistry;
pub use traits::PaymentProvider;
