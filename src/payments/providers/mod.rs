//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait.

pub mod icepay;

pub use icepay::IcepayProvider;
