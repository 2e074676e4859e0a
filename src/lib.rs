pub mod api;
pub mod config;
pub mod error;
pub mod i18n;
pub mod logentry;
pub mod orders;
pub mod payments;
