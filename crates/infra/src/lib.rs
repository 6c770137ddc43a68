//! Infrastructure layer: configuration, Postgres, stores, notifier and the
//! services that tie the domain crates to them.

pub mod catalog_store;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger_store;
pub mod notifier;
pub mod otp_store;
pub mod services;
pub mod stores;
pub mod user_store;

pub use config::{AppConfig, BootstrapAdmin, ConfigError, LogFormat};
pub use error::{StoreError, StoreResult};
pub use ledger_store::{LedgerPage, Pagination, Reconciliation};
pub use stores::Stores;
