//! Application services: orchestrate the pure domain rules and the stores.
//!
//! Every service takes its collaborators as trait objects and reads the clock
//! once per call. Errors from the domain, the stores and the auth rules are
//! folded into [`ServiceError`], which the HTTP layer maps to status codes.

pub mod accounts;
pub mod catalog;
pub mod password_reset;
pub mod recorder;
pub mod reporting;

pub use accounts::{AccessToken, Accounts, NewAccount};
pub use catalog::{CatalogService, LocationView};
pub use password_reset::PasswordReset;
pub use recorder::{ManualAdjustment, MovementRecorder};
pub use reporting::{ProductStock, Reporting};

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use depot_auth::{OtpError, PasswordError, TokenError};
use depot_core::DomainError;

use crate::error::StoreError;
use crate::notifier::NotifyError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("please wait {wait_seconds}s before requesting a new code")]
    TooManyRequests { wait_seconds: i64 },

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => ServiceError::Validation(msg),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Unauthorized => ServiceError::Unauthorized("unauthorized".to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Conflict(msg) | StoreError::InvalidReference(msg) => {
                ServiceError::Conflict(msg)
            }
            other => {
                tracing::error!(error = %other, "store failure");
                ServiceError::Store(other)
            }
        }
    }
}

impl From<OtpError> for ServiceError {
    fn from(value: OtpError) -> Self {
        match value {
            OtpError::ResendTooSoon { wait_seconds } => ServiceError::TooManyRequests { wait_seconds },
            OtpError::Invalid | OtpError::Expired => ServiceError::Validation(value.to_string()),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(value: PasswordError) -> Self {
        ServiceError::Internal(value.to_string())
    }
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        ServiceError::Internal(value.to_string())
    }
}

impl From<NotifyError> for ServiceError {
    fn from(value: NotifyError) -> Self {
        ServiceError::Internal(value.to_string())
    }
}

/// Orders catalog deletes against movements that reference the deleted row.
///
/// Movements hold it shared from the catalog check until the append; deletes
/// hold it exclusively across the ledger-reference check and the delete.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGate(Arc<RwLock<()>>);

impl ReferenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn movement(&self) -> RwLockReadGuard<'_, ()> {
        self.0.read().await
    }

    pub async fn removal(&self) -> RwLockWriteGuard<'_, ()> {
        self.0.write().await
    }
}

/// Run blocking work (bcrypt) off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("blocking task failed: {e}")))?
}
