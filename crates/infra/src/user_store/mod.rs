//! User account persistence.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;

use chrono::{DateTime, Utc};

use depot_auth::{NewUser, Role, User};
use depot_core::UserId;

use crate::error::StoreResult;

/// Emails are stored normalized; lookups expect the normalized form.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` when the email is already registered.
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User>;

    async fn get(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// All users ordered by id.
    async fn list(&self) -> StoreResult<Vec<User>>;

    async fn update_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<User>;

    async fn set_password(&self, id: UserId, password_hash: String, now: DateTime<Utc>)
    -> StoreResult<()>;

    async fn count(&self) -> StoreResult<u64>;
}
