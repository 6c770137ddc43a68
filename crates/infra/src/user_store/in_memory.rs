use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use depot_auth::{NewUser, Role, User};
use depot_core::UserId;

use super::UserStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct UserState {
    users: BTreeMap<UserId, User>,
    last_id: i64,
}

/// In-memory user accounts for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    state: RwLock<UserState>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        state.last_id += 1;
        let id = UserId::new(state.last_id);
        let user = user.into_user(id, now);
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.users.values().cloned().collect())
    }

    async fn update_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<User> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.role = role;
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn set_password(
        &self,
        id: UserId,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.password_hash = password_hash;
        user.updated_at = now;
        Ok(())
    }

    async fn count(&self) -> StoreResult<u64> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.users.len() as u64)
    }
}
