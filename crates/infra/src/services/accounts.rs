//! User accounts: login, administration and first-run bootstrap.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use depot_auth::{
    NewUser, PasswordHasher, Role, TokenIssuer, User, UserSummary, normalize_email,
    validate_name, validate_new_password,
};
use depot_core::UserId;

use super::{ServiceError, ServiceResult, blocking};
use crate::config::BootstrapAdmin;
use crate::user_store::UserStore;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

/// Account creation request from an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub role: String,
    pub temp_password: String,
}

#[derive(Clone)]
pub struct Accounts {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenIssuer>,
    hasher: PasswordHasher,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<dyn TokenIssuer>, hasher: PasswordHasher) -> Self {
        Self {
            users,
            tokens,
            hasher,
        }
    }

    fn invalid_credentials() -> ServiceError {
        ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string())
    }

    /// Unknown users, inactive users and wrong passwords are indistinguishable.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AccessToken> {
        let email = normalize_email(email).map_err(|_| Self::invalid_credentials())?;
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login failed: unknown user");
            return Err(Self::invalid_credentials());
        };
        if !user.is_active {
            warn!(user_id = %user.id, "login failed: inactive user");
            return Err(Self::invalid_credentials());
        }

        let hasher = self.hasher;
        let plain = password.to_string();
        let hash = user.password_hash.clone();
        let matches = blocking(move || Ok(hasher.verify(&plain, &hash)?)).await?;
        if !matches {
            warn!(user_id = %user.id, "login failed: wrong password");
            return Err(Self::invalid_credentials());
        }

        let access_token = self.tokens.issue(user.id, &user.role, Utc::now())?;
        info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(AccessToken {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// The user behind a token, if it still exists and is active.
    pub async fn active_user(&self, id: UserId) -> ServiceResult<User> {
        match self.users.get(id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(ServiceError::Unauthorized("unknown or inactive user".to_string())),
        }
    }

    async fn hash(&self, plain: &str) -> ServiceResult<String> {
        let hasher = self.hasher;
        let plain = plain.to_string();
        blocking(move || Ok(hasher.hash(&plain)?)).await
    }

    pub async fn create_user(&self, input: NewAccount) -> ServiceResult<UserSummary> {
        let name = validate_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        let role = Role::parse_assignable(&input.role)?;
        validate_new_password(&input.temp_password)?;

        let password_hash = self.hash(&input.temp_password).await?;
        let user = self
            .users
            .create(
                NewUser {
                    name,
                    email,
                    password_hash,
                    role,
                },
                Utc::now(),
            )
            .await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user.summary())
    }

    pub async fn update_role(&self, id: UserId, role: &str) -> ServiceResult<UserSummary> {
        let role = Role::parse_assignable(role)?;
        let user = self.users.update_role(id, role, Utc::now()).await?;
        info!(user_id = %user.id, role = %user.role, "user role updated");
        Ok(user.summary())
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<UserSummary>> {
        Ok(self.users.list().await?.iter().map(User::summary).collect())
    }

    /// Create the first administrator when no account exists yet.
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<Option<UserSummary>> {
        if self.users.count().await? > 0 {
            return Ok(None);
        }
        let user = self
            .create_user(NewAccount {
                name: admin.name.clone(),
                email: admin.email.clone(),
                role: Role::ADMIN.to_string(),
                temp_password: admin.password.clone(),
            })
            .await?;
        info!(user_id = %user.id, email = %user.email, "bootstrap administrator created");
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use depot_auth::{Hs256Jwt, JwtValidator};

    use super::*;
    use crate::user_store::InMemoryUserStore;

    fn accounts() -> (Accounts, Arc<Hs256Jwt>) {
        let jwt = Arc::new(Hs256Jwt::new("test-secret", Duration::minutes(5)));
        let accounts = Accounts::new(
            Arc::new(InMemoryUserStore::new()),
            jwt.clone(),
            PasswordHasher::new(4),
        );
        (accounts, jwt)
    }

    fn account(email: &str, role: &str) -> NewAccount {
        NewAccount {
            name: "Dana".to_string(),
            email: email.to_string(),
            role: role.to_string(),
            temp_password: "hunter22".to_string(),
        }
    }

    #[tokio::test]
    async fn login_issues_a_token_for_the_user() {
        let (accounts, jwt) = accounts();
        let user = accounts
            .create_user(account("Dana@Example.com", "stock_manager"))
            .await
            .unwrap();
        assert_eq!(user.email, "dana@example.com");

        let token = accounts.login("dana@example.com", "hunter22").await.unwrap();
        assert_eq!(token.token_type, "bearer");
        let claims = jwt.validate(&token.access_token, Utc::now()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::STOCK_MANAGER);
    }

    #[tokio::test]
    async fn bad_credentials_share_one_error() {
        let (accounts, _) = accounts();
        accounts
            .create_user(account("dana@example.com", "warehouse_staff"))
            .await
            .unwrap();
        let wrong = accounts.login("dana@example.com", "nope-nope").await.unwrap_err();
        let unknown = accounts.login("who@example.com", "hunter22").await.unwrap_err();
        assert_eq!(wrong, unknown);
        assert_eq!(wrong, ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    #[tokio::test]
    async fn unknown_roles_and_duplicate_emails_are_rejected() {
        let (accounts, _) = accounts();
        let err = accounts
            .create_user(account("a@example.com", "superuser"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        accounts.create_user(account("a@example.com", "admin")).await.unwrap();
        let err = accounts
            .create_user(account("a@example.com", "admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn bootstrap_runs_only_on_an_empty_store() {
        let (accounts, _) = accounts();
        let admin = BootstrapAdmin {
            name: "Administrator".to_string(),
            email: "root@example.com".to_string(),
            password: "changeme".to_string(),
        };
        let created = accounts.bootstrap_admin(&admin).await.unwrap().unwrap();
        assert_eq!(created.role, Role::ADMIN);
        assert!(accounts.bootstrap_admin(&admin).await.unwrap().is_none());
    }
}
