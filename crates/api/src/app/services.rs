//! Service wiring: picks the stores, builds every service once and shares
//! them with the handlers.

use std::sync::Arc;

use tracing::info;

use depot_auth::{Hs256Jwt, OtpPolicy, PasswordHasher};
use depot_infra::notifier::{LogNotifier, Notifier};
use depot_infra::services::{
    Accounts, CatalogService, MovementRecorder, PasswordReset, ReferenceGate, Reporting,
};
use depot_infra::{AppConfig, Stores, db};

use super::StartupError;

pub struct AppServices {
    pub recorder: MovementRecorder,
    pub reporting: Reporting,
    pub catalog: CatalogService,
    pub accounts: Accounts,
    pub password_reset: PasswordReset,
    pub jwt: Arc<Hs256Jwt>,
}

impl AppServices {
    pub fn new(config: &AppConfig, stores: Stores, notifier: Arc<dyn Notifier>) -> Self {
        let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.jwt_ttl));
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let policy = OtpPolicy::new(config.otp_ttl, config.otp_resend_window);
        let gate = ReferenceGate::new();

        Self {
            recorder: MovementRecorder::new(
                stores.ledger.clone(),
                stores.catalog.clone(),
                gate.clone(),
            ),
            reporting: Reporting::new(
                stores.ledger.clone(),
                stores.catalog.clone(),
                stores.users.clone(),
            ),
            catalog: CatalogService::new(stores.catalog.clone(), stores.ledger.clone(), gate),
            accounts: Accounts::new(stores.users.clone(), jwt.clone(), hasher),
            password_reset: PasswordReset::new(stores.users, stores.otps, notifier, policy, hasher),
            jwt,
        }
    }
}

/// Connect the configured stores and build the services on top of them.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let stores = match (&config.database_url, config.use_persistent_stores) {
        (Some(url), true) => {
            let pool = db::connect(url).await?;
            db::ensure_schema(&pool).await?;
            info!("using postgres stores");
            Stores::postgres(pool)
        }
        _ => {
            info!("using in-memory stores");
            Stores::in_memory()
        }
    };

    let services = AppServices::new(config, stores, Arc::new(LogNotifier));

    if let Some(admin) = &config.bootstrap_admin {
        services
            .accounts
            .bootstrap_admin(admin)
            .await
            .map_err(StartupError::Bootstrap)?;
    }

    Ok(services)
}
