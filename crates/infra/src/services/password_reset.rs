//! OTP-based password reset.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use depot_auth::{OtpError, OtpPolicy, PasswordHasher, normalize_email, validate_new_password};

use super::{ServiceError, ServiceResult, blocking};
use crate::notifier::Notifier;
use crate::otp_store::OtpStore;
use crate::user_store::UserStore;

#[derive(Clone)]
pub struct PasswordReset {
    users: Arc<dyn UserStore>,
    otps: Arc<dyn OtpStore>,
    notifier: Arc<dyn Notifier>,
    policy: OtpPolicy,
    hasher: PasswordHasher,
}

impl PasswordReset {
    pub fn new(
        users: Arc<dyn UserStore>,
        otps: Arc<dyn OtpStore>,
        notifier: Arc<dyn Notifier>,
        policy: OtpPolicy,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            otps,
            notifier,
            policy,
            hasher,
        }
    }

    /// Issue a code, honouring the resend window.
    pub async fn request(&self, email: &str) -> ServiceResult<()> {
        self.send(email, false).await
    }

    /// Issue a code regardless of the resend window.
    pub async fn resend(&self, email: &str) -> ServiceResult<()> {
        self.send(email, true).await
    }

    async fn send(&self, email: &str, force: bool) -> ServiceResult<()> {
        let email = normalize_email(email)?;
        // Unknown addresses get the same answer as known ones.
        if self.users.find_by_email(&email).await?.is_none() {
            info!(email = %email, "reset requested for unknown email");
            return Ok(());
        }

        let now = Utc::now();
        let latest = self.otps.latest(&email).await?;
        if let Err(err) = self.policy.ensure_can_send(latest.as_ref(), now, force) {
            warn!(email = %email, error = %err, "reset code throttled");
            return Err(err.into());
        }

        let challenge = self.otps.insert(self.policy.issue(&email, now)).await?;
        self.notifier
            .send_otp(&email, &challenge.code, self.policy.ttl.num_minutes())
            .await?;
        info!(email = %email, challenge_id = challenge.id, force, "reset code sent");
        Ok(())
    }

    /// Check the code against the newest unused challenge and set the new password.
    pub async fn verify(&self, email: &str, code: &str, new_password: &str) -> ServiceResult<()> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::not_found("user_not_found"))?;

        let latest = self.otps.latest_unused(&email).await?;
        if let Err(err) = self.policy.verify(latest.as_ref(), code, Utc::now()) {
            warn!(user_id = %user.id, error = %err, "reset code rejected");
            return Err(err.into());
        }
        validate_new_password(new_password)?;

        let Some(challenge) = latest else {
            return Err(OtpError::Invalid.into());
        };
        let hasher = self.hasher;
        let plain = new_password.to_string();
        let hash = blocking(move || Ok(hasher.hash(&plain)?)).await?;

        if !self.otps.consume(challenge.id).await? {
            return Err(OtpError::Invalid.into());
        }
        if let Err(err) = self.users.set_password(user.id, hash, Utc::now()).await {
            warn!(user_id = %user.id, error = %err, "password update failed; reset code released");
            self.otps.release(challenge.id).await?;
            return Err(err.into());
        }
        info!(user_id = %user.id, "password reset");
        Ok(())
    }
}
