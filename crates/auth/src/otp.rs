//! One-time password rules for the password-reset flow.
//!
//! Several challenges may exist per email. Only the most recent unused one
//! is actionable; older ones are superseded.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OTP_DIGITS: usize = 6;

/// A persisted challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A challenge ready to be stored (the store assigns the id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOtpChallenge {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewOtpChallenge {
    pub fn into_challenge(self, id: i64) -> OtpChallenge {
        OtpChallenge {
            id,
            email: self.email,
            code: self.code,
            expires_at: self.expires_at,
            used: false,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("please wait {wait_seconds}s before requesting a new code")]
    ResendTooSoon { wait_seconds: i64 },

    #[error("invalid_otp")]
    Invalid,

    #[error("expired")]
    Expired,
}

/// Lifetime and resend throttle for challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub ttl: Duration,
    pub resend_window: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            resend_window: Duration::seconds(60),
        }
    }
}

impl OtpPolicy {
    pub fn new(ttl: Duration, resend_window: Duration) -> Self {
        Self { ttl, resend_window }
    }

    /// Refuse a new code while the latest one is still fresh, unless `force`.
    pub fn ensure_can_send(
        &self,
        latest: Option<&OtpChallenge>,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<(), OtpError> {
        if force {
            return Ok(());
        }
        let Some(latest) = latest else {
            return Ok(());
        };
        if latest.used || latest.is_expired(now) {
            return Ok(());
        }
        let age = now - latest.created_at;
        if age < self.resend_window {
            let remaining = self.resend_window - age;
            // Round up so clients never retry a moment too early.
            let wait_seconds = (remaining.num_milliseconds() + 999) / 1000;
            return Err(OtpError::ResendTooSoon {
                wait_seconds: wait_seconds.max(1),
            });
        }
        Ok(())
    }

    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> NewOtpChallenge {
        NewOtpChallenge {
            email: email.to_string(),
            code: generate_code(&mut rand::thread_rng()),
            expires_at: now + self.ttl,
            created_at: now,
        }
    }

    /// Check `code` against the most recent unused challenge for the email.
    pub fn verify(
        &self,
        latest_unused: Option<&OtpChallenge>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let challenge = latest_unused.ok_or(OtpError::Invalid)?;
        if challenge.used || challenge.code != code.trim() {
            return Err(OtpError::Invalid);
        }
        if challenge.is_expired(now) {
            return Err(OtpError::Expired);
        }
        Ok(())
    }
}

/// Uniform random zero-padded numeric code.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let upper = 10u32.pow(OTP_DIGITS as u32);
    format!("{:0width$}", rng.gen_range(0..upper), width = OTP_DIGITS)
}
