//! Outbound notifications (password-reset codes).

use std::sync::Mutex;

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers one-time codes to users.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<(), NotifyError>;
}

/// Writes the code to the log instead of sending mail.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<(), NotifyError> {
        info!(
            email = %email,
            otp = %code,
            expires_in_minutes,
            "password reset code issued"
        );
        Ok(())
    }
}

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentOtp {
    pub email: String,
    pub code: String,
    pub expires_in_minutes: i64,
}

/// Keeps every sent code in memory so tests can read them back.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    outbox: Mutex<Vec<SentOtp>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentOtp> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// The code most recently sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.email == email)
            .map(|m| m.code)
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(
        &self,
        email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<(), NotifyError> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| NotifyError("outbox lock poisoned".to_string()))?;
        outbox.push(SentOtp {
            email: email.to_string(),
            code: code.to_string(),
            expires_in_minutes,
        });
        Ok(())
    }
}
