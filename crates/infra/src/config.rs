//! Process configuration.
//!
//! Read once at start-up (after `.env` is loaded) and passed down explicitly.
//! Nothing else in the workspace touches the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

pub use depot_observability::LogFormat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Credentials for the first administrator, created when no user exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Required when `use_persistent_stores` is set.
    pub database_url: Option<String>,
    pub use_persistent_stores: bool,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub otp_ttl: Duration,
    pub otp_resend_window: Duration,
    pub bcrypt_cost: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let use_persistent_stores = parse_bool(&get, "USE_PERSISTENT_STORES")?;
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let jwt_ttl = Duration::minutes(positive(&get, "JWT_TTL_MINUTES", 10_080)?);
        let otp_ttl = Duration::minutes(positive(&get, "OTP_EXP_MINUTES", 10)?);
        let otp_resend_window =
            Duration::seconds(parse_or(&get, "OTP_RESEND_WINDOW_SECONDS", 60i64)?.max(0));
        let bcrypt_cost = parse_or(&get, "BCRYPT_COST", 12u32)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                reason: "must be between 4 and 31".to_string(),
            });
        }

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: get("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("BOOTSTRAP_ADMIN_EMAIL")),
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "LOG_FORMAT",
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            database_url,
            use_persistent_stores,
            jwt_secret,
            jwt_ttl,
            otp_ttl,
            otp_resend_window,
            bcrypt_cost,
            bootstrap_admin,
            log_format,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive<G>(get: &G, key: &'static str, default: i64) -> Result<i64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be positive".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_with_only_a_secret() {
        let cfg = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(!cfg.use_persistent_stores);
        assert_eq!(cfg.jwt_ttl, Duration::minutes(10_080));
        assert_eq!(cfg.otp_ttl, Duration::minutes(10));
        assert_eq!(cfg.otp_resend_window, Duration::seconds(60));
        assert_eq!(cfg.bcrypt_cost, 12);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn jwt_secret_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn persistent_stores_need_a_database_url() {
        let err = load(&[("JWT_SECRET", "x"), ("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[("JWT_SECRET", "x"), ("OTP_EXP_MINUTES", "ten")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "OTP_EXP_MINUTES", .. }));
    }

    #[test]
    fn bootstrap_admin_needs_both_credentials() {
        let cfg = load(&[
            ("JWT_SECRET", "x"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "changeme"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        let admin = cfg.bootstrap_admin.unwrap();
        assert_eq!(admin.name, "Administrator");
        assert_eq!(cfg.log_format, LogFormat::Pretty);

        let err = load(&[("JWT_SECRET", "x"), ("BOOTSTRAP_ADMIN_EMAIL", "a@b.c")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOOTSTRAP_ADMIN_PASSWORD"));
    }
}
