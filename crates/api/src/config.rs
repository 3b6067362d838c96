//! Process configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use docgate_auth::PasswordHasher;
use docgate_infra::normalize_email;
use docgate_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEV_ADMIN_PASSWORD: &str = "change-me-now";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigLoadError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Account created at startup when no user owns its email yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    pub admin: AdminSeed,
    pub bcrypt_cost: u32,
    pub upload_dir: PathBuf,
    pub ingestion_delay: Duration,
    pub ingestion_success_rate: f64,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4000,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: chrono::Duration::hours(1),
            admin: AdminSeed {
                email: "admin@example.com".to_string(),
                password: DEV_ADMIN_PASSWORD.to_string(),
                name: "Admin".to_string(),
            },
            bcrypt_cost: docgate_auth::password::DEFAULT_COST,
            upload_dir: PathBuf::from("uploads"),
            ingestion_delay: Duration::from_millis(5000),
            ingestion_success_rate: 0.8,
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigLoadError> {
        let mut config = Self::default();

        if let Some(port) = parsed(&lookup, "PORT")? {
            config.port = port;
        }

        match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }

        if let Some(secs) = parsed::<i64>(&lookup, "JWT_TTL_SECS")? {
            if secs <= 0 {
                return Err(invalid("JWT_TTL_SECS", secs.to_string()));
            }
            config.jwt_ttl = chrono::Duration::seconds(secs);
        }

        if let Some(email) = lookup("ADMIN_EMAIL") {
            config.admin.email = normalize_email(&email).map_err(|_| invalid("ADMIN_EMAIL", email))?;
        }
        match lookup("ADMIN_PASSWORD") {
            Some(password) => config.admin.password = password,
            None => tracing::warn!("ADMIN_PASSWORD not set; using insecure dev default"),
        }
        if let Some(name) = lookup("ADMIN_NAME") {
            config.admin.name = name;
        }

        if let Some(cost) = parsed::<u32>(&lookup, "BCRYPT_COST")? {
            PasswordHasher::new(cost).map_err(|_| invalid("BCRYPT_COST", cost.to_string()))?;
            config.bcrypt_cost = cost;
        }

        if let Some(dir) = lookup("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(ms) = parsed::<u64>(&lookup, "INGESTION_DELAY_MS")? {
            config.ingestion_delay = Duration::from_millis(ms);
        }

        if let Some(rate) = parsed::<f64>(&lookup, "INGESTION_SUCCESS_RATE")? {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("INGESTION_SUCCESS_RATE", rate.to_string()));
            }
            config.ingestion_success_rate = rate;
        }

        if let Some(raw) = lookup("LOG_FORMAT") {
            config.log_format = raw.parse().map_err(|_| invalid("LOG_FORMAT", raw))?;
        }

        Ok(config)
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigLoadError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, raw)),
    }
}

fn invalid(key: &'static str, value: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        key,
        value: value.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigLoadError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn values_override_defaults() {
        let config = load(&[
            ("PORT", "8081"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_SECS", "60"),
            ("ADMIN_EMAIL", " Root@Example.COM "),
            ("BCRYPT_COST", "4"),
            ("INGESTION_DELAY_MS", "25"),
            ("INGESTION_SUCCESS_RATE", "1"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_ttl, chrono::Duration::seconds(60));
        assert_eq!(config.admin.email, "root@example.com");
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.ingestion_delay, Duration::from_millis(25));
        assert_eq!(config.ingestion_success_rate, 1.0);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigLoadError::Invalid {
                key: "PORT",
                value: "eighty".into()
            }
        );
        assert!(load(&[("INGESTION_SUCCESS_RATE", "1.5")]).is_err());
        assert!(load(&[("JWT_TTL_SECS", "0")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
        assert!(load(&[("BCRYPT_COST", "2")]).is_err());
    }

    #[test]
    fn admin_email_is_validated_at_load() {
        assert_eq!(
            load(&[("ADMIN_EMAIL", "admin@localhost")]).unwrap_err(),
            ConfigLoadError::Invalid {
                key: "ADMIN_EMAIL",
                value: "admin@localhost".into()
            }
        );
    }

    #[test]
    fn default_admin_email_is_valid() {
        let config = Config::default();
        assert_eq!(normalize_email(&config.admin.email).unwrap(), config.admin.email);
    }
}
