use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;

use crate::report::status::{ThresholdPolicy, Thresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,

    // Attendance status bands
    pub thresholds: ThresholdPolicy,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

/// Bounds must be finite with `warning <= good`; the band width must be
/// finite and non-negative.
fn check_thresholds(policy: &ThresholdPolicy) -> Result<(), ConfigError> {
    let invalid = |name, value: f64| ConfigError::Invalid {
        name,
        value: value.to_string(),
    };
    let Thresholds { good, warning } = policy.defaults;

    if !good.is_finite() {
        return Err(invalid("ATTENDANCE_GOOD_THRESHOLD", good));
    }
    if !warning.is_finite() || warning > good {
        return Err(invalid("ATTENDANCE_WARNING_THRESHOLD", warning));
    }
    if !policy.band_width.is_finite() || policy.band_width < 0.0 {
        return Err(invalid("REQUIREMENT_BAND_WIDTH", policy.band_width));
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let defaults = Thresholds::default();
        let thresholds = ThresholdPolicy {
            defaults: Thresholds {
                good: parse_or("ATTENDANCE_GOOD_THRESHOLD", defaults.good)?,
                warning: parse_or("ATTENDANCE_WARNING_THRESHOLD", defaults.warning)?,
            },
            use_module_requirement: parse_or("USE_MODULE_REQUIREMENT", false)?,
            band_width: parse_or("REQUIREMENT_BAND_WIDTH", ThresholdPolicy::DEFAULT_BAND_WIDTH)?,
        };

        check_thresholds(&thresholds)?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: parse_or("REFRESH_TOKEN_TTL", 604_800)?, // default 7 days
            run_migrations: parse_or("RUN_MIGRATIONS", true)?,

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parse_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", tracing::Level::DEBUG)?,

            thresholds,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Config used by HTTP-layer tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            run_migrations: false,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
            thresholds: ThresholdPolicy::default(),
        }
    }
}
