//! Front-end configuration.
//!
//! Environment variables are read once by [`FrontendConfig::from_env`] at startup; the
//! `*_from_env_value` helpers hold the parsing rules so they can be tested without touching
//! the process environment.

use crate::auth::DEFAULT_TOKEN_TTL_MINUTES;
use chrono::Duration;
use epr_core::{
    data_dir_from_env_value, secret_salt_from_env_value, store_kind_from_env_value, CoreConfig,
    PatientError, SecretSalt,
};

/// Default bind address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Core(#[from] PatientError),
    #[error("EPR_TOKEN_TTL_MINUTES must be a positive number of minutes, got '{0}'")]
    TokenTtl(String),
}

/// Everything a front end needs, resolved from the environment.
#[derive(Clone, Debug)]
pub struct FrontendConfig {
    pub core: CoreConfig,
    pub rest_addr: String,
    pub token_secret: Vec<u8>,
    pub token_ttl: Duration,
    pub seed_on_start: bool,
}

impl FrontendConfig {
    /// Reads `SECRET_SALT`, `EPR_DATA_DIR`, `EPR_STORE`, `EPR_REST_ADDR`, `EPR_TOKEN_SECRET`,
    /// `EPR_TOKEN_TTL_MINUTES` and `EPR_SEED_ON_START`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &str| std::env::var(name).ok();
        let core = core_config_from_env()?;

        Ok(Self {
            rest_addr: rest_addr_from_env_value(var("EPR_REST_ADDR")),
            token_secret: token_secret_from_env_value(var("EPR_TOKEN_SECRET"), core.secret_salt()),
            token_ttl: token_ttl_from_env_value(var("EPR_TOKEN_TTL_MINUTES"))?,
            seed_on_start: flag_from_env_value(var("EPR_SEED_ON_START")),
            core,
        })
    }
}

/// Reads `SECRET_SALT`, `EPR_DATA_DIR` and `EPR_STORE`; shared by every binary.
pub fn core_config_from_env() -> Result<CoreConfig, ConfigError> {
    let var = |name: &str| std::env::var(name).ok();
    Ok(CoreConfig::new(
        data_dir_from_env_value(var("EPR_DATA_DIR")),
        secret_salt_from_env_value(var("SECRET_SALT"))?,
        store_kind_from_env_value(var("EPR_STORE"))?,
    ))
}

pub fn rest_addr_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.into())
}

/// Token signing secret; falls back to the secret salt when unset.
pub fn token_secret_from_env_value(value: Option<String>, salt: &SecretSalt) -> Vec<u8> {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| salt.expose().to_string())
        .into_bytes()
}

pub fn token_ttl_from_env_value(value: Option<String>) -> Result<Duration, ConfigError> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES));
    };
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| *minutes > 0)
        .and_then(Duration::try_minutes)
        .ok_or(ConfigError::TokenTtl(raw))
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag; anything else disables it.
pub fn flag_from_env_value(value: Option<String>) -> bool {
    value
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}
