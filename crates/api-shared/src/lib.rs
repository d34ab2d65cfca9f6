//! # API Shared
//!
//! Shared utilities and definitions for the EPR front ends.
//!
//! Contains:
//! - Request/response bodies (`dto` module)
//! - Mock users and bearer-token issuance (`auth` module)
//! - Environment-driven front-end configuration
//! - Shared services like `HealthService`
//! - Tracing setup with identifier redaction
//!
//! Used by `api-rest` and the binaries for common functionality.

pub mod auth;
pub mod config;
pub mod dto;
pub mod health;
pub mod logging;

pub use auth::{AuthError, AuthResult, Role, TokenService, UserInfo};
pub use config::{core_config_from_env, ConfigError, FrontendConfig};
pub use health::HealthService;
pub use logging::{init_tracing, LoggingError, RedactingMakeWriter};
