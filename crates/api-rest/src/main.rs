//! Standalone REST API server binary.
//!
//! Runs the REST server on its own, without the startup seeding the workspace's `epr-run`
//! binary offers. Useful during development.

use api_rest::AppState;
use api_shared::{init_tracing, FrontendConfig, TokenService};
use epr_core::Services;

/// Starts the REST API on `EPR_REST_ADDR` (default `0.0.0.0:8000`).
///
/// # Errors
///
/// Returns an error if logging cannot be initialised, the configuration is invalid, the store
/// cannot be opened or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("api_rest=info")?;

    let cfg = FrontendConfig::from_env()?;
    let services = Services::open(&cfg.core)?;
    let tokens = TokenService::new(&cfg.token_secret, cfg.token_ttl);

    api_rest::serve(&cfg.rest_addr, AppState::new(services, tokens)).await?;
    Ok(())
}
