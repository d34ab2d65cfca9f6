use api_rest::AppState;
use api_shared::{FrontendConfig, TokenService, init_tracing};
use epr_core::{SeedOutcome, Services};

/// Main entry point for the EPR application.
///
/// Opens the configured record store, optionally seeds demo data and serves the REST API.
///
/// # Environment Variables
/// - `SECRET_SALT`: salt for identifier fingerprints (required)
/// - `EPR_DATA_DIR`: data directory (default: "epr_data")
/// - `EPR_STORE`: `file` or `memory` (default: "file")
/// - `EPR_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `EPR_TOKEN_SECRET`, `EPR_TOKEN_TTL_MINUTES`: bearer token settings
/// - `EPR_SEED_ON_START`: seed demo patients into an empty store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("epr_run=info,api_rest=info,epr_core=info")?;

    let cfg = FrontendConfig::from_env()?;
    let services = Services::open(&cfg.core)?;

    if cfg.seed_on_start {
        match services.seed_demo_data()? {
            SeedOutcome::AlreadySeeded => tracing::info!("++ Demo data already present"),
            SeedOutcome::Seeded(created) => {
                tracing::info!("++ Seeded {} demo patients", created.len())
            }
        }
    }

    let tokens = TokenService::new(&cfg.token_secret, cfg.token_ttl);
    tracing::info!("++ Starting EPR REST on {}", cfg.rest_addr);
    api_rest::serve(&cfg.rest_addr, AppState::new(services, tokens)).await?;

    Ok(())
}
