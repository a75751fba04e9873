// HTTP API server binary for precio-radar
// Serves search, comparison and barcode lookup to UI/automation consumers

use anyhow::Result;
use precio_radar::api::{ApiServer, AppState};
use precio_radar::logging;
use precio_radar::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    logging::init_tracing("info")?;

    tracing::info!("Initializing precio-radar API server");

    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();

    let server = ApiServer::from_env()?;
    let state = AppState::from_env()?;

    server.run(state).await?;

    Ok(())
}
