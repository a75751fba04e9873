// API server implementation using actix-web

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};

use crate::aggregator::CrossStoreAggregator;
use crate::api::{middleware, routes};
use crate::matching::SimilarityConfig;
use crate::models::Store;
use crate::stores::{default_catalogs, StoreCatalog};
use crate::util::env::{env_opt, env_parse};

/// Shared handler state: the aggregator plus direct access to each catalog
/// for single-store operations.
pub struct AppState {
    pub aggregator: CrossStoreAggregator,
    pub catalogs: Vec<Arc<dyn StoreCatalog>>,
}

impl AppState {
    pub fn from_env() -> Result<Self> {
        let catalogs = default_catalogs().context("failed to construct store catalogs")?;
        let aggregator =
            CrossStoreAggregator::new(catalogs.clone(), SimilarityConfig::from_env());
        Ok(Self {
            aggregator,
            catalogs,
        })
    }

    pub fn catalog_for(&self, store: Store) -> Option<Arc<dyn StoreCatalog>> {
        self.catalogs
            .iter()
            .find(|c| c.store() == store)
            .map(Arc::clone)
    }
}

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = env_parse("API_PORT", 8080u16);
        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:8000".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, state: AppState) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            stores = state.catalogs.len(),
            "Starting precio-radar API server"
        );

        let state = web::Data::new(state);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            App::new()
                .app_data(state.clone())
                .wrap(logger)
                .wrap(compress)
                .wrap(cors)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
