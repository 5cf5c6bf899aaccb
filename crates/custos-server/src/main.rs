//! Custos server entry point.

mod bootstrap;
mod config;

use std::process::ExitCode;

use custos_db::MemStore;
use custos_iam::IamStack;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("custos=info")),
        )
        .json()
        .init();

    tracing::info!("Starting Custos server...");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = MemStore::new(config.store.clone());
    let stack = IamStack::new(store, config.auth.clone());

    if let Some(bootstrap) = &config.bootstrap {
        if let Err(err) = bootstrap::run(&stack, bootstrap, config.has_signing_keys()).await {
            tracing::error!(error = %err, "bootstrap failed");
            return ExitCode::FAILURE;
        }
    }

    tracing::info!("Custos server ready");
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return ExitCode::FAILURE;
    }

    tracing::info!("Custos server stopped.");
    ExitCode::SUCCESS
}
