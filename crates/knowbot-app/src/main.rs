//! Knowbot server binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the completion client, session store and chat processor
//! 4. Start the background expiry sweeper
//! 5. Serve the HTTP API until Ctrl+C

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use knowbot_api::routes;
use knowbot_api::state::AppState;
use knowbot_chat::{DeepSeekClient, InMemorySessionStore, SessionStore, SessionSweeper};
use knowbot_core::config::KnowbotConfig;

use cli::CliArgs;

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config comes first: it decides the log level.
    let config_file = args.resolve_config_path();
    let config_exists = config_file.exists();
    let mut config = if config_exists {
        KnowbotConfig::load(&config_file)?
    } else {
        KnowbotConfig::default()
    };
    config.general.host = args.resolve_host(&config.general.host);
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing: RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Knowbot v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
    }

    // Completion client.
    let client = DeepSeekClient::from_config(&config.llm)?;
    if !client.has_api_key() {
        tracing::warn!(
            env = %config.llm.api_key_env,
            "No completion API key configured; chat requests will fail upstream"
        );
    }
    tracing::info!(endpoint = client.endpoint(), model = %config.llm.model, "Completion client ready");

    // Sessions.
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(config.session.ttl()));
    let sweeper = Arc::new(SessionSweeper::new(
        Arc::clone(&store),
        config.session.sweep_interval(),
    ));
    let sweeper_task = {
        let sweeper = Arc::clone(&sweeper);
        tokio::spawn(async move { sweeper.run().await })
    };
    tracing::info!(
        ttl_secs = config.session.ttl_secs,
        sweep_interval_secs = config.session.sweep_interval_secs,
        "Session sweeper started"
    );

    // API server.
    let state = AppState::new(config.clone(), store, Arc::new(client));
    let result = routes::start_server(&config, state, shutdown_signal()).await;

    sweeper.shutdown();
    if let Err(e) = sweeper_task.await {
        tracing::warn!(error = %e, "Session sweeper task ended abnormally");
    }

    if let Err(ref e) = result {
        tracing::error!(error = %e, "API server failed");
    }
    result?;

    tracing::info!("Knowbot stopped");
    Ok(())
}
