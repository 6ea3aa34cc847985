//! ClipVault API server binary.
//!
//! Serves the account and session routes over PostgreSQL, or over an
//! in-memory store with `--in-memory` for local development.

use std::sync::Arc;

use clap::Parser;
use clipvault_api::config::ApiConfig;
use clipvault_core::auth::CredentialStore;
use clipvault_core::auth::memory::MemoryCredentialStore;
use clipvault_core::auth::queries::PgCredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "clipvault_server", about = "ClipVault account and session API server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR` (0 = ephemeral).
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep accounts in process memory instead of PostgreSQL. Nothing survives a restart.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,clipvault_api=debug,clipvault_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(port) = args.port {
        config.bind_addr = with_port(&config.bind_addr, port);
    }

    let store: Arc<dyn CredentialStore> = if args.in_memory {
        warn!("using in-memory credential store; accounts are lost on exit");
        Arc::new(MemoryCredentialStore::new())
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        clipvault_core::migrate::migrate(&pool).await?;
        Arc::new(PgCredentialStore::new(pool))
    };

    let bind_addr = config.bind_addr.clone();
    let state = clipvault_api::AppState::new(config, store)?;
    let app = clipvault_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind_addr: &str, port: u16) -> String {
    let host = bind_addr
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(bind_addr);
    format!("{host}:{port}")
}
