mod auth;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod quotation_doc;
mod reconcile;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::PasswordHasher;
use crate::db::{MemoryStore, QuotationStore};
use crate::routes::AppState;

/// Quotation backend: admin login and quotation CRUD over HTTP
#[derive(Parser)]
#[command(name = "quotation-manager")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Print an Argon2id hash for seeding an admin account
    HashPassword {
        /// Plaintext password to hash
        password: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Keep data in memory instead of PostgreSQL
    #[arg(long)]
    in_memory: bool,

    /// Address to listen on; overrides HOST and PORT
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::HashPassword { password } => {
            let hash = PasswordHasher::new().hash(&password)?;
            println!("{hash}");
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = config::init()?;
    logging::init_logging(&config.log_filter);

    let store: Arc<dyn QuotationStore> = if args.in_memory {
        let mut store = MemoryStore::new();
        match config.seed_admin() {
            Some((email, hash)) => store = store.with_admin(email, hash),
            None => warn!("No ADMIN_EMAIL/ADMIN_PASSWORD_HASH set; logins will be rejected"),
        }
        info!("Serving from the in-memory store");
        Arc::new(store)
    } else {
        let db = db::init(&config).await?;
        info!("Database connection established");
        Arc::new(db)
    };

    let state = AppState {
        store,
        hasher: PasswordHasher::new(),
    };
    let app = routes::router(state, &config.static_dir)
        .layer(routes::cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr = match args.bind {
        Some(addr) => addr,
        None => config.bind_addr()?,
    };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, static_dir = %config.static_dir.display(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
