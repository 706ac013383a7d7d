//! regid-resolver - Registry identifier resolution service
//!
//! `serve` (default) runs the HTTP API; `resolve` runs a single resolution
//! and prints the result as JSON.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use regid_resolver::config::{
    default_log_directive, write_default_config, ConfigOrigin, CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};
use regid_resolver::db::{self, CompanyStore, SqliteCompanyStore};
use regid_resolver::{
    build_router, AppState, Location, Resolver, ResolverConfig, SearchRequest,
};

/// Command-line arguments for regid-resolver
#[derive(Parser, Debug)]
#[command(name = "regid-resolver")]
#[command(about = "Resolve company names to validated CNPJ identifiers")]
#[command(version)]
struct Args {
    /// Config file (overrides REGID_CONFIG and the per-user default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides [server] host)
        #[arg(long, env = "REGID_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides [server] port)
        #[arg(short, long, env = "REGID_PORT")]
        port: Option<u16>,

        /// Do not persist auto-applied identifiers
        #[arg(long)]
        no_store: bool,
    },
    /// Resolve one company and print the resolution as JSON
    Resolve {
        /// Company name
        name: String,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,
    },
    /// Write the default configuration file
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path =
        regid_common::config::resolve_config_path(args.config.as_deref(), CONFIG_PATH_ENV, CONFIG_FILE_NAME);
    let mut config: ResolverConfig =
        regid_common::config::load_toml_or_default(config_path.as_deref())
            .context("Failed to load configuration")?;

    // Installed after loading so the TOML level applies; the load outcome is
    // logged right after.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_directive(&config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    ConfigOrigin::of(config_path.as_deref()).log();

    if let Some(Command::InitConfig { force }) = &args.command {
        return init_config(config_path.as_deref(), *force);
    }

    config.sources.resolve_api_keys();

    let resolver = Arc::new(
        Resolver::from_config(&config).context("Failed to initialize external sources")?,
    );

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
        no_store: false,
    }) {
        Command::Serve {
            host,
            port,
            no_store,
        } => serve(config, resolver, host, port, no_store).await,
        Command::Resolve {
            name,
            domain,
            city,
            state,
        } => {
            let location = Some(Location { city, state });
            let request = SearchRequest::new(name, domain, location)?;
            let resolution = resolver.resolve(request).await;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Write defaults to the `--config`/`REGID_CONFIG` path or the per-user default
fn init_config(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => regid_common::config::default_config_path(CONFIG_FILE_NAME)
            .context("No per-user config directory on this platform")?,
    };

    if write_default_config(&path, force)? {
        info!("Default configuration written to {}", path.display());
    } else {
        warn!(
            "{} already exists, left unchanged (use --force to replace)",
            path.display()
        );
    }
    Ok(())
}

async fn serve(
    config: ResolverConfig,
    resolver: Arc<Resolver>,
    host: Option<String>,
    port: Option<u16>,
    no_store: bool,
) -> Result<()> {
    info!("Starting regid-resolver");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let store: Option<Arc<dyn CompanyStore>> = if no_store {
        info!("Company store disabled");
        None
    } else {
        let db_path = config.database.resolved_path();
        info!("Database: {}", db_path.display());
        let pool = db::init_database_pool(&db_path)
            .await
            .context("Failed to open database")?;
        Some(Arc::new(SqliteCompanyStore::new(pool)))
    };

    let app = build_router(AppState::new(resolver, store));

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
