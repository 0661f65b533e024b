mod config;
mod logging;
mod signals;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use innsyn::AppState;
use innsyn::api::rest::routes::router;
use innsyn::auth::{JwksKeyProvider, KeyProvider, run_jwks_refresh_task};
use innsyn::domain::ports::TokenSource;
use innsyn::domain::service::Ports;
use innsyn::infra::fiks::HttpFiksClient;
use innsyn::infra::klage::HttpKlageClient;
use innsyn::infra::kommune_info::HttpKommuneInfoClient;
use innsyn::infra::norg::HttpNorgClient;
use innsyn::infra::pdl::HttpPdlClient;
use innsyn::infra::storage::klage_utkast_repo::SeaOrmKlageUtkastRepository;
use innsyn::infra::storage::migrations::Migrator;
use innsyn::infra::texas::TexasTokenSource;
use innsyn::infra::unleash::{UnleashToggles, run_unleash_refresh_task};
use innsyn::infra::virusscan::ClamAvScanner;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, DatabaseConfig};

/// Innsyn server - lets citizens follow their sosialhjelp applications
#[derive(Parser)]
#[command(name = "innsyn-server")]
#[command(about = "Innsyn server - lets citizens follow their sosialhjelp applications")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port, cli.verbose);
    logging::init(&config.logging);

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    if config.innsyn.is_prod && config.innsyn.xsrf.secret.is_empty() {
        anyhow::bail!("innsyn.xsrf.secret must be set when is_prod is true");
    }
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn connect_database(cfg: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(cfg.url.clone());
    options.max_connections(cfg.max_connections).sqlx_logging(false);
    // Every connection to sqlite::memory: is its own database.
    if cfg.is_in_memory() {
        options.max_connections(1).min_connections(1);
        tracing::warn!("Using in-memory database; klage drafts are lost on restart");
    }
    let db = Database::connect(options)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&db, None).await.context("failed to run migrations")?;
    Ok(db)
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Innsyn server starting");

    let cancel = CancellationToken::new();
    let cancel_for_signals = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = signals::wait_for_shutdown().await {
            tracing::warn!(error = %e, "shutdown: signal waiter failed, falling back to ctrl_c()");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "shutdown: ctrl_c() failed");
            }
        }
        cancel_for_signals.cancel();
    });

    let db = connect_database(&config.database).await?;
    let innsyn = &config.innsyn;

    let tokens: Arc<dyn TokenSource> = Arc::new(TexasTokenSource::new(&innsyn.texas)?);
    let toggles = Arc::new(UnleashToggles::new(&innsyn.unleash)?);
    let jwks = Arc::new(
        JwksKeyProvider::new(innsyn.auth.jwks_url.clone())?.with_refresh_interval(innsyn.auth.jwks_refresh_interval),
    );
    let ports = Ports {
        fiks: Arc::new(HttpFiksClient::new(&innsyn.fiks)?),
        kommune_info: Arc::new(HttpKommuneInfoClient::new(&innsyn.fiks, Arc::clone(&tokens))?),
        pdl: Arc::new(HttpPdlClient::new(&innsyn.pdl, tokens)?),
        norg: Arc::new(HttpNorgClient::new(&innsyn.norg)?),
        virus_scan: Arc::new(ClamAvScanner::new(&innsyn.virusscan, innsyn.is_prod)?),
        toggles: toggles.clone(),
        klage: Arc::new(HttpKlageClient::new(&innsyn.fiks)?),
        klage_utkast: Arc::new(SeaOrmKlageUtkastRepository::new(db)),
    };

    let background = [
        tokio::spawn(run_jwks_refresh_task(jwks.clone(), cancel.clone())),
        tokio::spawn(run_unleash_refresh_task(toggles, cancel.clone())),
    ];

    let keys: Arc<dyn KeyProvider> = jwks;
    let limits = config.server.limits();
    let addr = SocketAddr::new(config.server.bind_addr, config.server.port);
    let app = router(AppState::new(&ports, keys, config.innsyn), limits);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Innsyn server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await
        .context("http server failed");

    cancel.cancel();
    for task in background {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }
    tracing::info!("Innsyn server stopped");
    result
}
