//! WalletWatch CLI: run the monitoring service or score data offline.

use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{response::IntoResponse, routing::get, Router};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tokio::sync::mpsc;
use walletwatch::alerts::{AlertEvaluator, AlertNotification, AlertRegistry, AlertRequest};
use walletwatch::cache::TtlCache;
use walletwatch::config::Config;
use walletwatch::provider::{CachedProvider, HttpDataProvider, WalletDataProvider};
use walletwatch::scheduler::spawn_periodic;
use walletwatch::utils::types::{TokenHolding, Transaction};

#[derive(Debug, Parser)]
#[command(name = "walletwatch", author, version, about = "Wallet risk scoring and alert monitor", long_about = None)]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the cache sweeper, alert evaluator and health endpoint
    Run {
        /// JSON array of alert requests to watch from startup
        #[arg(long, value_name = "JSON")]
        alerts: Option<PathBuf>,
    },
    /// Score a portfolio read from a JSON array of holdings
    Score {
        #[arg(long, value_name = "JSON")]
        holdings: PathBuf,
    },
    /// Score a single transaction read from JSON
    ScoreTx {
        #[arg(long, value_name = "JSON")]
        tx: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    // stdout carries command output (scores, default config)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml()?);
        return Ok(());
    }

    let config = load_config(&args.config)?;

    match args.command.unwrap_or(Command::Run { alerts: None }) {
        | Command::Run { alerts } => run_service(config, alerts).await,
        | Command::Score { holdings } => {
            let holdings: Vec<TokenHolding> = read_json(&holdings)?;
            let assessment = config.risk.engine().calculate_portfolio_risk(&holdings)?;
            println!("{}", serde_json::to_string_pretty(&assessment)?);
            Ok(())
        }
        | Command::ScoreTx { tx } => {
            let tx: Transaction = read_json(&tx)?;
            let assessment = config.risk.engine().assess_transaction_risk(&tx)?;
            println!("{}", serde_json::to_string_pretty(&assessment)?);
            Ok(())
        }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let config = if Path::new(path).exists() {
        Config::from_file(path).context("Failed to load configuration")?
    } else {
        log::warn!("Configuration file '{}' not found, using defaults", path);
        let mut config = Config::default();
        config.merge_env()?;
        config
    };
    config.validate()?;
    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

async fn health() -> impl IntoResponse {
    "OK"
}

async fn metrics_handler() -> impl IntoResponse {
    walletwatch::metrics::render()
}

async fn run_service(config: Config, alerts: Option<PathBuf>) -> Result<()> {
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<AlertNotification>();
    let registry = AlertRegistry::with_capacity(config.alerts.max_notifications).with_notifier(notify_tx);
    if let Some(path) = alerts {
        let requests: Vec<AlertRequest> = read_json(&path)?;
        let created = registry.create_alerts(requests).await.context("invalid alert definitions")?;
        log::info!("Watching {} alert(s) from {}", created.len(), path.display());
    }

    walletwatch::metrics::init()?;

    let cache = TtlCache::new();
    let http = HttpDataProvider::new(
        &config.provider.base_url,
        config.provider.api_key.clone(),
        std::time::Duration::from_secs(config.provider.timeout_seconds),
    )?;
    let provider: Arc<dyn WalletDataProvider> =
        Arc::new(CachedProvider::new(http, cache.clone(), config.cache.policy()));

    let evaluator = AlertEvaluator::new(registry.clone(), provider, config.risk.engine())
        .with_policy(config.alerts.retrigger_policy);

    let sweeper = spawn_periodic(Arc::new(cache), config.cache.sweep_interval())?;
    let evaluator = spawn_periodic(Arc::new(evaluator), config.alerts.evaluation_interval())?;
    let notifications = tokio::spawn(async move {
        while let Some(note) = notify_rx.recv().await {
            log::warn!("[{:?}] {} {}: {}", note.severity, note.alert_id, note.address, note.message);
        }
    });

    let app = Router::new()
        .route("/", get(|| async { "WalletWatch running" }))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_handler));
    let addr: SocketAddr = config.server.bind_addr.parse().context("invalid server.bind_addr")?;
    let listener = match TcpListener::bind(addr) {
        | Ok(l) => l,
        | Err(e) => {
            log::warn!("{} unavailable: {}, binding to a random port", addr, e);
            TcpListener::bind(SocketAddr::new(addr.ip(), 0))?
        }
    };
    log::info!("Serving /healthz and /metrics on http://{}", listener.local_addr()?);

    let server = axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for ctrl-c: {}", e);
            }
        });
    server.await?;

    log::info!("Shutdown signal received. Stopping background tasks...");
    evaluator.stop().await;
    sweeper.stop().await;
    notifications.abort();
    Ok(())
}
