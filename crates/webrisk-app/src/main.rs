//! wrserver - serves URL lookups and a safe redirector backed by Web Risk.
//!
//! Clients talk to wrserver instead of the Web Risk API directly. It keeps
//! the API key server-side and caches verdicts locally:
//!
//! - `/status` - cache and query statistics
//! - `POST /v1/uris:search` - look up a URI (JSON or protobuf)
//! - `/r?url=...` - redirect, or show a warning page for unsafe URLs
//!
//! ```text
//! wrserver --apikey $APIKEY --srvaddr 127.0.0.1:8080 --db /var/lib/wrserver/cache.db
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webrisk_client::{parse_duration, EngineConfig, RemoteEngine};
use webrisk_core::{interstitial_template, ThreatType, INTERSTITIAL_BASE};
use webrisk_server::{AppState, AssetStore, EmbeddedAssets, Server, ServerConfig, TerminationSignals};

/// How often expired verdicts are dropped from the cache.
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// wrserver - local Web Risk lookup and redirect server
#[derive(Parser, Debug)]
#[command(name = "wrserver", version, about)]
struct Args {
    /// Web Risk API key
    #[arg(long = "apikey", env = "APIKEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// TCP network address the HTTP server should use
    #[arg(long = "srvaddr", default_value = webrisk_server::DEFAULT_ADDR)]
    srv_addr: String,

    /// Proxy to use for connections to the Web Risk API
    #[arg(long, default_value = "")]
    proxy: String,

    /// Path to the verdict cache database (in-memory if empty)
    #[arg(long, default_value = "")]
    db: String,

    /// Threat types to check against: ALL or a comma-separated list
    #[arg(long = "threatTypes", default_value = "ALL")]
    threat_types: String,

    /// Minimum time to cache positive responses, e.g. 10m
    #[arg(long = "pminTTL", env = "PMINTTL", default_value = "", allow_hyphen_values = true)]
    pmin_ttl: String,

    /// Minimum time to cache negative responses; 0 disables negative caching
    #[arg(long = "nminTTL", env = "NMINTTL", default_value = "", allow_hyphen_values = true)]
    nmin_ttl: String,

    /// Log queries sent to the API (also enabled by LOGAPIQUERIES=yes)
    #[arg(long = "logAPIQueries")]
    log_api_queries: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write daily-rotated logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn log_api_queries(&self) -> bool {
        self.log_api_queries || std::env::var("LOGAPIQUERIES").is_ok_and(|v| v == "yes")
    }
}

/// Initialize logging, with file rotation when a log directory is given.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("wrserver={0},webrisk={0},warn", log_level))
    });

    if let Some(ref log_dir) = args.log_dir {
        if std::fs::create_dir_all(log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("wrserver")
                .filename_suffix("log")
                .build(log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        tracing::warn!("File logging unavailable in {:?}, using console only", log_dir);
        return None;
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    None
}

/// Collects the engine configuration, rejecting anything invalid.
fn engine_config(args: &Args) -> anyhow::Result<EngineConfig> {
    if args.api_key.trim().is_empty() {
        bail!("No --apikey specified");
    }

    let positive_min_ttl = parse_duration(&args.pmin_ttl).context("Invalid --pminTTL")?;
    let negative_min_ttl = parse_duration(&args.nmin_ttl).context("Invalid --nminTTL")?;
    let threat_types =
        ThreatType::parse_list(&args.threat_types).context("Invalid --threatTypes")?;

    let mut config = EngineConfig::new(args.api_key.trim())
        .with_proxy(args.proxy.trim())
        .with_threat_types(threat_types)
        .with_min_ttls(positive_min_ttl, negative_min_ttl)
        .with_api_query_logging(args.log_api_queries());

    if !args.db.is_empty() {
        config = config.with_db_path(&args.db);
    }

    Ok(config)
}

/// Resolves the listen address. A bare `:port` listens on all interfaces.
fn listen_addr(value: &str) -> anyhow::Result<SocketAddr> {
    let value = value.trim();
    let value = if value.starts_with(':') {
        format!("0.0.0.0{}", value)
    } else {
        value.to_string()
    };

    value
        .to_socket_addrs()
        .with_context(|| format!("Invalid --srvaddr {:?}", value))?
        .next()
        .with_context(|| format!("--srvaddr {:?} resolves to no address", value))
}

/// Makes sure every warning page can be loaded.
fn check_assets(assets: &dyn AssetStore) -> anyhow::Result<()> {
    let templates = ThreatType::all()
        .iter()
        .filter_map(|t| interstitial_template(*t));

    for path in std::iter::once(INTERSTITIAL_BASE).chain(templates) {
        assets
            .open(path)
            .with_context(|| format!("Unable to initialize static files: {}", path))?;
    }
    Ok(())
}

fn spawn_purge_task(engine: Arc<RemoteEngine>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = engine.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired verdicts");
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args);

    let config = engine_config(&args)?;
    let addr = listen_addr(&args.srv_addr)?;
    tracing::debug!(?config, "Engine configuration");

    let engine =
        Arc::new(RemoteEngine::new(config).context("Unable to initialize Web Risk client")?);

    let assets = Arc::new(EmbeddedAssets);
    check_assets(assets.as_ref())?;

    let signals =
        TerminationSignals::subscribe().context("Unable to listen for termination signals")?;

    let state = AppState::with_assets(engine.clone(), assets);
    let mut server = Server::new(ServerConfig::new(addr), state)
        .start()
        .context("Server error")?;

    server.shutdown_on(async move {
        let signal = signals.recv().await;
        tracing::info!(signal, "Received termination signal");
    });

    let purge = spawn_purge_task(engine);
    let result = server.wait().await;
    purge.abort();
    result.context("Server error when shutting down")?;

    tracing::info!("wrserver exiting.");
    Ok(())
}
