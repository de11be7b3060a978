//! The playlist bridge binary.
//!
//! Wires the in-memory session backend, the pending-load registry, the
//! session pump and reactor, and the HTTP server into one single-threaded
//! process. The reactor runs on the main task; the HTTP server shares the
//! runtime and answers requests as the reactor delivers load notifications.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{error, info};

use bridge_backend::{Credentials, MemoryBackend, PlaylistLink, PlaylistSnapshot, SessionBackend};
use bridge_server::{BridgeContext, BridgeServer};
use load_registry::PendingLoadRegistry;
use session_pump::{Reactor, SessionPump};

/// Serve playlists from a streaming session backend as synchronous HTTP JSON.
#[derive(Parser, Debug)]
#[command(name = "playlist-bridge")]
#[command(about = "HTTP JSON bridge over an asynchronous streaming session backend")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Backend account name
    #[arg(short, long)]
    username: Option<String>,

    /// Backend account password
    #[arg(long)]
    password: Option<String>,

    /// Path to a JSON playlist catalog to serve
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Seconds a request waits for a playlist to load before replying 504
    #[arg(long, default_value = "10")]
    load_wait: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug)]
struct Config {
    listen: SocketAddr,
    credentials: Credentials,
    catalog: Option<PathBuf>,
    load_wait: Duration,
    log_level: String,
}

impl Config {
    /// Build configuration from command line arguments, letting environment
    /// variables fill in anything the command line left out.
    fn from_env() -> Result<Self> {
        let mut args = Args::parse();

        if args.username.is_none() {
            args.username = std::env::var("BRIDGE_USERNAME").ok();
        }
        if args.password.is_none() {
            args.password = std::env::var("BRIDGE_PASSWORD").ok();
        }
        if args.catalog.is_none() {
            args.catalog = std::env::var("BRIDGE_CATALOG").ok().map(PathBuf::from);
        }
        if let Ok(log_level) = std::env::var("BRIDGE_LOG_LEVEL") {
            args.log_level = log_level;
        }

        match args.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{other}'. Valid levels: error, warn, info, debug, trace"
                ));
            }
        }

        let username = args
            .username
            .context("No username given (use --username or BRIDGE_USERNAME)")?;
        if username.is_empty() {
            return Err(anyhow::anyhow!("Username must not be empty"));
        }

        let listen: SocketAddr = format!("{}:{}", args.host, args.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

        if args.load_wait == 0 {
            return Err(anyhow::anyhow!("Load wait must be positive"));
        }

        Ok(Self {
            listen,
            credentials: Credentials {
                username,
                password: args.password.unwrap_or_default(),
            },
            catalog: args.catalog,
            load_wait: Duration::from_secs(args.load_wait),
            log_level: args.log_level,
        })
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();
}

/// One playlist in the catalog file.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    link: PlaylistLink,
    /// When present, the playlist resolves immediately but only finishes
    /// loading this many milliseconds after startup.
    #[serde(default)]
    load_after_ms: Option<u64>,
    playlist: PlaylistSnapshot,
}

fn load_catalog(path: &PathBuf, backend: &MemoryBackend) -> Result<usize> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse catalog file {}", path.display()))?;

    let count = entries.len();
    for entry in entries {
        match entry.load_after_ms {
            Some(delay_ms) => backend.insert_loading(
                entry.link,
                entry.playlist,
                Duration::from_millis(delay_ms),
            ),
            None => backend.insert_playlist(entry.link, entry.playlist),
        }
    }
    Ok(count)
}

async fn run(config: Config) -> Result<()> {
    let waker = Arc::new(Notify::new());
    let backend = Arc::new(MemoryBackend::new(waker.clone()));
    let registry = PendingLoadRegistry::new();

    if let Some(path) = &config.catalog {
        let count = load_catalog(path, &backend)?;
        info!(catalog = %path.display(), playlists = count, "catalog loaded");
    }

    backend.login(&config.credentials);

    let pump = SessionPump::new(backend.clone(), registry.clone());
    let reactor = Reactor::new(backend.clone(), pump, waker);

    let context =
        BridgeContext::new(backend.clone(), registry).with_load_wait(config.load_wait);
    let server = BridgeServer::bind(config.listen, context)
        .await
        .context("Failed to start HTTP server")?;
    info!(addr = %server.addr(), "serving playlists");

    // Runs until logout (Ctrl+C) or a fatal session error.
    let outcome = reactor.run().await;

    server.shutdown().await;
    outcome.context("Session ended with an error")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(2);
        }
    };

    init_tracing(&config.log_level);
    info!(
        load_wait_secs = config.load_wait.as_secs(),
        "starting playlist bridge"
    );

    if let Err(e) = run(config).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
