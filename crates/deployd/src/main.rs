// # deployd - Deployment Daemon
//
// This daemon is a thin integration layer. Deployment, DNS and lifecycle
// rules all live in deployd-core; nothing here retries or reconciles.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Opening the store and building the provider factory and host address source
// 3. Serving the HTTP API until SIGTERM/SIGINT
// 4. Flushing the store on the way out
//
// ## Configuration
//
// ### Server
// - `DEPLOYD_BIND_ADDR`: Listen address (default `0.0.0.0:5000`)
//
// ### Store
// - `DEPLOYD_STORE_TYPE`: Type of store (file, memory)
// - `DEPLOYD_STORE_PATH`: Path to the state file (for file store)
//
// ### Host address
// - `DEPLOYD_HOST_IP`: Address new records point at (default `127.0.0.1`)
// - `DEPLOYD_HOST_IP_URL`: When set, discover the address over HTTP;
//   `DEPLOYD_HOST_IP` becomes the fallback
//
// ### DNS Provider
// - `DEPLOYD_PROVIDER_API_BASE`: Cloudflare API base URL
// - `DEPLOYD_PROVIDER_TIMEOUT_SECS`: Per-request timeout (1..=120)
//
// Provider credentials are not configured here: operators store them
// through `POST /api/cloudflare/config`.
//
// ## Example
//
// ```bash
// export DEPLOYD_STORE_TYPE=file
// export DEPLOYD_STORE_PATH=/var/lib/deployd/state.json
// export DEPLOYD_HOST_IP_URL=https://api.ipify.org
//
// deployd
// ```

use anyhow::{Context, Result};
use deployd_core::config::{
    DEFAULT_PROVIDER_API_BASE, DEFAULT_PROVIDER_TIMEOUT_SECS, DeploydConfig, HostAddressConfig,
    ProviderSettings, ServerConfig, StoreConfig,
};
use deployd_core::{DeploymentStore, Reconciler};
use deployd_provider_cloudflare::CloudflareFactory;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DeploydExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DeploydExitCode> for ExitCode {
    fn from(code: DeploydExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const DEFAULT_STORE_PATH: &str = "/var/lib/deployd/state.json";

/// Raw settings as read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    bind_addr: String,
    store_type: String,
    store_path: Option<String>,
    host_ip: String,
    host_ip_url: Option<String>,
    provider_api_base: String,
    provider_timeout_secs: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating empty values as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            bind_addr: var("DEPLOYD_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            store_type: var("DEPLOYD_STORE_TYPE").unwrap_or_else(|| "file".to_string()),
            store_path: var("DEPLOYD_STORE_PATH"),
            host_ip: var("DEPLOYD_HOST_IP").unwrap_or_else(|| "127.0.0.1".to_string()),
            host_ip_url: var("DEPLOYD_HOST_IP_URL"),
            provider_api_base: var("DEPLOYD_PROVIDER_API_BASE")
                .unwrap_or_else(|| DEFAULT_PROVIDER_API_BASE.to_string()),
            provider_timeout_secs: var("DEPLOYD_PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|| DEFAULT_PROVIDER_TIMEOUT_SECS.to_string()),
            log_level: var("DEPLOYD_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Parse and validate into the typed configuration
    fn resolve(&self) -> Result<DeploydConfig> {
        let bind_addr: SocketAddr = self.bind_addr.parse().with_context(|| {
            format!(
                "DEPLOYD_BIND_ADDR '{}' is not a socket address (e.g. 0.0.0.0:5000)",
                self.bind_addr
            )
        })?;

        let store = match self.store_type.as_str() {
            "file" => StoreConfig::File {
                path: PathBuf::from(
                    self.store_path
                        .clone()
                        .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
                ),
            },
            "memory" => StoreConfig::Memory,
            other => anyhow::bail!(
                "DEPLOYD_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        };

        let host_ip: IpAddr = self
            .host_ip
            .parse()
            .with_context(|| format!("DEPLOYD_HOST_IP '{}' is not an IP address", self.host_ip))?;
        let host_address = match &self.host_ip_url {
            Some(url) => HostAddressConfig::Http {
                url: url.clone(),
                fallback: host_ip,
            },
            None => HostAddressConfig::Static { ip: host_ip },
        };

        let timeout_secs: u64 = self.provider_timeout_secs.parse().with_context(|| {
            format!(
                "DEPLOYD_PROVIDER_TIMEOUT_SECS '{}' is not a number",
                self.provider_timeout_secs
            )
        })?;

        self.log_level()?;

        let config = DeploydConfig {
            server: ServerConfig { bind_addr },
            store,
            host_address,
            provider: ProviderSettings {
                api_base: self.provider_api_base.clone(),
                timeout_secs,
            },
        };
        config.validate()?;

        if let Some(url) = &self.host_ip_url
            && url.starts_with("http://")
        {
            eprintln!(
                "WARNING: DEPLOYD_HOST_IP_URL uses HTTP (not HTTPS). \
                      This is less secure. Consider using HTTPS."
            );
        }

        Ok(config)
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DEPLOYD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let raw = Config::from_env();

    let config = match raw.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DeploydExitCode::ConfigError.into();
        }
    };
    let log_level = raw.log_level().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DeploydExitCode::ConfigError.into();
    }

    info!("Starting deployd");
    info!(
        "Store: {}, provider API: {}",
        config.store.type_name(),
        config.provider.api_base
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DeploydExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DeploydExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup failed: {:#}", e);
                DeploydExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {:#}", e);
                DeploydExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Failure phase, for picking the exit code
enum DaemonError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: DeploydConfig) -> std::result::Result<(), DaemonError> {
    let store = deployd_core::store::open(&config.store)
        .await
        .context("Failed to open store")
        .map_err(DaemonError::Startup)?;
    let host = deployd_ip_http::from_config(&config.host_address)
        .context("Failed to build host address source")
        .map_err(DaemonError::Startup)?;
    let providers = Arc::new(CloudflareFactory::from_settings(&config.provider));

    let reconciler = Arc::new(Reconciler::new(Arc::clone(&store), providers, host));
    let app = deployd_api::router(reconciler);

    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))
        .map_err(DaemonError::Startup)?;
    info!("Listening on {}", config.server.bind_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    info!("Flushing store");
    let flushed = store.flush().await.context("Failed to flush store");

    served.map_err(DaemonError::Runtime)?;
    flushed.map_err(DaemonError::Runtime)?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives
#[cfg(unix)]
async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers: {}. Falling back to CTRL-C.", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to wait for CTRL-C: {}", e);
            }
            return;
        }
    };

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", name);
}

/// Resolve on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => error!("Failed to wait for CTRL-C: {}", e),
    }
}
