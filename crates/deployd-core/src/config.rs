//! Configuration types for deployd
//!
//! This module defines the process-level configuration. Provider
//! credentials are not part of it: they live in the store and are edited
//! through the settings operations.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default Cloudflare API v4 base URL
pub const DEFAULT_PROVIDER_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default per-request provider timeout
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Main deployd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploydConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Persistence store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Where the address provisioned records point at comes from
    #[serde(default)]
    pub host_address: HostAddressConfig,

    /// DNS provider client settings
    #[serde(default)]
    pub provider: ProviderSettings,
}

impl DeploydConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.host_address.validate()?;
        self.provider.validate()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the API binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

/// Persistence store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON snapshot on disk
    File {
        /// Path to the state file
        path: PathBuf,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.as_os_str().is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from("/var/lib/deployd/state.json"),
        }
    }
}

/// Host address source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAddressConfig {
    /// A fixed address
    Static {
        /// Address records point at
        ip: IpAddr,
    },

    /// Discover the public address over HTTP, falling back to `fallback`
    Http {
        /// URL returning the address as plain text
        url: String,
        /// Address used when discovery fails
        fallback: IpAddr,
    },
}

impl HostAddressConfig {
    /// Validate the host address configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            HostAddressConfig::Http { url, .. } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Host address URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Host address URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            HostAddressConfig::Static { .. } => Ok(()),
        }
    }
}

impl Default for HostAddressConfig {
    fn default() -> Self {
        HostAddressConfig::Static {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

/// DNS provider client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API base URL, without trailing slash
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    /// Validate the provider settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_base.is_empty() {
            return Err(crate::Error::config("Provider API base URL cannot be empty"));
        }
        if !(1..=120).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Provider timeout must be between 1 and 120 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_PROVIDER_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}
