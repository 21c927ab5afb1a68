// # HTTP Host Address
//
// This crate discovers the host's public address over HTTP, for records
// that should point at the machine deployd runs on.
//
// ## Architecture
//
// Fetches the address from an external "what is my IP" service
// (e.g., api.ipify.org, icanhazip.com) once per `current()` call. There is
// no polling and no cache: provisioning is rare and operator-triggered.
// When the service is unreachable the configured fallback is used, so a
// flaky lookup service never blocks provisioning.

use deployd_core::config::HostAddressConfig;
use deployd_core::traits::{HostAddress, StaticHostAddress};
use deployd_core::{Error, Result};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for the lookup request
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based host address source
#[derive(Debug)]
pub struct HttpHostAddress {
    /// URL returning the address as plain text
    url: String,

    /// Address used when the lookup fails
    fallback: Option<IpAddr>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpHostAddress {
    /// Create a new HTTP host address source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://api.ipify.org")
    /// - `fallback`: Address returned when the lookup fails; `None` surfaces the error
    pub fn new(url: impl Into<String>, fallback: Option<IpAddr>) -> Result<Self> {
        Self::with_timeout(url, fallback, DEFAULT_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(
        url: impl Into<String>,
        fallback: Option<IpAddr>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            fallback,
            client,
        })
    }

    /// Fetch the current address from the HTTP service
    async fn fetch_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| lookup_error(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(lookup_error(format!("HTTP error: {}", response.status())));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| lookup_error(format!("Failed to read response: {}", e)))?;

        let ip_text = ip_text.trim();
        ip_text
            .parse()
            .map_err(|_| lookup_error(format!("Invalid IP address: {}", ip_text)))
    }
}

#[async_trait::async_trait]
impl HostAddress for HttpHostAddress {
    async fn current(&self) -> Result<IpAddr> {
        match self.fetch_ip().await {
            Ok(ip) => {
                tracing::debug!("Discovered host address {} via {}", ip, self.url);
                Ok(ip)
            }
            Err(e) => match self.fallback {
                Some(fallback) => {
                    tracing::warn!(
                        "Host address lookup via {} failed: {}. Using fallback {}.",
                        self.url,
                        e,
                        fallback
                    );
                    Ok(fallback)
                }
                None => Err(e),
            },
        }
    }
}

/// Lookup failures are local, not DNS provider errors
fn lookup_error(message: String) -> Error {
    Error::Other(format!("Host address lookup failed: {}", message))
}

/// Build the host address source described by `config`
pub fn from_config(config: &HostAddressConfig) -> Result<Arc<dyn HostAddress>> {
    match config {
        HostAddressConfig::Static { ip } => Ok(Arc::new(StaticHostAddress::new(*ip))),
        HostAddressConfig::Http { url, fallback } => {
            Ok(Arc::new(HttpHostAddress::new(url.clone(), Some(*fallback))?))
        }
    }
}
