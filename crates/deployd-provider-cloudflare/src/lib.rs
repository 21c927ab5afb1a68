// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of deployd's
// `DnsProvider`.
//
// ## Behaviour
//
// - One HTTP request per call
// - Every request bounded by the client timeout (default 10 seconds)
// - Every outcome is a `ProviderOutcome`/`Verification`: transport errors,
//   timeouts, non-2xx statuses, `success: false` envelopes and unparseable
//   bodies are all reported as failures, never as panics or `Err`
// - No retries, no caching, no background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - The factory refuses to build a client with an empty token
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Zone details: GET `/zones/:zone_id`
// - Create DNS record: POST `/zones/:zone_id/dns_records`
// - Patch DNS record: PATCH `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use deployd_core::config::{DEFAULT_PROVIDER_API_BASE, DEFAULT_PROVIDER_TIMEOUT_SECS, ProviderSettings};
use deployd_core::model::DnsProviderConfig;
use deployd_core::traits::{
    DnsProvider, DnsProviderFactory, ProviderOutcome, RecordRequest, Verification,
};
use deployd_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider name used in errors and logs
pub const PROVIDER_NAME: &str = "cloudflare";

/// TTL Cloudflare interprets as "automatic"; required for proxied records
const AUTOMATIC_TTL: u32 = 1;

/// TTL for DNS-only records
const DNS_ONLY_TTL: u32 = 3600;

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS);

/// Cloudflare API v4 response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    content: String,
}

/// Body of a record create request
#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    proxied: bool,
    ttl: u32,
}

/// Cloudflare DNS provider bound to one zone
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// API base URL, without trailing slash
    api_base: String,

    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone all records are created in
    zone_id: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_base", &self.api_base)
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_base`: API base URL (normally `https://api.cloudflare.com/client/v4`)
    /// - `api_token`: API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone the records live in
    /// - `timeout`: Per-request timeout
    pub fn new(
        api_base: impl Into<String>,
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token is required"));
        }

        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_token,
            zone_id,
            client,
        })
    }

    fn zone_url(&self) -> String {
        format!("{}/zones/{}", self.api_base, self.zone_id)
    }

    fn records_url(&self) -> String {
        format!("{}/dns_records", self.zone_url())
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    /// Send one request and unwrap the v4 envelope
    ///
    /// # Returns
    ///
    /// - `Ok(result)`: 2xx status and `success: true`
    /// - `Err(message)`: anything else, with the provider's first error
    ///   message when it sent one
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> std::result::Result<Option<T>, String> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "Cloudflare API request timed out".to_string()
                } else {
                    format!("HTTP request failed: {}", e)
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(format!("Failed to parse response: {}", e));
            }
            Err(_) => return Err(status_message(status, fallback)),
        };

        if status.is_success() && envelope.success {
            return Ok(envelope.result);
        }

        Err(envelope
            .errors
            .into_iter()
            .next()
            .map(|e| e.message)
            .unwrap_or_else(|| status_message(status, fallback)))
    }
}

/// Describe a non-2xx status the provider sent no message for
fn status_message(status: StatusCode, fallback: &str) -> String {
    match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("Not found. Status: {}", status),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloudflare server error: {}", status),
        200..=299 => fallback.to_string(),
        _ => format!("{}. Status: {}", fallback, status),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// ```http
    /// GET /zones/:zone_id
    /// ```
    async fn verify_credentials(&self) -> Verification {
        tracing::debug!("Verifying Cloudflare credentials for zone {}", self.zone_id);

        match self
            .call::<Zone>(
                self.client.get(self.zone_url()),
                "Invalid credentials or zone ID",
            )
            .await
        {
            Ok(Some(zone)) => {
                let message = format!("Successfully connected to zone: {}", zone.name);
                Verification::valid(zone.name, message)
            }
            Ok(None) => Verification::invalid("Invalid credentials or zone ID"),
            Err(message) => Verification::invalid(message),
        }
    }

    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "...", "content": "...", "proxied": true, "ttl": 1}
    /// ```
    async fn create_record(&self, record: &RecordRequest) -> ProviderOutcome<String> {
        let body = NewRecord {
            record_type: record.record_type.as_str(),
            name: &record.name,
            content: &record.content,
            proxied: record.proxied,
            ttl: if record.proxied {
                AUTOMATIC_TTL
            } else {
                DNS_ONLY_TTL
            },
        };

        tracing::info!(
            "Creating Cloudflare {} record: {} -> {} (proxied: {})",
            body.record_type,
            body.name,
            body.content,
            body.proxied
        );

        let fallback = "Failed to create DNS record";
        match self
            .call::<DnsRecord>(self.client.post(self.records_url()).json(&body), fallback)
            .await
        {
            Ok(Some(created)) => ProviderOutcome::success(
                created.id,
                format!("DNS record created: {} → {}", created.name, created.content),
            ),
            Ok(None) => ProviderOutcome::failure(fallback),
            Err(message) => ProviderOutcome::failure(message),
        }
    }

    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// {"proxied": false}
    /// ```
    async fn update_record_proxy(&self, record_id: &str, proxied: bool) -> ProviderOutcome<()> {
        tracing::info!(
            "Setting proxied={} on Cloudflare record {}",
            proxied,
            record_id
        );

        let request = self
            .client
            .patch(self.record_url(record_id))
            .json(&serde_json::json!({ "proxied": proxied }));

        match self
            .call::<serde_json::Value>(request, "Failed to update proxy setting")
            .await
        {
            Ok(_) => ProviderOutcome::success(
                (),
                format!(
                    "Proxy mode {} for DNS record",
                    if proxied { "enabled" } else { "disabled" }
                ),
            ),
            Err(message) => ProviderOutcome::failure(message),
        }
    }

    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_record(&self, record_id: &str) -> ProviderOutcome<()> {
        tracing::info!("Deleting Cloudflare record {}", record_id);

        match self
            .call::<serde_json::Value>(
                self.client.delete(self.record_url(record_id)),
                "Failed to delete DNS record",
            )
            .await
        {
            Ok(_) => ProviderOutcome::success((), "DNS record deleted successfully"),
            Err(message) => ProviderOutcome::failure(message),
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Cloudflare providers from stored credentials
#[derive(Debug, Clone)]
pub struct CloudflareFactory {
    api_base: String,
    timeout: Duration,
}

impl CloudflareFactory {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(settings.api_base.clone(), settings.timeout())
    }
}

impl Default for CloudflareFactory {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_API_BASE, DEFAULT_HTTP_TIMEOUT)
    }
}

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &DnsProviderConfig) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(CloudflareProvider::new(
            self.api_base.clone(),
            config.api_token.clone(),
            config.zone_id.clone(),
            self.timeout,
        )?))
    }
}
