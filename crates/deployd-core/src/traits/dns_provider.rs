// # DNS Provider Trait
//
// Defines the interface for managing DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `deployd-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use deployd_core::traits::{DnsProvider, RecordRequest};
//
// let provider = /* DnsProvider implementation */;
// let outcome = provider
//     .create_record(&RecordRequest::address("api.example.com", ip, true))
//     .await;
// if let ProviderOutcome::Success { payload: record_id, .. } = outcome {
//     // persist record_id
// }
// ```

use crate::model::DnsProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Two-outcome result of every provider call
///
/// The provider's raw response schema never leaves the client: transport
/// failures, timeouts, non-2xx statuses, `success: false` bodies and
/// unparseable bodies all collapse into `Failure`. A caller that sees
/// `Success` knows the mutation happened; anything else is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome<T> {
    /// The provider confirmed the operation
    Success {
        /// Operation payload (e.g. the created record id)
        payload: T,
        /// Human-readable message
        message: String,
    },
    /// The provider rejected the request or could not be reached
    Failure {
        /// Human-readable message, taken from the provider when available
        message: String,
    },
}

impl<T> ProviderOutcome<T> {
    pub fn success(payload: T, message: impl Into<String>) -> Self {
        Self::Success {
            payload,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Failure { message } => message,
        }
    }

    /// Convert into a `Result`, mapping `Failure` to [`crate::Error::Provider`]
    pub fn into_result(self, provider: &str) -> crate::Result<(T, String)> {
        match self {
            Self::Success { payload, message } => Ok((payload, message)),
            Self::Failure { message } => Err(crate::Error::provider(provider, message)),
        }
    }
}

/// Result of a credential check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    pub message: String,
}

impl Verification {
    pub fn valid(zone_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: true,
            zone_name: Some(zone_name.into()),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            zone_name: None,
            message: message.into(),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record to create at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRequest {
    /// Fully qualified record name (the deployment's domain)
    pub name: String,
    /// Record content (the host address)
    pub content: String,
    pub record_type: RecordType,
    pub proxied: bool,
}

impl RecordRequest {
    /// Address record for `name`, typed by the IP version of `ip`
    pub fn address(name: impl Into<String>, ip: IpAddr, proxied: bool) -> Self {
        let record_type = match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::Aaaa,
        };

        Self {
            name: name.into(),
            content: ip.to_string(),
            record_type,
            proxied,
        }
    }
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - One request per call; no retries, no backoff, no caching
/// - No access to the deployment store
/// - Every request is bounded by a timeout; expiry is a `Failure`
/// - Methods never return `Err` and never panic: every outcome is a
///   [`ProviderOutcome`] (or a [`Verification`])
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Check the credentials against the configured zone
    async fn verify_credentials(&self) -> Verification;

    /// Create a record
    ///
    /// # Returns
    ///
    /// - `Success { payload: record_id, .. }`: the record exists at the provider
    /// - `Failure { message }`: nothing was created
    async fn create_record(&self, record: &RecordRequest) -> ProviderOutcome<String>;

    /// Set the proxied flag of an existing record
    async fn update_record_proxy(&self, record_id: &str, proxied: bool) -> ProviderOutcome<()>;

    /// Delete a record
    async fn delete_record(&self, record_id: &str) -> ProviderOutcome<()>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from the stored credentials
///
/// The reconciler calls this on every DNS-touching operation with the
/// config it just read, so rotated credentials take effect immediately.
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from credentials
    fn create(&self, config: &DnsProviderConfig) -> Result<Box<dyn DnsProvider>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_follows_ip_version() {
        let v4 = RecordRequest::address("api.example.com", IpAddr::from([10, 0, 0, 1]), true);
        assert_eq!(v4.record_type, RecordType::A);
        assert_eq!(v4.content, "10.0.0.1");

        let v6 = RecordRequest::address("api.example.com", "2001:db8::1".parse().unwrap(), false);
        assert_eq!(v6.record_type, RecordType::Aaaa);
    }

    #[test]
    fn test_outcome_into_result() {
        let ok: ProviderOutcome<String> = ProviderOutcome::success("abc".to_string(), "created");
        assert_eq!(ok.into_result("test").unwrap().0, "abc");

        let failed: ProviderOutcome<String> = ProviderOutcome::failure("zone locked");
        let err = failed.into_result("test").unwrap_err();
        assert!(matches!(err, crate::Error::Provider { ref message, .. } if message == "zone locked"));
    }

    #[test]
    fn test_verification_wire_shape() {
        let json = serde_json::to_value(Verification::invalid("Invalid API token")).unwrap();
        assert_eq!(json["valid"], false);
        assert!(json.get("zoneName").is_none());

        let json = serde_json::to_value(Verification::valid("example.com", "ok")).unwrap();
        assert_eq!(json["zoneName"], "example.com");
    }
}
