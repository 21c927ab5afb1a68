//! DNS provider credentials
//!
//! A single row holds the operator's credentials. The API token is stored in
//! plaintext by the store but is never echoed back: responses use
//! [`DnsConfigView`], and every `Debug` impl here redacts it.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder substituted for the API token in every response
pub const MASKED_SECRET: &str = "••••••••";

/// Stored provider credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsProviderConfig {
    pub id: u64,
    /// ⚠️ NEVER log this value
    pub api_token: String,
    pub zone_id: String,
    /// Zone name as last reported by the provider
    pub zone_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DnsProviderConfig {
    pub(crate) fn from_input(id: u64, input: NewDnsConfig, now: DateTime<Utc>) -> Self {
        Self {
            id,
            api_token: input.api_token,
            zone_id: input.zone_id,
            zone_name: input.zone_name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update (last writer wins)
    pub(crate) fn apply(&mut self, update: DnsConfigUpdate, now: DateTime<Utc>) {
        if let Some(token) = update.api_token {
            self.api_token = token;
        }
        if let Some(zone_id) = update.zone_id {
            self.zone_id = zone_id;
        }
        if let Some(zone_name) = update.zone_name {
            self.zone_name = zone_name;
        }
        self.updated_at = now;
    }

    /// Response-safe view with the token masked
    pub fn view(&self) -> DnsConfigView {
        DnsConfigView {
            id: self.id,
            api_token: MASKED_SECRET.to_string(),
            zone_id: self.zone_id.clone(),
            zone_name: self.zone_name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for DnsProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsProviderConfig")
            .field("id", &self.id)
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("zone_name", &self.zone_name)
            .finish()
    }
}

/// Credentials as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfigView {
    pub id: u64,
    pub api_token: String,
    pub zone_id: String,
    pub zone_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create request for the singleton config
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDnsConfig {
    pub api_token: String,
    pub zone_id: String,
    pub zone_name: String,
}

impl NewDnsConfig {
    pub fn validate(mut self) -> Result<Self> {
        self.api_token = self.api_token.trim().to_string();
        self.zone_id = self.zone_id.trim().to_string();
        self.zone_name = self.zone_name.trim().to_string();

        if self.api_token.is_empty() || self.api_token == MASKED_SECRET {
            return Err(Error::validation("apiToken", "API token is required"));
        }
        if self.zone_id.is_empty() {
            return Err(Error::validation("zoneId", "Zone ID is required"));
        }
        Ok(self)
    }
}

impl fmt::Debug for NewDnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewDnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("zone_name", &self.zone_name)
            .finish()
    }
}

/// Partial update for the singleton config
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfigUpdate {
    pub api_token: Option<String>,
    pub zone_id: Option<String>,
    pub zone_name: Option<String>,
}

impl DnsConfigUpdate {
    /// Normalize and check the update
    ///
    /// A token equal to [`MASKED_SECRET`] is what a client gets back from a
    /// read, so sending it again means "keep the stored token".
    pub fn validate(mut self) -> Result<Self> {
        self.api_token = self
            .api_token
            .map(|t| t.trim().to_string())
            .filter(|t| t != MASKED_SECRET);
        if self.api_token.as_deref() == Some("") {
            return Err(Error::validation("apiToken", "API token cannot be empty"));
        }

        self.zone_id = self.zone_id.map(|z| z.trim().to_string());
        if self.zone_id.as_deref() == Some("") {
            return Err(Error::validation("zoneId", "Zone ID cannot be empty"));
        }

        self.zone_name = self.zone_name.map(|z| z.trim().to_string());
        Ok(self)
    }
}

impl fmt::Debug for DnsConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsConfigUpdate")
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .field("zone_id", &self.zone_id)
            .field("zone_name", &self.zone_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DnsProviderConfig {
        DnsProviderConfig::from_input(
            1,
            NewDnsConfig {
                api_token: "secret_token_12345".to_string(),
                zone_id: "zone-1".to_string(),
                zone_name: "example.com".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let debug_str = format!("{:?}", config());
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("DnsProviderConfig"));
    }

    #[test]
    fn test_view_masks_token() {
        let view = config().view();
        assert_eq!(view.api_token, MASKED_SECRET);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret_token"));
    }

    #[test]
    fn test_masked_token_in_update_keeps_stored_token() {
        let update = DnsConfigUpdate {
            api_token: Some(MASKED_SECRET.to_string()),
            zone_name: Some("example.org".to_string()),
            ..DnsConfigUpdate::default()
        }
        .validate()
        .unwrap();

        let mut stored = config();
        stored.apply(update, Utc::now());
        assert_eq!(stored.api_token, "secret_token_12345");
        assert_eq!(stored.zone_name, "example.org");
    }

    #[test]
    fn test_create_requires_token_and_zone() {
        let err = NewDnsConfig {
            zone_id: "zone".to_string(),
            ..NewDnsConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field.as_deref() == Some("apiToken")));

        let err = NewDnsConfig {
            api_token: "token".to_string(),
            ..NewDnsConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field.as_deref() == Some("zoneId")));
    }
}
