// # Host Address Trait
//
// Resolves the address that provisioned A records point at.
//
// ## Implementations
//
// - Static: [`StaticHostAddress`] (configured address)
// - HTTP: `deployd-ip-http` crate (public address discovery)

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for host address sources
///
/// Called once per `provision_dns`. Implementations must not cache beyond a
/// single call unless the address is static.
#[async_trait]
pub trait HostAddress: Send + Sync {
    /// Get the address new records should point at
    async fn current(&self) -> Result<IpAddr, crate::Error>;
}

/// A fixed, configured host address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHostAddress(pub IpAddr);

impl StaticHostAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl Default for StaticHostAddress {
    fn default() -> Self {
        Self(IpAddr::from([127, 0, 0, 1]))
    }
}

#[async_trait]
impl HostAddress for StaticHostAddress {
    async fn current(&self) -> Result<IpAddr, crate::Error> {
        Ok(self.0)
    }
}
