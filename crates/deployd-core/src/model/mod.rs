//! Data model
//!
//! - [`Deployment`]: one managed application bound to a domain
//! - [`DeploymentLog`]: append-only event record of a deployment
//! - [`DnsProviderConfig`]: the operator's provider credentials (singleton)

pub mod deployment;
pub mod dns_config;
pub mod log;
pub mod validate;

pub use deployment::{
    DEFAULT_BRANCH, DEFAULT_PORT, Deployment, DeploymentKind, DeploymentPatch, DeploymentSource,
    DeploymentSpec, NewDeployment, UpdateDeployment,
};
pub use dns_config::{DnsConfigUpdate, DnsConfigView, DnsProviderConfig, MASKED_SECRET, NewDnsConfig};
pub use log::{DeploymentLog, LogLevel, NewLog};
