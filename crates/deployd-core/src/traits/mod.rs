//! Core traits for deployd
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DeploymentStore`]: Local source of truth
//! - [`DnsProvider`]: Record management via provider APIs
//! - [`HostAddress`]: Address provisioned records point at
//! - [`ContainerRuntime`]: Launch step of a deploy

pub mod dns_provider;
pub mod host_address;
pub mod runtime;
pub mod store;

pub use dns_provider::{
    DnsProvider, DnsProviderFactory, ProviderOutcome, RecordRequest, RecordType, Verification,
};
pub use host_address::{HostAddress, StaticHostAddress};
pub use runtime::ContainerRuntime;
pub use store::DeploymentStore;
