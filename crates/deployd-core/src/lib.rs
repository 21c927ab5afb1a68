// # deployd-core
//
// Core library for deployd.
//
// ## Architecture Overview
//
// deployd keeps an external DNS provider's record set consistent with the
// deployments an operator registers locally:
// - **DeploymentStore**: Trait for the local source of truth (deployments, logs, credentials)
// - **DnsProvider**: Trait for record create/update/delete against a provider API
// - **HostAddress**: Trait for resolving the address new A records point at
// - **ContainerRuntime**: Trait for the (stubbed) container launch step
// - **Lifecycle**: The deployment state machine, independent of DNS
// - **Reconciler**: Drives store and provider through each operation and owns
//   all partial-failure handling
//
// ## Design Principles
//
// 1. **Local state stays truthful**: `dns_record_id` is only written after the
//    provider confirmed the record exists
// 2. **Fresh credentials**: provider clients are built from the stored config on
//    every DNS-touching call
// 3. **No retries**: failed operations are re-triggered by the operator

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod reconciler;
pub mod runtime;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{DeploydConfig, HostAddressConfig, ProviderSettings, ServerConfig, StoreConfig};
pub use error::{Error, Result};
pub use lifecycle::{DeploymentStatus, Transition};
pub use model::{
    Deployment, DeploymentLog, DeploymentSource, DnsProviderConfig, LogLevel, NewDeployment,
    UpdateDeployment,
};
pub use reconciler::{DeploymentDetail, DnsChange, Reconciler};
pub use runtime::NoopRuntime;
pub use store::{FileStore, MemoryStore};
pub use traits::{ContainerRuntime, DeploymentStore, DnsProvider, DnsProviderFactory, HostAddress};
