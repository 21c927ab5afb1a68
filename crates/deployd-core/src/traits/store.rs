// # Deployment Store Trait
//
// Defines the interface for the local source of truth.
//
// ## Purpose
//
// The store holds:
// - Deployments and their DNS record references
// - The append-only log of every deployment
// - The singleton DNS provider credentials
//
// ## Implementations
//
// - Memory: `MemoryStore` (tests, throwaway instances)
// - File-based: `FileStore` (JSON snapshot with atomic writes)
//
// ## Usage
//
// ```rust,no_run
// use deployd_core::store::MemoryStore;
// use deployd_core::traits::DeploymentStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = MemoryStore::new();
//     let deployments = store.list_deployments().await?;
//     assert!(deployments.is_empty());
//     Ok(())
// }
// ```

use crate::model::{
    Deployment, DeploymentLog, DeploymentPatch, DeploymentSpec, DnsConfigUpdate,
    DnsProviderConfig, NewDnsConfig, NewLog,
};
use async_trait::async_trait;

/// Trait for deployment store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Atomicity
///
/// Each method is one logical unit: a status change and its log entry,
/// an insert and its creation log, or the removal of a deployment's logs
/// followed by its row are never observable half-applied.
///
/// # Responsibilities
///
/// - ✅ Persist and query local state
/// - ✅ Assign ids and timestamps
/// - ❌ Call DNS providers (owned by `Reconciler`)
/// - ❌ Decide lifecycle transitions (owned by `lifecycle`)
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Get the stored provider credentials
    ///
    /// # Returns
    ///
    /// - `Ok(Some(config))`: credentials are configured
    /// - `Ok(None)`: nothing stored yet
    async fn dns_config(&self) -> Result<Option<DnsProviderConfig>, crate::Error>;

    /// Store the provider credentials
    ///
    /// Fails with `Error::Conflict` if a config already exists.
    async fn create_dns_config(
        &self,
        input: NewDnsConfig,
    ) -> Result<DnsProviderConfig, crate::Error>;

    /// Partially update the provider credentials
    ///
    /// Fails with `Error::NotFound` if `id` is not the stored config.
    async fn update_dns_config(
        &self,
        id: u64,
        update: DnsConfigUpdate,
    ) -> Result<DnsProviderConfig, crate::Error>;

    /// List all deployments, newest first
    async fn list_deployments(&self) -> Result<Vec<Deployment>, crate::Error>;

    /// Get one deployment
    async fn get_deployment(&self, id: u64) -> Result<Option<Deployment>, crate::Error>;

    /// Find the deployment that owns a provider record
    async fn find_by_dns_record(
        &self,
        record_id: &str,
    ) -> Result<Option<Deployment>, crate::Error>;

    /// Insert a new `pending` deployment together with its creation log
    async fn insert_deployment(
        &self,
        spec: DeploymentSpec,
        log: NewLog,
    ) -> Result<Deployment, crate::Error>;

    /// Apply a patch and optionally append a log entry, atomically
    ///
    /// Fails with `Error::NotFound` if the deployment does not exist.
    async fn update_deployment(
        &self,
        id: u64,
        patch: DeploymentPatch,
        log: Option<NewLog>,
    ) -> Result<Deployment, crate::Error>;

    /// Delete a deployment's logs, then the deployment
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: deleted
    /// - `Ok(false)`: there was nothing to delete
    async fn delete_deployment(&self, id: u64) -> Result<bool, crate::Error>;

    /// Logs of a deployment, oldest first
    async fn logs(&self, deployment_id: u64) -> Result<Vec<DeploymentLog>, crate::Error>;

    /// Append a log entry
    ///
    /// Fails with `Error::NotFound` if the deployment does not exist.
    async fn append_log(
        &self,
        deployment_id: u64,
        log: NewLog,
    ) -> Result<DeploymentLog, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
