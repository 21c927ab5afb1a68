// # Memory Store
//
// In-memory implementation of DeploymentStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and throwaway instances.
//
// ## Crash Behavior
//
// - All deployments, logs and credentials are lost on restart/crash
// - DNS records provisioned before the crash become orphans at the provider

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::tables::Tables;
use crate::Error;
use crate::model::{
    Deployment, DeploymentLog, DeploymentPatch, DeploymentSpec, DnsConfigUpdate,
    DnsProviderConfig, NewDnsConfig, NewLog,
};
use crate::traits::DeploymentStore;

/// In-memory store implementation
///
/// All tables live behind one RwLock, so every trait method is atomic.
///
/// # Example
///
/// ```rust,no_run
/// use deployd_core::model::{DeploymentKind, NewDeployment, NewLog};
/// use deployd_core::store::MemoryStore;
/// use deployd_core::traits::DeploymentStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///
///     let spec = NewDeployment {
///         name: "api".to_string(),
///         domain: "api.example.com".to_string(),
///         deployment_type: Some(DeploymentKind::Local),
///         docker_image: Some("nginx:latest".to_string()),
///         ..NewDeployment::default()
///     }
///     .validate()?;
///
///     let deployment = store.insert_deployment(spec, NewLog::info("created")).await?;
///     assert_eq!(store.logs(deployment.id).await?.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of deployments in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.deployment_count()
    }

    /// Check if the store holds no deployments
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn dns_config(&self) -> Result<Option<DnsProviderConfig>, Error> {
        Ok(self.inner.read().await.dns_config())
    }

    async fn create_dns_config(&self, input: NewDnsConfig) -> Result<DnsProviderConfig, Error> {
        self.inner.write().await.create_dns_config(input)
    }

    async fn update_dns_config(
        &self,
        id: u64,
        update: DnsConfigUpdate,
    ) -> Result<DnsProviderConfig, Error> {
        self.inner.write().await.update_dns_config(id, update)
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, Error> {
        Ok(self.inner.read().await.list_deployments())
    }

    async fn get_deployment(&self, id: u64) -> Result<Option<Deployment>, Error> {
        Ok(self.inner.read().await.get_deployment(id))
    }

    async fn find_by_dns_record(&self, record_id: &str) -> Result<Option<Deployment>, Error> {
        Ok(self.inner.read().await.find_by_dns_record(record_id))
    }

    async fn insert_deployment(
        &self,
        spec: DeploymentSpec,
        log: NewLog,
    ) -> Result<Deployment, Error> {
        Ok(self.inner.write().await.insert_deployment(spec, log))
    }

    async fn update_deployment(
        &self,
        id: u64,
        patch: DeploymentPatch,
        log: Option<NewLog>,
    ) -> Result<Deployment, Error> {
        self.inner.write().await.update_deployment(id, patch, log)
    }

    async fn delete_deployment(&self, id: u64) -> Result<bool, Error> {
        Ok(self.inner.write().await.delete_deployment(id))
    }

    async fn logs(&self, deployment_id: u64) -> Result<Vec<DeploymentLog>, Error> {
        Ok(self.inner.read().await.logs(deployment_id))
    }

    async fn append_log(&self, deployment_id: u64, log: NewLog) -> Result<DeploymentLog, Error> {
        self.inner.write().await.append_log(deployment_id, log)
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for memory store (everything is already "persisted")
        Ok(())
    }
}
