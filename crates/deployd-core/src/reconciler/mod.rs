//! Deployment/DNS reconciler
//!
//! The Reconciler is the only component that talks to both the
//! [`DeploymentStore`] and a [`DnsProvider`]. It is responsible for:
//! - Validating operator input before anything is persisted
//! - Driving the lifecycle state machine and its audit log
//! - Keeping `dns_record_id` truthful across provider failures
//! - Serialising operations per deployment
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!   API request ───▶ │  Reconciler  │
//!                    └──────────────┘
//!                            │
//!         ┌──────────────────┼──────────────────┬─────────────────┐
//!         │                  │                  │                 │
//!         ▼                  ▼                  ▼                 ▼
//! ┌───────────────┐ ┌─────────────────┐ ┌─────────────┐ ┌──────────────────┐
//! │DeploymentStore│ │DnsProviderFactory│ │ HostAddress │ │ ContainerRuntime │
//! └───────────────┘ └─────────────────┘ └─────────────┘ └──────────────────┘
//!                            │
//!                            ▼
//!                    ┌──────────────┐
//!                    │ DnsProvider  │ (built per call from stored credentials)
//!                    └──────────────┘
//! ```
//!
//! ## Partial Failure Rules
//!
//! - Provider failure in `provision_dns`/`toggle_proxy`: surfaced, local
//!   state unchanged
//! - Store failure right after a record was created: the record is deleted
//!   again before the error is surfaced
//! - Provider failure in `delete_deployment`: logged, deletion proceeds and
//!   the record may be left at the provider

use crate::error::{Error, Result};
use crate::lifecycle::{Next, Transition};
use crate::model::{
    Deployment, DeploymentLog, DeploymentPatch, DnsConfigUpdate, DnsConfigView,
    DnsProviderConfig, NewDeployment, NewDnsConfig, NewLog, UpdateDeployment,
};
use crate::runtime::NoopRuntime;
use crate::traits::{
    ContainerRuntime, DeploymentStore, DnsProvider, DnsProviderFactory, HostAddress,
    ProviderOutcome, RecordRequest, Verification,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

type LockMap = SyncMutex<HashMap<u64, Arc<Mutex<()>>>>;

/// A deployment together with its audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentDetail {
    pub deployment: Deployment,
    /// Oldest first
    pub logs: Vec<DeploymentLog>,
}

/// Result of a successful DNS mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsChange {
    /// The deployment after the change was persisted
    pub deployment: Deployment,
    /// Provider message
    pub message: String,
}

/// Deployment/DNS reconciler
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
pub struct Reconciler {
    /// Local source of truth
    store: Arc<dyn DeploymentStore>,

    /// Builds provider clients from the stored credentials
    providers: Arc<dyn DnsProviderFactory>,

    /// Address new records point at
    host: Arc<dyn HostAddress>,

    /// Launch step of a deploy
    runtime: Arc<dyn ContainerRuntime>,

    /// Per-deployment operation locks, present only while held or awaited
    locks: Arc<LockMap>,
}

impl Reconciler {
    /// Create a reconciler with the no-op container runtime
    pub fn new(
        store: Arc<dyn DeploymentStore>,
        providers: Arc<dyn DnsProviderFactory>,
        host: Arc<dyn HostAddress>,
    ) -> Self {
        Self {
            store,
            providers,
            host,
            runtime: Arc::new(NoopRuntime),
            locks: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    /// Replace the container runtime
    pub fn with_runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    // ----------------------------------------------------------------------
    // Reads
    // ----------------------------------------------------------------------

    /// All deployments, newest first
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.store.list_deployments().await
    }

    /// A deployment and its logs
    pub async fn deployment_with_logs(&self, id: u64) -> Result<DeploymentDetail> {
        let deployment = self.require(id).await?;
        let logs = self.store.logs(id).await?;
        Ok(DeploymentDetail { deployment, logs })
    }

    /// A deployment's logs, oldest first
    pub async fn deployment_logs(&self, id: u64) -> Result<Vec<DeploymentLog>> {
        self.require(id).await?;
        self.store.logs(id).await
    }

    /// Resolve the deployment that owns a provider record
    pub async fn deployment_for_record(&self, record_id: &str) -> Result<Deployment> {
        self.store
            .find_by_dns_record(record_id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("No deployment owns DNS record {}", record_id))
            })
    }

    // ----------------------------------------------------------------------
    // Deployment operations
    // ----------------------------------------------------------------------

    /// Validate and persist a new `pending` deployment
    ///
    /// Does not provision DNS.
    pub async fn create_deployment(&self, input: NewDeployment) -> Result<Deployment> {
        let spec = input.validate()?;
        let log = NewLog::info(format!("Deployment \"{}\" created", spec.name));

        let deployment = self.store.insert_deployment(spec, log).await?;
        info!(
            "Created deployment {} ({}) for {}",
            deployment.id, deployment.name, deployment.domain
        );
        Ok(deployment)
    }

    /// Apply a partial update
    ///
    /// A proxy change on a deployment with a record goes through the
    /// provider first. The domain cannot change while a record exists.
    pub async fn update_deployment(&self, id: u64, input: UpdateDeployment) -> Result<Deployment> {
        let _guard = self.lock(id).await;

        let current = self.require(id).await?;
        let spec = input.merge(&current)?;

        if let Some(record_id) = current.dns_record_id.as_deref() {
            if spec.domain != current.domain {
                return Err(Error::validation(
                    "domain",
                    "Domain cannot change while a DNS record exists",
                ));
            }

            if spec.is_proxied != current.is_proxied {
                let provider = self.provider().await?;
                provider
                    .update_record_proxy(record_id, spec.is_proxied)
                    .await
                    .into_result(provider.provider_name())
                    .inspect_err(|e| warn!("Proxy update for deployment {} failed: {}", id, e))?;
            }
        }

        let updated = self
            .store
            .update_deployment(
                id,
                DeploymentPatch::spec(spec),
                Some(NewLog::info("Deployment updated")),
            )
            .await?;
        info!("Updated deployment {}", id);
        Ok(updated)
    }

    /// Run the deploy transition
    ///
    /// Appends the start and build/pull logs, invokes the container runtime,
    /// then moves to `running` together with the success log. A runtime
    /// failure moves the deployment to `stopped` with one error log.
    pub async fn deploy(&self, id: u64) -> Result<Deployment> {
        let _guard = self.lock(id).await;

        let deployment = self.require(id).await?;
        let Next::Status(next) = deployment.status.apply(Transition::Deploy)? else {
            return Err(Error::conflict("Deploy cannot delete a deployment"));
        };

        info!("Deploying {} ({})", deployment.id, deployment.name);
        self.store
            .append_log(
                id,
                NewLog::info(format!("Starting deployment for {}", deployment.name)),
            )
            .await?;
        self.store
            .append_log(id, NewLog::info(deployment.source.build_step()))
            .await?;

        if let Err(e) = self.runtime.launch(&deployment).await {
            error!("Deployment {} failed to launch: {}", id, e);
            self.record_launch_failure(&deployment, &e).await?;
            return Err(match e {
                Error::Runtime(_) => e,
                other => Error::runtime(other.to_string()),
            });
        }

        let deployed = self
            .store
            .update_deployment(
                id,
                DeploymentPatch::status(next),
                Some(NewLog::success(format!(
                    "Container started on port {}",
                    deployment.port
                ))),
            )
            .await?;
        info!("Deployment {} is {}", id, deployed.status);
        Ok(deployed)
    }

    async fn record_launch_failure(&self, deployment: &Deployment, cause: &Error) -> Result<()> {
        let log = NewLog::error(format!("Deployment failed: {}", cause));

        match deployment.status.apply(Transition::Stop) {
            Ok(Next::Status(stopped)) => {
                self.store
                    .update_deployment(deployment.id, DeploymentPatch::status(stopped), Some(log))
                    .await?;
            }
            // Already stopped: keep the status, still record the failure
            _ => {
                self.store.append_log(deployment.id, log).await?;
            }
        }
        Ok(())
    }

    /// Create the A record for a deployment's domain
    ///
    /// Fails with `Conflict` without contacting the provider when the
    /// deployment already has a record.
    pub async fn provision_dns(&self, id: u64) -> Result<DnsChange> {
        let _guard = self.lock(id).await;

        let deployment = self.require(id).await?;
        if let Some(existing) = &deployment.dns_record_id {
            return Err(Error::conflict(format!(
                "Deployment {} already has DNS record {}",
                id, existing
            )));
        }

        let provider = self.provider().await?;
        let address = self.host.current().await?;
        let request = RecordRequest::address(&deployment.domain, address, deployment.is_proxied);

        debug!(
            "Creating {} record {} -> {} (proxied: {})",
            request.record_type, request.name, request.content, request.proxied
        );
        let (record_id, message) = match provider.create_record(&request).await {
            ProviderOutcome::Success { payload, message } => (payload, message),
            ProviderOutcome::Failure { message } => {
                warn!(
                    "DNS record creation for {} failed: {}",
                    deployment.domain, message
                );
                return Err(Error::provider(provider.provider_name(), message));
            }
        };

        let persisted = self
            .store
            .update_deployment(
                id,
                DeploymentPatch::dns_record(record_id.clone()),
                Some(NewLog::success(format!(
                    "DNS record created for {}",
                    deployment.domain
                ))),
            )
            .await;

        match persisted {
            Ok(deployment) => {
                info!("DNS record {} created for {}", record_id, deployment.domain);
                Ok(DnsChange {
                    deployment,
                    message,
                })
            }
            Err(e) => {
                error!(
                    "Failed to persist DNS record {} for deployment {}: {}. Removing record.",
                    record_id, id, e
                );
                if let ProviderOutcome::Failure { message } =
                    provider.delete_record(&record_id).await
                {
                    error!("DNS record {} left at provider: {}", record_id, message);
                }
                Err(e)
            }
        }
    }

    /// Set the proxy flag of a deployment's record
    ///
    /// `record_id` must match the stored reference. Local state only changes
    /// after the provider confirmed the update.
    pub async fn toggle_proxy(&self, id: u64, record_id: &str, proxied: bool) -> Result<DnsChange> {
        let _guard = self.lock(id).await;

        let deployment = self.require(id).await?;
        let stored = deployment
            .dns_record_id
            .as_deref()
            .ok_or(Error::NoDnsRecord(id))?;
        if stored != record_id {
            return Err(Error::validation(
                "recordId",
                format!("Record {} does not belong to deployment {}", record_id, id),
            ));
        }

        let provider = self.provider().await?;
        let ((), message) = provider
            .update_record_proxy(record_id, proxied)
            .await
            .into_result(provider.provider_name())
            .inspect_err(|e| warn!("Proxy update for {} failed: {}", deployment.domain, e))?;

        let state = if proxied { "enabled" } else { "disabled" };
        let deployment = self
            .store
            .update_deployment(
                id,
                DeploymentPatch::proxied(proxied),
                Some(NewLog::info(format!(
                    "Proxy {} for {}",
                    state, deployment.domain
                ))),
            )
            .await?;
        info!("Proxy {} for deployment {}", state, id);

        Ok(DnsChange {
            deployment,
            message,
        })
    }

    /// Delete a deployment, removing its DNS record first
    ///
    /// Record removal is best effort: a missing config or a provider
    /// failure is logged and the local deletion still happens.
    pub async fn delete_deployment(&self, id: u64) -> Result<()> {
        let _guard = self.lock(id).await;

        let deployment = self.require(id).await?;
        if let Some(record_id) = deployment.dns_record_id.as_deref() {
            self.remove_record_best_effort(&deployment, record_id).await;
        }

        if !self.store.delete_deployment(id).await? {
            return Err(Error::not_found(format!("Deployment {} not found", id)));
        }
        info!("Deleted deployment {} ({})", id, deployment.name);

        Ok(())
    }

    async fn remove_record_best_effort(&self, deployment: &Deployment, record_id: &str) {
        let provider = match self.provider().await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    "Cannot remove DNS record {} for {}: {}. Record left at provider.",
                    record_id, deployment.domain, e
                );
                return;
            }
        };

        match provider.delete_record(record_id).await {
            ProviderOutcome::Success { .. } => {
                info!("DNS record {} deleted for {}", record_id, deployment.domain)
            }
            ProviderOutcome::Failure { message } => warn!(
                "DNS record {} for {} could not be deleted: {}. Record left at provider.",
                record_id, deployment.domain, message
            ),
        }
    }

    // ----------------------------------------------------------------------
    // Settings
    // ----------------------------------------------------------------------

    /// Stored credentials with the token masked
    pub async fn dns_config_view(&self) -> Result<Option<DnsConfigView>> {
        Ok(self.store.dns_config().await?.map(|c| c.view()))
    }

    /// Create the singleton credentials row
    pub async fn create_dns_config(&self, input: NewDnsConfig) -> Result<DnsConfigView> {
        let input = input.validate()?;
        let config = self.store.create_dns_config(input).await?;
        info!("DNS provider configuration created for zone {}", config.zone_id);
        Ok(config.view())
    }

    /// Partially update the credentials row
    pub async fn update_dns_config(&self, id: u64, update: DnsConfigUpdate) -> Result<DnsConfigView> {
        let update = update.validate()?;
        let config = self.store.update_dns_config(id, update).await?;
        info!("DNS provider configuration {} updated", id);
        Ok(config.view())
    }

    /// Check credentials without storing them
    ///
    /// Never fails: every problem is reported as `valid: false`.
    pub async fn verify_credentials(&self, api_token: &str, zone_id: &str) -> Verification {
        let input = NewDnsConfig {
            api_token: api_token.to_string(),
            zone_id: zone_id.to_string(),
            zone_name: String::new(),
        };
        let input = match input.validate() {
            Ok(input) => input,
            Err(e) => return Verification::invalid(e.to_string()),
        };

        let candidate = DnsProviderConfig::from_input(0, input, Utc::now());
        match self.providers.create(&candidate) {
            Ok(provider) => provider.verify_credentials().await,
            Err(e) => Verification::invalid(e.to_string()),
        }
    }

    // ----------------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------------

    async fn require(&self, id: u64) -> Result<Deployment> {
        self.store
            .get_deployment(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Deployment {} not found", id)))
    }

    /// Build a provider client from the credentials as stored right now
    async fn provider(&self) -> Result<Box<dyn DnsProvider>> {
        let config = self.store.dns_config().await?.ok_or(Error::ConfigMissing)?;
        self.providers.create(&config)
    }

    async fn lock(&self, id: u64) -> OperationGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };

        OperationGuard {
            guard: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
            id,
        }
    }
}

/// Held for the duration of one operation on a deployment
///
/// On drop the map entry is removed unless another caller still holds or
/// awaits it, so ids that never existed leave nothing behind.
struct OperationGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    id: u64,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        // Release first so the entry's only remaining owner is the map
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DeploymentStatus;
    use crate::model::DeploymentKind;
    use crate::store::MemoryStore;
    use crate::traits::StaticHostAddress;

    struct NoProviders;

    impl DnsProviderFactory for NoProviders {
        fn create(&self, _config: &DnsProviderConfig) -> Result<Box<dyn DnsProvider>> {
            Err(Error::config("no provider in this test"))
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Arc::new(MemoryStore::new()),
            Arc::new(NoProviders),
            Arc::new(StaticHostAddress::default()),
        )
    }

    fn input() -> NewDeployment {
        NewDeployment {
            name: "api".to_string(),
            domain: "api.example.com".to_string(),
            deployment_type: Some(DeploymentKind::Local),
            docker_image: Some("nginx:latest".to_string()),
            ..NewDeployment::default()
        }
    }

    #[tokio::test]
    async fn test_create_logs_creation() {
        let reconciler = reconciler();
        let created = reconciler.create_deployment(input()).await.unwrap();

        let logs = reconciler.deployment_logs(created.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "Deployment \"api\" created");
    }

    #[tokio::test]
    async fn test_update_without_record_changes_proxy_locally() {
        let reconciler = reconciler();
        let created = reconciler.create_deployment(input()).await.unwrap();

        let update = UpdateDeployment {
            is_proxied: Some(false),
            port: Some("8080".to_string()),
            ..UpdateDeployment::default()
        };
        let updated = reconciler.update_deployment(created.id, update).await.unwrap();
        assert!(!updated.is_proxied);
        assert_eq!(updated.port, "8080");
        assert_eq!(updated.status, DeploymentStatus::Pending);

        let logs = reconciler.deployment_logs(created.id).await.unwrap();
        assert_eq!(logs.last().unwrap().message, "Deployment updated");
    }

    #[tokio::test]
    async fn test_verify_rejects_blank_input_without_provider() {
        let verification = reconciler().verify_credentials("", "zone").await;
        assert!(!verification.valid);
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_operations() {
        let reconciler = reconciler();
        let created = reconciler.create_deployment(input()).await.unwrap();

        reconciler.deploy(created.id).await.unwrap();
        assert!(reconciler.locks.lock().unwrap().is_empty());

        reconciler.delete_deployment(created.id).await.unwrap();
        assert!(reconciler.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_leave_no_lock_entries() {
        let reconciler = reconciler();

        for id in 1..=100 {
            assert!(matches!(reconciler.deploy(id).await, Err(Error::NotFound(_))));
            assert!(matches!(reconciler.provision_dns(id).await, Err(Error::NotFound(_))));
            assert!(matches!(
                reconciler.toggle_proxy(id, "abc", true).await,
                Err(Error::NotFound(_))
            ));
            assert!(matches!(
                reconciler.update_deployment(id, UpdateDeployment::default()).await,
                Err(Error::NotFound(_))
            ));
            assert!(matches!(reconciler.delete_deployment(id).await, Err(Error::NotFound(_))));
        }

        assert!(reconciler.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_waiting_caller_keeps_lock_entry() {
        let reconciler = reconciler();
        let created = reconciler.create_deployment(input()).await.unwrap();

        let held = reconciler.lock(created.id).await;
        let waiter = reconciler.locks.lock().unwrap().get(&created.id).cloned().unwrap();
        drop(held);
        assert!(reconciler.locks.lock().unwrap().contains_key(&created.id));

        drop(waiter);
        let again = reconciler.lock(created.id).await;
        drop(again);
        assert!(reconciler.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dns_config_view_masks_token() {
        let reconciler = reconciler();
        assert!(reconciler.dns_config_view().await.unwrap().is_none());

        reconciler
            .create_dns_config(NewDnsConfig {
                api_token: "secret".to_string(),
                zone_id: "zone".to_string(),
                zone_name: "example.com".to_string(),
            })
            .await
            .unwrap();

        let view = reconciler.dns_config_view().await.unwrap().unwrap();
        assert_eq!(view.api_token, crate::model::MASKED_SECRET);
    }
}
