//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles count calls through shared `Arc` counters so a test can keep
//! a handle while the reconciler owns the boxed trait object.

#![allow(dead_code)]

use async_trait::async_trait;
use deployd_core::error::{Error, Result};
use deployd_core::model::{
    Deployment, DeploymentKind, DeploymentLog, DeploymentPatch, DeploymentSpec, DnsConfigUpdate,
    DnsProviderConfig, NewDeployment, NewDnsConfig, NewLog,
};
use deployd_core::store::MemoryStore;
use deployd_core::traits::{
    ContainerRuntime, DeploymentStore, DnsProvider, DnsProviderFactory, ProviderOutcome,
    RecordRequest, StaticHostAddress, Verification,
};
use deployd_core::Reconciler;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Address every test record points at
pub const HOST_IP: [u8; 4] = [203, 0, 113, 10];

/// Scripted provider behaviour, shared between the factory and its clients
#[derive(Debug, Clone)]
pub struct ProviderScript {
    /// Record id returned by a successful create
    pub record_id: String,
    pub fail_create: bool,
    pub fail_update: bool,
    pub fail_delete: bool,
}

impl Default for ProviderScript {
    fn default() -> Self {
        Self {
            record_id: "abc".to_string(),
            fail_create: false,
            fail_update: false,
            fail_delete: false,
        }
    }
}

/// Call counters and recorded requests
#[derive(Debug, Default)]
pub struct ProviderCalls {
    pub built: AtomicUsize,
    pub verify: AtomicUsize,
    pub create: AtomicUsize,
    pub update: AtomicUsize,
    pub delete: AtomicUsize,
    pub tokens: Mutex<Vec<String>>,
    pub created: Mutex<Vec<RecordRequest>>,
    pub deleted: Mutex<Vec<String>>,
    pub proxy_updates: Mutex<Vec<(String, bool)>>,
}

/// A mock DnsProvider that follows a [`ProviderScript`]
pub struct MockDnsProvider {
    script: Arc<Mutex<ProviderScript>>,
    calls: Arc<ProviderCalls>,
    zone_name: String,
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn verify_credentials(&self) -> Verification {
        self.calls.verify.fetch_add(1, Ordering::SeqCst);
        Verification::valid(self.zone_name.clone(), "Credentials verified")
    }

    async fn create_record(&self, record: &RecordRequest) -> ProviderOutcome<String> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.calls.created.lock().unwrap().push(record.clone());

        let script = self.script.lock().unwrap().clone();
        if script.fail_create {
            ProviderOutcome::failure("Zone is locked")
        } else {
            ProviderOutcome::success(script.record_id, "DNS record created successfully")
        }
    }

    async fn update_record_proxy(&self, record_id: &str, proxied: bool) -> ProviderOutcome<()> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        self.calls
            .proxy_updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), proxied));

        if self.script.lock().unwrap().fail_update {
            ProviderOutcome::failure("Record not found")
        } else {
            ProviderOutcome::success((), "Proxy setting updated")
        }
    }

    async fn delete_record(&self, record_id: &str) -> ProviderOutcome<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.calls.deleted.lock().unwrap().push(record_id.to_string());

        if self.script.lock().unwrap().fail_delete {
            ProviderOutcome::failure("Upstream timeout")
        } else {
            ProviderOutcome::success((), "DNS record deleted")
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory handing out [`MockDnsProvider`]s that share one script
#[derive(Clone, Default)]
pub struct MockFactory {
    pub script: Arc<Mutex<ProviderScript>>,
    pub calls: Arc<ProviderCalls>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, change: impl FnOnce(&mut ProviderScript)) {
        change(&mut self.script.lock().unwrap());
    }

    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.calls.update.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    /// Total provider calls of any kind
    pub fn total_calls(&self) -> usize {
        self.create_calls()
            + self.update_calls()
            + self.delete_calls()
            + self.calls.verify.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.calls.tokens.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<RecordRequest> {
        self.calls.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.calls.deleted.lock().unwrap().clone()
    }
}

impl DnsProviderFactory for MockFactory {
    fn create(&self, config: &DnsProviderConfig) -> Result<Box<dyn DnsProvider>> {
        self.calls.built.fetch_add(1, Ordering::SeqCst);
        self.calls
            .tokens
            .lock()
            .unwrap()
            .push(config.api_token.clone());

        Ok(Box::new(MockDnsProvider {
            script: Arc::clone(&self.script),
            calls: Arc::clone(&self.calls),
            zone_name: "example.com".to_string(),
        }))
    }
}

/// A runtime that always fails to launch
#[derive(Default)]
pub struct FailingRuntime {
    pub launches: AtomicUsize,
}

#[async_trait]
impl ContainerRuntime for FailingRuntime {
    async fn launch(&self, _deployment: &Deployment) -> Result<()> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Err(Error::runtime("image pull failed"))
    }
}

/// A MemoryStore whose `update_deployment` can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_updates: AtomicBool,
}

#[async_trait]
impl DeploymentStore for FlakyStore {
    async fn dns_config(&self) -> Result<Option<DnsProviderConfig>> {
        self.inner.dns_config().await
    }

    async fn create_dns_config(&self, input: NewDnsConfig) -> Result<DnsProviderConfig> {
        self.inner.create_dns_config(input).await
    }

    async fn update_dns_config(&self, id: u64, update: DnsConfigUpdate) -> Result<DnsProviderConfig> {
        self.inner.update_dns_config(id, update).await
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.inner.list_deployments().await
    }

    async fn get_deployment(&self, id: u64) -> Result<Option<Deployment>> {
        self.inner.get_deployment(id).await
    }

    async fn find_by_dns_record(&self, record_id: &str) -> Result<Option<Deployment>> {
        self.inner.find_by_dns_record(record_id).await
    }

    async fn insert_deployment(&self, spec: DeploymentSpec, log: NewLog) -> Result<Deployment> {
        self.inner.insert_deployment(spec, log).await
    }

    async fn update_deployment(
        &self,
        id: u64,
        patch: DeploymentPatch,
        log: Option<NewLog>,
    ) -> Result<Deployment> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::store("disk full"));
        }
        self.inner.update_deployment(id, patch, log).await
    }

    async fn delete_deployment(&self, id: u64) -> Result<bool> {
        self.inner.delete_deployment(id).await
    }

    async fn logs(&self, deployment_id: u64) -> Result<Vec<DeploymentLog>> {
        self.inner.logs(deployment_id).await
    }

    async fn append_log(&self, deployment_id: u64, log: NewLog) -> Result<DeploymentLog> {
        self.inner.append_log(deployment_id, log).await
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Reconciler over a fresh MemoryStore and a MockFactory
pub struct Harness {
    pub reconciler: Reconciler,
    pub store: Arc<MemoryStore>,
    pub provider: MockFactory,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = MockFactory::new();
        let reconciler = Reconciler::new(
            store.clone(),
            Arc::new(provider.clone()),
            Arc::new(StaticHostAddress::new(IpAddr::from(HOST_IP))),
        );

        Self {
            reconciler,
            store,
            provider,
        }
    }

    /// Harness with provider credentials already stored
    pub async fn configured() -> Self {
        let harness = Self::new();
        harness
            .reconciler
            .create_dns_config(credentials("token-1"))
            .await
            .expect("config creation succeeds");
        harness
    }

    /// Create a deployment and provision its record
    pub async fn provisioned(&self, name: &str) -> Deployment {
        let created = self
            .reconciler
            .create_deployment(local_input(name))
            .await
            .expect("create succeeds");
        self.reconciler
            .provision_dns(created.id)
            .await
            .expect("provision succeeds")
            .deployment
    }

    pub async fn log_count(&self, id: u64) -> usize {
        self.store.logs(id).await.unwrap().len()
    }
}

pub fn credentials(token: &str) -> NewDnsConfig {
    NewDnsConfig {
        api_token: token.to_string(),
        zone_id: "zone-123".to_string(),
        zone_name: "example.com".to_string(),
    }
}

pub fn local_input(name: &str) -> NewDeployment {
    NewDeployment {
        name: name.to_string(),
        domain: format!("{}.example.com", name),
        deployment_type: Some(DeploymentKind::Local),
        docker_image: Some("nginx:latest".to_string()),
        ..NewDeployment::default()
    }
}

pub fn github_input(name: &str) -> NewDeployment {
    NewDeployment {
        name: name.to_string(),
        domain: format!("{}.example.com", name),
        deployment_type: Some(DeploymentKind::Github),
        github_repo: Some(format!("https://github.com/acme/{}", name)),
        ..NewDeployment::default()
    }
}
