//! Test doubles and request helpers for router contract tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use deployd_core::error::Result;
use deployd_core::model::DnsProviderConfig;
use deployd_core::store::MemoryStore;
use deployd_core::traits::{
    DnsProvider, DnsProviderFactory, ProviderOutcome, RecordRequest, StaticHostAddress,
    Verification,
};
use deployd_core::Reconciler;
use http_body_util::BodyExt;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Shared switches and counters for [`ScriptedProvider`]
#[derive(Debug, Default)]
pub struct Script {
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub calls: AtomicUsize,
}

pub struct ScriptedProvider {
    script: Arc<Script>,
    zone_id: String,
}

#[async_trait]
impl DnsProvider for ScriptedProvider {
    async fn verify_credentials(&self) -> Verification {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        if self.zone_id == "zone-123" {
            Verification::valid("example.com", "Successfully connected to zone: example.com")
        } else {
            Verification::invalid("Could not route to zone")
        }
    }

    async fn create_record(&self, record: &RecordRequest) -> ProviderOutcome<String> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_create.load(Ordering::SeqCst) {
            ProviderOutcome::failure("Record already exists.")
        } else {
            ProviderOutcome::success(
                "abc".to_string(),
                format!("DNS record created: {} → {}", record.name, record.content),
            )
        }
    }

    async fn update_record_proxy(&self, _record_id: &str, proxied: bool) -> ProviderOutcome<()> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        let state = if proxied { "enabled" } else { "disabled" };
        ProviderOutcome::success((), format!("Proxy mode {} for DNS record", state))
    }

    async fn delete_record(&self, _record_id: &str) -> ProviderOutcome<()> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_delete.load(Ordering::SeqCst) {
            ProviderOutcome::failure("Upstream timeout")
        } else {
            ProviderOutcome::success((), "DNS record deleted successfully")
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pub script: Arc<Script>,
}

impl DnsProviderFactory for ScriptedFactory {
    fn create(&self, config: &DnsProviderConfig) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(ScriptedProvider {
            script: Arc::clone(&self.script),
            zone_id: config.zone_id.clone(),
        }))
    }
}

/// Router over an in-memory store and a scripted provider
pub struct TestApp {
    pub router: Router,
    pub script: Arc<Script>,
}

impl TestApp {
    pub fn new() -> Self {
        let factory = ScriptedFactory::default();
        let script = Arc::clone(&factory.script);
        let reconciler = Reconciler::new(
            Arc::new(MemoryStore::new()),
            Arc::new(factory),
            Arc::new(StaticHostAddress::new(IpAddr::from([203, 0, 113, 10]))),
        );

        Self {
            router: deployd_api::router(Arc::new(reconciler)),
            script,
        }
    }

    pub fn provider_calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a raw body with a JSON content type
    pub async fn post_raw(&self, uri: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Store working credentials
    pub async fn configure(&self) {
        let (status, _) = self
            .post(
                "/api/cloudflare/config",
                serde_json::json!({ "apiToken": "secret-token", "zoneId": "zone-123" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    /// Create a local deployment and return its id
    pub async fn create_deployment(&self, name: &str) -> u64 {
        let (status, body) = self
            .post(
                "/api/deployments",
                serde_json::json!({
                    "name": name,
                    "domain": format!("{}.example.com", name),
                    "deploymentType": "local",
                    "dockerImage": "nginx:latest",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_u64().unwrap()
    }
}
