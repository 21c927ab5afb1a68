//! Contract Test: Proxy Toggle
//!
//! Constraints verified:
//! - Toggling without a record fails before the provider is contacted
//! - The record id must belong to the deployment
//! - Local proxy intent only changes after the provider confirmed it
//! - Toggling never changes status
//! - Updates that flip the proxy flag follow the same rules
//!
//! If this test fails, local proxy intent can drift from the provider.

mod common;

use common::*;
use deployd_core::lifecycle::DeploymentStatus;
use deployd_core::model::UpdateDeployment;
use deployd_core::traits::DeploymentStore;
use deployd_core::Error;

#[tokio::test]
async fn toggle_without_record_never_contacts_provider() {
    let harness = Harness::configured().await;
    let created = harness
        .reconciler
        .create_deployment(local_input("api"))
        .await
        .unwrap();

    let err = harness
        .reconciler
        .toggle_proxy(created.id, "abc", false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoDnsRecord(id) if id == created.id));
    assert_eq!(harness.provider.total_calls(), 0);
}

#[tokio::test]
async fn toggle_with_foreign_record_is_rejected() {
    let harness = Harness::configured().await;
    let deployment = harness.provisioned("api").await;

    let err = harness
        .reconciler
        .toggle_proxy(deployment.id, "someone-else", false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(harness.provider.update_calls(), 0);
}

#[tokio::test]
async fn toggle_success_persists_intent_and_keeps_status() {
    let harness = Harness::configured().await;
    let deployment = harness.provisioned("api").await;
    let logs_before = harness.log_count(deployment.id).await;

    let change = harness
        .reconciler
        .toggle_proxy(deployment.id, "abc", false)
        .await
        .unwrap();

    assert!(!change.deployment.is_proxied);
    assert_eq!(change.deployment.status, DeploymentStatus::Pending);
    assert_eq!(change.message, "Proxy setting updated");
    assert_eq!(
        harness.provider.calls.proxy_updates.lock().unwrap().clone(),
        vec![("abc".to_string(), false)]
    );
    assert_eq!(harness.log_count(deployment.id).await, logs_before + 1);
}

#[tokio::test]
async fn toggle_failure_leaves_local_state_unchanged() {
    let harness = Harness::configured().await;
    let deployment = harness.provisioned("api").await;
    let logs_before = harness.log_count(deployment.id).await;
    harness.provider.set(|s| s.fail_update = true);

    let err = harness
        .reconciler
        .toggle_proxy(deployment.id, "abc", false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
    let stored = harness.store.get_deployment(deployment.id).await.unwrap().unwrap();
    assert!(stored.is_proxied);
    assert_eq!(harness.log_count(deployment.id).await, logs_before);
}

#[tokio::test]
async fn toggle_without_config_is_config_missing() {
    let harness = Harness::new();
    let created = harness
        .reconciler
        .create_deployment(local_input("api"))
        .await
        .unwrap();
    harness
        .store
        .update_deployment(
            created.id,
            deployd_core::model::DeploymentPatch::dns_record("abc"),
            None,
        )
        .await
        .unwrap();

    let err = harness
        .reconciler
        .toggle_proxy(created.id, "abc", true)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConfigMissing));
}

#[tokio::test]
async fn update_flipping_proxy_goes_through_provider() {
    let harness = Harness::configured().await;
    let deployment = harness.provisioned("api").await;

    let updated = harness
        .reconciler
        .update_deployment(
            deployment.id,
            UpdateDeployment {
                is_proxied: Some(false),
                ..UpdateDeployment::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.is_proxied);
    assert_eq!(harness.provider.update_calls(), 1);

    harness.provider.set(|s| s.fail_update = true);
    let err = harness
        .reconciler
        .update_deployment(
            deployment.id,
            UpdateDeployment {
                is_proxied: Some(true),
                ..UpdateDeployment::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));

    let stored = harness.store.get_deployment(deployment.id).await.unwrap().unwrap();
    assert!(!stored.is_proxied);
}

#[tokio::test]
async fn update_cannot_move_a_provisioned_domain() {
    let harness = Harness::configured().await;
    let deployment = harness.provisioned("api").await;

    let err = harness
        .reconciler
        .update_deployment(
            deployment.id,
            UpdateDeployment {
                domain: Some("other.example.com".to_string()),
                ..UpdateDeployment::default()
            },
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Validation { ref field, .. } if field.as_deref() == Some("domain"))
    );
    assert_eq!(harness.provider.update_calls(), 0);
}
