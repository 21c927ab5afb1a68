//! HTTP request handlers
//!
//! Handlers only translate between JSON and [`Reconciler`] calls; every
//! rule lives in the reconciler.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use deployd_core::Reconciler;
use deployd_core::error::Error;
use deployd_core::model::{DnsConfigUpdate, NewDeployment, NewDnsConfig, UpdateDeployment};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::extract::{Id, JsonBody};

type ApiResult<T> = Result<T, ApiError>;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "deployd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// --------------------------------------------------------------------------
// Provider settings
// --------------------------------------------------------------------------

/// Stored credentials with the token masked, or `null`
pub async fn get_config_handler(
    State(reconciler): State<Arc<Reconciler>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.dns_config_view().await?))
}

pub async fn create_config_handler(
    State(reconciler): State<Arc<Reconciler>>,
    JsonBody(input): JsonBody<NewDnsConfig>,
) -> ApiResult<impl IntoResponse> {
    let view = reconciler.create_dns_config(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_config_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Id(id): Id,
    JsonBody(update): JsonBody<DnsConfigUpdate>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.update_dns_config(id, update).await?))
}

/// Credentials to check without storing them
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyRequest {
    pub api_token: String,
    pub zone_id: String,
}

pub async fn verify_handler(
    State(reconciler): State<Arc<Reconciler>>,
    JsonBody(request): JsonBody<VerifyRequest>,
) -> impl IntoResponse {
    Json(
        reconciler
            .verify_credentials(&request.api_token, &request.zone_id)
            .await,
    )
}

// --------------------------------------------------------------------------
// Deployments
// --------------------------------------------------------------------------

pub async fn list_deployments_handler(
    State(reconciler): State<Arc<Reconciler>>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.list_deployments().await?))
}

pub async fn get_deployment_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Id(id): Id,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.deployment_with_logs(id).await?))
}

pub async fn create_deployment_handler(
    State(reconciler): State<Arc<Reconciler>>,
    JsonBody(input): JsonBody<NewDeployment>,
) -> ApiResult<impl IntoResponse> {
    let deployment = reconciler.create_deployment(input).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

pub async fn update_deployment_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Id(id): Id,
    JsonBody(input): JsonBody<UpdateDeployment>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.update_deployment(id, input).await?))
}

pub async fn delete_deployment_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Id(id): Id,
) -> ApiResult<StatusCode> {
    reconciler.delete_deployment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deploy_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Id(id): Id,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.deploy(id).await?))
}

pub async fn logs_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Id(id): Id,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(reconciler.deployment_logs(id).await?))
}

// --------------------------------------------------------------------------
// DNS
// --------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRecordRequest {
    pub deployment_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordResponse {
    pub success: bool,
    pub record_id: Option<String>,
    pub message: String,
}

pub async fn create_record_handler(
    State(reconciler): State<Arc<Reconciler>>,
    JsonBody(request): JsonBody<CreateRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = request
        .deployment_id
        .ok_or_else(|| Error::validation("deploymentId", "Deployment ID is required"))?;

    let change = reconciler.provision_dns(id).await?;
    Ok(Json(CreateRecordResponse {
        success: true,
        record_id: change.deployment.dns_record_id,
        message: change.message,
    }))
}

/// Proxy toggle request
///
/// Without `deploymentId` the owning deployment is looked up by record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyRequest {
    pub proxied: Option<bool>,
    pub deployment_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProxyResponse {
    pub success: bool,
    pub message: String,
}

pub async fn proxy_handler(
    State(reconciler): State<Arc<Reconciler>>,
    Path(record_id): Path<String>,
    JsonBody(request): JsonBody<ProxyRequest>,
) -> ApiResult<impl IntoResponse> {
    let proxied = request
        .proxied
        .ok_or_else(|| Error::validation("proxied", "proxied must be a boolean"))?;

    let id = match request.deployment_id {
        Some(id) => id,
        None => {
            let deployment = reconciler.deployment_for_record(&record_id).await?;
            debug!("Record {} belongs to deployment {}", record_id, deployment.id);
            deployment.id
        }
    };

    let change = reconciler.toggle_proxy(id, &record_id, proxied).await?;
    Ok(Json(ProxyResponse {
        success: true,
        message: change.message,
    }))
}
