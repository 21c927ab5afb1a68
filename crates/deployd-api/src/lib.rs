// # deployd-api
//
// HTTP surface of deployd: an axum [`Router`] over a shared [`Reconciler`].
//
// Errors leave handlers as [`ApiError`], which maps the core taxonomy onto
// status codes and a `{message, code, field?}` body. Malformed JSON and
// non-numeric ids are rejected the same way, as validation errors.

pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use deployd_core::Reconciler;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorBody};

use handlers::{
    create_config_handler, create_deployment_handler, create_record_handler,
    delete_deployment_handler, deploy_handler, get_config_handler, get_deployment_handler,
    health_handler, list_deployments_handler, logs_handler, proxy_handler, update_config_handler,
    update_deployment_handler, verify_handler,
};

/// Build the API router
pub fn router(reconciler: Arc<Reconciler>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_handler))
        // Provider settings
        .route(
            "/api/cloudflare/config",
            get(get_config_handler).post(create_config_handler),
        )
        .route("/api/cloudflare/config/{id}", put(update_config_handler))
        .route("/api/cloudflare/verify", post(verify_handler))
        // Deployments
        .route(
            "/api/deployments",
            get(list_deployments_handler).post(create_deployment_handler),
        )
        .route(
            "/api/deployments/{id}",
            get(get_deployment_handler)
                .put(update_deployment_handler)
                .delete(delete_deployment_handler),
        )
        .route("/api/deployments/{id}/deploy", post(deploy_handler))
        .route("/api/deployments/{id}/logs", get(logs_handler))
        // DNS
        .route("/api/dns/create", post(create_record_handler))
        .route("/api/dns/{record_id}/proxy", post(proxy_handler))
        // State and middleware
        .with_state(reconciler)
        .layer(TraceLayer::new_for_http())
}
