//! Default container runtime
//!
//! Container execution is outside deployd's scope. [`NoopRuntime`] records
//! the intended action and reports success.

use crate::model::Deployment;
use crate::traits::ContainerRuntime;
use async_trait::async_trait;
use tracing::info;

/// Runtime that launches nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRuntime;

#[async_trait]
impl ContainerRuntime for NoopRuntime {
    async fn launch(&self, deployment: &Deployment) -> Result<(), crate::Error> {
        info!(
            "[NO-OP] Would launch deployment {} ({}) on port {}",
            deployment.id,
            deployment.source.build_step(),
            deployment.port
        );
        Ok(())
    }
}
