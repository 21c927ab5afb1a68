// # Container Runtime Trait
//
// The step that actually pulls, builds and starts a deployment. deployd does
// not orchestrate containers; the default implementation is
// [`crate::runtime::NoopRuntime`].

use crate::model::Deployment;
use async_trait::async_trait;

/// Trait for container runtimes
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Launch (or relaunch) a deployment
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the container is up on `deployment.port`
    /// - `Err(Error)`: the launch failed; the reconciler stops the deployment
    async fn launch(&self, deployment: &Deployment) -> Result<(), crate::Error>;
}
