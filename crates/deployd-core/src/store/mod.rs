// # Store Implementations
//
// This module provides implementations of the DeploymentStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;
mod tables;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::traits::DeploymentStore;
use std::sync::Arc;

/// Open the store described by `config`
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn DeploymentStore>> {
    match config {
        StoreConfig::File { path } => Ok(Arc::new(FileStore::new(path).await?)),
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
