// # File Store
//
// File-based implementation of DeploymentStore with crash recovery.
//
// ## Purpose
//
// Keeps deployments, their logs and the provider credentials across
// restarts. Every mutation is written through before the call returns.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of the previous snapshot
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "tables": {
//     "lastDeploymentId": 1,
//     "lastLogId": 3,
//     "lastConfigId": 1,
//     "dnsConfig": { "id": 1, "apiToken": "...", "zoneId": "...", ... },
//     "deployments": { "1": { "id": 1, "name": "api", ... } },
//     "logs": [ { "id": 1, "deploymentId": 1, "message": "...", ... } ]
//   }
// }
// ```
//
// The API token is stored in plaintext. Restrict the file's permissions.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::tables::Tables;
use crate::Error;
use crate::model::{
    Deployment, DeploymentLog, DeploymentPatch, DeploymentSpec, DnsConfigUpdate,
    DnsProviderConfig, NewDnsConfig, NewLog,
};
use crate::traits::DeploymentStore;

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use deployd_core::store::FileStore;
/// use deployd_core::traits::DeploymentStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/deployd/state.json").await?;
///
///     for deployment in store.list_deployments().await? {
///         println!("{} -> {}", deployment.name, deployment.domain);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Mirrors the file: only replaced after a successful write
    tables: RwLock<Tables>,
}

/// Serializable state file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    tables: Tables,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing state file
    /// 3. If it is corrupted, load the backup instead
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let tables = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    /// Load state from file with automatic recovery
    ///
    /// Only a parse failure counts as corruption. I/O errors are returned
    /// as-is so a permissions problem never silently empties the store.
    async fn load_state_with_recovery(path: &Path) -> Result<Tables, Error> {
        let err = match Self::load_state(path).await {
            Ok(tables) => {
                tracing::debug!(
                    "Loaded state from file: {} deployments",
                    tables.deployment_count()
                );
                return Ok(tables);
            }
            Err(Error::Json(e)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "State file {} appears corrupted: {}. Attempting recovery from backup.",
            path.display(),
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty state.");
            return Ok(Tables::default());
        }

        match Self::load_state(&backup_path).await {
            Ok(tables) => {
                tracing::info!(
                    "Recovered state from backup: {} deployments",
                    tables.deployment_count()
                );
                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!("Failed to restore state file from backup: {}", restore_err);
                }
                Ok(tables)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also unreadable: {}. Starting with empty state.",
                    backup_err
                );
                Ok(Tables::default())
            }
        }
    }

    /// Load state from file
    async fn load_state(path: &Path) -> Result<Tables, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(Tables::default());
        }

        let content = fs::read_to_string(path).await?;
        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.tables)
    }

    /// Write a snapshot atomically: temp file, backup of current, rename
    async fn write_snapshot(&self, tables: &Tables) -> Result<(), Error> {
        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            tables: tables.clone(),
        };
        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                Error::store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the tables and write the copy through
    ///
    /// The copy replaces the live tables only once it is on disk, so a
    /// failed write leaves neither memory nor file changed.
    async fn mutate<T, F>(&self, change: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Tables) -> Result<T, Error> + Send,
        T: Send,
    {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let out = change(&mut next)?;

        self.write_snapshot(&next).await?;
        *tables = next;
        Ok(out)
    }

    /// Restore state file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored state file from backup");
        Ok(())
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl DeploymentStore for FileStore {
    async fn dns_config(&self) -> Result<Option<DnsProviderConfig>, Error> {
        Ok(self.tables.read().await.dns_config())
    }

    async fn create_dns_config(&self, input: NewDnsConfig) -> Result<DnsProviderConfig, Error> {
        self.mutate(|tables| tables.create_dns_config(input)).await
    }

    async fn update_dns_config(
        &self,
        id: u64,
        update: DnsConfigUpdate,
    ) -> Result<DnsProviderConfig, Error> {
        self.mutate(|tables| tables.update_dns_config(id, update))
            .await
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, Error> {
        Ok(self.tables.read().await.list_deployments())
    }

    async fn get_deployment(&self, id: u64) -> Result<Option<Deployment>, Error> {
        Ok(self.tables.read().await.get_deployment(id))
    }

    async fn find_by_dns_record(&self, record_id: &str) -> Result<Option<Deployment>, Error> {
        Ok(self.tables.read().await.find_by_dns_record(record_id))
    }

    async fn insert_deployment(
        &self,
        spec: DeploymentSpec,
        log: NewLog,
    ) -> Result<Deployment, Error> {
        self.mutate(|tables| Ok(tables.insert_deployment(spec, log)))
            .await
    }

    async fn update_deployment(
        &self,
        id: u64,
        patch: DeploymentPatch,
        log: Option<NewLog>,
    ) -> Result<Deployment, Error> {
        self.mutate(|tables| tables.update_deployment(id, patch, log))
            .await
    }

    async fn delete_deployment(&self, id: u64) -> Result<bool, Error> {
        self.mutate(|tables| Ok(tables.delete_deployment(id))).await
    }

    async fn logs(&self, deployment_id: u64) -> Result<Vec<DeploymentLog>, Error> {
        Ok(self.tables.read().await.logs(deployment_id))
    }

    async fn append_log(&self, deployment_id: u64, log: NewLog) -> Result<DeploymentLog, Error> {
        self.mutate(|tables| tables.append_log(deployment_id, log))
            .await
    }

    async fn flush(&self) -> Result<(), Error> {
        let tables = self.tables.write().await;
        self.write_snapshot(&tables).await
    }
}
