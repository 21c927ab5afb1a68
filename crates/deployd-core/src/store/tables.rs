//! In-memory tables shared by the store implementations
//!
//! All methods are synchronous and expect the caller to hold the store's
//! write lock, which is what makes each of them one atomic unit.

use crate::error::{Error, Result};
use crate::model::{
    Deployment, DeploymentLog, DeploymentPatch, DeploymentSpec, DnsConfigUpdate,
    DnsProviderConfig, NewDnsConfig, NewLog,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tables {
    last_deployment_id: u64,
    last_log_id: u64,
    last_config_id: u64,
    dns_config: Option<DnsProviderConfig>,
    deployments: BTreeMap<u64, Deployment>,
    /// Append-only, in issuance order
    logs: Vec<DeploymentLog>,
}

impl Tables {
    pub(crate) fn dns_config(&self) -> Option<DnsProviderConfig> {
        self.dns_config.clone()
    }

    pub(crate) fn create_dns_config(&mut self, input: NewDnsConfig) -> Result<DnsProviderConfig> {
        if self.dns_config.is_some() {
            return Err(Error::conflict(
                "DNS provider configuration already exists; update it instead",
            ));
        }

        self.last_config_id += 1;
        let config = DnsProviderConfig::from_input(self.last_config_id, input, Utc::now());
        self.dns_config = Some(config.clone());
        Ok(config)
    }

    pub(crate) fn update_dns_config(
        &mut self,
        id: u64,
        update: DnsConfigUpdate,
    ) -> Result<DnsProviderConfig> {
        match self.dns_config.as_mut() {
            Some(config) if config.id == id => {
                config.apply(update, Utc::now());
                Ok(config.clone())
            }
            _ => Err(Error::not_found(format!("Configuration {} not found", id))),
        }
    }

    pub(crate) fn list_deployments(&self) -> Vec<Deployment> {
        let mut deployments: Vec<Deployment> = self.deployments.values().cloned().collect();
        deployments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        deployments
    }

    pub(crate) fn get_deployment(&self, id: u64) -> Option<Deployment> {
        self.deployments.get(&id).cloned()
    }

    pub(crate) fn find_by_dns_record(&self, record_id: &str) -> Option<Deployment> {
        self.deployments
            .values()
            .find(|d| d.dns_record_id.as_deref() == Some(record_id))
            .cloned()
    }

    pub(crate) fn insert_deployment(&mut self, spec: DeploymentSpec, log: NewLog) -> Deployment {
        self.last_deployment_id += 1;
        let id = self.last_deployment_id;

        let deployment = Deployment::from_spec(id, spec, Utc::now());
        self.deployments.insert(id, deployment.clone());
        self.push_log(id, log);
        deployment
    }

    pub(crate) fn update_deployment(
        &mut self,
        id: u64,
        patch: DeploymentPatch,
        log: Option<NewLog>,
    ) -> Result<Deployment> {
        let deployment = self
            .deployments
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Deployment {} not found", id)))?;

        deployment.apply(patch, Utc::now());
        let updated = deployment.clone();

        if let Some(log) = log {
            self.push_log(id, log);
        }
        Ok(updated)
    }

    pub(crate) fn delete_deployment(&mut self, id: u64) -> bool {
        if !self.deployments.contains_key(&id) {
            return false;
        }

        // Logs first, then the row
        self.logs.retain(|log| log.deployment_id != id);
        self.deployments.remove(&id);
        true
    }

    pub(crate) fn logs(&self, deployment_id: u64) -> Vec<DeploymentLog> {
        self.logs
            .iter()
            .filter(|log| log.deployment_id == deployment_id)
            .cloned()
            .collect()
    }

    pub(crate) fn append_log(&mut self, deployment_id: u64, log: NewLog) -> Result<DeploymentLog> {
        if !self.deployments.contains_key(&deployment_id) {
            return Err(Error::not_found(format!(
                "Deployment {} not found",
                deployment_id
            )));
        }
        Ok(self.push_log(deployment_id, log))
    }

    pub(crate) fn deployment_count(&self) -> usize {
        self.deployments.len()
    }

    fn push_log(&mut self, deployment_id: u64, log: NewLog) -> DeploymentLog {
        self.last_log_id += 1;
        let entry = DeploymentLog {
            id: self.last_log_id,
            deployment_id,
            message: log.message,
            level: log.level,
            created_at: Utc::now(),
        };
        self.logs.push(entry.clone());
        entry
    }
}
