//! Deployment records and the inputs that create or change them

use crate::error::{Error, Result};
use crate::lifecycle::DeploymentStatus;
use crate::model::validate::{non_blank, validate_domain_name, validate_port};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Port used when the operator does not name one
pub const DEFAULT_PORT: &str = "3000";

/// Branch used for repository deployments when none is given
pub const DEFAULT_BRANCH: &str = "main";

/// Where a deployment's code comes from
///
/// Serialized flat into the deployment with a `deploymentType` tag, so a
/// local deployment carries only `dockerImage` and a repository deployment
/// only `githubRepo`/`githubBranch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "deploymentType")]
pub enum DeploymentSource {
    /// A locally available container image
    #[serde(rename = "local", rename_all = "camelCase")]
    Local { docker_image: String },

    /// A source repository, pulled and built on deploy
    #[serde(rename = "github", rename_all = "camelCase")]
    Github {
        github_repo: String,
        github_branch: String,
    },
}

impl DeploymentSource {
    /// The source kind
    pub fn kind(&self) -> DeploymentKind {
        match self {
            DeploymentSource::Local { .. } => DeploymentKind::Local,
            DeploymentSource::Github { .. } => DeploymentKind::Github,
        }
    }

    /// Human-readable description of the build/pull step
    pub fn build_step(&self) -> String {
        match self {
            DeploymentSource::Local { docker_image } => {
                format!("Building Docker image: {}", docker_image)
            }
            DeploymentSource::Github {
                github_repo,
                github_branch,
            } => format!("Pulling from GitHub: {} ({})", github_repo, github_branch),
        }
    }
}

/// Deployment source kind, as sent by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentKind {
    Local,
    Github,
}

/// One managed application bound to a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: u64,
    pub name: String,
    pub domain: String,
    #[serde(flatten)]
    pub source: DeploymentSource,
    pub port: String,
    pub is_proxied: bool,
    /// Provider id of the A record for `domain`
    ///
    /// Present iff the record exists at the provider. Only the reconciler
    /// writes it, and only after the provider confirmed the mutation.
    pub dns_record_id: Option<String>,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Build a fresh `pending` deployment from a validated spec
    pub(crate) fn from_spec(id: u64, spec: DeploymentSpec, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: spec.name,
            domain: spec.domain,
            source: spec.source,
            port: spec.port,
            is_proxied: spec.is_proxied,
            dns_record_id: None,
            status: DeploymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a store-level patch, bumping `updated_at`
    pub(crate) fn apply(&mut self, patch: DeploymentPatch, now: DateTime<Utc>) {
        if let Some(spec) = patch.spec {
            self.name = spec.name;
            self.domain = spec.domain;
            self.source = spec.source;
            self.port = spec.port;
            self.is_proxied = spec.is_proxied;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(record) = patch.dns_record_id {
            self.dns_record_id = record;
        }
        if let Some(proxied) = patch.is_proxied {
            self.is_proxied = proxied;
        }
        self.updated_at = now;
    }

    /// The operator-editable part of this deployment
    pub fn spec(&self) -> DeploymentSpec {
        DeploymentSpec {
            name: self.name.clone(),
            domain: self.domain.clone(),
            source: self.source.clone(),
            port: self.port.clone(),
            is_proxied: self.is_proxied,
        }
    }
}

/// A validated set of operator-editable deployment attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub name: String,
    pub domain: String,
    pub source: DeploymentSource,
    pub port: String,
    pub is_proxied: bool,
}

/// Raw create request
///
/// Everything is optional at the wire level so that missing fields are
/// reported as field-level validation errors instead of parse failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDeployment {
    pub name: String,
    pub domain: String,
    pub deployment_type: Option<DeploymentKind>,
    pub docker_image: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
    pub port: Option<String>,
    pub is_proxied: Option<bool>,
}

impl NewDeployment {
    /// Check the deployment invariants and produce a spec
    ///
    /// - `name` non-empty, `domain` a valid hostname
    /// - `local` requires `dockerImage` and forbids `githubRepo`/`githubBranch`
    /// - `github` requires `githubRepo`, forbids `dockerImage`, branch defaults to `main`
    /// - `port` digits only, defaults to `3000`
    pub fn validate(self) -> Result<DeploymentSpec> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("name", "Name is required"));
        }

        let domain = self.domain.trim().to_ascii_lowercase();
        validate_domain_name("domain", &domain)?;

        let kind = self
            .deployment_type
            .ok_or_else(|| Error::validation("deploymentType", "Deployment type is required"))?;

        let docker_image = non_blank(self.docker_image);
        let github_repo = non_blank(self.github_repo);
        let github_branch = non_blank(self.github_branch);

        let source = match kind {
            DeploymentKind::Local => {
                if github_repo.is_some() || github_branch.is_some() {
                    return Err(Error::validation(
                        "githubRepo",
                        "Repository fields must be empty for local deployments",
                    ));
                }
                let docker_image = docker_image.ok_or_else(|| {
                    Error::validation("dockerImage", "Docker image is required for local deployments")
                })?;
                DeploymentSource::Local { docker_image }
            }
            DeploymentKind::Github => {
                if docker_image.is_some() {
                    return Err(Error::validation(
                        "dockerImage",
                        "Docker image must be empty for GitHub deployments",
                    ));
                }
                let github_repo = github_repo.ok_or_else(|| {
                    Error::validation("githubRepo", "Repository is required for GitHub deployments")
                })?;
                DeploymentSource::Github {
                    github_repo,
                    github_branch: github_branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                }
            }
        };

        let port = non_blank(self.port).unwrap_or_else(|| DEFAULT_PORT.to_string());
        validate_port("port", &port)?;

        Ok(DeploymentSpec {
            name,
            domain,
            source,
            port,
            is_proxied: self.is_proxied.unwrap_or(true),
        })
    }
}

impl From<&Deployment> for NewDeployment {
    fn from(deployment: &Deployment) -> Self {
        let (docker_image, github_repo, github_branch) = match &deployment.source {
            DeploymentSource::Local { docker_image } => (Some(docker_image.clone()), None, None),
            DeploymentSource::Github {
                github_repo,
                github_branch,
            } => (None, Some(github_repo.clone()), Some(github_branch.clone())),
        };

        Self {
            name: deployment.name.clone(),
            domain: deployment.domain.clone(),
            deployment_type: Some(deployment.source.kind()),
            docker_image,
            github_repo,
            github_branch,
            port: Some(deployment.port.clone()),
            is_proxied: Some(deployment.is_proxied),
        }
    }
}

/// Raw partial update request
///
/// Status and DNS record reference are deliberately absent: the lifecycle
/// and the reconciler own them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateDeployment {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub deployment_type: Option<DeploymentKind>,
    pub docker_image: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: Option<String>,
    pub port: Option<String>,
    pub is_proxied: Option<bool>,
}

impl UpdateDeployment {
    /// Overlay this update on `current` and re-validate the result
    ///
    /// Switching the deployment type drops the previous source's fields
    /// before the update's own fields are applied.
    pub fn merge(self, current: &Deployment) -> Result<DeploymentSpec> {
        let mut merged = NewDeployment::from(current);

        if let Some(kind) = self.deployment_type {
            if kind != current.source.kind() {
                merged.docker_image = None;
                merged.github_repo = None;
                merged.github_branch = None;
            }
            merged.deployment_type = Some(kind);
        }
        if let Some(name) = self.name {
            merged.name = name;
        }
        if let Some(domain) = self.domain {
            merged.domain = domain;
        }
        if self.docker_image.is_some() {
            merged.docker_image = self.docker_image;
        }
        if self.github_repo.is_some() {
            merged.github_repo = self.github_repo;
        }
        if self.github_branch.is_some() {
            merged.github_branch = self.github_branch;
        }
        if self.port.is_some() {
            merged.port = self.port;
        }
        if self.is_proxied.is_some() {
            merged.is_proxied = self.is_proxied;
        }

        merged.validate()
    }
}

/// Store-level change set for an existing deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPatch {
    pub spec: Option<DeploymentSpec>,
    pub status: Option<DeploymentStatus>,
    /// `Some(None)` clears the reference
    pub dns_record_id: Option<Option<String>>,
    pub is_proxied: Option<bool>,
}

impl DeploymentPatch {
    pub fn spec(spec: DeploymentSpec) -> Self {
        Self {
            spec: Some(spec),
            ..Self::default()
        }
    }

    pub fn status(status: DeploymentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn dns_record(record_id: impl Into<String>) -> Self {
        Self {
            dns_record_id: Some(Some(record_id.into())),
            ..Self::default()
        }
    }

    pub fn proxied(proxied: bool) -> Self {
        Self {
            is_proxied: Some(proxied),
            ..Self::default()
        }
    }
}
