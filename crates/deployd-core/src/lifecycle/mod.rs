//! Deployment lifecycle state machine
//!
//! ```text
//!             Deploy                Deploy
//!  pending ───────────▶ running ◀──────────┐
//!     │                  │  ▲ │            │
//!     │ Stop        Stop │  └─┘ Deploy     │
//!     │                  ▼   (redeploy)    │
//!     └────────────▶ stopped ──────────────┘
//!
//!  any ── Delete ──▶ deleted (terminal, record removed)
//! ```
//!
//! The machine knows nothing about DNS. Callers persist the resulting status
//! together with exactly one log entry per status change.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted deployment status
///
/// `deleted` is never stored: a deleted deployment has no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Created, never deployed
    Pending,
    /// Last deploy succeeded
    Running,
    /// Stopped, currently only reached when a deploy fails
    Stopped,
}

impl DeploymentStatus {
    /// Status string as stored and returned over the API
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Running => "running",
            DeploymentStatus::Stopped => "stopped",
        }
    }

    /// Apply a transition
    ///
    /// # Returns
    ///
    /// - `Ok(Next::Status(_))`: the status to persist
    /// - `Ok(Next::Deleted)`: the deployment must be removed
    /// - `Err(Error::Conflict)`: the transition is not defined from this status
    pub fn apply(self, transition: Transition) -> Result<Next> {
        use DeploymentStatus::*;

        let next = match (self, transition) {
            (_, Transition::Delete) => Next::Deleted,
            (Pending | Running | Stopped, Transition::Deploy) => Next::Status(Running),
            (Pending | Running, Transition::Stop) => Next::Status(Stopped),
            (Stopped, Transition::Stop) => {
                return Err(Error::conflict(format!(
                    "Invalid transition: {} -> {:?}",
                    self, transition
                )));
            }
        };

        Ok(next)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(DeploymentStatus::Pending),
            "running" => Ok(DeploymentStatus::Running),
            "stopped" => Ok(DeploymentStatus::Stopped),
            other => Err(Error::validation(
                "status",
                format!("Unknown deployment status: {}", other),
            )),
        }
    }
}

/// Lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Deploy or redeploy
    Deploy,
    /// Stop a pending or running deployment
    Stop,
    /// Remove the deployment and its logs
    Delete,
}

/// Result of applying a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Persist this status
    Status(DeploymentStatus),
    /// Remove the record
    Deleted,
}
