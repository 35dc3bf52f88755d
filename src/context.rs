//! Agent Context
//!
//! Configuration is loaded once at startup into an [`AgentContext`] which is
//! then passed to every component that needs it. Nothing here is global.

use crate::error::{Error, Result};
use crate::topology::ClusterKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

// =============================================================================
// Constants
// =============================================================================

/// Domain id of the reporting cluster when none is configured
pub const DEFAULT_CLUSTER_DOMAIN_ID: &str = "dpCluster";

/// Name of the reporting cluster when none is configured
pub const DEFAULT_CLUSTER_NAME: &str = "DiskProphet for Lab Test";

/// Datacenter name used when the source reports none
pub const DEFAULT_DATACENTER_NAME: &str = "Global";

const DEFAULT_LOCAL_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Agent Configuration
// =============================================================================

/// On-disk agent configuration (YAML). Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Domain id of the cluster this agent reports into
    pub cluster_domain_id: String,
    /// Display name of that cluster
    pub cluster_name: String,
    /// Cluster type tag for the local datacenter, e.g. `vSAN` or `ceph`
    pub cluster_type: String,
    /// Datacenter name for the local datacenter
    pub datacenter_name: String,
    pub smartctl_path: String,
    pub dmidecode_path: String,
    /// Generic device-node prefix probed under /dev
    pub devnode_prefix: String,
    /// Timeout for one local command
    pub local_timeout_secs: u64,
    /// Timeout for one remote (SSH) command
    pub remote_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cluster_domain_id: DEFAULT_CLUSTER_DOMAIN_ID.to_string(),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            cluster_type: String::new(),
            datacenter_name: String::new(),
            smartctl_path: "smartctl".to_string(),
            dmidecode_path: "dmidecode".to_string(),
            devnode_prefix: "sg".to_string(),
            local_timeout_secs: DEFAULT_LOCAL_TIMEOUT_SECS,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }
}

impl AgentConfig {
    /// Load from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        info!("Loaded agent configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_domain_id.trim().is_empty() {
            return Err(Error::Configuration("cluster_domain_id must not be empty".into()));
        }
        if self.smartctl_path.trim().is_empty() {
            return Err(Error::Configuration("smartctl_path must not be empty".into()));
        }
        if self.local_timeout_secs == 0 || self.remote_timeout_secs == 0 {
            return Err(Error::Configuration("command timeouts must be positive".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Agent Context
// =============================================================================

/// Immutable per-process context threaded through discovery and emission
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub cluster_domain_id: String,
    pub cluster_name: String,
    pub cluster_kind: ClusterKind,
    pub datacenter_name: String,
    pub smartctl_path: String,
    pub dmidecode_path: String,
    pub devnode_prefix: String,
    pub local_timeout: Duration,
    pub remote_timeout: Duration,
}

impl AgentContext {
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        config.validate()?;

        // Anything unrecognised falls back to a plain default cluster
        let cluster_kind = match ClusterKind::from_tag(&config.cluster_type) {
            ClusterKind::Unknown => ClusterKind::Default,
            kind => kind,
        };
        let datacenter_name = if config.datacenter_name.trim().is_empty() {
            DEFAULT_DATACENTER_NAME.to_string()
        } else {
            config.datacenter_name.clone()
        };

        Ok(Self {
            cluster_domain_id: config.cluster_domain_id.clone(),
            cluster_name: config.cluster_name.clone(),
            cluster_kind,
            datacenter_name,
            smartctl_path: config.smartctl_path.clone(),
            dmidecode_path: config.dmidecode_path.clone(),
            devnode_prefix: config.devnode_prefix.clone(),
            local_timeout: Duration::from_secs(config.local_timeout_secs),
            remote_timeout: Duration::from_secs(config.remote_timeout_secs),
        })
    }
}

impl Default for AgentContext {
    fn default() -> Self {
        Self {
            cluster_domain_id: DEFAULT_CLUSTER_DOMAIN_ID.to_string(),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            cluster_kind: ClusterKind::Default,
            datacenter_name: DEFAULT_DATACENTER_NAME.to_string(),
            smartctl_path: "smartctl".to_string(),
            dmidecode_path: "dmidecode".to_string(),
            devnode_prefix: "sg".to_string(),
            local_timeout: Duration::from_secs(DEFAULT_LOCAL_TIMEOUT_SECS),
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }
}
