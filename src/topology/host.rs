//! Hosts
//!
//! A host is either a Linux machine probed locally or a hypervisor host
//! learned from the management API (or its shell). Both expose the same
//! capability set through [`Host`]; consumers match on the variant instead
//! of downcasting.

use crate::error::{Error, Result};
use crate::hardware::discovery::linux::HostDmi;
use crate::hardware::disk::Disk;
use crate::topology::cluster::ClusterId;
use crate::topology::datastore::Datastore;
use crate::topology::disk_group::DiskGroup;
use crate::topology::nic::{joined_ipv4s, joined_ipv6s, NetworkInterface};
use crate::topology::virtual_machine::VirtualMachine;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

// =============================================================================
// OS Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OsType {
    Unknown,
    Linux,
    VMware,
    Windows,
}

impl OsType {
    pub fn code(&self) -> i64 {
        match self {
            OsType::Unknown => 0,
            OsType::Linux => 1,
            OsType::VMware => 2,
            OsType::Windows => 3,
        }
    }
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsType::Unknown => write!(f, "Unknown OS type"),
            OsType::Linux => write!(f, "linux"),
            OsType::VMware => write!(f, "vmware"),
            OsType::Windows => write!(f, "windows"),
        }
    }
}

// =============================================================================
// Linux Host
// =============================================================================

/// A locally probed Linux host
#[derive(Debug, Clone, Serialize)]
pub struct LinuxHost {
    pub name: String,
    pub os_name: String,
    pub os_version: String,
    pub nics: Vec<NetworkInterface>,
    pub dmi: Option<HostDmi>,
    pub disks: Vec<Arc<Disk>>,
    hw_id: String,
}

impl LinuxHost {
    pub fn new(
        name: impl Into<String>,
        os_name: impl Into<String>,
        os_version: impl Into<String>,
        nics: Vec<NetworkInterface>,
        dmi: Option<HostDmi>,
        disks: Vec<Arc<Disk>>,
    ) -> Self {
        let hw_id = linux_hardware_id(dmi.as_ref(), &nics);
        Self {
            name: name.into(),
            os_name: os_name.into(),
            os_version: os_version.into(),
            nics,
            dmi,
            disks,
            hw_id,
        }
    }

    pub fn hw_id(&self) -> &str {
        &self.hw_id
    }
}

/// Hardware id of a Linux host: SHA-256 hex over the DMI identity followed
/// by every MAC address in interface order
pub fn linux_hardware_id(dmi: Option<&HostDmi>, nics: &[NetworkInterface]) -> String {
    let mut hasher = Sha256::new();
    if let Some(dmi) = dmi {
        hasher.update(dmi.to_string().as_bytes());
    }
    for mac in nics.iter().flat_map(|n| n.macs.iter()) {
        hasher.update(mac.as_bytes());
    }
    hex::encode(hasher.finalize())
}

// =============================================================================
// Hypervisor Host
// =============================================================================

/// A hypervisor host and everything resolved under it
#[derive(Debug, Clone, Serialize)]
pub struct HypervisorHost {
    pub name: String,
    /// Hardware system UUID, the host's identity
    pub uuid: String,
    pub os_name: String,
    pub os_version: String,
    pub nics: Vec<NetworkInterface>,
    pub disks: Vec<Arc<Disk>>,
    pub vms: Vec<VirtualMachine>,
    pub datastores: Vec<Arc<Datastore>>,
    /// Cluster this host joined; lookup only
    pub cluster: Option<ClusterId>,
    pub disk_groups: Vec<DiskGroup>,
}

impl HypervisorHost {
    /// Empty host record; fails without a UUID
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let uuid = uuid.into();
        if uuid.trim().is_empty() {
            return Err(Error::MissingIdentity {
                entity: format!("host {}", name),
            });
        }

        Ok(Self {
            name,
            uuid,
            os_name: String::new(),
            os_version: String::new(),
            nics: Vec::new(),
            disks: Vec::new(),
            vms: Vec::new(),
            datastores: Vec::new(),
            cluster: None,
            disk_groups: Vec::new(),
        })
    }
}

// =============================================================================
// Host
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "host_kind")]
pub enum Host {
    Linux(LinuxHost),
    Hypervisor(HypervisorHost),
}

impl Host {
    pub fn hostname(&self) -> &str {
        match self {
            Host::Linux(h) => &h.name,
            Host::Hypervisor(h) => &h.name,
        }
    }

    pub fn hw_id(&self) -> &str {
        match self {
            Host::Linux(h) => h.hw_id(),
            Host::Hypervisor(h) => &h.uuid,
        }
    }

    /// Stable identity of the host in the graph
    pub fn domain_id(&self) -> &str {
        self.hw_id()
    }

    pub fn os_type(&self) -> OsType {
        match self {
            Host::Linux(_) => OsType::Linux,
            Host::Hypervisor(_) => OsType::VMware,
        }
    }

    pub fn os_name(&self) -> &str {
        match self {
            Host::Linux(h) => &h.os_name,
            Host::Hypervisor(h) => &h.os_name,
        }
    }

    pub fn os_version(&self) -> &str {
        match self {
            Host::Linux(h) => &h.os_version,
            Host::Hypervisor(h) => &h.os_version,
        }
    }

    pub fn nics(&self) -> &[NetworkInterface] {
        match self {
            Host::Linux(h) => &h.nics,
            Host::Hypervisor(h) => &h.nics,
        }
    }

    pub fn ipv4s(&self) -> String {
        joined_ipv4s(self.nics())
    }

    pub fn ipv6s(&self) -> String {
        joined_ipv6s(self.nics())
    }

    pub fn disks(&self) -> &[Arc<Disk>] {
        match self {
            Host::Linux(h) => &h.disks,
            Host::Hypervisor(h) => &h.disks,
        }
    }

    pub fn as_hypervisor(&self) -> Option<&HypervisorHost> {
        match self {
            Host::Hypervisor(h) => Some(h),
            Host::Linux(_) => None,
        }
    }
}

impl From<LinuxHost> for Host {
    fn from(host: LinuxHost) -> Self {
        Host::Linux(host)
    }
}

impl From<HypervisorHost> for Host {
    fn from(host: HypervisorHost) -> Self {
        Host::Hypervisor(host)
    }
}
