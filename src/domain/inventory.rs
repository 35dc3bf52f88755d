//! Managed Object Model
//!
//! The read-only view of the virtualization management API that the topology
//! assembler consumes. Objects reference each other through [`ObjectRef`]s
//! and are fetched through the [`ManagementApi`](super::ports::ManagementApi)
//! port.

use serde::{Deserialize, Serialize};

// =============================================================================
// Object References
// =============================================================================

/// Kind of a managed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Folder,
    Datacenter,
    HostSystem,
    Datastore,
    VirtualMachine,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Folder => write!(f, "Folder"),
            ObjectKind::Datacenter => write!(f, "Datacenter"),
            ObjectKind::HostSystem => write!(f, "HostSystem"),
            ObjectKind::Datastore => write!(f, "Datastore"),
            ObjectKind::VirtualMachine => write!(f, "VirtualMachine"),
        }
    }
}

/// Reference to a managed object, e.g. `HostSystem:host-21`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub value: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

// =============================================================================
// Datacenter
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatacenterObject {
    pub self_ref: ObjectRef,
    pub name: String,
    /// Folder holding the datacenter's hosts
    pub host_folder: ObjectRef,
}

// =============================================================================
// Host System
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSystemObject {
    pub self_ref: ObjectRef,
    /// Configured host name
    pub name: String,
    /// Hardware system UUID
    pub hardware_uuid: String,
    pub product_name: String,
    pub product_version: String,
    #[serde(default)]
    pub vnics: Vec<HostVirtualNic>,
    #[serde(default)]
    pub scsi_luns: Vec<ScsiLun>,
    #[serde(default)]
    pub vsan: Option<VsanHostConfig>,
    #[serde(default)]
    pub datastores: Vec<ObjectRef>,
    #[serde(default)]
    pub vms: Vec<ObjectRef>,
}

/// A host virtual NIC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostVirtualNic {
    pub device: String,
    pub mac: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub ipv6_addresses: Option<Vec<String>>,
}

/// Kind of a SCSI logical unit; only disks become [`Disk`](crate::Disk)s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LunKind {
    Disk,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCapacity {
    pub block: u64,
    pub block_size: u32,
}

/// A SCSI logical unit attached to a host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScsiLun {
    pub kind: LunKind,
    /// e.g. `naa.5000c5005f50e6ab`
    pub canonical_name: String,
    pub uuid: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub ssd: Option<bool>,
    #[serde(default)]
    pub capacity: Option<BlockCapacity>,
}

/// vSAN membership and disk mappings of a host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VsanHostConfig {
    #[serde(default)]
    pub cluster_uuid: String,
    #[serde(default)]
    pub disk_mappings: Vec<VsanDiskMapping>,
}

/// One cache disk with its capacity disks, by canonical name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VsanDiskMapping {
    pub ssd: String,
    #[serde(default)]
    pub non_ssd: Vec<String>,
}

// =============================================================================
// Datastore
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreObject {
    pub self_ref: ObjectRef,
    pub name: String,
    /// Backing URL, e.g. `ds:///vmfs/volumes/5a1c3d4e-.../`
    pub url: String,
    #[serde(default)]
    pub backing: DatastoreBacking,
}

/// Filesystem behind a datastore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatastoreBacking {
    /// VMFS volume spanning the named disk extents
    Vmfs { extents: Vec<String> },
    Vsan,
    Nfs,
    #[default]
    Other,
}

// =============================================================================
// Virtual Machine
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualMachineObject {
    pub self_ref: ObjectRef,
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub datastores: Vec<ObjectRef>,
    #[serde(default)]
    pub root_snapshots: Option<Vec<SnapshotTree>>,
}

/// Snapshot node as reported by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTree {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub children: Vec<SnapshotTree>,
}

// =============================================================================
// Managed Object
// =============================================================================

/// Any object returned by a retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ManagedObject {
    Datacenter(DatacenterObject),
    HostSystem(HostSystemObject),
    Datastore(DatastoreObject),
    VirtualMachine(VirtualMachineObject),
}

impl ManagedObject {
    pub fn object_ref(&self) -> &ObjectRef {
        match self {
            ManagedObject::Datacenter(o) => &o.self_ref,
            ManagedObject::HostSystem(o) => &o.self_ref,
            ManagedObject::Datastore(o) => &o.self_ref,
            ManagedObject::VirtualMachine(o) => &o.self_ref,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            ManagedObject::Datacenter(_) => ObjectKind::Datacenter,
            ManagedObject::HostSystem(_) => ObjectKind::HostSystem,
            ManagedObject::Datastore(_) => ObjectKind::Datastore,
            ManagedObject::VirtualMachine(_) => ObjectKind::VirtualMachine,
        }
    }
}
