//! vSAN disk groups

use crate::hardware::disk::Disk;
use serde::Serialize;
use std::sync::Arc;

/// One cache disk paired with its capacity disks on a host.
///
/// Disks are shared with the host's disk list, never copied.
#[derive(Debug, Clone, Serialize)]
pub struct DiskGroup {
    /// Name of the owning host
    pub name: String,
    /// UUID of the owning host
    pub host_uuid: String,
    pub cache_disk: Arc<Disk>,
    pub capacity_disks: Vec<Arc<Disk>>,
}

impl DiskGroup {
    pub fn new(name: impl Into<String>, host_uuid: impl Into<String>, cache_disk: Arc<Disk>) -> Self {
        Self {
            name: name.into(),
            host_uuid: host_uuid.into(),
            cache_disk,
            capacity_disks: Vec::new(),
        }
    }

    pub fn domain_id(&self) -> &str {
        &self.host_uuid
    }

    pub fn add_capacity_disk(&mut self, disk: Arc<Disk>) {
        self.capacity_disks.push(disk);
    }
}
