//! Datastores
//!
//! A datastore is identified by the filesystem UUID embedded as the last
//! path segment of its backing URL. It references, but does not own, the
//! disks its extents live on.

use crate::hardware::disk::Disk;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

static BACKING_UUID: Lazy<Regex> = Lazy::new(|| Regex::new(r".*/(.*)/$").unwrap());

/// Filesystem UUID of a backing URL, e.g.
/// `ds:///vmfs/volumes/5a1c3d4e-6f7a8b9c-0d1e-001122334455/`
pub fn backing_uuid(url: &str) -> Option<String> {
    BACKING_UUID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct Datastore {
    pub name: String,
    pub uuid: String,
    pub disks: Vec<Arc<Disk>>,
}

impl Datastore {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>, disks: Vec<Arc<Disk>>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            disks,
        }
    }

    pub fn domain_id(&self) -> &str {
        &self.uuid
    }

    /// vSAN datastores carry `vsan` in their filesystem id
    pub fn is_vsan(&self) -> bool {
        self.uuid.contains("vsan")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_uuid() {
        assert_eq!(
            backing_uuid("ds:///vmfs/volumes/5a1c3d4e-6f7a8b9c-0d1e-001122334455/").as_deref(),
            Some("5a1c3d4e-6f7a8b9c-0d1e-001122334455")
        );
        assert_eq!(
            backing_uuid("ds:///vmfs/volumes/vsan:52e1a2b3c4d5e6f7-8091a2b3c4d5e6f7/").as_deref(),
            Some("vsan:52e1a2b3c4d5e6f7-8091a2b3c4d5e6f7")
        );
        // No trailing slash, no identity
        assert_eq!(backing_uuid("ds:///vmfs/volumes/5a1c3d4e"), None);
    }

    #[test]
    fn test_is_vsan() {
        let ds = Datastore::new("vsanDatastore", "vsan:52e1a2b3c4d5e6f7-8091a2b3c4d5e6f7", vec![]);
        assert!(ds.is_vsan());
        assert_eq!(ds.domain_id(), "vsan:52e1a2b3c4d5e6f7-8091a2b3c4d5e6f7");

        let ds = Datastore::new("local", "5a1c3d4e-6f7a8b9c", vec![]);
        assert!(!ds.is_vsan());
    }
}
