//! Disk Index
//!
//! Deduplicates disks discovered through several paths by their normalized
//! world-wide-name. The first record inserted for a WWN is kept; later
//! records with the same WWN are dropped. Insertion order is preserved.

use crate::error::{Error, Result};
use crate::hardware::disk::{normalize_wwn, Disk};
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// WWN-keyed, insertion-ordered disk index
#[derive(Debug, Default)]
pub struct DiskIndex {
    disks: IndexMap<String, Arc<Disk>>,
}

impl DiskIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a disk unless its WWN is already indexed.
    ///
    /// Returns `Ok(true)` when the disk was added, `Ok(false)` when an
    /// earlier record with the same WWN already holds the slot.
    pub fn insert(&mut self, disk: Disk) -> Result<bool> {
        let key = normalize_wwn(&disk.wwn);
        if key.is_empty() {
            return Err(Error::MissingIdentity {
                entity: format!("disk {}", disk.display_name()),
            });
        }

        match self.disks.entry(key) {
            Entry::Occupied(existing) => {
                debug!(
                    "Disk {} duplicates {} (wwn {}), keeping first",
                    disk.display_name(),
                    existing.get().display_name(),
                    existing.key()
                );
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(disk));
                Ok(true)
            }
        }
    }

    pub fn get(&self, wwn: &str) -> Option<&Arc<Disk>> {
        self.disks.get(&normalize_wwn(wwn))
    }

    pub fn contains(&self, wwn: &str) -> bool {
        self.get(wwn).is_some()
    }

    pub fn len(&self) -> usize {
        self.disks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disks.is_empty()
    }

    /// Disks in first-seen order
    pub fn into_disks(self) -> Vec<Arc<Disk>> {
        self.disks.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::discovery::header::DiskHeader;
    use assert_matches::assert_matches;

    fn disk(devpath: &str, wwn: &str) -> Disk {
        let header = DiskHeader::new(devpath, "sat");
        Disk {
            name: header.disk_name(),
            header: Some(header),
            wwn: wwn.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_record_wins() {
        let mut index = DiskIndex::new();

        assert!(index.insert(disk("/dev/sda", "50014ee60711e39c")).unwrap());
        assert!(!index.insert(disk("/dev/sg0", "50014ee60711e39c")).unwrap());
        assert!(index.insert(disk("/dev/sdb", "5000c5005f50e6ab")).unwrap());

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("50014ee60711e39c").unwrap().name, "sda");

        let names: Vec<_> = index.into_disks().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["sda", "sdb"]);
    }

    #[test]
    fn test_lookup_normalizes() {
        let mut index = DiskIndex::new();
        index.insert(disk("/dev/sda", "5 0014ee 60711e39c")).unwrap();

        assert!(index.contains("50014ee60711e39c"));
        assert!(index.contains("5 0014ee 60711e39c"));
    }

    #[test]
    fn test_empty_wwn_rejected() {
        let mut index = DiskIndex::new();
        assert_matches!(
            index.insert(disk("/dev/sda", "  ")),
            Err(Error::MissingIdentity { .. })
        );
        assert!(index.is_empty());
    }
}
