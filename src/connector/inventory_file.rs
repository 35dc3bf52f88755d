//! Inventory Snapshot
//!
//! A [`ManagementApi`] served from a JSON document captured from a
//! management server: every managed object plus the containment edges
//! between folders, datacenters and objects. Used to assemble topology
//! offline and as the backing store for assembler tests.

use crate::domain::inventory::{ManagedObject, ObjectKind, ObjectRef};
use crate::domain::ports::ManagementApi;
use crate::error::{Error, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Root folder id used by vCenter
pub const ROOT_FOLDER_ID: &str = "group-d1";

// =============================================================================
// Snapshot Document
// =============================================================================

/// Serialized inventory: objects plus containment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Server the snapshot was captured from
    pub endpoint: String,
    pub root: ObjectRef,
    #[serde(default)]
    pub objects: Vec<ManagedObject>,
    /// Container (as `Kind:value`) to its direct members
    #[serde(default)]
    pub children: IndexMap<String, Vec<ObjectRef>>,
}

impl InventorySnapshot {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            root: ObjectRef::new(ObjectKind::Folder, ROOT_FOLDER_ID),
            objects: Vec::new(),
            children: IndexMap::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: InventorySnapshot = serde_json::from_str(&text)?;
        info!(
            "Loaded inventory snapshot of {} ({} objects) from {}",
            snapshot.endpoint,
            snapshot.objects.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Add an object reachable only by reference
    pub fn add_object(&mut self, object: ManagedObject) {
        self.objects.push(object);
    }

    /// Add an object as a direct member of `container`
    pub fn add_child(&mut self, container: &ObjectRef, object: ManagedObject) {
        self.children
            .entry(container.to_string())
            .or_default()
            .push(object.object_ref().clone());
        self.objects.push(object);
    }

    /// Record containment of an existing reference, e.g. a folder
    pub fn add_member(&mut self, container: &ObjectRef, member: ObjectRef) {
        self.children.entry(container.to_string()).or_default().push(member);
    }
}

// =============================================================================
// Snapshot-backed Management API
// =============================================================================

#[derive(Debug)]
pub struct SnapshotInventory {
    endpoint: String,
    root: ObjectRef,
    objects: HashMap<ObjectRef, ManagedObject>,
    children: IndexMap<String, Vec<ObjectRef>>,
    connected: AtomicBool,
}

impl SnapshotInventory {
    pub fn from_snapshot(snapshot: InventorySnapshot) -> Self {
        let objects = snapshot
            .objects
            .into_iter()
            .map(|o| (o.object_ref().clone(), o))
            .collect();
        Self {
            endpoint: snapshot.endpoint,
            root: snapshot.root,
            objects,
            children: snapshot.children,
            connected: AtomicBool::new(false),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::from_snapshot(InventorySnapshot::from_file(path)?))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn members(&self, container: &ObjectRef) -> &[ObjectRef] {
        self.children
            .get(&container.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[async_trait]
impl ManagementApi for SnapshotInventory {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        debug!("Connected to snapshot of {}", self.endpoint);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    fn root_folder(&self) -> ObjectRef {
        self.root.clone()
    }

    /// Breadth-first over containment, in member order
    async fn retrieve(
        &self,
        container: &ObjectRef,
        kind: ObjectKind,
        recursive: bool,
    ) -> Result<Vec<ManagedObject>> {
        self.ensure_connected()?;

        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&ObjectRef> = self.members(container).iter().collect();

        while let Some(member) = queue.pop_front() {
            if !seen.insert(member) {
                continue;
            }
            if member.kind == kind {
                if let Some(object) = self.objects.get(member) {
                    found.push(object.clone());
                }
            }
            if recursive {
                queue.extend(self.members(member));
            }
        }

        Ok(found)
    }

    async fn retrieve_objects(&self, refs: &[ObjectRef]) -> Result<Vec<ManagedObject>> {
        self.ensure_connected()?;
        refs.iter()
            .map(|r| {
                self.objects
                    .get(r)
                    .cloned()
                    .ok_or_else(|| Error::ManagementApi(format!("object not found: {}", r)))
            })
            .collect()
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
