//! Virtual Machines and Snapshots
//!
//! Snapshot trees arrive nested; they are flattened depth-first in document
//! order with an explicit stack, so tree depth never grows the call stack.

use crate::domain::inventory::SnapshotTree;
use crate::topology::datastore::Datastore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: i64,
    pub name: String,
}

impl Snapshot {
    pub fn domain_id(&self) -> String {
        self.id.to_string()
    }
}

/// Pre-order flatten of a snapshot forest.
///
/// A snapshot id seen twice is reported once; the repeated subtree is
/// skipped.
pub fn flatten_snapshots(roots: &[SnapshotTree]) -> Vec<Snapshot> {
    let mut flat = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<&SnapshotTree> = roots.iter().rev().collect();

    while let Some(node) = stack.pop() {
        if !seen.insert(node.id) {
            warn!("Snapshot {} ({}) repeated in tree, skipping", node.id, node.name);
            continue;
        }
        flat.push(Snapshot {
            id: node.id,
            name: node.name.clone(),
        });
        stack.extend(node.children.iter().rev());
    }

    flat
}

// =============================================================================
// Virtual Machine
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VirtualMachine {
    pub name: String,
    pub uuid: String,
    pub datastores: Vec<Arc<Datastore>>,
    pub snapshots: Vec<Snapshot>,
}

impl VirtualMachine {
    pub fn domain_id(&self) -> &str {
        &self.uuid
    }
}
