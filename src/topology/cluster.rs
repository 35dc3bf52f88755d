//! Clusters
//!
//! A cluster is keyed by a type-tagged UUID. During one crawl every cluster
//! lives in a single [`ClusterRegistry`]; the first host reporting a UUID
//! creates it and every later host joins the same entity.

use crate::error::{Error, Result};
use crate::topology::host::Host;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Cluster Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClusterKind {
    Unknown,
    /// Hosts with no real cluster membership
    Default,
    Vsan,
    Kubernetes,
    Ceph,
}

impl ClusterKind {
    pub fn code(&self) -> i64 {
        match self {
            ClusterKind::Unknown => 0,
            ClusterKind::Default => 1,
            ClusterKind::Vsan => 2,
            ClusterKind::Kubernetes => 3,
            ClusterKind::Ceph => 4,
        }
    }

    /// Look up a kind by its text tag, case-insensitively
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "nocluster" | "default" => ClusterKind::Default,
            "vsan" => ClusterKind::Vsan,
            "kubernetes" => ClusterKind::Kubernetes,
            "ceph" => ClusterKind::Ceph,
            _ => ClusterKind::Unknown,
        }
    }
}

impl std::fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterKind::Unknown => write!(f, "Unknown Cluster Type"),
            ClusterKind::Default => write!(f, "NoCluster"),
            ClusterKind::Vsan => write!(f, "vSAN"),
            ClusterKind::Kubernetes => write!(f, "Kubernetes"),
            ClusterKind::Ceph => write!(f, "ceph"),
        }
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// Type-tagged cluster identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClusterId {
    pub kind: ClusterKind,
    pub uuid: String,
}

impl ClusterId {
    pub fn new(kind: ClusterKind, uuid: impl Into<String>) -> Self {
        Self {
            kind,
            uuid: uuid.into(),
        }
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.uuid)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    pub hosts: Vec<Arc<Host>>,
}

impl Cluster {
    pub fn new(id: ClusterId, name: impl Into<String>) -> Result<Self> {
        if id.uuid.trim().is_empty() {
            return Err(Error::MissingIdentity {
                entity: format!("{} cluster", id.kind),
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            hosts: Vec::new(),
        })
    }

    pub fn domain_id(&self) -> &str {
        &self.id.uuid
    }

    pub fn kind(&self) -> ClusterKind {
        self.id.kind
    }

    pub fn append_host(&mut self, host: Arc<Host>) {
        self.hosts.push(host);
    }
}

// =============================================================================
// Cluster Registry
// =============================================================================

/// Crawl-wide, insertion-ordered set of clusters.
///
/// Find-or-create runs under one lock, so concurrent host assembly still
/// yields exactly one cluster per identity.
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    clusters: Mutex<IndexMap<ClusterId, Cluster>>,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cluster for `id`, creating it named `name` on first sight.
    ///
    /// The boolean is true when this call created the cluster.
    pub fn find_or_create(&self, id: &ClusterId, name: &str) -> Result<bool> {
        let mut clusters = self.clusters.lock();
        if clusters.contains_key(id) {
            return Ok(false);
        }

        let cluster = Cluster::new(id.clone(), name)?;
        info!("Discovered cluster {}", id);
        clusters.insert(id.clone(), cluster);
        Ok(true)
    }

    /// Append a host to an existing cluster
    pub fn append_host(&self, id: &ClusterId, host: Arc<Host>) -> Result<()> {
        let mut clusters = self.clusters.lock();
        let cluster = clusters
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("cluster {} not registered", id)))?;
        debug!("Host {} joins cluster {}", host.hostname(), id);
        cluster.append_host(host);
        Ok(())
    }

    pub fn get(&self, id: &ClusterId) -> Option<Cluster> {
        self.clusters.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &ClusterId) -> bool {
        self.clusters.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clusters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.lock().is_empty()
    }

    /// Snapshot of the listed clusters, in the order given; unknown ids are
    /// left out
    pub fn select(&self, ids: &[ClusterId]) -> Vec<Cluster> {
        let clusters = self.clusters.lock();
        ids.iter().filter_map(|id| clusters.get(id).cloned()).collect()
    }

    /// All clusters in creation order
    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters.into_inner().into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::host::HypervisorHost;
    use assert_matches::assert_matches;

    fn host(name: &str, uuid: &str) -> Arc<Host> {
        Arc::new(HypervisorHost::new(name, uuid).unwrap().into())
    }

    #[test]
    fn test_cluster_kind_tags() {
        assert_eq!(ClusterKind::from_tag("vSAN"), ClusterKind::Vsan);
        assert_eq!(ClusterKind::from_tag("ceph"), ClusterKind::Ceph);
        assert_eq!(ClusterKind::from_tag("NoCluster"), ClusterKind::Default);
        assert_eq!(ClusterKind::from_tag(""), ClusterKind::Unknown);
        assert_eq!(ClusterKind::from_tag("hadoop"), ClusterKind::Unknown);

        for kind in [ClusterKind::Default, ClusterKind::Vsan, ClusterKind::Kubernetes, ClusterKind::Ceph] {
            assert_eq!(ClusterKind::from_tag(&kind.to_string()), kind);
        }
        assert_eq!(ClusterKind::Vsan.code(), 2);
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let registry = ClusterRegistry::new();
        let id = ClusterId::new(ClusterKind::Vsan, "52a1b2c3-d4e5-f607-1829-3a4b5c6d7e8f");

        assert!(registry.find_or_create(&id, "first-name").unwrap());
        assert!(!registry.find_or_create(&id, "second-name").unwrap());
        registry.append_host(&id, host("esx-01", "uuid-1")).unwrap();
        registry.append_host(&id, host("esx-02", "uuid-2")).unwrap();

        assert_eq!(registry.len(), 1);
        let cluster = registry.get(&id).unwrap();
        assert_eq!(cluster.name, "first-name");
        assert_eq!(cluster.hosts.len(), 2);
    }

    #[test]
    fn test_same_uuid_different_kind() {
        let registry = ClusterRegistry::new();
        let vsan = ClusterId::new(ClusterKind::Vsan, "shared");
        let ceph = ClusterId::new(ClusterKind::Ceph, "shared");

        registry.find_or_create(&vsan, "shared").unwrap();
        registry.find_or_create(&ceph, "shared").unwrap();
        assert_eq!(registry.len(), 2);

        let selected = registry.select(&[ceph.clone(), ClusterId::new(ClusterKind::Vsan, "absent")]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].kind(), ClusterKind::Ceph);
    }

    #[test]
    fn test_empty_uuid_rejected() {
        let registry = ClusterRegistry::new();
        let id = ClusterId::new(ClusterKind::Vsan, " ");
        assert_matches!(registry.find_or_create(&id, "x"), Err(Error::MissingIdentity { .. }));
        assert!(registry.is_empty());
        assert_matches!(registry.append_host(&id, host("esx-01", "uuid-1")), Err(Error::Internal(_)));
    }

    #[test]
    fn test_concurrent_find_or_create() {
        let registry = Arc::new(ClusterRegistry::new());
        let id = ClusterId::new(ClusterKind::Vsan, "52a1b2c3");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                std::thread::spawn(move || {
                    registry.find_or_create(&id, "vsan").unwrap();
                    registry
                        .append_host(&id, host(&format!("esx-{}", i), &format!("uuid-{}", i)))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let clusters = Arc::try_unwrap(registry).unwrap().into_clusters();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].hosts.len(), 8);
    }
}
