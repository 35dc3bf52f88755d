//! Datacenters

use crate::context::{AgentContext, DEFAULT_DATACENTER_NAME};
use crate::error::Result;
use crate::topology::cluster::{Cluster, ClusterId};
use crate::topology::host::{Host, LinuxHost};
use serde::Serialize;
use std::sync::Arc;

/// A named datacenter with its clusters and a flat list of all its hosts
#[derive(Debug, Clone, Serialize)]
pub struct Datacenter {
    pub name: String,
    pub clusters: Vec<Cluster>,
    pub hosts: Vec<Arc<Host>>,
}

impl Datacenter {
    /// An empty datacenter; a blank name becomes the default name
    pub fn new(name: &str) -> Self {
        let name = if name.trim().is_empty() {
            DEFAULT_DATACENTER_NAME.to_string()
        } else {
            name.to_string()
        };
        Self {
            name,
            clusters: Vec::new(),
            hosts: Vec::new(),
        }
    }

    pub fn domain_id(&self) -> &str {
        &self.name
    }

    pub fn append_cluster(&mut self, cluster: Cluster) {
        self.clusters.push(cluster);
    }

    pub fn append_host(&mut self, host: Arc<Host>) {
        self.hosts.push(host);
    }

    /// Datacenter for a single locally probed host, grouped under the
    /// configured reporting cluster
    pub fn local(ctx: &AgentContext, host: LinuxHost) -> Result<Self> {
        let host = Arc::new(Host::from(host));
        let mut cluster = Cluster::new(
            ClusterId::new(ctx.cluster_kind, ctx.cluster_domain_id.clone()),
            ctx.cluster_name.clone(),
        )?;
        cluster.append_host(Arc::clone(&host));

        let mut datacenter = Datacenter::new(&ctx.datacenter_name);
        datacenter.append_cluster(cluster);
        datacenter.append_host(host);
        Ok(datacenter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::cluster::ClusterKind;

    #[test]
    fn test_default_name() {
        assert_eq!(Datacenter::new("").name, "Global");
        assert_eq!(Datacenter::new("DC-East").domain_id(), "DC-East");
    }

    #[test]
    fn test_local_datacenter() {
        let ctx = AgentContext::default();
        let host = LinuxHost::new("node-a", "Ubuntu", "18.04", vec![], None, vec![]);
        let dc = Datacenter::local(&ctx, host).unwrap();

        assert_eq!(dc.name, "Global");
        assert_eq!(dc.hosts.len(), 1);
        assert_eq!(dc.clusters.len(), 1);

        let cluster = &dc.clusters[0];
        assert_eq!(cluster.kind(), ClusterKind::Default);
        assert_eq!(cluster.domain_id(), "dpCluster");
        assert_eq!(cluster.name, "DiskProphet for Lab Test");
        assert!(Arc::ptr_eq(&cluster.hosts[0], &dc.hosts[0]));
    }
}
