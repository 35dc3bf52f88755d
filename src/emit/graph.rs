//! Topology Graph Walk
//!
//! Turns assembled datacenters into labelled nodes and directed relations
//! for the graph store. Every relation carries both of its endpoint nodes so
//! the store can merge them idempotently.

use crate::context::AgentContext;
use crate::domain::ports::{GraphNode, GraphRelation, TopologySink};
use crate::emit::measurement::{sai_cluster, sai_host};
use crate::error::{Error, Result};
use crate::topology::{Cluster, Datacenter, Host};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

// =============================================================================
// Labels and Relationships
// =============================================================================

pub const LABEL_CLUSTER_CENTER: &str = "VMClusterCenter";
pub const LABEL_DATACENTER: &str = "VMDataCenter";
pub const LABEL_VSAN_CLUSTER: &str = "VMVSanCluster";
pub const LABEL_HOST: &str = "VMHost";
pub const LABEL_DISK: &str = "VMDisk";
pub const LABEL_DATASTORE: &str = "VMDatastore";
pub const LABEL_DISK_GROUP: &str = "VMVSanDiskGroup";
pub const LABEL_VIRTUAL_MACHINE: &str = "VMVirtualMachine";
pub const LABEL_SNAPSHOT: &str = "VMSnapshot";

pub const DATACENTER_CONTAINS_CLUSTER: &str = "VmDataCenterContainsVmCluster";
pub const DATACENTER_CONTAINS_VSAN_CLUSTER: &str = "VmDataCenterContainsVSanCluster";
pub const CLUSTER_CONTAINS_HOST: &str = "VmClusterContainsVmHost";
pub const CLUSTER_CONTAINS_DATASTORE: &str = "VmClusterContainsVmDatastore";
pub const VSAN_CLUSTER_CONTAINS_DISK_GROUP: &str = "VSanClusterContainsVSanDiskGroup";
pub const VSAN_DATASTORE_CONTAINS_DISK_GROUP: &str = "VsanDatastoreContainsVmDiskGroup";
pub const DISK_GROUP_HAS_CACHE_DISK: &str = "VSanDiskGroupHasCacheVmDisk";
pub const DISK_GROUP_HAS_CAPACITY_DISK: &str = "VSanDiskGroupHasCapacityVmDisk";
pub const HOST_CONTAINS_DISK: &str = "VmHostContainsVmDisk";
pub const HOST_HAS_DATASTORE: &str = "VmHostHasVmDatastore";
pub const HOST_HAS_DISK_GROUP: &str = "VmHostHasVmDiskGroup";
pub const HOST_HOSTS_VIRTUAL_MACHINE: &str = "VmHostHostsVmVirtualMachine";
pub const DATASTORE_COMPOSES_OF_DISK: &str = "VmDatastoreComposesOfVmDisk";
pub const VIRTUAL_MACHINE_USES_DATASTORE: &str = "VmVirtualMachineUsesVmDatastore";
pub const VIRTUAL_MACHINE_TAKES_SNAPSHOT: &str = "VmVirtualMachineTakesVmSnapshot";

/// Build a node; label, domain id and name must all be present
pub fn graph_node(label: &str, domain_id: &str, name: &str) -> Result<GraphNode> {
    if label.is_empty() || domain_id.is_empty() || name.is_empty() {
        return Err(Error::MissingIdentity {
            entity: format!("graph node ({}-{}-{})", label, domain_id, name),
        });
    }
    Ok(GraphNode {
        label: label.to_string(),
        domain_id: domain_id.to_string(),
        name: name.to_string(),
        endpoint: None,
    })
}

// =============================================================================
// Emitter
// =============================================================================

/// Counts of what one walk handed to the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub nodes: usize,
    pub relations: usize,
    pub measurements: usize,
}

impl std::fmt::Display for EmitSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} relations, {} measurements",
            self.nodes, self.relations, self.measurements
        )
    }
}

/// Walks a topology into a sink
pub struct GraphEmitter<'a> {
    ctx: &'a AgentContext,
    sink: &'a mut dyn TopologySink,
    timestamp: DateTime<Utc>,
    summary: EmitSummary,
}

impl<'a> GraphEmitter<'a> {
    pub fn new(ctx: &'a AgentContext, sink: &'a mut dyn TopologySink) -> Self {
        Self {
            ctx,
            sink,
            timestamp: Utc::now(),
            summary: EmitSummary::default(),
        }
    }

    /// Stamp every measurement of this walk with `timestamp`
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Emit the whole graph under the root node for `endpoint`
    pub fn emit(mut self, endpoint: &str, datacenters: &[Datacenter]) -> Result<EmitSummary> {
        let mut root = graph_node(
            LABEL_CLUSTER_CENTER,
            &self.ctx.cluster_domain_id,
            &self.ctx.cluster_name,
        )?;
        if !endpoint.is_empty() {
            root.endpoint = Some(endpoint.to_string());
        }
        self.sink.node(&root)?;
        self.summary.nodes += 1;

        if datacenters.is_empty() {
            info!("{} contains no datacenters", endpoint);
            return Ok(self.summary);
        }

        let cluster = sai_cluster(
            &self.ctx.cluster_domain_id,
            &self.ctx.cluster_name,
            self.timestamp,
        );
        self.sink.measurement(&cluster)?;
        self.summary.measurements += 1;

        for datacenter in datacenters {
            self.emit_datacenter(&root, datacenter)?;
        }

        info!("Emitted topology of {}: {}", endpoint, self.summary);
        Ok(self.summary)
    }

    fn relate(&mut self, from: &GraphNode, to: &GraphNode, relationship: &str) -> Result<()> {
        self.sink.relation(&GraphRelation {
            from: from.clone(),
            to: to.clone(),
            relationship: relationship.to_string(),
        })?;
        self.summary.relations += 1;
        Ok(())
    }

    fn emit_datacenter(&mut self, root: &GraphNode, datacenter: &Datacenter) -> Result<()> {
        let dc_node = graph_node(LABEL_DATACENTER, datacenter.domain_id(), &datacenter.name)?;
        self.relate(&dc_node, root, DATACENTER_CONTAINS_CLUSTER)?;

        for cluster in &datacenter.clusters {
            self.emit_cluster(&dc_node, cluster)?;
        }

        for host in &datacenter.hosts {
            self.emit_host(root, host)?;
        }
        debug!("Emitted datacenter {}", datacenter.name);
        Ok(())
    }

    fn emit_cluster(&mut self, dc_node: &GraphNode, cluster: &Cluster) -> Result<()> {
        let cluster_node = graph_node(LABEL_VSAN_CLUSTER, cluster.domain_id(), &cluster.name)?;
        self.relate(dc_node, &cluster_node, DATACENTER_CONTAINS_VSAN_CLUSTER)?;

        for host in cluster.hosts.iter().filter_map(|h| h.as_hypervisor()) {
            for datastore in host.datastores.iter().filter(|ds| ds.is_vsan()) {
                let ds_node = graph_node(LABEL_DATASTORE, datastore.domain_id(), &datastore.name)?;
                let group_node = graph_node(LABEL_DISK_GROUP, &host.uuid, &host.name)?;
                self.relate(&ds_node, &group_node, VSAN_DATASTORE_CONTAINS_DISK_GROUP)?;
            }

            for group in &host.disk_groups {
                let group_node = graph_node(LABEL_DISK_GROUP, group.domain_id(), &group.name)?;
                self.relate(&cluster_node, &group_node, VSAN_CLUSTER_CONTAINS_DISK_GROUP)?;

                let cache = &group.cache_disk;
                let cache_node = graph_node(LABEL_DISK, cache.domain_id(), &cache.name)?;
                self.relate(&group_node, &cache_node, DISK_GROUP_HAS_CACHE_DISK)?;

                for disk in &group.capacity_disks {
                    let disk_node = graph_node(LABEL_DISK, disk.domain_id(), &disk.name)?;
                    self.relate(&group_node, &disk_node, DISK_GROUP_HAS_CAPACITY_DISK)?;
                }
            }
        }
        Ok(())
    }

    fn emit_host(&mut self, root: &GraphNode, host: &Host) -> Result<()> {
        let measurement = sai_host(host, &self.ctx.cluster_domain_id, self.timestamp);
        self.sink.measurement(&measurement)?;
        self.summary.measurements += 1;

        let host_node = graph_node(LABEL_HOST, host.domain_id(), host.hostname())?;
        self.relate(&host_node, root, CLUSTER_CONTAINS_HOST)?;

        for disk in host.disks() {
            let disk_node = graph_node(LABEL_DISK, disk.domain_id(), &disk.name)?;
            self.relate(&host_node, &disk_node, HOST_CONTAINS_DISK)?;
        }

        let hypervisor = match host.as_hypervisor() {
            Some(h) => h,
            None => return Ok(()),
        };

        for datastore in &hypervisor.datastores {
            let ds_node = graph_node(LABEL_DATASTORE, datastore.domain_id(), &datastore.name)?;
            self.relate(root, &ds_node, CLUSTER_CONTAINS_DATASTORE)?;
            self.relate(&host_node, &ds_node, HOST_HAS_DATASTORE)?;

            for disk in &datastore.disks {
                let disk_node = graph_node(LABEL_DISK, disk.domain_id(), &disk.name)?;
                self.relate(&ds_node, &disk_node, DATASTORE_COMPOSES_OF_DISK)?;
            }
        }

        for group in &hypervisor.disk_groups {
            let group_node = graph_node(LABEL_DISK_GROUP, group.domain_id(), &group.name)?;
            self.relate(&host_node, &group_node, HOST_HAS_DISK_GROUP)?;
        }

        for vm in &hypervisor.vms {
            let vm_node = graph_node(LABEL_VIRTUAL_MACHINE, vm.domain_id(), &vm.name)?;
            self.relate(&host_node, &vm_node, HOST_HOSTS_VIRTUAL_MACHINE)?;

            for datastore in &vm.datastores {
                let ds_node = graph_node(LABEL_DATASTORE, datastore.domain_id(), &datastore.name)?;
                self.relate(&vm_node, &ds_node, VIRTUAL_MACHINE_USES_DATASTORE)?;
            }
            for snapshot in &vm.snapshots {
                let snap_node = graph_node(LABEL_SNAPSHOT, &snapshot.domain_id(), &snapshot.name)?;
                self.relate(&vm_node, &snap_node, VIRTUAL_MACHINE_TAKES_SNAPSHOT)?;
            }
        }
        Ok(())
    }
}

/// Emit the graph of `datacenters` under the root node for `endpoint`
pub fn emit_topology(
    ctx: &AgentContext,
    endpoint: &str,
    datacenters: &[Datacenter],
    sink: &mut dyn TopologySink,
) -> Result<EmitSummary> {
    GraphEmitter::new(ctx, sink).emit(endpoint, datacenters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::sink::testing::CollectingSink;
    use crate::hardware::disk::Disk;
    use crate::topology::{
        ClusterId, ClusterKind, Datastore, DiskGroup, HypervisorHost, LinuxHost, Snapshot,
        VirtualMachine,
    };
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn disk(name: &str, wwn: &str) -> Arc<Disk> {
        Arc::new(Disk {
            name: name.to_string(),
            wwn: wwn.to_string(),
            ..Default::default()
        })
    }

    fn vsan_datacenter() -> Datacenter {
        let cache = disk("naa.55cd2e404b7ee0e9", "55cd2e404b7ee0e9");
        let capacity = disk("naa.5000c5005f50e6ab", "5000c5005f50e6ab");
        let local = Arc::new(Datastore::new(
            "datastore1",
            "5a1c3d4e-6f7a8b9c-0d1e-001122334455",
            vec![Arc::clone(&capacity)],
        ));
        let vsan = Arc::new(Datastore::new("vsanDatastore", "vsan:52a0e3b1c4d5e6f7", vec![]));

        let mut group = DiskGroup::new("esx-01", "4c4c4544-0038", Arc::clone(&cache));
        group.add_capacity_disk(Arc::clone(&capacity));

        let mut host = HypervisorHost::new("esx-01", "4c4c4544-0038").unwrap();
        host.disks = vec![cache, capacity];
        host.datastores = vec![Arc::clone(&local), vsan];
        host.disk_groups = vec![group];
        host.vms = vec![VirtualMachine {
            name: "web-01".to_string(),
            uuid: "4210b1a2-77aa".to_string(),
            datastores: vec![local],
            snapshots: vec![Snapshot {
                id: 1,
                name: "before-upgrade".to_string(),
            }],
        }];
        let id = ClusterId::new(ClusterKind::Vsan, "52a0e3b1c4d5e6f7");
        host.cluster = Some(id.clone());

        let host = Arc::new(Host::from(host));
        let mut cluster = Cluster::new(id, "vsan-cluster").unwrap();
        cluster.append_host(Arc::clone(&host));

        let mut dc = Datacenter::new("DC-East");
        dc.append_cluster(cluster);
        dc.append_host(host);
        dc
    }

    fn relationships(sink: &CollectingSink) -> Vec<&str> {
        sink.relations.iter().map(|r| r.relationship.as_str()).collect()
    }

    #[test]
    fn test_emit_order() {
        let ctx = AgentContext::default();
        let mut sink = CollectingSink::default();
        let summary = emit_topology(&ctx, "https://vcsa.lab.local/sdk", &[vsan_datacenter()], &mut sink).unwrap();

        assert_eq!(
            relationships(&sink),
            vec![
                DATACENTER_CONTAINS_CLUSTER,
                DATACENTER_CONTAINS_VSAN_CLUSTER,
                VSAN_DATASTORE_CONTAINS_DISK_GROUP,
                VSAN_CLUSTER_CONTAINS_DISK_GROUP,
                DISK_GROUP_HAS_CACHE_DISK,
                DISK_GROUP_HAS_CAPACITY_DISK,
                CLUSTER_CONTAINS_HOST,
                HOST_CONTAINS_DISK,
                HOST_CONTAINS_DISK,
                CLUSTER_CONTAINS_DATASTORE,
                HOST_HAS_DATASTORE,
                DATASTORE_COMPOSES_OF_DISK,
                CLUSTER_CONTAINS_DATASTORE,
                HOST_HAS_DATASTORE,
                HOST_HAS_DISK_GROUP,
                HOST_HOSTS_VIRTUAL_MACHINE,
                VIRTUAL_MACHINE_USES_DATASTORE,
                VIRTUAL_MACHINE_TAKES_SNAPSHOT,
            ]
        );
        assert_eq!(summary.nodes, 1);
        assert_eq!(summary.relations, sink.relations.len());
        assert_eq!(summary.measurements, 2);

        let root = &sink.nodes[0];
        assert_eq!(root.label, LABEL_CLUSTER_CENTER);
        assert_eq!(root.domain_id, "dpCluster");
        assert_eq!(root.endpoint.as_deref(), Some("https://vcsa.lab.local/sdk"));

        // Stored directions point at the root for datacenters and hosts
        let first = &sink.relations[0];
        assert_eq!(first.from.label, LABEL_DATACENTER);
        assert_eq!(first.to.label, LABEL_CLUSTER_CENTER);

        let names: Vec<_> = sink.measurements.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["sai_cluster", "sai_host"]);
    }

    #[test]
    fn test_emit_without_datacenters() {
        let ctx = AgentContext::default();
        let mut sink = CollectingSink::default();
        let summary = emit_topology(&ctx, "vcsa.lab.local", &[], &mut sink).unwrap();

        assert_eq!(summary, EmitSummary { nodes: 1, relations: 0, measurements: 0 });
        assert_eq!(sink.nodes[0].label, LABEL_CLUSTER_CENTER);
    }

    #[test]
    fn test_emit_local_host() {
        let ctx = AgentContext::default();
        let host = LinuxHost::new(
            "node-a",
            "Ubuntu",
            "18.04",
            vec![],
            None,
            vec![disk("sda", "50014ee60711e39c")],
        );
        let dc = Datacenter::local(&ctx, host).unwrap();

        let mut sink = CollectingSink::default();
        emit_topology(&ctx, "", &[dc], &mut sink).unwrap();

        assert_eq!(
            relationships(&sink),
            vec![
                DATACENTER_CONTAINS_CLUSTER,
                DATACENTER_CONTAINS_VSAN_CLUSTER,
                CLUSTER_CONTAINS_HOST,
                HOST_CONTAINS_DISK,
            ]
        );
        assert!(sink.nodes[0].endpoint.is_none());
    }

    #[test]
    fn test_rejects_incomplete_node() {
        assert_matches!(
            graph_node(LABEL_DISK, "", "sda"),
            Err(Error::MissingIdentity { .. })
        );

        let ctx = AgentContext::default();
        let host = LinuxHost::new("node-a", "Ubuntu", "18.04", vec![], None, vec![disk("sdb", "")]);
        let dc = Datacenter::local(&ctx, host).unwrap();
        let mut sink = CollectingSink::default();
        assert_matches!(
            emit_topology(&ctx, "", &[dc], &mut sink),
            Err(Error::MissingIdentity { .. })
        );
    }
}
