//! Topology Assembler
//!
//! Walks the management API's object graph and builds the
//! Datacenter -> Cluster -> Host -> {Datastore, VirtualMachine, DiskGroup}
//! graph. Disks come from each host's SCSI LUN list; datastores, disk groups
//! and virtual machines reference them by canonical name, and virtual
//! machines reference datastores by backing UUID. Any reference that does
//! not resolve aborts the whole assembly.

use crate::domain::inventory::{
    DatastoreBacking, DatastoreObject, HostSystemObject, LunKind, ManagedObject, ObjectKind,
    ObjectRef, ScsiLun, VirtualMachineObject,
};
use crate::domain::ports::{ManagementApi, ManagementApiRef};
use crate::error::{Error, ErrorAction, Result};
use crate::hardware::disk::{format_byte_size, normalize_wwn, Disk, DiskStatus, DiskType};
use crate::hardware::registry::DiskIndex;
use crate::topology::cluster::{ClusterId, ClusterKind, ClusterRegistry};
use crate::topology::datacenter::Datacenter;
use crate::topology::datastore::{backing_uuid, Datastore};
use crate::topology::disk_group::DiskGroup;
use crate::topology::host::{Host, HypervisorHost};
use crate::topology::nic::NetworkInterface;
use crate::topology::virtual_machine::{flatten_snapshots, VirtualMachine};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

static NAA_WWN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^naa\.(.*)").unwrap());

// =============================================================================
// Object Downcasts
// =============================================================================

fn unexpected(expected: ObjectKind, object: &ManagedObject) -> Error {
    Error::UnexpectedObject {
        expected: expected.to_string(),
        actual: object.object_ref().to_string(),
    }
}

fn into_host(object: ManagedObject) -> Result<HostSystemObject> {
    match object {
        ManagedObject::HostSystem(host) => Ok(host),
        other => Err(unexpected(ObjectKind::HostSystem, &other)),
    }
}

fn into_datastore(object: ManagedObject) -> Result<DatastoreObject> {
    match object {
        ManagedObject::Datastore(ds) => Ok(ds),
        other => Err(unexpected(ObjectKind::Datastore, &other)),
    }
}

fn into_vm(object: ManagedObject) -> Result<VirtualMachineObject> {
    match object {
        ManagedObject::VirtualMachine(vm) => Ok(vm),
        other => Err(unexpected(ObjectKind::VirtualMachine, &other)),
    }
}

// =============================================================================
// Host-local Extraction
// =============================================================================

/// WWN of a LUN: the `naa.` suffix of its canonical name, else its UUID
pub fn lun_wwn(lun: &ScsiLun) -> String {
    match NAA_WWN.captures(&lun.canonical_name) {
        Some(caps) => normalize_wwn(&caps[1]),
        None => normalize_wwn(&lun.uuid),
    }
}

/// Disks of a host from its SCSI LUN list.
///
/// Only LUNs of kind disk count. No SMART probe runs on this path, so the
/// status stays unknown and the type is the coarse SSD/HDD family. Two LUNs
/// resolving to the same WWN fail the host.
pub fn extract_disks(host: &HostSystemObject) -> Result<Vec<Arc<Disk>>> {
    let mut index = DiskIndex::new();
    for lun in host.scsi_luns.iter().filter(|l| l.kind == LunKind::Disk) {
        let wwn = lun_wwn(lun);
        if wwn.is_empty() {
            return Err(Error::MissingIdentity {
                entity: format!("disk {} on host {}", lun.canonical_name, host.name),
            });
        }

        let (size, sector_size, capacity_bytes) = match lun.capacity {
            Some(cap) => {
                let bytes = cap.block.saturating_mul(u64::from(cap.block_size));
                (format_byte_size(bytes), cap.block_size.to_string(), Some(bytes))
            }
            None => (String::new(), String::new(), None),
        };

        let disk = Disk {
            name: lun.canonical_name.clone(),
            wwn: wwn.clone(),
            serial_number: lun.serial_number.clone(),
            vendor: lun.vendor.clone(),
            model: lun.model.clone(),
            firmware_version: lun.revision.clone(),
            sector_size,
            size,
            capacity_bytes,
            disk_type: if lun.ssd == Some(true) {
                DiskType::Ssd
            } else {
                DiskType::Hdd
            },
            status: DiskStatus::Unknown,
            ..Default::default()
        };
        if !index.insert(disk)? {
            return Err(Error::DuplicateIdentity {
                key: wwn,
                entity: format!("disk {} on host {}", lun.canonical_name, host.name),
            });
        }
    }
    Ok(index.into_disks())
}

pub fn extract_nics(host: &HostSystemObject) -> Vec<NetworkInterface> {
    host.vnics.iter().map(NetworkInterface::from).collect()
}

fn find_disk(name: &str, disks: &[Arc<Disk>]) -> Result<Arc<Disk>> {
    disks
        .iter()
        .find(|d| d.name == name)
        .cloned()
        .ok_or_else(|| Error::UnresolvedDisk {
            name: name.to_string(),
        })
}

/// Build a datastore, resolving VMFS extents against the host's disks
pub fn build_datastore(object: &DatastoreObject, disks: &[Arc<Disk>]) -> Result<Datastore> {
    let uuid = backing_uuid(&object.url).unwrap_or_default();
    if uuid.is_empty() {
        debug!("Datastore {} has no backing UUID in {:?}", object.name, object.url);
    }

    let members = match &object.backing {
        DatastoreBacking::Vmfs { extents } => extents
            .iter()
            .map(|extent| find_disk(extent, disks))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok(Datastore::new(object.name.clone(), uuid, members))
}

/// Cluster membership and disk groups from a host's vSAN configuration
pub fn build_disk_groups(
    host: &HostSystemObject,
    disks: &[Arc<Disk>],
    registry: &ClusterRegistry,
) -> Result<(Option<ClusterId>, Vec<DiskGroup>)> {
    let vsan = match &host.vsan {
        Some(vsan) => vsan,
        None => return Ok((None, Vec::new())),
    };

    let cluster = if vsan.cluster_uuid.is_empty() {
        None
    } else {
        let id = ClusterId::new(ClusterKind::Vsan, vsan.cluster_uuid.clone());
        registry.find_or_create(&id, &vsan.cluster_uuid)?;
        Some(id)
    };

    let mut groups = Vec::with_capacity(vsan.disk_mappings.len());
    for mapping in &vsan.disk_mappings {
        let mut group = DiskGroup::new(
            host.name.clone(),
            host.hardware_uuid.clone(),
            find_disk(&mapping.ssd, disks)?,
        );
        for name in &mapping.non_ssd {
            group.add_capacity_disk(find_disk(name, disks)?);
        }
        groups.push(group);
    }

    Ok((cluster, groups))
}

fn find_datastore(object: &DatastoreObject, datastores: &[Arc<Datastore>]) -> Result<Arc<Datastore>> {
    let unresolved = || Error::UnresolvedDatastore {
        uuid: backing_uuid(&object.url).unwrap_or_else(|| object.url.clone()),
    };
    let uuid = backing_uuid(&object.url).ok_or_else(unresolved)?;
    datastores
        .iter()
        .find(|ds| ds.uuid == uuid)
        .cloned()
        .ok_or_else(unresolved)
}

// =============================================================================
// Topology Assembler
// =============================================================================

/// Builds datacenter graphs from a management API session
pub struct TopologyAssembler {
    api: ManagementApiRef,
}

impl TopologyAssembler {
    pub fn new(api: ManagementApiRef) -> Self {
        Self { api }
    }

    pub fn endpoint(&self) -> &str {
        self.api.endpoint()
    }

    /// Connect, assemble, and always disconnect
    pub async fn crawl(&self) -> Result<Vec<Datacenter>> {
        self.api.connect().await?;
        let assembled = assemble(self.api.as_ref()).await;
        let disconnected = self.api.disconnect().await;

        let datacenters = match assembled {
            Ok(datacenters) => datacenters,
            Err(e) => {
                match e.action() {
                    ErrorAction::RetryNextPass => {
                        warn!("Crawl of {} interrupted, retrying next pass: {}", self.api.endpoint(), e)
                    }
                    _ => warn!("Crawl of {} aborted: {}", self.api.endpoint(), e),
                }
                return Err(e);
            }
        };
        if let Err(e) = disconnected {
            warn!("Disconnect from {} failed: {}", self.api.endpoint(), e);
        }
        Ok(datacenters)
    }
}

/// Assemble every datacenter reachable from the API's root folder.
///
/// The cluster registry spans the whole crawl. Each datacenter lists the
/// clusters its own hosts joined, in first-join order.
pub async fn assemble(api: &dyn ManagementApi) -> Result<Vec<Datacenter>> {
    let registry = ClusterRegistry::new();
    let root = api.root_folder();

    let dc_objects = api.retrieve(&root, ObjectKind::Datacenter, true).await?;
    info!("Assembling {} datacenters from {}", dc_objects.len(), api.endpoint());

    let mut pending = Vec::with_capacity(dc_objects.len());
    for object in dc_objects {
        let dc_object = match object {
            ManagedObject::Datacenter(dc) => dc,
            other => return Err(unexpected(ObjectKind::Datacenter, &other)),
        };

        let mut datacenter = Datacenter::new(&dc_object.name);
        let mut joined: Vec<ClusterId> = Vec::new();

        let host_objects = api
            .retrieve(&dc_object.host_folder, ObjectKind::HostSystem, true)
            .await?;
        for object in host_objects {
            let host_object = into_host(object)?;
            let (host, cluster) = assemble_host(api, host_object, &registry).await?;
            let host = Arc::new(Host::from(host));

            if let Some(id) = cluster {
                registry.append_host(&id, Arc::clone(&host))?;
                if !joined.contains(&id) {
                    joined.push(id);
                }
            }
            datacenter.append_host(host);
        }

        pending.push((datacenter, joined));
    }

    // Clusters are complete only once every datacenter has been walked
    let datacenters = pending
        .into_iter()
        .map(|(mut datacenter, joined)| {
            datacenter.clusters = registry.select(&joined);
            info!(
                "Datacenter {}: {} hosts, {} clusters",
                datacenter.name,
                datacenter.hosts.len(),
                datacenter.clusters.len()
            );
            datacenter
        })
        .collect();

    Ok(datacenters)
}

async fn assemble_host(
    api: &dyn ManagementApi,
    object: HostSystemObject,
    registry: &ClusterRegistry,
) -> Result<(HypervisorHost, Option<ClusterId>)> {
    let nics = extract_nics(&object);
    let disks = extract_disks(&object)?;

    let mut datastores = Vec::new();
    for ds in retrieve_datastores(api, &object.datastores).await? {
        datastores.push(Arc::new(build_datastore(&ds, &disks)?));
    }

    let (cluster, disk_groups) = build_disk_groups(&object, &disks, registry)?;
    let vms = resolve_vms(api, &object.vms, &datastores).await?;

    let mut host = HypervisorHost::new(object.name.clone(), object.hardware_uuid.clone())?;
    host.os_name = object.product_name;
    host.os_version = object.product_version;
    host.nics = nics;
    host.disks = disks;
    host.datastores = datastores;
    host.disk_groups = disk_groups;
    host.vms = vms;
    host.cluster = cluster.clone();

    debug!(
        "Host {}: {} disks, {} datastores, {} disk groups, {} vms",
        host.name,
        host.disks.len(),
        host.datastores.len(),
        host.disk_groups.len(),
        host.vms.len()
    );
    Ok((host, cluster))
}

async fn retrieve_datastores(api: &dyn ManagementApi, refs: &[ObjectRef]) -> Result<Vec<DatastoreObject>> {
    if refs.is_empty() {
        return Ok(Vec::new());
    }
    api.retrieve_objects(refs)
        .await?
        .into_iter()
        .map(into_datastore)
        .collect()
}

async fn resolve_vms(
    api: &dyn ManagementApi,
    refs: &[ObjectRef],
    datastores: &[Arc<Datastore>],
) -> Result<Vec<VirtualMachine>> {
    if refs.is_empty() {
        return Ok(Vec::new());
    }

    let mut vms = Vec::with_capacity(refs.len());
    for object in api.retrieve_objects(refs).await? {
        let vm = into_vm(object)?;

        let mut vm_datastores = Vec::with_capacity(vm.datastores.len());
        for ds in retrieve_datastores(api, &vm.datastores).await? {
            vm_datastores.push(find_datastore(&ds, datastores)?);
        }

        let snapshots = vm
            .root_snapshots
            .as_deref()
            .map(flatten_snapshots)
            .unwrap_or_default();

        vms.push(VirtualMachine {
            name: vm.name,
            uuid: vm.uuid,
            datastores: vm_datastores,
            snapshots,
        });
    }
    Ok(vms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::inventory_file::{InventorySnapshot, SnapshotInventory};
    use crate::domain::inventory::{
        BlockCapacity, DatacenterObject, HostVirtualNic, SnapshotTree, VsanDiskMapping, VsanHostConfig,
    };
    use assert_matches::assert_matches;

    const CLUSTER_UUID: &str = "52a1b2c3-d4e5-f607-1829-3a4b5c6d7e8f";

    fn lun(canonical: &str, ssd: bool) -> ScsiLun {
        ScsiLun {
            kind: LunKind::Disk,
            canonical_name: canonical.to_string(),
            uuid: format!("0200000000{}", canonical.trim_start_matches("naa.")),
            vendor: "ATA".into(),
            model: "ST4000NM0033".into(),
            revision: "GA6E".into(),
            serial_number: "Z1Z8X2LA".into(),
            ssd: Some(ssd),
            capacity: Some(BlockCapacity {
                block: 7_814_037_168,
                block_size: 512,
            }),
        }
    }

    fn host(id: &str, uuid: &str, vsan: Option<VsanHostConfig>) -> HostSystemObject {
        HostSystemObject {
            self_ref: ObjectRef::new(ObjectKind::HostSystem, id),
            name: format!("{}.lab.local", id),
            hardware_uuid: uuid.to_string(),
            product_name: "VMware ESXi".into(),
            product_version: "6.7.0".into(),
            vnics: vec![HostVirtualNic {
                device: "vmk0".into(),
                mac: "00:50:56:6a:11:02".into(),
                ip_address: "10.0.0.21".into(),
                ipv6_addresses: None,
            }],
            scsi_luns: vec![
                lun("naa.55cd2e404b7ee0e9", true),
                lun("naa.5000c5005f50e6ab", false),
                lun("naa.5000c5005f50e6ac", false),
            ],
            vsan,
            datastores: vec![],
            vms: vec![],
        }
    }

    fn vsan(mappings: Vec<VsanDiskMapping>) -> Option<VsanHostConfig> {
        Some(VsanHostConfig {
            cluster_uuid: CLUSTER_UUID.into(),
            disk_mappings: mappings,
        })
    }

    fn datastore(id: &str, uuid: &str, backing: DatastoreBacking) -> DatastoreObject {
        DatastoreObject {
            self_ref: ObjectRef::new(ObjectKind::Datastore, id),
            name: format!("ds-{}", id),
            url: format!("ds:///vmfs/volumes/{}/", uuid),
            backing,
        }
    }

    fn datacenter(id: &str, name: &str) -> DatacenterObject {
        DatacenterObject {
            self_ref: ObjectRef::new(ObjectKind::Datacenter, id),
            name: name.to_string(),
            host_folder: ObjectRef::new(ObjectKind::Folder, format!("{}-hosts", id)),
        }
    }

    /// One datacenter with the given hosts
    fn inventory(hosts: Vec<HostSystemObject>) -> InventorySnapshot {
        let mut snapshot = InventorySnapshot::new("https://vcsa.lab.local/sdk");
        let root = snapshot.root.clone();
        let dc = datacenter("datacenter-2", "DC-East");
        let folder = dc.host_folder.clone();
        snapshot.add_child(&root, ManagedObject::Datacenter(dc));
        for host in hosts {
            snapshot.add_child(&folder, ManagedObject::HostSystem(host));
        }
        snapshot
    }

    async fn run(snapshot: InventorySnapshot) -> Result<Vec<Datacenter>> {
        let api = SnapshotInventory::from_snapshot(snapshot);
        api.connect().await?;
        assemble(&api).await
    }

    #[test]
    fn test_lun_wwn() {
        assert_eq!(lun_wwn(&lun("naa.5000c5005f50e6ab", false)), "5000c5005f50e6ab");

        let mut t10 = lun("t10.ATA_____ST4000NM0033", false);
        t10.uuid = "0100000000202020205a31".into();
        assert_eq!(lun_wwn(&t10), "0100000000202020205a31");
    }

    #[test]
    fn test_extract_disks() {
        let mut object = host("host-1", "uuid-1", None);
        object.scsi_luns.push(ScsiLun {
            kind: LunKind::Other,
            ..lun("mpx.vmhba32:C0:T0:L0", false)
        });

        let disks = extract_disks(&object).unwrap();
        assert_eq!(disks.len(), 3);
        assert_eq!(disks[0].disk_type, DiskType::Ssd);
        assert_eq!(disks[1].disk_type, DiskType::Hdd);
        assert_eq!(disks[1].name, "naa.5000c5005f50e6ab");
        assert_eq!(disks[1].firmware_version, "GA6E");
        assert_eq!(disks[1].sector_size, "512");
        assert_eq!(disks[1].size, "3.6TB");
        assert_eq!(disks[1].status, DiskStatus::Unknown);
    }

    #[test]
    fn test_extract_disks_duplicate_wwn() {
        let mut object = host("host-1", "uuid-1", None);
        object.scsi_luns = vec![
            ScsiLun {
                uuid: "0100000000ABC".into(),
                ..lun("t10.ATA_A", false)
            },
            ScsiLun {
                uuid: "0100000000ABC".into(),
                ..lun("t10.ATA_B", false)
            },
        ];
        assert_matches!(
            extract_disks(&object),
            Err(Error::DuplicateIdentity { key, .. }) if key == "0100000000ABC"
        );

        // Same naa suffix behind two canonical names
        object.scsi_luns = vec![
            lun("naa.5000c5005f50e6ab", false),
            lun("naa.5000c5005f50e6ab", true),
        ];
        assert_matches!(extract_disks(&object), Err(Error::DuplicateIdentity { .. }));
    }

    #[tokio::test]
    async fn test_assemble_single_host() {
        let mut object = host("host-1", "uuid-1", None);
        object.datastores = vec![ObjectRef::new(ObjectKind::Datastore, "datastore-1")];
        object.vms = vec![ObjectRef::new(ObjectKind::VirtualMachine, "vm-1")];

        let mut snapshot = inventory(vec![object]);
        snapshot.add_object(ManagedObject::Datastore(datastore(
            "datastore-1",
            "5a1c3d4e-6f7a8b9c",
            DatastoreBacking::Vmfs {
                extents: vec!["naa.5000c5005f50e6ab".into()],
            },
        )));
        snapshot.add_object(ManagedObject::VirtualMachine(VirtualMachineObject {
            self_ref: ObjectRef::new(ObjectKind::VirtualMachine, "vm-1"),
            name: "web-01".into(),
            uuid: "4230a1b2-c3d4-e5f6-0718-293a4b5c6d7e".into(),
            datastores: vec![ObjectRef::new(ObjectKind::Datastore, "datastore-1")],
            root_snapshots: Some(vec![SnapshotTree {
                id: 1,
                name: "base".into(),
                children: vec![
                    SnapshotTree {
                        id: 2,
                        name: "upgrade".into(),
                        children: vec![],
                    },
                    SnapshotTree {
                        id: 3,
                        name: "rollback".into(),
                        children: vec![],
                    },
                ],
            }]),
        }));

        let dcs = run(snapshot).await.unwrap();
        assert_eq!(dcs.len(), 1);
        assert_eq!(dcs[0].name, "DC-East");
        assert!(dcs[0].clusters.is_empty());

        let host = dcs[0].hosts[0].as_hypervisor().unwrap();
        assert_eq!(host.uuid, "uuid-1");
        assert_eq!(host.nics[0].ipv4s, vec!["10.0.0.21"]);
        assert_eq!(host.datastores[0].uuid, "5a1c3d4e-6f7a8b9c");
        assert!(Arc::ptr_eq(&host.datastores[0].disks[0], &host.disks[1]));

        let vm = &host.vms[0];
        assert!(Arc::ptr_eq(&vm.datastores[0], &host.datastores[0]));
        let snapshots: Vec<_> = vm.snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(snapshots, vec!["base", "upgrade", "rollback"]);
    }

    #[tokio::test]
    async fn test_cluster_shared_across_hosts() {
        let mapping = |ssd: &str, capacity: &[&str]| VsanDiskMapping {
            ssd: ssd.to_string(),
            non_ssd: capacity.iter().map(|s| s.to_string()).collect(),
        };
        let hosts = vec![
            host(
                "host-1",
                "uuid-1",
                vsan(vec![mapping(
                    "naa.55cd2e404b7ee0e9",
                    &["naa.5000c5005f50e6ab", "naa.5000c5005f50e6ac"],
                )]),
            ),
            host("host-2", "uuid-2", vsan(vec![])),
        ];

        let dcs = run(inventory(hosts)).await.unwrap();
        let dc = &dcs[0];
        assert_eq!(dc.clusters.len(), 1);
        assert_eq!(dc.clusters[0].domain_id(), CLUSTER_UUID);
        assert_eq!(dc.clusters[0].kind(), ClusterKind::Vsan);
        assert_eq!(dc.clusters[0].hosts.len(), 2);
        assert_eq!(dc.hosts.len(), 2);

        let first = dc.hosts[0].as_hypervisor().unwrap();
        assert_eq!(first.cluster.as_ref().unwrap().uuid, CLUSTER_UUID);
        let group = &first.disk_groups[0];
        assert_eq!(group.domain_id(), "uuid-1");
        assert!(Arc::ptr_eq(&group.cache_disk, &first.disks[0]));
        assert_eq!(group.capacity_disks.len(), 2);
    }

    #[tokio::test]
    async fn test_cluster_spans_datacenters() {
        let mut snapshot = InventorySnapshot::new("https://vcsa.lab.local/sdk");
        let root = snapshot.root.clone();
        for (dc_id, host_id) in [("datacenter-2", "host-1"), ("datacenter-3", "host-2")] {
            let dc = datacenter(dc_id, dc_id);
            let folder = dc.host_folder.clone();
            snapshot.add_child(&root, ManagedObject::Datacenter(dc));
            snapshot.add_child(
                &folder,
                ManagedObject::HostSystem(host(host_id, &format!("uuid-{}", host_id), vsan(vec![]))),
            );
        }

        let dcs = run(snapshot).await.unwrap();
        assert_eq!(dcs.len(), 2);
        assert_eq!(dcs[0].clusters.len(), 1);
        assert_eq!(dcs[1].clusters.len(), 1);
        assert_eq!(dcs[0].clusters[0].hosts.len(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_extent_disk_aborts() {
        let mut object = host("host-1", "uuid-1", None);
        object.datastores = vec![ObjectRef::new(ObjectKind::Datastore, "datastore-1")];

        let mut snapshot = inventory(vec![object]);
        snapshot.add_object(ManagedObject::Datastore(datastore(
            "datastore-1",
            "5a1c3d4e-6f7a8b9c",
            DatastoreBacking::Vmfs {
                extents: vec!["naa.600508b1001c4d5e".into()],
            },
        )));

        assert_matches!(
            run(snapshot).await,
            Err(Error::UnresolvedDisk { name }) if name == "naa.600508b1001c4d5e"
        );
    }

    #[tokio::test]
    async fn test_unresolved_diskgroup_disk_aborts() {
        let object = host(
            "host-1",
            "uuid-1",
            vsan(vec![VsanDiskMapping {
                ssd: "naa.55cd2e404b7ee0e9".into(),
                non_ssd: vec!["naa.5000c50000000000".into()],
            }]),
        );

        let err = run(inventory(vec![object])).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot find disk naa.5000c50000000000");
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unresolved_vm_datastore_aborts() {
        let mut object = host("host-1", "uuid-1", None);
        object.vms = vec![ObjectRef::new(ObjectKind::VirtualMachine, "vm-1")];

        let mut snapshot = inventory(vec![object]);
        snapshot.add_object(ManagedObject::Datastore(datastore(
            "datastore-9",
            "nfs-share-9",
            DatastoreBacking::Nfs,
        )));
        snapshot.add_object(ManagedObject::VirtualMachine(VirtualMachineObject {
            self_ref: ObjectRef::new(ObjectKind::VirtualMachine, "vm-1"),
            name: "db-01".into(),
            uuid: "4230ffff".into(),
            datastores: vec![ObjectRef::new(ObjectKind::Datastore, "datastore-9")],
            root_snapshots: None,
        }));

        assert_matches!(
            run(snapshot).await,
            Err(Error::UnresolvedDatastore { uuid }) if uuid == "nfs-share-9"
        );
    }

    #[tokio::test]
    async fn test_host_without_uuid_aborts() {
        let object = host("host-1", "", None);
        assert_matches!(run(inventory(vec![object])).await, Err(Error::MissingIdentity { .. }));
    }

    #[tokio::test]
    async fn test_crawl_disconnects() {
        let api = Arc::new(SnapshotInventory::from_snapshot(inventory(vec![host(
            "host-1", "uuid-1", None,
        )])));
        let assembler = TopologyAssembler::new(api.clone());

        let dcs = assembler.crawl().await.unwrap();
        assert_eq!(dcs[0].hosts.len(), 1);
        assert!(!api.is_connected());
        assert_matches!(assemble(api.as_ref()).await, Err(Error::NotConnected));
    }

    #[tokio::test]
    async fn test_crawl_disconnects_after_abort() {
        let mut object = host("host-1", "uuid-1", None);
        object.scsi_luns.push(lun("naa.5000c5005f50e6ab", false));
        let api = Arc::new(SnapshotInventory::from_snapshot(inventory(vec![object])));
        let assembler = TopologyAssembler::new(api.clone());

        assert_matches!(
            assembler.crawl().await,
            Err(Error::DuplicateIdentity { key, .. }) if key == "5000c5005f50e6ab"
        );
        assert!(!api.is_connected());
    }
}
