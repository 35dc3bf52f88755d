//! Flat Measurements
//!
//! Builders for the `sai_*` measurements written next to the graph: one
//! per host, one for the reporting cluster, and a record plus a SMART
//! sample for every probed disk.

use crate::context::{DEFAULT_CLUSTER_DOMAIN_ID, DEFAULT_CLUSTER_NAME};
use crate::domain::ports::{FieldValue, Measurement, TopologySink};
use crate::error::Result;
use crate::hardware::discovery::{MetricValue, ProbedDisk, ProbedHost, SmartMetrics};
use crate::hardware::disk::Disk;
use crate::topology::Host;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

pub const SAI_HOST: &str = "sai_host";
pub const SAI_CLUSTER: &str = "sai_cluster";
pub const SAI_DISK: &str = "sai_disk";
pub const SAI_DISK_SMART: &str = "sai_disk_smart";

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

impl From<MetricValue> for FieldValue {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Integer(v) => FieldValue::Integer(v),
            MetricValue::Float(v) => FieldValue::Float(v),
        }
    }
}

/// Tags shared by both disk measurements
fn disk_tags(disk: &Disk, cluster_domain_id: &str, host_domain_id: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert("disk_name".to_string(), disk.display_name());
    tags.insert("disk_wwn".to_string(), disk.wwn.clone());
    tags.insert("disk_domain_id".to_string(), disk.domain_id().to_string());
    tags.insert(
        "primary_key".to_string(),
        format!("{}-{}-{}", cluster_domain_id, host_domain_id, disk.wwn),
    );
    tags
}

pub fn sai_host(host: &Host, cluster_domain_id: &str, timestamp: DateTime<Utc>) -> Measurement {
    let mut tags = BTreeMap::new();
    tags.insert("domain_id".to_string(), host.domain_id().to_string());

    let mut fields = BTreeMap::new();
    fields.insert("host_uuid".to_string(), text(host.hw_id()));
    fields.insert("cluster_domain_id".to_string(), text(cluster_domain_id));
    fields.insert("name".to_string(), text(host.hostname()));
    fields.insert("os_type".to_string(), text(&host.os_type().to_string()));
    fields.insert("os_name".to_string(), text(host.os_name()));
    fields.insert("os_version".to_string(), text(host.os_version()));
    fields.insert("host_ip".to_string(), FieldValue::Text(host.ipv4s()));
    fields.insert("host_ipv6".to_string(), FieldValue::Text(host.ipv6s()));

    Measurement {
        name: SAI_HOST.to_string(),
        tags,
        fields,
        timestamp,
    }
}

/// The reporting cluster; blank values fall back to the defaults
pub fn sai_cluster(domain_id: &str, name: &str, timestamp: DateTime<Utc>) -> Measurement {
    let domain_id = if domain_id.is_empty() { DEFAULT_CLUSTER_DOMAIN_ID } else { domain_id };
    let name = if name.is_empty() { DEFAULT_CLUSTER_NAME } else { name };

    let mut tags = BTreeMap::new();
    tags.insert("domain_id".to_string(), domain_id.to_string());
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), text(name));

    Measurement {
        name: SAI_CLUSTER.to_string(),
        tags,
        fields,
        timestamp,
    }
}

pub fn sai_disk(
    disk: &Disk,
    cluster_domain_id: &str,
    host_domain_id: &str,
    timestamp: DateTime<Utc>,
) -> Measurement {
    let mut fields = BTreeMap::new();
    fields.insert("cluster_domain_id".to_string(), text(cluster_domain_id));
    fields.insert("host_domain_id".to_string(), text(host_domain_id));
    fields.insert(
        "disk_status".to_string(),
        FieldValue::Integer(i64::from(disk.status.code())),
    );
    fields.insert(
        "disk_type".to_string(),
        FieldValue::Integer(i64::from(disk.disk_type.code())),
    );
    fields.insert("firmware_version".to_string(), text(&disk.firmware_version));
    fields.insert("model".to_string(), text(&disk.model));
    fields.insert("sata_version".to_string(), text(&disk.sata_version));
    fields.insert("sector_size".to_string(), text(&disk.sector_size));
    fields.insert("serial_number".to_string(), text(&disk.serial_number));
    fields.insert("size".to_string(), text(&disk.size));
    fields.insert("smart_health_status".to_string(), text(&disk.smart_health_status));
    fields.insert("transport_protocol".to_string(), text(&disk.transport_protocol));
    fields.insert("vendor".to_string(), text(&disk.vendor));

    Measurement {
        name: SAI_DISK.to_string(),
        tags: disk_tags(disk, cluster_domain_id, host_domain_id),
        fields,
        timestamp,
    }
}

pub fn sai_disk_smart(
    disk: &Disk,
    metrics: &SmartMetrics,
    cluster_domain_id: &str,
    host_domain_id: &str,
    timestamp: DateTime<Utc>,
) -> Measurement {
    let mut fields: BTreeMap<String, FieldValue> = metrics
        .values
        .iter()
        .map(|(name, value)| (name.clone(), FieldValue::from(*value)))
        .collect();
    fields.insert("cluster_domain_id".to_string(), text(cluster_domain_id));
    fields.insert("host_domain_id".to_string(), text(host_domain_id));

    Measurement {
        name: SAI_DISK_SMART.to_string(),
        tags: disk_tags(disk, cluster_domain_id, host_domain_id),
        fields,
        timestamp,
    }
}

/// Emit a SMART sample and a disk record for every probed disk
pub fn emit_disk_measurements(
    disks: &[ProbedDisk],
    cluster_domain_id: &str,
    host_domain_id: &str,
    sink: &mut dyn TopologySink,
    timestamp: DateTime<Utc>,
) -> Result<usize> {
    for probed in disks {
        let disk = probed.disk.as_ref();
        sink.measurement(&sai_disk_smart(
            disk,
            &probed.metrics,
            cluster_domain_id,
            host_domain_id,
            timestamp,
        ))?;
        sink.measurement(&sai_disk(disk, cluster_domain_id, host_domain_id, timestamp))?;
    }
    Ok(2 * disks.len())
}

/// Emit a probed host: its `sai_host` record followed by its disks.
/// Returns the number of measurements written.
pub fn emit_probed_host(
    probed: &ProbedHost,
    cluster_domain_id: &str,
    sink: &mut dyn TopologySink,
    timestamp: DateTime<Utc>,
) -> Result<usize> {
    sink.measurement(&sai_host(&probed.host, cluster_domain_id, timestamp))?;
    let written = emit_disk_measurements(
        &probed.disks,
        cluster_domain_id,
        probed.host.domain_id(),
        sink,
        timestamp,
    )?;
    debug!(
        "Emitted {} disks of host {}",
        probed.disks.len(),
        probed.host.hostname()
    );

    Ok(1 + written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::sink::testing::CollectingSink;
    use crate::hardware::discovery::{DiskHeader, SmartctlParser};
    use crate::hardware::disk::DiskType;
    use crate::topology::{HypervisorHost, LinuxHost};
    use std::sync::Arc;

    const SATA_HDD: &str = include_str!("../../testdata/smartctl_sata_hdd.txt");
    const SATA_ATTRIBUTES: &str = include_str!("../../testdata/smartctl_sata_attributes.txt");

    fn probed_sata() -> ProbedDisk {
        let parser = SmartctlParser::new();
        let header = DiskHeader::new("/dev/bus/0", "sat+megaraid,3");
        ProbedDisk {
            disk: Arc::new(parser.parse_disk(&header, SATA_HDD)),
            metrics: parser.parse_metrics(SATA_HDD),
        }
    }

    #[test]
    fn test_sai_disk() {
        let probed = probed_sata();
        let m = sai_disk(&probed.disk, "dpCluster", "4c4c4544-0038", Utc::now());

        assert_eq!(m.name, "sai_disk");
        assert_eq!(m.tags["disk_name"], "MegaraidDisk-3");
        assert_eq!(m.tags["disk_wwn"], "50014ee60711e39c");
        assert_eq!(m.tags["disk_domain_id"], "50014ee60711e39c");
        assert_eq!(m.tags["primary_key"], "dpCluster-4c4c4544-0038-50014ee60711e39c");
        assert_eq!(
            m.fields["disk_type"],
            FieldValue::Integer(i64::from(DiskType::HddSata.code()))
        );
        assert_eq!(m.fields["host_domain_id"], FieldValue::Text("4c4c4544-0038".into()));
    }

    #[test]
    fn test_sai_disk_smart() {
        let probed = probed_sata();
        let metrics = SmartctlParser::new().parse_metrics(SATA_ATTRIBUTES);
        let m = sai_disk_smart(&probed.disk, &metrics, "dpCluster", "h1", Utc::now());

        assert_eq!(m.name, "sai_disk_smart");
        assert_eq!(m.tags["primary_key"], "dpCluster-h1-50014ee60711e39c");
        assert_eq!(m.fields["cluster_domain_id"], FieldValue::Text("dpCluster".into()));
        assert_eq!(m.fields.len(), metrics.len() + 2);
        assert_eq!(m.fields["9_raw"], FieldValue::Integer(235_989));
    }

    #[test]
    fn test_sai_host_and_cluster() {
        let host: Host = LinuxHost::new("node-a", "Ubuntu", "18.04", vec![], None, vec![]).into();
        let m = sai_host(&host, "lab-42", Utc::now());
        assert_eq!(m.tags["domain_id"], host.hw_id());
        assert_eq!(m.fields["os_type"], FieldValue::Text("linux".into()));
        assert_eq!(m.fields["cluster_domain_id"], FieldValue::Text("lab-42".into()));

        let m = sai_cluster("", "", Utc::now());
        assert_eq!(m.tags["domain_id"], "dpCluster");
        assert_eq!(m.fields["name"], FieldValue::Text("DiskProphet for Lab Test".into()));
    }

    #[test]
    fn test_emit_probed_host() {
        let host = HypervisorHost::new("esx-01", "4c4c4544-0038").unwrap();
        let probed = ProbedHost {
            host: Host::Hypervisor(host),
            disks: vec![probed_sata()],
        };

        let mut sink = CollectingSink::default();
        let written = emit_probed_host(&probed, "dpCluster", &mut sink, Utc::now()).unwrap();

        assert_eq!(written, 3);
        let names: Vec<_> = sink.measurements.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["sai_host", "sai_disk_smart", "sai_disk"]);
    }
}
