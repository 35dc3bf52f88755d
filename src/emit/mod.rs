//! Emission Module
//!
//! Hands the assembled topology and probe results to a [`TopologySink`]:
//! graph nodes and relations for the inventory graph, and flat `sai_*`
//! measurements for disks, hosts and the reporting cluster.
//!
//! [`TopologySink`]: crate::domain::ports::TopologySink

pub mod graph;
pub mod measurement;
pub mod sink;

pub use graph::{emit_topology, graph_node, EmitSummary, GraphEmitter};
pub use measurement::{emit_disk_measurements, emit_probed_host, sai_cluster, sai_disk, sai_disk_smart, sai_host};
pub use sink::JsonLinesSink;
