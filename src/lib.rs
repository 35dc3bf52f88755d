//! Inventory Topology - Discovery and Reconciliation Engine
//!
//! Discovers the physical disks of storage hosts and reconciles them with a
//! virtualization management server's view into one typed graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Emission (emit)                            │
//! │        graph nodes / relations          sai_* measurements          │
//! ├──────────────────────────────────┬──────────────────────────────────┤
//! │     Topology Assembler           │        Host Probes               │
//! │  Datacenter -> Cluster -> Host   │   Linux (local)   ESXi (shell)   │
//! │  -> Datastore / VM / DiskGroup   │                                  │
//! ├──────────────────────────────────┼──────────────────────────────────┤
//! │   Management API (port)          │  smartctl parser -> classifier   │
//! │   snapshot-backed connector      │  -> WWN disk index               │
//! ├──────────────────────────────────┴──────────────────────────────────┤
//! │                  Command Gateways (local / SSH)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`hardware`]: Disk model, smartctl parsing, classification, deduplication
//! - [`topology`]: The inventory graph and its assembler
//! - [`connector`]: Command gateways and the snapshot management API
//! - [`emit`]: Graph and measurement emission
//! - [`domain`]: Managed object model and ports
//! - [`context`]: Agent configuration
//! - [`error`]: Error types and handling

pub mod connector;
pub mod context;
pub mod domain;
pub mod emit;
pub mod error;
pub mod hardware;
pub mod topology;

// Re-export commonly used types
pub use context::{AgentConfig, AgentContext};

pub use domain::ports::{
    CommandGateway, CommandGatewayRef, CommandOutput, GraphNode, GraphRelation, ManagementApi,
    ManagementApiRef, Measurement, TopologySink,
};

pub use error::{Error, ErrorAction, Result};

pub use hardware::{
    Disk, DiskClassifier, DiskHeader, DiskIndex, DiskScanner, DiskStatus, DiskType, EsxiProbe,
    LinuxProbe, ProbedDisk, ProbedHost, ScannerConfig, SmartMetrics, SmartctlParser,
};

pub use topology::{
    Cluster, ClusterId, ClusterKind, ClusterRegistry, Datacenter, Datastore, DiskGroup, Host,
    HypervisorHost, LinuxHost, TopologyAssembler, VirtualMachine,
};

pub use emit::{emit_probed_host, emit_topology, JsonLinesSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
