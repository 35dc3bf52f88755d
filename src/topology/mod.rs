//! Topology Module
//!
//! The reconciled inventory graph: datacenters, clusters, hosts and what
//! hangs off each host, plus the assembler that builds it from a
//! management API session.

pub mod nic;
pub mod datastore;
pub mod virtual_machine;
pub mod disk_group;
pub mod host;
pub mod cluster;
pub mod datacenter;
pub mod assembler;

pub use nic::*;
pub use datastore::*;
pub use virtual_machine::*;
pub use disk_group::*;
pub use host::*;
pub use cluster::*;
pub use datacenter::*;
pub use assembler::*;
