//! Hardware Discovery Module
//!
//! Probes hosts for disks and host identity: smartctl headers and output
//! parsing, local Linux facts, and ESXi shell facts.

pub mod header;
pub mod smartctl;
pub mod scanner;
pub mod linux;
pub mod esxcli;

pub use header::*;
pub use smartctl::*;
pub use scanner::*;
pub use linux::*;
pub use esxcli::*;
