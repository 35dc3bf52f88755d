//! Domain layer - Managed object model and port definitions
//!
//! This module defines the collaborator traits (ports) that adapters
//! implement, following hexagonal architecture principles.

pub mod inventory;
pub mod ports;

pub use inventory::*;
pub use ports::*;
