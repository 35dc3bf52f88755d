//! Connectors - Adapters behind the domain ports
//!
//! Command gateways for local and SSH command execution, and a
//! snapshot-backed management API.

pub mod command;
pub mod inventory_file;

pub use command::{LocalCommandGateway, SshCommandGateway};
pub use inventory_file::{InventorySnapshot, SnapshotInventory, ROOT_FOLDER_ID};
