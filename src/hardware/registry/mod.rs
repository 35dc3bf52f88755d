//! Disk Registry Module
//!
//! WWN-keyed deduplication of disks found through several locators.

pub mod disk_index;

pub use disk_index::*;
