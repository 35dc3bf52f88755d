//! Hardware Module
//!
//! Disk model, smartctl discovery, classification and WWN deduplication.

pub mod disk;
pub mod discovery;
pub mod classification;
pub mod registry;

pub use disk::*;
pub use discovery::*;
pub use classification::*;
pub use registry::*;
