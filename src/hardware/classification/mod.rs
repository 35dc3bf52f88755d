//! Hardware Classification Module
//!
//! Derives disk type and health status from probed attributes.

pub mod classifier;

pub use classifier::*;
