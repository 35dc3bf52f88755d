//! Disk Classifier
//!
//! Assigns a disk its media/transport type and a health status code from
//! parsed diagnostic fields, and decides whether a disk is reportable.

use crate::hardware::disk::{Disk, DiskStatus, DiskType};
use tracing::debug;

// =============================================================================
// Health Status Tables
// =============================================================================

/// Health tokens reported by ATA/SATA devices
const SATA_HEALTH_TOKENS: &[(&str, DiskStatus)] = &[
    ("PASSED", DiskStatus::Good),
    ("FAILED", DiskStatus::Failure),
];

/// Health tokens reported by SCSI/SAS devices
const SAS_HEALTH_TOKENS: &[(&str, DiskStatus)] = &[
    ("OK", DiskStatus::Good),
    ("WARNING", DiskStatus::Warning),
    ("CRITICAL", DiskStatus::Critical),
];

/// Marks a rotational disk inside the rotation-rate text
const ROTATIONAL_TOKEN: &str = "rpm";
/// Marks a solid-state disk inside the rotation-rate text
const SOLID_STATE_TOKEN: &str = "Solid";
/// Marks a SAS transport inside the transport-protocol text
const SAS_TOKEN: &str = "SAS";

// =============================================================================
// Disk Classifier
// =============================================================================

/// Classifies parsed disks
#[derive(Debug, Clone, Default)]
pub struct DiskClassifier;

impl DiskClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Derive the disk type.
    ///
    /// The rotation-rate text picks the family (HDD, SSD or Unknown). A
    /// non-empty SATA version refines the family to SATA; otherwise a SAS
    /// transport refines it to SAS. SATA is checked first and wins.
    pub fn classify(&self, sata_version: &str, transport_protocol: &str, rotation_rate: &str) -> DiskType {
        let (sata, sas, coarse) = if rotation_rate.contains(ROTATIONAL_TOKEN) {
            (DiskType::HddSata, DiskType::HddSas, DiskType::Hdd)
        } else if rotation_rate.contains(SOLID_STATE_TOKEN) {
            (DiskType::SsdSata, DiskType::SsdSas, DiskType::Ssd)
        } else {
            return DiskType::Unknown;
        };

        if !sata_version.trim().is_empty() {
            sata
        } else if transport_protocol.contains(SAS_TOKEN) {
            sas
        } else {
            coarse
        }
    }

    /// Map a SMART health token to a status code.
    ///
    /// The SATA table is consulted first, then the SAS table.
    pub fn status_from_health(&self, token: &str) -> DiskStatus {
        lookup_status(token, SATA_HEALTH_TOKENS)
            .or_else(|| lookup_status(token, SAS_HEALTH_TOKENS))
            .unwrap_or(DiskStatus::Unknown)
    }

    /// A disk is reportable only with a WWN and a concrete SAS/SATA type
    pub fn is_valid(&self, disk: &Disk) -> bool {
        let valid = !disk.wwn.is_empty() && disk.disk_type.is_concrete_transport();
        if !valid {
            debug!(
                "Disk {} excluded (wwn={:?}, type={})",
                disk.display_name(),
                disk.wwn,
                disk.disk_type
            );
        }
        valid
    }
}

fn lookup_status(token: &str, table: &[(&str, DiskStatus)]) -> Option<DiskStatus> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == token)
        .map(|(_, status)| *status)
}
