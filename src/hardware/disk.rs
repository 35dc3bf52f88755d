//! Disk Model
//!
//! The typed disk record shared by the diagnostic parser, the local identity
//! resolver and the management-API topology path.

use crate::hardware::discovery::header::DiskHeader;
use serde::{Deserialize, Serialize};

// =============================================================================
// Disk Type
// =============================================================================

/// Disk media and transport classification.
///
/// The integer codes are stable and travel with emitted measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiskType {
    #[default]
    Unknown,
    Hdd,
    Ssd,
    SsdNvme,
    SsdSas,
    SsdSata,
    HddSas,
    HddSata,
}

impl DiskType {
    /// Stable integer code
    pub fn code(&self) -> u8 {
        match self {
            DiskType::Unknown => 0,
            DiskType::Hdd => 1,
            DiskType::Ssd => 2,
            DiskType::SsdNvme => 3,
            DiskType::SsdSas => 4,
            DiskType::SsdSata => 5,
            DiskType::HddSas => 6,
            DiskType::HddSata => 7,
        }
    }

    /// Whether this is one of the four concrete SAS/SATA combinations
    pub fn is_concrete_transport(&self) -> bool {
        self.is_sata() || self.is_sas()
    }

    pub fn is_sata(&self) -> bool {
        matches!(self, DiskType::HddSata | DiskType::SsdSata)
    }

    pub fn is_sas(&self) -> bool {
        matches!(self, DiskType::HddSas | DiskType::SsdSas)
    }
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskType::Unknown => write!(f, "Unknown"),
            DiskType::Hdd => write!(f, "HDD"),
            DiskType::Ssd => write!(f, "SSD"),
            DiskType::SsdNvme => write!(f, "SSD NVME"),
            DiskType::SsdSas => write!(f, "SSD SAS"),
            DiskType::SsdSata => write!(f, "SSD SATA"),
            DiskType::HddSas => write!(f, "HDD SAS"),
            DiskType::HddSata => write!(f, "HDD SATA"),
        }
    }
}

// =============================================================================
// Disk Status
// =============================================================================

/// Disk health status derived from the SMART health token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiskStatus {
    #[default]
    Unknown,
    Good,
    Failure,
    Warning,
    Critical,
}

impl DiskStatus {
    /// Stable integer code
    pub fn code(&self) -> u8 {
        match self {
            DiskStatus::Unknown => 0,
            DiskStatus::Good => 1,
            DiskStatus::Failure => 2,
            DiskStatus::Warning => 3,
            DiskStatus::Critical => 4,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => DiskStatus::Good,
            2 => DiskStatus::Failure,
            3 => DiskStatus::Warning,
            4 => DiskStatus::Critical,
            _ => DiskStatus::Unknown,
        }
    }
}

impl std::fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskStatus::Unknown => write!(f, "Unknown"),
            DiskStatus::Good => write!(f, "Good"),
            DiskStatus::Failure => write!(f, "Failure"),
            DiskStatus::Warning => write!(f, "Warning"),
            DiskStatus::Critical => write!(f, "Critical"),
        }
    }
}

// =============================================================================
// Disk
// =============================================================================

/// One physical disk as seen by a single discovery pass.
///
/// Records are never mutated after construction; a later pass builds new ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    /// Locator the disk was probed through, absent on the management-API path
    pub header: Option<DiskHeader>,
    /// Friendly or canonical device name
    pub name: String,
    /// Normalized world-wide-name, the durable identity key
    pub wwn: String,
    pub serial_number: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: String,
    pub sata_version: String,
    pub sector_size: String,
    /// Human readable capacity, e.g. "1.00 TB"
    pub size: String,
    /// Capacity in bytes when the source reports it
    pub capacity_bytes: Option<u64>,
    pub transport_protocol: String,
    pub rotation_rate: String,
    pub peripheral_device_type: String,
    /// Raw SMART health token, e.g. "PASSED" or "OK"
    pub smart_health_status: String,
    pub disk_type: DiskType,
    pub status: DiskStatus,
}

impl Disk {
    /// Identity key of this disk
    pub fn domain_id(&self) -> &str {
        &self.wwn
    }

    /// Name used when reporting the disk
    pub fn display_name(&self) -> String {
        match &self.header {
            Some(header) => header.disk_name(),
            None => self.name.clone(),
        }
    }
}

/// Strip all whitespace from a world-wide-name. Idempotent.
pub fn normalize_wwn(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Format a byte count with binary units and one decimal, e.g. "1.8TB"
pub fn format_byte_size(bytes: u64) -> String {
    const UNITS: [(&str, u64); 6] = [
        ("EB", 1 << 60),
        ("PB", 1 << 50),
        ("TB", 1 << 40),
        ("GB", 1 << 30),
        ("MB", 1 << 20),
        ("KB", 1 << 10),
    ];

    for (suffix, scale) in UNITS {
        if bytes >= scale {
            return format!("{:.1}{}", bytes as f64 / scale as f64, suffix);
        }
    }
    format!("{}B", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_wwn() {
        assert_eq!(normalize_wwn("5 0014ee 60711e39c"), "50014ee60711e39c");
        assert_eq!(normalize_wwn("50014ee60711e39c"), "50014ee60711e39c");

        let once = normalize_wwn(" 5 5cd2e4 04b7ee0e9 ");
        assert_eq!(normalize_wwn(&once), once);
        assert_eq!(once, normalize_wwn("55cd2e404b7ee0e9"));
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(DiskType::Unknown.code(), 0);
        assert_eq!(DiskType::SsdNvme.code(), 3);
        assert_eq!(DiskType::HddSata.code(), 7);
        assert!(DiskType::SsdSas.is_concrete_transport());
        assert!(!DiskType::Ssd.is_concrete_transport());
        assert!(!DiskType::SsdNvme.is_concrete_transport());
    }

    #[test]
    fn test_status_codes() {
        for code in 0..=4u8 {
            assert_eq!(DiskStatus::from_code(code).code(), code);
        }
        assert_eq!(DiskStatus::from_code(9), DiskStatus::Unknown);
    }

    #[test]
    fn test_format_byte_size() {
        assert_eq!(format_byte_size(512), "512B");
        assert_eq!(format_byte_size(1536), "1.5KB");
        assert_eq!(format_byte_size(300_000_000_000), "279.4GB");
        assert_eq!(format_byte_size(2 * (1 << 40)), "2.0TB");
    }
}
