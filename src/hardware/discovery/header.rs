//! Disk Headers
//!
//! A disk header is the locator a disk is probed through: a device path plus
//! the smartctl `-d` device type. Headers come from `smartctl --scan-open`
//! lines, from generic device nodes, or from adapter slot expansion.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Device type used when a locator names none
pub const DEFAULT_DEVICE_TYPE: &str = "scsi";

/// Enclosures probed behind an Areca adapter
pub const ARECA_MAX_ENCLOSURE_NUM: u32 = 2;

/// Slots per Areca enclosure
pub const ARECA_MAX_SLOT_NUM: u32 = 16;

/// Slots probed behind an HP cciss adapter
pub const CCISS_MAX_SLOT_NUM: u32 = 128;

static MEGARAID_DEVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*megaraid,([0-9]+)$").unwrap());
static CCISS_DEVICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*cciss,([0-9]+)$").unwrap());
static ARECA_DEVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*areca,([0-9]+)/([0-9]+)$").unwrap());

// =============================================================================
// Adapter Families
// =============================================================================

/// RAID adapter families whose disks hide behind one device node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterFamily {
    /// HP Smart Array
    Cciss,
    Areca,
}

// =============================================================================
// Disk Header
// =============================================================================

/// Device locator for a single disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiskHeader {
    /// Last path segment of `devpath`
    pub devname: String,
    pub devpath: String,
    /// smartctl device type, e.g. `sat`, `scsi` or `sat+megaraid,0`
    pub devtype: String,
}

impl DiskHeader {
    pub fn new(devpath: impl Into<String>, devtype: impl Into<String>) -> Self {
        let devpath = devpath.into();
        let devname = devpath.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            devname,
            devpath,
            devtype: devtype.into(),
        }
    }

    /// Parse one `smartctl --scan-open` line: `<path> -d <type> # comment`.
    ///
    /// Returns `None` for blank lines.
    pub fn from_scan_line(line: &str) -> Option<Self> {
        let locator = line.split('#').next().unwrap_or_default();
        if locator.trim().is_empty() {
            return None;
        }

        let mut parts = locator.splitn(2, "-d");
        let path = parts.next().unwrap_or_default().trim();
        match parts.next() {
            Some(devtype) => Some(Self::new(path, devtype.trim())),
            None => Some(Self::new(path, DEFAULT_DEVICE_TYPE)),
        }
    }

    /// Vendor-specific friendly name, or the device name
    pub fn disk_name(&self) -> String {
        if let Some(caps) = MEGARAID_DEVICE.captures(&self.devtype) {
            return format!("MegaraidDisk-{}", &caps[1]);
        }
        if let Some(caps) = CCISS_DEVICE.captures(&self.devtype) {
            return format!("HP-{}", &caps[1]);
        }
        if let Some(caps) = ARECA_DEVICE.captures(&self.devtype) {
            return format!("Areca-{}-{}", &caps[1], &caps[2]);
        }
        self.devname.clone()
    }

    /// Every candidate slot address behind an adapter at `devpath`
    pub fn expand_adapter(devpath: &str, family: AdapterFamily) -> Vec<Self> {
        match family {
            AdapterFamily::Cciss => (0..CCISS_MAX_SLOT_NUM)
                .map(|slot| Self::new(devpath, format!("cciss,{}", slot)))
                .collect(),
            AdapterFamily::Areca => (1..=ARECA_MAX_ENCLOSURE_NUM)
                .flat_map(|enclosure| {
                    (1..=ARECA_MAX_SLOT_NUM)
                        .map(move |slot| Self::new(devpath, format!("areca,{}/{}", slot, enclosure)))
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for DiskHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -d {}", self.devpath, self.devtype)
    }
}
