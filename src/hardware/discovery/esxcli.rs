//! ESXi Shell Discovery
//!
//! Probes a hypervisor host directly through its shell: storage devices come
//! from `esxcli storage core device list`, the host identity from the
//! platform UUID, and each device is probed with smartctl like any other
//! disk.

use crate::domain::ports::CommandGatewayRef;
use crate::error::{Error, Result};
use crate::hardware::discovery::header::DiskHeader;
use crate::hardware::discovery::scanner::{DiskScanner, ProbedHost, ScannerConfig};
use crate::topology::host::{Host, HypervisorHost};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

/// Where smartmontools lands on an ESXi host when installed as a VIB
pub const ESXI_SMARTCTL_PATH: &str = "/opt/smartmontools/smartctl";

const ESXI_PROBE_ARGS: &str = "-xa --format=old -n never";

/// Device id prefixes of local storage devices
const DEVICE_ID_PREFIXES: [&str; 2] = ["naa.", "t10."];

static IS_SAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*Is SAS:\s*(\w.+)\s*$").unwrap());
static IS_OFFLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Is Offline:\s*(\w.+)\s*$").unwrap());
static PLATFORM_UUID: Lazy<Regex> = Lazy::new(|| {
    let bytes = r"\s*0x([[:alnum:]]+)".repeat(16);
    Regex::new(&format!(r"^\s*UUID:{}\s*$", bytes)).unwrap()
});

// =============================================================================
// Parsers
// =============================================================================

/// Disk headers from `esxcli storage core device list`.
///
/// Each device block starts at an unindented line holding the device id.
/// Offline devices are skipped; SAS devices probe as `scsi`, the rest as
/// `sat`.
pub fn parse_device_list(text: &str) -> Vec<DiskHeader> {
    let mut headers = Vec::new();
    let mut block: Option<(String, String, String)> = None;

    let flush = |block: Option<(String, String, String)>, headers: &mut Vec<DiskHeader>| {
        if let Some((id, is_sas, is_offline)) = block {
            if is_offline.trim() == "true" {
                debug!("Skipping offline device {}", id);
                return;
            }
            let devtype = if is_sas.trim() == "false" { "sat" } else { "scsi" };
            headers.push(DiskHeader::new(format!("/dev/disks/{}", id), devtype));
        }
    };

    for line in text.lines() {
        let unindented = !line.starts_with(char::is_whitespace);
        if unindented && DEVICE_ID_PREFIXES.iter().any(|p| line.starts_with(p)) {
            flush(block.take(), &mut headers);
            block = Some((line.trim().to_string(), String::new(), String::new()));
            continue;
        }

        if let Some((_, is_sas, is_offline)) = block.as_mut() {
            if let Some(caps) = IS_SAS.captures(line) {
                *is_sas = caps[1].to_string();
            }
            if let Some(caps) = IS_OFFLINE.captures(line) {
                *is_offline = caps[1].to_string();
            }
        }
    }
    flush(block, &mut headers);

    headers
}

/// Platform UUID from `esxcli hardware platform get`, formatted 8-4-4-4-12
pub fn parse_hardware_uuid(text: &str) -> Option<String> {
    let caps = text.lines().find_map(|line| PLATFORM_UUID.captures(line))?;
    let bytes: Vec<String> = (1..=16).map(|i| format!("{:0>2}", &caps[i])).collect();
    Some(format!(
        "{}-{}-{}-{}-{}",
        bytes[0..4].concat(),
        bytes[4..6].concat(),
        bytes[6..8].concat(),
        bytes[8..10].concat(),
        bytes[10..16].concat()
    ))
}

// =============================================================================
// ESXi Probe
// =============================================================================

/// Disk and identity discovery for one ESXi host over its shell
pub struct EsxiProbe {
    gateway: CommandGatewayRef,
    smartctl_path: String,
    scanner: DiskScanner,
}

impl std::fmt::Debug for EsxiProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsxiProbe")
            .field("target", &self.gateway.target())
            .field("smartctl_path", &self.smartctl_path)
            .finish_non_exhaustive()
    }
}

impl EsxiProbe {
    /// Locate smartctl on the host and verify it exists.
    ///
    /// Without an explicit path, `which smartctl` is tried before the
    /// smartmontools VIB location.
    pub async fn connect(gateway: CommandGatewayRef, smartctl_path: Option<&str>) -> Result<Self> {
        let smartctl_path = match smartctl_path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => path.to_string(),
            None => {
                let which = gateway.exec("which smartctl").await?;
                match which.stdout.lines().next().map(str::trim) {
                    Some(path) if which.success() && !path.is_empty() => path.to_string(),
                    _ => ESXI_SMARTCTL_PATH.to_string(),
                }
            }
        };

        let check = gateway.exec(&format!("ls {}", smartctl_path)).await?;
        if !check.success() {
            return Err(Error::Configuration(format!(
                "invalid smartctl path on {}: {}",
                gateway.target(),
                smartctl_path
            )));
        }

        let config = ScannerConfig {
            smartctl_path: smartctl_path.clone(),
            probe_args: ESXI_PROBE_ARGS.to_string(),
            ..Default::default()
        };
        Ok(Self {
            scanner: DiskScanner::new(config, Arc::clone(&gateway)),
            smartctl_path,
            gateway,
        })
    }

    pub fn smartctl_path(&self) -> &str {
        &self.smartctl_path
    }

    pub async fn device_headers(&self) -> Result<Vec<DiskHeader>> {
        let command = "esxcli storage core device list";
        let output = self.gateway.exec(command).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }

        let headers = parse_device_list(&output.stdout);
        if headers.is_empty() {
            return Err(Error::Parse(format!(
                "cannot find any storage device from esxcli on {}",
                self.gateway.target()
            )));
        }
        Ok(headers)
    }

    pub async fn hostname(&self) -> Result<String> {
        let output = self.gateway.exec("hostname").await?;
        let name = output.stdout.trim();
        if !output.success() || name.is_empty() {
            return Err(Error::CommandFailed {
                command: "hostname".to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        Ok(name.to_string())
    }

    pub async fn hardware_uuid(&self) -> Result<String> {
        let output = self.gateway.exec("esxcli hardware platform get").await?;
        parse_hardware_uuid(&output.stdout).ok_or_else(|| {
            Error::Parse(format!(
                "cannot parse platform UUID from {}",
                self.gateway.target()
            ))
        })
    }

    /// Probe the host; only valid, deduplicated disks are reported
    pub async fn probe(&self) -> Result<ProbedHost> {
        let headers = self.device_headers().await?;
        let name = self.hostname().await?;
        let uuid = self.hardware_uuid().await?;

        let disks = self.scanner.resolve(headers).await?;
        let mut host = HypervisorHost::new(name, uuid)?;
        host.disks = disks.iter().map(|p| Arc::clone(&p.disk)).collect();
        info!("Probed ESXi host {} ({} disks)", host.name, disks.len());

        Ok(ProbedHost {
            host: Host::Hypervisor(host),
            disks,
        })
    }
}
