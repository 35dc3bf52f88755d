//! Linux Host Discovery
//!
//! Host facts for a local Linux machine: OS release, network interfaces
//! from `ip addr`, DMI identity from dmidecode, and disks through the
//! [`DiskScanner`].

use crate::context::AgentContext;
use crate::domain::ports::CommandGatewayRef;
use crate::error::{Error, Result};
use crate::hardware::discovery::scanner::{DiskScanner, ProbedHost, ScannerConfig};
use crate::hardware::discovery::smartctl::{extract_fields, FieldRule};
use crate::topology::host::{Host, LinuxHost};
use crate::topology::nic::NetworkInterface;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

// =============================================================================
// Patterns
// =============================================================================

static OS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^NAME="(.*)"$"#).unwrap());
static OS_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^VERSION="(.*)"$"#).unwrap());
static REDHAT_RELEASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^\d]*)(.+)$").unwrap());

static NIC_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+:\s+([\w@]+):.*$").unwrap());
static NIC_MAC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*link/ether\s+([a-zA-Z0-9]{2}(?::[a-zA-Z0-9]{2}){5}).*$").unwrap()
});
static NIC_IPV4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*inet\s+([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)/.*").unwrap());
static NIC_IPV6: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*inet6\s+([0-9a-fA-F:]+)/.*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DmiField {
    Manufacturer,
    ProductName,
    SerialNumber,
}

static DMI_RULES: Lazy<Vec<FieldRule<DmiField>>> = Lazy::new(|| {
    vec![
        FieldRule::new(
            DmiField::Manufacturer,
            Regex::new(r"\s*Manufacturer:\s*(.*)\s*$").unwrap(),
        ),
        FieldRule::new(
            DmiField::ProductName,
            Regex::new(r"\s*Product Name:\s*(.*)\s*$").unwrap(),
        ),
        FieldRule::new(
            DmiField::SerialNumber,
            Regex::new(r"\s*Serial Number:\s*(.*)\s*$").unwrap(),
        ),
    ]
});

// =============================================================================
// DMI Identity
// =============================================================================

/// One dmidecode section's identity fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DmiRecord {
    pub manufacturer: String,
    pub product_name: String,
    pub serial_number: String,
}

impl std::fmt::Display for DmiRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.manufacturer, self.product_name, self.serial_number)
    }
}

/// System and baseboard identity of a host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostDmi {
    pub system: DmiRecord,
    pub baseboard: DmiRecord,
}

impl std::fmt::Display for HostDmi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.system, self.baseboard)
    }
}

/// Parse `dmidecode -t system` or `-t baseboard` output
pub fn parse_dmi_record(text: &str) -> DmiRecord {
    let mut fields = extract_fields(text, &DMI_RULES);
    DmiRecord {
        manufacturer: fields.take(&DmiField::Manufacturer).trim().to_string(),
        product_name: fields.take(&DmiField::ProductName).trim().to_string(),
        serial_number: fields.take(&DmiField::SerialNumber).trim().to_string(),
    }
}

// =============================================================================
// OS Release and Interfaces
// =============================================================================

/// OS name and version from `/etc/os-release`
pub fn parse_os_release(text: &str) -> (String, String) {
    let mut name = String::new();
    let mut version = String::new();
    for line in text.lines() {
        if let Some(caps) = OS_NAME.captures(line) {
            name = caps[1].to_string();
        }
        if let Some(caps) = OS_VERSION.captures(line) {
            version = caps[1].to_string();
        }
    }
    (name, version)
}

/// OS name and version from `/etc/redhat-release`,
/// e.g. `CentOS release 6.5 (Final)`
pub fn parse_redhat_release(text: &str) -> Option<(String, String)> {
    let caps = REDHAT_RELEASE.captures(text.trim())?;
    Some((caps[1].trim().to_string(), caps[2].to_string()))
}

/// Interfaces from `ip addr` output; loopback is skipped
pub fn parse_ip_addr(text: &str) -> Vec<NetworkInterface> {
    let mut nics = Vec::new();
    let mut current: Option<NetworkInterface> = None;

    for line in text.lines() {
        if let Some(caps) = NIC_NAME.captures(line) {
            nics.extend(current.take());
            if &caps[1] != "lo" {
                current = Some(NetworkInterface::new(&caps[1]));
            }
            continue;
        }

        let nic = match current.as_mut() {
            Some(nic) => nic,
            None => continue,
        };
        if let Some(caps) = NIC_MAC.captures(line) {
            nic.macs.push(caps[1].to_string());
        }
        if let Some(caps) = NIC_IPV4.captures(line) {
            nic.ipv4s.push(caps[1].to_string());
        }
        if let Some(caps) = NIC_IPV6.captures(line) {
            nic.ipv6s.push(caps[1].to_string());
        }
    }
    nics.extend(current);

    nics
}

// =============================================================================
// Linux Probe
// =============================================================================

/// Collects host facts and disks of a Linux machine through a gateway
pub struct LinuxProbe {
    gateway: CommandGatewayRef,
    dmidecode_path: String,
    scanner: DiskScanner,
}

impl LinuxProbe {
    pub fn new(ctx: &AgentContext, gateway: CommandGatewayRef) -> Self {
        Self {
            scanner: DiskScanner::new(ScannerConfig::from(ctx), Arc::clone(&gateway)),
            dmidecode_path: ctx.dmidecode_path.clone(),
            gateway,
        }
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

    /// OS name and version, falling back to the Red Hat release file
    pub async fn os_release(&self) -> Result<(String, String)> {
        let output = self.gateway.exec("cat /etc/os-release").await?;
        if output.success() {
            return Ok(parse_os_release(&output.stdout));
        }

        let command = "cat /etc/redhat-release";
        let output = self.gateway.exec(command).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        parse_redhat_release(&output.stdout)
            .ok_or_else(|| Error::Parse("cannot parse /etc/redhat-release".to_string()))
    }

    pub async fn network_interfaces(&self) -> Result<Vec<NetworkInterface>> {
        let output = self.gateway.exec("ip addr").await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command: "ip addr".to_string(),
                reason: output.stderr.trim().to_string(),
            });
        }
        Ok(parse_ip_addr(&output.stdout))
    }

    pub async fn dmi(&self) -> Result<HostDmi> {
        if !self.gateway.check_root_permission("dmidecode").await? {
            return Err(Error::PermissionDenied {
                tool: "dmidecode".to_string(),
            });
        }

        let system = self
            .gateway
            .exec_privileged(&format!("{} -t system", self.dmidecode_path))
            .await?;
        let baseboard = self
            .gateway
            .exec_privileged(&format!("{} -t baseboard", self.dmidecode_path))
            .await?;

        Ok(HostDmi {
            system: parse_dmi_record(&system.stdout),
            baseboard: parse_dmi_record(&baseboard.stdout),
        })
    }

    /// Probe the host. OS, interface and DMI gaps only thin the record;
    /// hostname and disk discovery failures abort.
    pub async fn probe(&self) -> Result<ProbedHost> {
        let name = self.hostname().await?;

        let (os_name, os_version) = self.os_release().await.unwrap_or_else(|e| {
            warn!("Cannot get OS release information: {}", e);
            Default::default()
        });
        let nics = self.network_interfaces().await.unwrap_or_else(|e| {
            warn!("Cannot get network information: {}", e);
            Vec::new()
        });
        let dmi = match self.dmi().await {
            Ok(dmi) => Some(dmi),
            Err(e) => {
                warn!("Cannot get host dmidecode information: {}", e);
                None
            }
        };

        let disks = self.scanner.discover().await?;
        let host = LinuxHost::new(
            name,
            os_name,
            os_version,
            nics,
            dmi,
            disks.iter().map(|p| Arc::clone(&p.disk)).collect(),
        );
        info!("Probed Linux host {} ({} disks)", host.name, disks.len());

        Ok(ProbedHost {
            host: Host::Linux(host),
            disks,
        })
    }
}
