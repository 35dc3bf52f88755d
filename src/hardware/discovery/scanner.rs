//! Disk Scanner
//!
//! Resolves the physical disks of one host. Disk headers are gathered from
//! two independent enumerations, `smartctl --scan-open` first and generic
//! device nodes (`/dev/sg*`) second. Every header is probed with smartctl,
//! invalid disks are dropped, and the rest are deduplicated by WWN so a disk
//! reachable through several locators is reported once, as first probed.

use crate::context::AgentContext;
use crate::domain::ports::CommandGatewayRef;
use crate::error::{Error, ErrorAction, Result};
use crate::hardware::discovery::header::{AdapterFamily, DiskHeader, DEFAULT_DEVICE_TYPE};
use crate::hardware::discovery::smartctl::{SmartMetrics, SmartctlParser};
use crate::hardware::disk::Disk;
use crate::hardware::registry::DiskIndex;
use crate::topology::host::Host;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Scanner Configuration
// =============================================================================

/// Configuration for the disk scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// smartctl binary on the probed host
    pub smartctl_path: String,
    /// Generic device-node prefix under /dev, e.g. `sg`
    pub devnode_prefix: String,
    /// Probe arguments placed before the device locator
    pub probe_args: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            smartctl_path: "smartctl".to_string(),
            devnode_prefix: "sg".to_string(),
            probe_args: "--xall --format=old -n never".to_string(),
        }
    }
}

impl From<&AgentContext> for ScannerConfig {
    fn from(ctx: &AgentContext) -> Self {
        Self {
            smartctl_path: ctx.smartctl_path.clone(),
            devnode_prefix: ctx.devnode_prefix.clone(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Probe Result
// =============================================================================

/// A resolved disk together with the SMART metrics of its probe
#[derive(Debug, Clone)]
pub struct ProbedDisk {
    pub disk: Arc<Disk>,
    pub metrics: SmartMetrics,
}

/// A probed host with the SMART data of its disks
#[derive(Debug, Clone)]
pub struct ProbedHost {
    pub host: Host,
    pub disks: Vec<ProbedDisk>,
}

// =============================================================================
// Disk Scanner
// =============================================================================

/// Enumerates, probes and deduplicates the disks behind a command gateway
pub struct DiskScanner {
    config: ScannerConfig,
    gateway: CommandGatewayRef,
    parser: SmartctlParser,
}

impl DiskScanner {
    pub fn new(config: ScannerConfig, gateway: CommandGatewayRef) -> Self {
        Self {
            config,
            gateway,
            parser: SmartctlParser::new(),
        }
    }

    pub fn parser(&self) -> &SmartctlParser {
        &self.parser
    }

    /// Discover every valid disk on the gateway's host
    pub async fn discover(&self) -> Result<Vec<ProbedDisk>> {
        self.ensure_permission().await?;

        info!("Starting disk discovery on {}", self.gateway.target());

        let mut headers = Vec::new();
        match self.scan_headers().await {
            Ok(scanned) => {
                debug!("smartctl scan found {} headers", scanned.len());
                headers.extend(scanned);
            }
            Err(e) if e.action() == ErrorAction::SkipField => {
                warn!("smartctl scan failed on {}: {}", self.gateway.target(), e)
            }
            Err(e) => return Err(e),
        }
        match self.devnode_headers().await {
            Ok(nodes) => {
                debug!("Device nodes expanded to {} headers", nodes.len());
                headers.extend(nodes);
            }
            Err(e) if e.action() == ErrorAction::SkipField => {
                warn!("Device node listing failed on {}: {}", self.gateway.target(), e)
            }
            Err(e) => return Err(e),
        }

        let disks = self.resolve(headers).await?;
        info!("Resolved {} disks on {}", disks.len(), self.gateway.target());
        Ok(disks)
    }

    /// Fail unless smartctl may run privileged
    pub async fn ensure_permission(&self) -> Result<()> {
        if self.gateway.check_root_permission("smartctl").await? {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                tool: "smartctl".to_string(),
            })
        }
    }

    /// Headers listed by `smartctl --scan-open`
    pub async fn scan_headers(&self) -> Result<Vec<DiskHeader>> {
        let command = format!("{} --scan-open", self.config.smartctl_path);
        let output = self.gateway.exec_privileged(&command).await?;
        if !output.success() && output.stdout.trim().is_empty() {
            return Err(Error::CommandFailed {
                command,
                reason: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout.lines().filter_map(DiskHeader::from_scan_line).collect())
    }

    /// Headers derived from generic device nodes.
    ///
    /// Each node is probed once to learn what sits behind it: a plain disk
    /// yields the node itself, an HP storage array or an Areca adapter
    /// yields every candidate slot behind it.
    pub async fn devnode_headers(&self) -> Result<Vec<DiskHeader>> {
        let command = format!("ls /dev/{}*", self.config.devnode_prefix);
        let output = self.gateway.exec(&command).await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                command,
                reason: output.stderr.trim().to_string(),
            });
        }

        let mut headers = Vec::new();
        for devpath in output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let node = DiskHeader::new(devpath, DEFAULT_DEVICE_TYPE);
            let disk = match self.probe_disk(&node).await {
                Ok(disk) => disk,
                Err(e) => {
                    debug!("Skipping device node {}: {}", devpath, e);
                    continue;
                }
            };

            match (disk.peripheral_device_type.as_str(), disk.vendor.trim()) {
                ("storage array", "HP") => {
                    headers.extend(DiskHeader::expand_adapter(devpath, AdapterFamily::Cciss))
                }
                ("storage array", _) => {}
                ("disk", _) => headers.push(node),
                (_, "Areca") => {
                    headers.extend(DiskHeader::expand_adapter(devpath, AdapterFamily::Areca))
                }
                _ => {}
            }
        }
        Ok(headers)
    }

    /// Run smartctl for one header and return its raw output
    pub async fn probe_output(&self, header: &DiskHeader) -> Result<String> {
        let command = format!(
            "{} {} {} -d {}",
            self.config.smartctl_path, self.config.probe_args, header.devpath, header.devtype
        );
        // Non-zero exits still carry parseable output
        let output = self.gateway.exec_privileged(&command).await?;
        Ok(output.stdout)
    }

    async fn probe_disk(&self, header: &DiskHeader) -> Result<Disk> {
        let output = self.probe_output(header).await?;
        Ok(self.parser.parse_disk(header, &output))
    }

    /// Probe headers in order, keep valid disks, first record per WWN wins.
    ///
    /// A probe that times out or fails only drops its header; any other
    /// error ends the resolution.
    pub async fn resolve(&self, headers: Vec<DiskHeader>) -> Result<Vec<ProbedDisk>> {
        let mut index = DiskIndex::new();
        let mut resolved = Vec::new();

        for header in headers {
            let output = match self.probe_output(&header).await {
                Ok(output) => output,
                Err(e) if e.action() == ErrorAction::SkipField => {
                    debug!("Probe of {} unavailable: {}", header, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let disk = self.parser.parse_disk(&header, &output);
            if !self.parser.classifier().is_valid(&disk) {
                continue;
            }

            let wwn = disk.wwn.clone();
            if !index.insert(disk)? {
                continue;
            }
            if let Some(disk) = index.get(&wwn) {
                resolved.push(ProbedDisk {
                    disk: Arc::clone(disk),
                    metrics: self.parser.parse_metrics(&output),
                });
            }
        }

        Ok(resolved)
    }
}
