//! Inventory Topology
//!
//! Command-line front end: assemble a management server's topology from a
//! captured inventory snapshot, probe the local Linux host, or probe an
//! ESXi host over SSH. Everything is emitted as JSON lines.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use inventory_topology::connector::{LocalCommandGateway, SnapshotInventory, SshCommandGateway};
use inventory_topology::emit::emit_disk_measurements;
use inventory_topology::{
    emit_probed_host, emit_topology, AgentConfig, AgentContext, Datacenter, EsxiProbe, Host,
    JsonLinesSink, LinuxProbe, TopologyAssembler,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Inventory discovery and reconciliation for virtualized storage hosts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent configuration file (YAML)
    #[arg(long, env = "INVENTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Write records to this file instead of stdout
    #[arg(long, env = "INVENTORY_OUTPUT")]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble topology from a captured inventory snapshot
    Topology {
        /// Inventory snapshot (JSON)
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// Probe this Linux host
    Local,

    /// Probe an ESXi host over SSH
    Hypervisor {
        #[arg(long)]
        address: String,

        #[arg(long, default_value = "root")]
        user: String,

        #[arg(long, env = "ESXI_PASSWORD", hide_env_values = true)]
        password: String,

        /// smartctl on the ESXi host; located automatically when omitted
        #[arg(long)]
        smartctl_path: Option<String>,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting {} v{}", inventory_topology::NAME, inventory_topology::VERSION);

    let config = match &args.config {
        Some(path) => AgentConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AgentConfig::default(),
    };
    let ctx = AgentContext::from_config(&config)?;

    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let mut sink = JsonLinesSink::new(writer);

    match args.command {
        Command::Topology { snapshot } => {
            let api = SnapshotInventory::from_file(&snapshot)
                .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
            let assembler = TopologyAssembler::new(Arc::new(api));
            let datacenters = assembler.crawl().await?;
            let summary = emit_topology(&ctx, assembler.endpoint(), &datacenters, &mut sink)?;
            info!("Topology emitted: {}", summary);
        }
        Command::Local => {
            let gateway = Arc::new(LocalCommandGateway::new(ctx.local_timeout));
            let probed = LinuxProbe::new(&ctx, gateway).probe().await?;
            let host_domain_id = probed.host.domain_id().to_string();

            if let Host::Linux(host) = probed.host {
                let datacenter = Datacenter::local(&ctx, host)?;
                emit_topology(&ctx, "", &[datacenter], &mut sink)?;
            }
            emit_disk_measurements(
                &probed.disks,
                &ctx.cluster_domain_id,
                &host_domain_id,
                &mut sink,
                chrono::Utc::now(),
            )?;
        }
        Command::Hypervisor {
            address,
            user,
            password,
            smartctl_path,
        } => {
            let gateway = Arc::new(SshCommandGateway::new(
                address.clone(),
                user,
                password,
                ctx.remote_timeout,
            ));
            let probe = EsxiProbe::connect(gateway, smartctl_path.as_deref())
                .await
                .with_context(|| format!("connecting to {}", address))?;
            let probed = probe.probe().await?;
            let written =
                emit_probed_host(&probed, &ctx.cluster_domain_id, &mut sink, chrono::Utc::now())?;
            info!("{} measurements written for {}", written, address);
        }
    }

    sink.flush()?;
    info!("{} records written", sink.written());
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Records go to stdout, so logs stay on stderr
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
