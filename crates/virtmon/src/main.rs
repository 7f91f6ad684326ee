// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! virtmon - hypervisor statistics through out-of-process drivers.
//!
//! This is the host binary: it launches a driver plugin, talks to it through
//! the bridge, and prints what it reports as JSON.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio::process::Command;
use virtmon_config::VirtmonConfig;
use virtmon_core::{CollectRequest, VirtmonError};
use virtmon_plugin::{BridgeOptions, DispatchTable, PluginProcess, launch};

use crate::report::{CollectReport, ProbeReport};

/// virtmon - hypervisor statistics through out-of-process drivers.
#[derive(Parser, Debug)]
#[command(name = "virtmon", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a driver plugin whether its hypervisor is present and what it is.
    Probe(PluginArgs),
    /// Collect domain statistics through a driver plugin.
    Collect {
        #[command(flatten)]
        plugin: PluginArgs,
        /// Include CPU statistics.
        #[arg(long)]
        cpu: bool,
        /// Include block device statistics.
        #[arg(long)]
        disk: bool,
        /// Include network interface statistics.
        #[arg(long)]
        network: bool,
    },
    /// Print the resolved configuration.
    Config,
}

#[derive(Args, Debug)]
struct PluginArgs {
    /// Path to the driver plugin binary.
    binary: PathBuf,
    /// Capability set to request (defaults to `bridge.plugin`).
    #[arg(long)]
    capability: Option<String>,
    /// Arguments passed through to the plugin binary.
    #[arg(last = true)]
    args: Vec<String>,
}

impl PluginArgs {
    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(&self.args);
        command
    }

    fn options(&self, config: &VirtmonConfig) -> BridgeOptions {
        let options = BridgeOptions::from_config(config);
        match &self.capability {
            Some(name) => options.with_plugin(name),
            None => options,
        }
    }
}

/// Collect flags; none given means everything.
fn collect_request(cpu: bool, disk: bool, network: bool) -> CollectRequest {
    let request = CollectRequest::new(cpu, disk, network);
    if request.is_empty() {
        CollectRequest::all()
    } else {
        request
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => virtmon_config::load_and_validate_path(path),
        None => virtmon_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            virtmon_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    if let Err(err) = run(cli.command, &config).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &VirtmonConfig) -> Result<(), VirtmonError> {
    match command {
        Commands::Probe(plugin) => {
            let process = start(&plugin, config).await?;
            let report = ProbeReport::gather(process.driver()).await;
            process.shutdown().await;
            print_json(&report)
        }
        Commands::Collect {
            plugin,
            cpu,
            disk,
            network,
        } => {
            let process = start(&plugin, config).await?;
            let result =
                CollectReport::gather(process.driver(), collect_request(cpu, disk, network)).await;
            process.shutdown().await;
            print_json(&result?)
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(config)
                .map_err(|e| VirtmonError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
    }
}

async fn start(plugin: &PluginArgs, config: &VirtmonConfig) -> Result<PluginProcess, VirtmonError> {
    let options = plugin.options(config);
    tracing::debug!(binary = %plugin.binary.display(), plugin = %options.plugin, "launching driver plugin");
    launch(plugin.command(), &options, &DispatchTable::host()).await
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), VirtmonError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| VirtmonError::Internal(format!("failed to render output: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("virtmon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
