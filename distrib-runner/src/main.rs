//! Distribution runner binary.
//!
//! Loads a run configuration, pushes a synthetic workload through the pipeline and prints the
//! collected packets in arrival order.

use clap::{Parser, ValueEnum};
use distrib_config::CONFIGURATION_DIR;
use distrib_config::shared::ShutdownMode;
use distrib_telemetry::tracing::init_tracing;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::load_runner_config;
use crate::core::start_runner_with_config;

mod config;
mod core;
mod workload;

/// Runs a synthetic workload through a distribution pipeline.
#[derive(Debug, Parser)]
#[command(name = "distrib-runner", version, about)]
struct Args {
    /// Directory holding the `base` and per-environment configuration files.
    #[arg(long, default_value = CONFIGURATION_DIR)]
    config_dir: PathBuf,

    /// Number of tasks in the workload.
    #[arg(long)]
    tasks: Option<usize>,

    /// Number of completed results after which the run shuts down.
    #[arg(long)]
    want: Option<usize>,

    /// Number of concurrent workers.
    #[arg(long)]
    workers: Option<usize>,

    /// Per-task deadline in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Upper bound of the random per-task sleep, in milliseconds.
    #[arg(long)]
    max_task_ms: Option<u64>,

    #[arg(long, value_enum)]
    shutdown_mode: Option<ShutdownModeArg>,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShutdownModeArg {
    GracefulDrain,
    Abandon,
}

impl From<ShutdownModeArg> for ShutdownMode {
    fn from(value: ShutdownModeArg) -> Self {
        match value {
            ShutdownModeArg::GracefulDrain => ShutdownMode::GracefulDrain,
            ShutdownModeArg::Abandon => ShutdownMode::Abandon,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load runner config, with command line flags taking precedence.
    let runner_config = load_runner_config(&args)?;

    init_tracing(env!("CARGO_BIN_NAME"))?;

    // We start the runtime.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_runner_with_config(runner_config))?;

    Ok(())
}
