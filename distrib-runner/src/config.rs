use anyhow::Context;
use distrib_config::shared::RunnerConfig;
use distrib_config::{Environment, load_config_from};

use crate::Args;

/// Loads the runner configuration, applies command line overrides and validates the result.
pub fn load_runner_config(args: &Args) -> anyhow::Result<RunnerConfig> {
    let environment = Environment::load().context("failed to read the application environment")?;

    let mut config = load_config_from::<RunnerConfig>(&args.config_dir, environment)
        .with_context(|| format!("failed to load configuration from {:?}", args.config_dir))?;

    apply_overrides(&mut config, args);
    config.validate().context("invalid runner configuration")?;

    Ok(config)
}

fn apply_overrides(config: &mut RunnerConfig, args: &Args) {
    if let Some(tasks) = args.tasks {
        config.workload.task_count = tasks;
    }
    if let Some(want) = args.want {
        config.distrib.want = want;
    }
    if let Some(workers) = args.workers {
        config.distrib.worker_count = workers;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.distrib.task_timeout_ms = timeout_ms;
    }
    if let Some(max_task_ms) = args.max_task_ms {
        config.workload.max_task_ms = max_task_ms;
        config.workload.min_task_ms = config.workload.min_task_ms.min(max_task_ms);
    }
    if let Some(shutdown_mode) = args.shutdown_mode {
        config.distrib.shutdown_mode = shutdown_mode.into();
    }
    if let Some(metrics_addr) = args.metrics_addr {
        config.metrics_listen_addr = Some(metrics_addr);
    }
}
