use distrib::{DistribReport, Distributor};
use distrib_config::shared::{DistribConfig, RunnerConfig, WorkloadConfig};
use distrib_telemetry::metrics::init_metrics;
use tracing::{debug, info};

use crate::workload::{SyntheticWork, build_workload};

/// Runs the configured workload once and prints the outcome.
pub async fn start_runner_with_config(runner_config: RunnerConfig) -> anyhow::Result<()> {
    info!("starting distribution runner");

    log_config(&runner_config);

    if let Some(listen_addr) = runner_config.metrics_listen_addr {
        init_metrics(listen_addr, None)?;
    }

    let workload = build_workload(&runner_config.workload, &mut rand::thread_rng());
    let distributor = Distributor::new(runner_config.distrib)?;

    let report = distributor.run_with_report(workload).await?;
    print_report(&report);

    info!("distribution runner completed");

    Ok(())
}

fn log_config(config: &RunnerConfig) {
    log_distrib_config(&config.distrib);
    log_workload_config(&config.workload);
}

fn log_distrib_config(config: &DistribConfig) {
    debug!(
        worker_count = config.worker_count,
        want = config.want,
        task_timeout_ms = config.task_timeout_ms,
        shutdown_mode = %config.shutdown_mode,
        trailing_pause = config.trailing_pause,
        tick_interval_ms = config.tick_interval_ms,
        handoff_capacity = config.handoff_capacity,
        "using distrib config"
    );
}

fn log_workload_config(config: &WorkloadConfig) {
    debug!(
        task_count = config.task_count,
        min_task_ms = config.min_task_ms,
        max_task_ms = config.max_task_ms,
        "using workload config"
    );
}

fn print_report(report: &DistribReport<SyntheticWork>) {
    for packet in &report.packets {
        let work = packet.work();
        let elapsed = work.elapsed().unwrap_or_default();
        println!(
            "{packet}  planned {:>4}ms  slept {:>4}ms",
            work.duration().as_millis(),
            elapsed.as_millis()
        );
    }

    let counters = &report.counters;
    println!(
        "collected {} of {} dispatched, {} timed out, in {}ms ({})",
        report.packets.len(),
        counters.dispatched(),
        counters.abandoned,
        report.elapsed.as_millis(),
        report.exit.as_str()
    );
}
