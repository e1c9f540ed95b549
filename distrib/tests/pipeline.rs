#![cfg(feature = "test-utils")]

use distrib::Distributor;
use distrib::config::ShutdownMode;
use distrib::pipeline::distribute;
use distrib::test_utils::config::TestConfigBuilder;
use distrib::test_utils::timed::within_default;
use distrib::test_utils::work::{
    ExecutionCounter, InstantWork, MixedWork, PanickingWork, SleepingWork, instant_workload,
    sleeping_workload,
};
use distrib::workers::CollectorExit;
use distrib_telemetry::tracing::init_test_tracing;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn more_tasks_than_wanted_are_bounded_by_supply() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let config = TestConfigBuilder::new()
        .with_workers(6)
        .with_want(10)
        .with_task_timeout_ms(15)
        .build();

    let packets = within_default(distribute(instant_workload(20, &executions), &config))
        .await
        .unwrap();

    assert!(packets.len() >= 10, "got {} packets", packets.len());
    assert!(packets.len() <= 20, "got {} packets", packets.len());
    assert!(packets.iter().all(|packet| packet.worker_id().is_some()));
}

#[tokio::test(flavor = "multi_thread")]
async fn fewer_tasks_than_wanted_return_every_task() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let config = TestConfigBuilder::new().with_workers(6).with_want(10).build();
    let distributor = Distributor::new(config).unwrap();

    let report = within_default(distributor.run_with_report(instant_workload(5, &executions)))
        .await
        .unwrap();

    assert_eq!(report.packets.len(), 5);
    assert_eq!(executions.get(), 5);
    assert!(report.counters.supply_exhausted);
    assert_eq!(report.counters.received, 5);

    let mut ids = report
        .packets
        .iter()
        .map(|packet| packet.task_id())
        .collect::<Vec<_>>();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread")]
async fn buffered_handoff_drains_every_dispatched_task() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let config = TestConfigBuilder::new()
        .with_workers(6)
        .with_want(10)
        .with_handoff_capacity(4)
        .build();
    let distributor = Distributor::new(config).unwrap();

    let report = within_default(distributor.run_with_report(instant_workload(20, &executions)))
        .await
        .unwrap();

    // Packets waiting in the handoff buffer count as sent and must still be collected.
    assert!(report.packets.len() >= 10, "got {} packets", report.packets.len());
    assert!(report.packets.len() <= 20, "got {} packets", report.packets.len());
    assert_eq!(report.counters.received, report.counters.sent);
    assert_eq!(report.counters.received, report.packets.len());
}

#[tokio::test(flavor = "multi_thread")]
async fn tasks_slower_than_the_deadline_are_all_abandoned() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let config = TestConfigBuilder::new()
        .with_want(5)
        .with_task_timeout_ms(15)
        .build();
    let distributor = Distributor::new(config).unwrap();

    let workload = sleeping_workload(10, Duration::from_millis(50), &executions);
    let report = within_default(distributor.run_with_report(workload))
        .await
        .unwrap();

    assert!(report.packets.is_empty());
    assert_eq!(report.counters.sent, 0);
    assert_eq!(report.counters.abandoned, 10);
    assert!(report.counters.supply_exhausted);
}

#[tokio::test(flavor = "multi_thread")]
async fn late_tasks_never_appear_in_the_output() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let workload = (0..12)
        .map(|task_id| {
            if task_id % 3 == 0 {
                MixedWork::Sleeping(SleepingWork::with_counter(
                    Duration::from_millis(80),
                    executions.clone(),
                ))
            } else {
                MixedWork::Instant(InstantWork::new(executions.clone()))
            }
        })
        .collect::<Vec<_>>();

    for shutdown_mode in [ShutdownMode::GracefulDrain, ShutdownMode::Abandon] {
        let config = TestConfigBuilder::new()
            .with_workers(3)
            .with_want(20)
            .with_task_timeout_ms(20)
            .with_shutdown_mode(shutdown_mode)
            .build();

        let packets = within_default(distribute(workload.clone(), &config))
            .await
            .unwrap();

        let leaked = packets
            .iter()
            .any(|packet| matches!(packet.work(), MixedWork::Sleeping(_)));
        assert!(!leaked, "late task leaked into the output in {shutdown_mode} mode");
        assert!(packets.iter().all(|packet| packet.task_id() % 3 != 0));
        assert_eq!(packets.len(), 8);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn output_never_exceeds_completed_dispatches() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let workload = (0..30)
        .map(|task_id| {
            let millis = if task_id % 4 == 0 { 40 } else { 1 };
            SleepingWork::with_counter(Duration::from_millis(millis), executions.clone())
        })
        .collect::<Vec<_>>();
    let config = TestConfigBuilder::new()
        .with_workers(4)
        .with_want(12)
        .with_task_timeout_ms(15)
        .build();
    let distributor = Distributor::new(config).unwrap();

    let report = within_default(distributor.run_with_report(workload))
        .await
        .unwrap();

    let counters = report.counters;
    assert_eq!(counters.received, report.packets.len());
    assert!(report.packets.len() <= counters.dispatched() - counters.abandoned);
    assert!(report.packets.iter().all(|packet| packet.work().is_finished()));
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_tasks_are_excluded_without_hanging() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let workload = (0..8)
        .map(|task_id| {
            if task_id % 2 == 0 {
                MixedWork::Panicking(PanickingWork)
            } else {
                MixedWork::Instant(InstantWork::new(executions.clone()))
            }
        })
        .collect::<Vec<_>>();
    let config = TestConfigBuilder::new().with_workers(2).with_want(10).build();
    let distributor = Distributor::new(config).unwrap();

    let report = within_default(distributor.run_with_report(workload))
        .await
        .unwrap();

    assert_eq!(report.packets.len(), 4);
    assert!(report.packets.iter().all(|packet| packet.task_id() % 2 == 1));
    assert_eq!(report.counters.abandoned, 4);
    assert_eq!(report.counters.sent, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_input_terminates_immediately() {
    init_test_tracing();

    let config = TestConfigBuilder::new().build();
    let packets = within_default(distribute(Vec::<InstantWork>::new(), &config))
        .await
        .unwrap();

    assert!(packets.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn graceful_drain_returns_after_draining() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let config = TestConfigBuilder::new()
        .with_workers(4)
        .with_want(3)
        .with_task_timeout_ms(200)
        .build();
    let distributor = Distributor::new(config).unwrap();

    let workload = sleeping_workload(40, Duration::from_millis(5), &executions);
    let report = within_default(distributor.run_with_report(workload))
        .await
        .unwrap();

    // Every task that was in flight when loading stopped made it to the output.
    assert_ne!(report.exit, CollectorExit::TargetReached);
    assert!(report.packets.len() >= 3);
    assert!(report.packets.len() < 40);
    assert_eq!(report.counters.received, report.counters.sent);
    assert_eq!(report.counters.abandoned, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn trailing_pause_delays_return() {
    init_test_tracing();

    let executions = ExecutionCounter::new();
    let config = TestConfigBuilder::new()
        .with_want(2)
        .with_trailing_pause(true)
        .build();
    let distributor = Distributor::new(config).unwrap();

    let report = within_default(distributor.run_with_report(instant_workload(2, &executions)))
        .await
        .unwrap();

    assert_eq!(report.packets.len(), 2);
    assert!(report.elapsed >= Duration::from_millis(60));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_config_is_an_error() {
    init_test_tracing();

    let config = TestConfigBuilder::new().with_task_timeout_ms(0).build();
    let result = distribute(Vec::<InstantWork>::new(), &config).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), distrib::error::ErrorKind::ConfigError);
}
