//! End-to-end apply workflow behavior over a fake orchestration platform.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_workflow, FakePlatform, MANAGED};
use tradmin::config::TraderConfig;
use tradmin::error::ApplyError;
use tradmin::orchestrator::ServiceController;
use tradmin::status::{BrokerProbe, StatusAggregator};
use tradmin::workflow::{ApplyPhase, FailurePhase, ResumeRetryConfig};

fn platform() -> Arc<FakePlatform> {
    Arc::new(FakePlatform::with_services(&[
        ("orchestrator", 2),
        ("scanner", 1),
    ]))
}

#[tokio::test]
async fn apply_rejects_min_dte_above_max_dte_and_restores_services() {
    // Scenario A: candidate with min_dte > max_dte
    let platform = platform();
    let dir = tempfile::TempDir::new().unwrap();

    let mut initial = TraderConfig::default();
    initial.options.min_dte = 7;
    initial.options.max_dte = 90;
    let (workflow, store, _shared) = build_workflow(platform.clone(), &dir, &initial);

    let mut candidate = initial.clone();
    candidate.options.min_dte = 45;
    candidate.options.max_dte = 30;

    let err = workflow.apply(candidate).await.unwrap_err();
    let ApplyError::Failed { phase, report } = err else {
        panic!("expected Failed error");
    };
    assert_eq!(phase, FailurePhase::Validation);
    assert!(report
        .violations
        .iter()
        .any(|v| v.field == "options.min_dte" && v.message.contains("options.max_dte")));

    // On-disk file unchanged
    let on_disk = store.load().unwrap();
    assert_eq!(on_disk.options.min_dte, 7);
    assert_eq!(on_disk.options.max_dte, 90);
    assert!(!report.config_persisted);

    // All services paused then resumed as cleanup, at their original capacity
    assert!(!report.services_left_paused);
    assert_eq!(platform.capacity("orchestrator"), 2);
    assert_eq!(platform.capacity("scanner"), 1);

    assert_eq!(workflow.phase(), ApplyPhase::Failed(FailurePhase::Validation));
}

#[tokio::test]
async fn apply_persists_schedule_change_and_keeps_backup() {
    // Scenario B: successful apply of a schedule change
    let platform = platform();
    let dir = tempfile::TempDir::new().unwrap();

    let mut initial = TraderConfig::default();
    initial.schedule.start = "13:30".to_string();
    initial.schedule.stop = "20:00".to_string();
    let (workflow, store, shared) = build_workflow(platform.clone(), &dir, &initial);

    let mut candidate = initial.clone();
    candidate.schedule.start = "14:00".to_string();

    let report = workflow.apply(candidate).await.unwrap();
    assert!(report.is_success());
    assert!(report.config_persisted);
    assert!(!report.services_left_paused);

    // Load returns the new value
    assert_eq!(store.load().unwrap().schedule.start, "14:00");
    assert_eq!(shared.read().await.schedule.start, "14:00");

    // A backup holds the superseded config
    let backups = store.list_backups().unwrap();
    assert_eq!(backups.len(), 1);
    let backed_up: TraderConfig =
        toml::from_str(&std::fs::read_to_string(&backups[0]).unwrap()).unwrap();
    assert_eq!(backed_up.schedule.start, "13:30");

    // Services are running again and got a reload signal
    assert_eq!(platform.capacity("orchestrator"), 2);
    assert_eq!(platform.capacity("scanner"), 1);
    let signaled = platform.signaled();
    for name in MANAGED {
        assert!(signaled.contains(&name.to_string()));
    }
    assert_eq!(workflow.phase(), ApplyPhase::Idle);
}

#[tokio::test]
async fn pause_failure_aborts_before_any_save() {
    // Scenario C: pause fails only for "scanner"
    let platform = platform();
    platform.fail_pause_for("scanner");
    let dir = tempfile::TempDir::new().unwrap();

    let initial = TraderConfig::default();
    let (workflow, store, _shared) = build_workflow(platform.clone(), &dir, &initial);

    let mut candidate = initial.clone();
    candidate.trading.max_positions = 8;

    let err = workflow.apply(candidate).await.unwrap_err();
    let ApplyError::Failed { phase, report } = err else {
        panic!("expected Failed error");
    };
    assert_eq!(phase, FailurePhase::Pause);
    assert_eq!(report.service_failures.len(), 1);
    assert!(report.service_failures.contains_key("scanner"));

    // The service that did pause stays paused for inspection
    assert!(report.services_left_paused);
    assert_eq!(platform.capacity("orchestrator"), 0);
    assert_eq!(platform.capacity("scanner"), 1);

    // No save was attempted
    assert!(!report.config_persisted);
    assert_eq!(store.load().unwrap().trading.max_positions, 5);
}

#[tokio::test]
async fn concurrent_applies_exactly_one_proceeds() {
    let platform = Arc::new(
        FakePlatform::with_services(&[("orchestrator", 2), ("scanner", 1)])
            .with_op_delay(Duration::from_millis(100)),
    );
    let dir = tempfile::TempDir::new().unwrap();
    let (workflow, _store, _shared) = build_workflow(platform, &dir, &TraderConfig::default());
    let workflow = Arc::new(workflow);

    let mut candidate = TraderConfig::default();
    candidate.trading.max_daily_trades = 9;

    let first = tokio::spawn({
        let workflow = workflow.clone();
        let candidate = candidate.clone();
        async move { workflow.apply(candidate).await }
    });
    // Let the first apply take the single-flight lock
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = tokio::spawn({
        let workflow = workflow.clone();
        let candidate = candidate.clone();
        async move { workflow.apply(candidate).await }
    });

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(first.is_ok());
    assert!(matches!(second, Err(ApplyError::InProgress)));
}

#[tokio::test]
async fn resume_failure_after_save_is_latched_until_acknowledged() {
    let platform = platform();
    platform.fail_resume_for("scanner");
    let dir = tempfile::TempDir::new().unwrap();

    let mut initial = TraderConfig::default();
    initial.trading.max_positions = 5;
    let (workflow, store, shared) = build_workflow(platform.clone(), &dir, &initial);

    let mut candidate = initial.clone();
    candidate.trading.max_positions = 7;

    let err = workflow.apply(candidate.clone()).await.unwrap_err();
    let ApplyError::Failed { phase, report } = err else {
        panic!("expected Failed error");
    };
    assert_eq!(phase, FailurePhase::Resume);
    assert!(report.config_persisted);
    assert!(report.services_left_paused);
    assert!(report.service_failures.contains_key("scanner"));

    // The new configuration is already persisted
    assert_eq!(store.load().unwrap().trading.max_positions, 7);

    // Status reports the stuck service as not healthy
    let controller = Arc::new(ServiceController::new(platform.clone(), ""));
    let aggregator = StatusAggregator::new(
        controller,
        shared.clone(),
        BrokerProbe::new(Duration::from_millis(200)),
        common::managed_names(),
    );
    let snapshot = aggregator.get_status().await;
    assert!(snapshot
        .services
        .iter()
        .any(|s| s.name == "scanner" && !s.health.is_healthy()));

    // Further applies are refused until the operator acknowledges
    assert!(workflow.needs_intervention());
    assert!(matches!(
        workflow.apply(candidate.clone()).await,
        Err(ApplyError::InterventionRequired)
    ));

    platform.clear_failures();
    workflow.acknowledge_resume_failure();
    assert!(!workflow.needs_intervention());
    let report = workflow.apply(candidate).await.unwrap();
    assert!(report.is_success());
    assert_eq!(platform.capacity("scanner"), 1);
}

#[tokio::test]
async fn resume_retry_recovers_from_transient_failure() {
    let platform = platform();
    // First two resume attempts fail, third succeeds
    platform.fail_resume_times("scanner", 2);
    let dir = tempfile::TempDir::new().unwrap();

    let initial = TraderConfig::default();
    let (workflow, _store, _shared) = build_workflow(platform.clone(), &dir, &initial);
    let workflow = workflow.with_resume_retry(ResumeRetryConfig {
        max_attempts: 3,
        base_delay_ms: 10,
        max_delay_ms: 50,
    });

    let mut candidate = initial.clone();
    candidate.universe.min_price = 25.0;

    let report = workflow.apply(candidate).await.unwrap();
    assert!(report.is_success());
    assert_eq!(platform.capacity("scanner"), 1);
    assert!(!workflow.needs_intervention());
}

#[tokio::test]
async fn baseline_resume_makes_a_single_attempt() {
    let platform = platform();
    platform.fail_resume_times("scanner", 1);
    let dir = tempfile::TempDir::new().unwrap();

    let initial = TraderConfig::default();
    // Default retry policy: no retries
    let (workflow, _store, _shared) = build_workflow(platform.clone(), &dir, &initial);

    let mut candidate = initial.clone();
    candidate.universe.min_price = 25.0;

    let err = workflow.apply(candidate).await.unwrap_err();
    let ApplyError::Failed { phase, .. } = err else {
        panic!("expected Failed error");
    };
    assert_eq!(phase, FailurePhase::Resume);
    assert_eq!(platform.capacity("scanner"), 0);
}

#[tokio::test]
async fn saved_and_loaded_config_round_trips() {
    let platform = platform();
    let dir = tempfile::TempDir::new().unwrap();

    let mut initial = TraderConfig::default();
    initial.connection.account = "DU1234567".to_string();
    initial.universe.min_market_cap = 1_000_000_000;
    initial.alerts.slack_enabled = true;
    initial.alerts.slack_webhook_url = "https://hooks.example.com/T000/B000".to_string();
    let (workflow, store, _shared) = build_workflow(platform, &dir, &initial);

    let report = workflow.apply(initial.clone()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(store.load().unwrap(), initial);
}
