//! Teardown runs recorded in an on-disk ledger

use hosting_teardown::audit::LedgerAuditLog;
use hosting_teardown::audit::ledger::{self, open_db_at};
use hosting_teardown::config::TeardownConfig;
use hosting_teardown::confirm::AlwaysGate;
use hosting_teardown::run_teardown;
use hosting_teardown::site::InMemorySite;
use hosting_teardown_common::StepKind;
use hosting_teardown_test_utils::Fixture;
use hosting_teardown_test_utils::db::TempLedger;

fn site(fixture: &Fixture) -> InMemorySite {
    let file = fixture.write_snapshot().unwrap();
    InMemorySite::load(file.path()).unwrap()
}

#[tokio::test]
async fn test_run_is_recorded_and_closed() {
    let tmp = TempLedger::new().unwrap();
    let pool = open_db_at(&tmp.path()).await.unwrap();
    let audit = LedgerAuditLog::new(pool.clone());

    let site = site(&Fixture::single_task());
    site.fail_on(StepKind::RemoveHostingConnection, "HV1");

    let report = run_teardown(
        &site,
        &audit,
        &mut AlwaysGate(true),
        TeardownConfig::default(),
        "HV1",
    )
    .await
    .unwrap();

    let ops = ledger::run_operations(&pool, audit.run_id()).await.unwrap();
    assert_eq!(ops.len(), report.steps.len());
    assert!(ops.iter().all(|op| !op.is_open()));
    assert!(ledger::open_operations(&pool).await.unwrap().is_empty());

    let kinds: Vec<_> = ops.iter().map(|op| op.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::StopTask,
            StepKind::RemoveTask,
            StepKind::RemoveResourceUnit,
            StepKind::RemoveHostingConnection,
            StepKind::RemoveBrokerRegistration,
        ]
    );

    let failed: Vec<_> = ops.iter().filter(|op| op.status() == "failed").collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, StepKind::RemoveHostingConnection);
    assert_eq!(failed[0].label, "Remove hosting connection HV1");
}

#[tokio::test]
async fn test_runs_are_kept_apart() {
    let tmp = TempLedger::new().unwrap();
    let path = tmp.path();

    let first = LedgerAuditLog::new(open_db_at(&path).await.unwrap());
    run_teardown(
        &site(&Fixture::single_task()),
        &first,
        &mut AlwaysGate(true),
        TeardownConfig::resource_only(),
        "HV1",
    )
    .await
    .unwrap();

    // Reopen the same file, as a second invocation would
    let pool = open_db_at(&path).await.unwrap();
    let second = LedgerAuditLog::new(pool.clone());
    run_teardown(
        &site(&Fixture::queued_tasks(2)),
        &second,
        &mut AlwaysGate(true),
        TeardownConfig::resource_only(),
        "HV1",
    )
    .await
    .unwrap();

    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(
        ledger::run_operations(&pool, first.run_id()).await.unwrap().len(),
        3
    );
    assert_eq!(
        ledger::run_operations(&pool, second.run_id()).await.unwrap().len(),
        5
    );
    assert_eq!(ledger::recent_operations(&pool, 4).await.unwrap().len(), 4);

    // Nothing is old enough to prune
    assert_eq!(ledger::prune_closed(&pool, 30).await.unwrap(), 0);
}

#[tokio::test]
async fn test_declined_run_leaves_ledger_empty() {
    let tmp = TempLedger::new().unwrap();
    let pool = open_db_at(&tmp.path()).await.unwrap();
    let audit = LedgerAuditLog::new(pool.clone());

    run_teardown(
        &site(&Fixture::single_task()),
        &audit,
        &mut AlwaysGate(false),
        TeardownConfig::default(),
        "HV1",
    )
    .await
    .unwrap();

    assert!(ledger::recent_operations(&pool, 10).await.unwrap().is_empty());
}
