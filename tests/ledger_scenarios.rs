//! Ledger behaviour against the persistent Fjall store
//!
//! Timeline used throughout: T1 < T2 < T3 < T4 on 2026-01-05.

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use spoolbox::ledger::{BaselineSource, BatchOutcome, LedgerError, SpoolLedger};
use spoolbox::model::{AuditRecord, AuditStatus, ClosureRecord, Spool};
use spoolbox::store::{FjallStore, SpoolRepository};

fn t(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 8 + n, 0, 0).unwrap()
}

fn open_store() -> (FjallStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = FjallStore::open(temp_dir.path().join("spools")).unwrap();
    (store, temp_dir)
}

fn spool(serial: &str, initial: f64) -> Spool {
    Spool::builder()
        .serial_number(serial)
        .initial_quantity(initial)
        .created_at(t(0))
        .build()
}

fn closure(serial: &str, used: &str, wasted: &str, at: DateTime<Utc>) -> ClosureRecord {
    ClosureRecord::builder()
        .spool_serial(serial)
        .meters_used(used)
        .meters_wasted(wasted)
        .created_at(at)
        .build()
}

fn audit(serial: &str, qty: f64, at: DateTime<Utc>, status: AuditStatus) -> AuditRecord {
    AuditRecord::builder()
        .spool_serial(serial)
        .physical_quantity(qty)
        .audited_at(at)
        .status(status)
        .build()
}

#[tokio::test]
async fn test_never_audited_spool() {
    let (store, _temp_dir) = open_store();
    store.put_spool(&spool("S1", 1000.0)).unwrap();
    store.put_closure(&closure("S1", "100", "10", t(1))).unwrap();
    store.put_closure(&closure("S1", "45", "5", t(2))).unwrap();

    let ledger = SpoolLedger::new(store);
    let remaining = ledger.get_remaining("S1").await.unwrap();

    assert_eq!(remaining.baseline_quantity, 1000.0);
    assert_eq!(remaining.baseline_date, t(0));
    assert_eq!(remaining.usage_since_base, 160.0);
    assert_eq!(remaining.current_quantity, 840.0);
}

#[tokio::test]
async fn test_audit_resets_baseline() {
    let (store, _temp_dir) = open_store();
    store.put_spool(&spool("S1", 1000.0)).unwrap();
    store.put_closure(&closure("S1", "150", "", t(1))).unwrap();
    store.put_closure(&closure("S1", "40", "10", t(2))).unwrap();
    store
        .put_audit(&audit("S1", 800.0, t(3), AuditStatus::Completed))
        .unwrap();
    store.put_closure(&closure("S1", "20", "", t(4))).unwrap();

    let ledger = SpoolLedger::new(store);
    let remaining = ledger.get_remaining("S1").await.unwrap();

    assert_eq!(remaining.baseline_quantity, 800.0);
    assert_eq!(remaining.baseline_date, t(3));
    assert!(matches!(remaining.baseline_source, BaselineSource::Audit { .. }));
    assert_eq!(remaining.current_quantity, 780.0);
}

#[tokio::test]
async fn test_latest_completed_audit_wins() {
    let (store, _temp_dir) = open_store();
    store.put_spool(&spool("S1", 1000.0)).unwrap();
    store
        .put_audit(&audit("S1", 900.0, t(1), AuditStatus::Completed))
        .unwrap();
    store
        .put_audit(&audit("S1", 850.0, t(2), AuditStatus::Completed))
        .unwrap();
    store
        .put_audit(&audit("S1", 10.0, t(3), AuditStatus::Pending))
        .unwrap();

    let ledger = SpoolLedger::new(store);
    let baseline = ledger.get_baseline("S1").await.unwrap();

    assert_eq!(baseline.quantity, 850.0);
    assert_eq!(baseline.as_of, t(2));
}

#[tokio::test]
async fn test_closure_at_baseline_instant_is_excluded() {
    let (store, _temp_dir) = open_store();
    store.put_spool(&spool("S1", 500.0)).unwrap();
    store
        .put_audit(&audit("S1", 400.0, t(2), AuditStatus::Completed))
        .unwrap();
    store.put_closure(&closure("S1", "30", "", t(2))).unwrap();
    store.put_closure(&closure("S1", "12", "", t(3))).unwrap();

    let ledger = SpoolLedger::new(store);
    let remaining = ledger.get_remaining("S1").await.unwrap();

    assert_eq!(remaining.closures_counted, 1);
    assert_eq!(remaining.current_quantity, 388.0);
}

#[tokio::test]
async fn test_serial_prefix_does_not_leak() {
    let (store, _temp_dir) = open_store();
    store.put_spool(&spool("S1", 100.0)).unwrap();
    store.put_spool(&spool("S1:B", 100.0)).unwrap();
    store.put_spool(&spool("S10", 100.0)).unwrap();
    store.put_closure(&closure("S1:B", "70", "", t(1))).unwrap();
    store.put_closure(&closure("S10", "60", "", t(1))).unwrap();
    store.put_closure(&closure("S1", "5", "", t(1))).unwrap();

    let ledger = SpoolLedger::new(store);

    assert_eq!(ledger.get_remaining("S1").await.unwrap().current_quantity, 95.0);
    assert_eq!(ledger.get_remaining("S1:B").await.unwrap().current_quantity, 30.0);
    assert_eq!(ledger.get_remaining("S10").await.unwrap().current_quantity, 40.0);
}

#[tokio::test]
async fn test_batch_with_unknown_serial() {
    let (store, _temp_dir) = open_store();
    store.put_spool(&spool("S1", 1000.0)).unwrap();
    store.put_closure(&closure("S1", "100m", "10", t(1))).unwrap();

    let ledger = SpoolLedger::new(store);
    let outcomes = ledger
        .batch_remaining(&["S1".to_string(), "UNKNOWN".to_string()])
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].resolved().unwrap().current_quantity, 890.0);
    assert_eq!(
        outcomes[1],
        BatchOutcome::NotFound {
            serial: "UNKNOWN".to_string()
        }
    );
}

#[tokio::test]
async fn test_unknown_spool_is_not_found() {
    let (store, _temp_dir) = open_store();
    let ledger = SpoolLedger::new(store);

    assert!(matches!(
        ledger.get_baseline("NOPE").await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("spools");
    {
        let store = FjallStore::open(&path).unwrap();
        store.put_spool(&spool("S1", 300.0)).unwrap();
        store.put_closure(&closure("S1", "25", "", t(1))).unwrap();
        store.persist().unwrap();
    }

    let store = FjallStore::open(&path).unwrap();
    assert!(store.find_spool("S1").await.unwrap().is_some());

    let ledger = SpoolLedger::new(store);
    assert_eq!(ledger.get_remaining("S1").await.unwrap().current_quantity, 275.0);
}
