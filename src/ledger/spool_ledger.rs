use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::meters::parse_reading;
use crate::model::{AuditRecord, ClosureRecord, Spool, SpoolStatus};
use crate::observability::Metrics;
use crate::store::SpoolRepository;

use super::error::{LedgerError, Result};

/// Where a baseline quantity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineSource {
    /// No completed audit yet; registration quantity and date
    Registration,
    Audit { audit_id: Uuid },
}

/// Authoritative quantity of a spool at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub quantity: f64,
    pub as_of: DateTime<Utc>,
    pub source: BaselineSource,
}

impl Baseline {
    /// Pick the baseline for a spool given its latest completed audit, if any.
    /// Pending audits are never authoritative.
    pub fn resolve(spool: &Spool, audit: Option<&AuditRecord>) -> Self {
        match audit.filter(|a| a.is_completed()) {
            Some(audit) => Self {
                quantity: audit.physical_quantity,
                as_of: audit.audited_at,
                source: BaselineSource::Audit {
                    audit_id: audit.audit_id,
                },
            },
            None => Self {
                quantity: spool.initial_quantity,
                as_of: spool.created_at,
                source: BaselineSource::Registration,
            },
        }
    }
}

/// Meters consumed by a set of closures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTally {
    pub used: f64,
    pub wasted: f64,
    /// Closures that contributed
    pub closures: usize,
    /// Readings that were non-blank but unparsable and counted as zero
    pub degraded: usize,
}

impl UsageTally {
    pub fn total(&self) -> f64 {
        self.used + self.wasted
    }

    /// Sum every given closure, regardless of timestamp
    pub fn from_closures<'a, I>(closures: I) -> Self
    where
        I: IntoIterator<Item = &'a ClosureRecord>,
    {
        Self::collect(closures, true)
    }

    /// Same sum, without warning about readings another tally already reported
    pub(super) fn from_closures_quiet<'a, I>(closures: I) -> Self
    where
        I: IntoIterator<Item = &'a ClosureRecord>,
    {
        Self::collect(closures, false)
    }

    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            used: self.used + other.used,
            wasted: self.wasted + other.wasted,
            closures: self.closures + other.closures,
            degraded: self.degraded + other.degraded,
        }
    }

    fn collect<'a, I>(closures: I, warn_degraded: bool) -> Self
    where
        I: IntoIterator<Item = &'a ClosureRecord>,
    {
        let mut tally = Self::default();
        for closure in closures {
            tally.add(closure, warn_degraded);
        }
        tally
    }

    fn add(&mut self, closure: &ClosureRecord, warn_degraded: bool) {
        let used = parse_reading(closure.meters_used.as_deref());
        let wasted = parse_reading(closure.meters_wasted.as_deref());

        for (field, reading, raw) in [
            ("meters_used", used, &closure.meters_used),
            ("meters_wasted", wasted, &closure.meters_wasted),
        ] {
            if !reading.is_degraded() {
                continue;
            }
            self.degraded += 1;
            if warn_degraded {
                warn!(
                    closure_id = %closure.id,
                    spool = closure.spool_serial.as_deref().unwrap_or("-"),
                    field,
                    raw = raw.as_deref().unwrap_or_default(),
                    "Unparsable meter reading counted as zero"
                );
            }
        }

        self.used += used.meters();
        self.wasted += wasted.meters();
        self.closures += 1;
    }
}

/// Sum closures created strictly after `after`.
/// A closure stamped exactly at the baseline is left out.
pub fn tally_usage<'a, I>(closures: I, after: DateTime<Utc>) -> UsageTally
where
    I: IntoIterator<Item = &'a ClosureRecord>,
{
    UsageTally::from_closures(closures.into_iter().filter(|c| c.created_at > after))
}

/// Status the spool should carry given its computed remaining length
pub fn suggest_status(stored: SpoolStatus, current_quantity: f64) -> SpoolStatus {
    match stored {
        SpoolStatus::Retired => SpoolStatus::Retired,
        _ if current_quantity <= 0.0 => SpoolStatus::Depleted,
        other => other,
    }
}

/// Remaining length of one spool and how it was derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolRemaining {
    pub serial: String,
    pub status: SpoolStatus,
    pub suggested_status: SpoolStatus,
    pub baseline_quantity: f64,
    pub baseline_date: DateTime<Utc>,
    pub baseline_source: BaselineSource,
    pub usage_since_base: f64,
    pub closures_counted: usize,
    /// May be negative; never clamped
    pub current_quantity: f64,
}

/// Per-serial result of a batch computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Resolved(SpoolRemaining),
    NotFound { serial: String },
}

impl BatchOutcome {
    pub fn serial(&self) -> &str {
        match self {
            BatchOutcome::Resolved(remaining) => &remaining.serial,
            BatchOutcome::NotFound { serial } => serial,
        }
    }

    pub fn resolved(&self) -> Option<&SpoolRemaining> {
        match self {
            BatchOutcome::Resolved(remaining) => Some(remaining),
            BatchOutcome::NotFound { .. } => None,
        }
    }
}

/// Computes remaining spool lengths from a [`SpoolRepository`]
///
/// Holds no state beyond the repository handle and counters, so one instance
/// can serve any number of concurrent callers.
pub struct SpoolLedger<R> {
    repo: R,
    metrics: Arc<Metrics>,
}

impl<R: SpoolRepository> SpoolLedger<R> {
    pub fn new(repo: R) -> Self {
        Self::with_metrics(repo, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(repo: R, metrics: Arc<Metrics>) -> Self {
        Self { repo, metrics }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Latest completed audit of the spool, else its registration figures
    pub async fn get_baseline(&self, serial: &str) -> Result<Baseline> {
        let spool = self.require_spool(serial).await?;
        let audit = self.repo.find_latest_completed_audit(serial).await?;
        Ok(self.baseline_for(&spool, audit.as_ref()))
    }

    /// Meters used and wasted on the spool strictly after `as_of`
    pub async fn sum_usage_since(&self, serial: &str, as_of: DateTime<Utc>) -> Result<UsageTally> {
        let closures = self.repo.find_closures_after(serial, as_of).await?;
        let tally = tally_usage(&closures, as_of);
        self.record_degraded(&tally);
        debug!(
            serial,
            closures = tally.closures,
            usage = tally.total(),
            "Summed usage since baseline"
        );
        Ok(tally)
    }

    /// Baseline minus usage since the baseline
    pub async fn get_remaining(&self, serial: &str) -> Result<SpoolRemaining> {
        let spool = self.require_spool(serial).await?;
        let audit = self.repo.find_latest_completed_audit(serial).await?;
        let baseline = self.baseline_for(&spool, audit.as_ref());
        let usage = self.sum_usage_since(serial, baseline.as_of).await?;
        Ok(self.compose(&spool, &baseline, &usage))
    }

    /// Remaining length for many spools
    ///
    /// Spools and baselines are looked up once for the whole batch. Unknown
    /// serials come back as [`BatchOutcome::NotFound`]; store failures abort
    /// the batch. Output follows input order with repeats dropped.
    pub async fn batch_remaining(&self, serials: &[String]) -> Result<Vec<BatchOutcome>> {
        let mut seen = HashSet::with_capacity(serials.len());
        let unique: Vec<String> = serials
            .iter()
            .filter(|serial| seen.insert(serial.as_str()))
            .cloned()
            .collect();

        let spools = self.repo.find_spools(&unique).await?;
        let known: Vec<String> = unique
            .iter()
            .filter(|serial| spools.contains_key(*serial))
            .cloned()
            .collect();
        let audits = self.repo.find_latest_completed_audits(&known).await?;

        let mut outcomes = Vec::with_capacity(unique.len());
        for serial in unique {
            let Some(spool) = spools.get(&serial) else {
                self.metrics.spool_not_found();
                debug!(serial = %serial, "Spool not found in batch");
                outcomes.push(BatchOutcome::NotFound { serial });
                continue;
            };
            let baseline = self.baseline_for(spool, audits.get(&serial));
            let usage = self.sum_usage_since(&serial, baseline.as_of).await?;
            outcomes.push(BatchOutcome::Resolved(self.compose(spool, &baseline, &usage)));
        }

        info!(
            requested = serials.len(),
            resolved = outcomes.iter().filter(|o| o.resolved().is_some()).count(),
            "Computed batch remaining"
        );
        Ok(outcomes)
    }

    async fn require_spool(&self, serial: &str) -> Result<Spool> {
        match self.repo.find_spool(serial).await? {
            Some(spool) => Ok(spool),
            None => {
                self.metrics.spool_not_found();
                Err(LedgerError::NotFound(serial.to_string()))
            }
        }
    }

    fn baseline_for(&self, spool: &Spool, audit: Option<&AuditRecord>) -> Baseline {
        let baseline = Baseline::resolve(spool, audit);
        match baseline.source {
            BaselineSource::Audit { .. } => self.metrics.baseline_from_audit(),
            BaselineSource::Registration => self.metrics.baseline_from_registration(),
        }
        baseline
    }

    pub(super) fn record_degraded(&self, tally: &UsageTally) {
        for _ in 0..tally.degraded {
            self.metrics.reading_degraded();
        }
    }

    fn compose(&self, spool: &Spool, baseline: &Baseline, usage: &UsageTally) -> SpoolRemaining {
        self.metrics.remaining_computed();
        let current_quantity = baseline.quantity - usage.total();
        SpoolRemaining {
            serial: spool.serial_number.clone(),
            status: spool.status,
            suggested_status: suggest_status(spool.status, current_quantity),
            baseline_quantity: baseline.quantity,
            baseline_date: baseline.as_of,
            baseline_source: baseline.source,
            usage_since_base: usage.total(),
            closures_counted: usage.closures,
            current_quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuditStatus;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 6, hour, 0, 0).unwrap()
    }

    fn spool(serial: &str, initial: f64, created: DateTime<Utc>) -> Spool {
        Spool::builder()
            .serial_number(serial)
            .initial_quantity(initial)
            .status(SpoolStatus::Assigned)
            .created_at(created)
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

    fn completed_audit(serial: &str, qty: f64, at: DateTime<Utc>) -> AuditRecord {
        AuditRecord::builder()
            .spool_serial(serial)
            .physical_quantity(qty)
            .audited_at(at)
            .status(AuditStatus::Completed)
            .build()
    }

    async fn scenario_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_spool(spool("S1", 1000.0, t(6))).await;
        store.insert_closure(closure("S1", "100", "10", t(9))).await;
        store.insert_closure(closure("S1", "50", "0", t(11))).await;
        store
    }

    #[tokio::test]
    async fn test_baseline_falls_back_to_registration() {
        let ledger = SpoolLedger::new(scenario_store().await);

        let baseline = ledger.get_baseline("S1").await.unwrap();
        assert_eq!(baseline.quantity, 1000.0);
        assert_eq!(baseline.as_of, t(6));
        assert_eq!(baseline.source, BaselineSource::Registration);
    }

    #[tokio::test]
    async fn test_baseline_uses_latest_completed_audit() {
        let store = scenario_store().await;
        store.insert_audit(completed_audit("S1", 900.0, t(8))).await;
        store.insert_audit(completed_audit("S1", 820.0, t(12))).await;
        store
            .insert_audit(
                AuditRecord::builder()
                    .spool_serial("S1")
                    .physical_quantity(1.0)
                    .audited_at(t(13))
                    .build(),
            )
            .await;
        let ledger = SpoolLedger::new(store);

        let baseline = ledger.get_baseline("S1").await.unwrap();
        assert_eq!(baseline.quantity, 820.0);
        assert_eq!(baseline.as_of, t(12));
        assert!(matches!(baseline.source, BaselineSource::Audit { .. }));
    }

    #[test]
    fn test_resolve_ignores_pending_audit() {
        let spool = spool("S1", 500.0, t(6));
        let pending = AuditRecord::builder()
            .spool_serial("S1")
            .physical_quantity(1.0)
            .audited_at(t(7))
            .build();

        let baseline = Baseline::resolve(&spool, Some(&pending));
        assert_eq!(baseline.quantity, 500.0);
        assert_eq!(baseline.source, BaselineSource::Registration);
    }

    #[test]
    fn test_tally_excludes_closure_at_boundary() {
        let closures = vec![
            closure("S1", "10", "", t(9)),
            closure("S1", "20", "", t(10)),
            closure("S1", "40", "", t(11)),
        ];

        let tally = tally_usage(&closures, t(10));
        assert_eq!(tally.total(), 40.0);
        assert_eq!(tally.closures, 1);
    }

    #[test]
    fn test_tally_counts_degraded_readings() {
        let closures = vec![
            closure("S1", "abc", "5m", t(9)),
            closure("S1", "12.5", "", t(10)),
        ];

        let tally = tally_usage(&closures, t(0));
        assert_eq!(tally.used, 12.5);
        assert_eq!(tally.wasted, 5.0);
        assert_eq!(tally.degraded, 1);
    }

    #[tokio::test]
    async fn test_remaining_without_audit() {
        let ledger = SpoolLedger::new(scenario_store().await);

        let remaining = ledger.get_remaining("S1").await.unwrap();
        assert_eq!(remaining.baseline_quantity, 1000.0);
        assert_eq!(remaining.usage_since_base, 160.0);
        assert_eq!(remaining.current_quantity, 840.0);
        assert_eq!(remaining.closures_counted, 2);
    }

    #[tokio::test]
    async fn test_remaining_after_audit_does_not_double_count() {
        let store = scenario_store().await;
        store.insert_audit(completed_audit("S1", 800.0, t(12))).await;
        store.insert_closure(closure("S1", "20", "0", t(14))).await;
        let ledger = SpoolLedger::new(store);

        let remaining = ledger.get_remaining("S1").await.unwrap();
        assert_eq!(remaining.baseline_quantity, 800.0);
        assert_eq!(remaining.baseline_date, t(12));
        assert_eq!(remaining.usage_since_base, 20.0);
        assert_eq!(remaining.current_quantity, 780.0);
    }

    #[tokio::test]
    async fn test_remaining_is_not_clamped() {
        let store = MemoryStore::new();
        store.insert_spool(spool("S9", 100.0, t(6))).await;
        store.insert_closure(closure("S9", "150", "", t(7))).await;
        let ledger = SpoolLedger::new(store);

        let remaining = ledger.get_remaining("S9").await.unwrap();
        assert_eq!(remaining.current_quantity, -50.0);
        assert_eq!(remaining.suggested_status, SpoolStatus::Depleted);
    }

    #[tokio::test]
    async fn test_remaining_is_idempotent() {
        let ledger = SpoolLedger::new(scenario_store().await);

        let first = ledger.get_remaining("S1").await.unwrap();
        let second = ledger.get_remaining("S1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_spool_is_not_found() {
        let ledger = SpoolLedger::new(MemoryStore::new());

        let result = ledger.get_remaining("NOPE").await;
        assert!(matches!(result, Err(LedgerError::NotFound(serial)) if serial == "NOPE"));
        assert_eq!(ledger.metrics().snapshot().spools_not_found, 1);
    }

    #[tokio::test]
    async fn test_batch_reports_not_found_without_failing() {
        let ledger = SpoolLedger::new(scenario_store().await);
        let serials = vec!["S1".to_string(), "UNKNOWN".to_string()];

        let outcomes = ledger.batch_remaining(&serials).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].resolved().unwrap().current_quantity, 840.0);
        assert_eq!(
            outcomes[1],
            BatchOutcome::NotFound {
                serial: "UNKNOWN".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_batch_drops_repeated_serials() {
        let ledger = SpoolLedger::new(scenario_store().await);
        let serials = vec!["S1".to_string(), "S1".to_string()];

        let outcomes = ledger.batch_remaining(&serials).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].serial(), "S1");
    }

    #[tokio::test]
    async fn test_batch_matches_single_lookups() {
        let store = scenario_store().await;
        store.insert_spool(spool("S2", 300.0, t(6))).await;
        store.insert_audit(completed_audit("S2", 250.0, t(10))).await;
        store.insert_closure(closure("S2", "30m", "2", t(15))).await;
        let ledger = SpoolLedger::new(store);

        let serials = vec!["S2".to_string(), "S1".to_string()];
        let outcomes = ledger.batch_remaining(&serials).await.unwrap();

        for outcome in &outcomes {
            let single = ledger.get_remaining(outcome.serial()).await.unwrap();
            assert_eq!(outcome.resolved(), Some(&single));
        }
        assert_eq!(outcomes[0].resolved().unwrap().current_quantity, 218.0);
    }

    #[tokio::test]
    async fn test_degraded_readings_reach_metrics() {
        let store = MemoryStore::new();
        store.insert_spool(spool("S3", 50.0, t(6))).await;
        store.insert_closure(closure("S3", "lots", "n/a", t(7))).await;
        let ledger = SpoolLedger::new(store);

        let remaining = ledger.get_remaining("S3").await.unwrap();
        assert_eq!(remaining.current_quantity, 50.0);
        assert_eq!(ledger.metrics().snapshot().readings_degraded, 2);
    }

    struct UnavailableStore;

    #[async_trait]
    impl SpoolRepository for UnavailableStore {
        async fn find_spool(&self, _serial: &str) -> crate::store::Result<Option<Spool>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_latest_completed_audit(
            &self,
            _serial: &str,
        ) -> crate::store::Result<Option<AuditRecord>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_closures_after(
            &self,
            _serial: &str,
            _after: DateTime<Utc>,
        ) -> crate::store::Result<Vec<ClosureRecord>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_spool_closures_between(
            &self,
            _serial: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> crate::store::Result<Vec<ClosureRecord>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_closures_between(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> crate::store::Result<Vec<ClosureRecord>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find_spools(
            &self,
            _serials: &[String],
        ) -> crate::store::Result<HashMap<String, Spool>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let ledger = SpoolLedger::new(UnavailableStore);

        let single = ledger.get_remaining("S1").await;
        assert!(matches!(single, Err(LedgerError::StoreUnavailable(_))));

        let batch = ledger.batch_remaining(&["S1".to_string()]).await;
        assert!(matches!(batch, Err(LedgerError::StoreUnavailable(_))));
    }

    #[test]
    fn test_suggest_status() {
        assert_eq!(suggest_status(SpoolStatus::Assigned, 10.0), SpoolStatus::Assigned);
        assert_eq!(suggest_status(SpoolStatus::Assigned, 0.0), SpoolStatus::Depleted);
        assert_eq!(suggest_status(SpoolStatus::Retired, -5.0), SpoolStatus::Retired);
    }
}
