//! Reports built on top of the ledger
//!
//! - daily spool usage for a crew (the end-of-day installation report)
//! - usage of a spool during one assignment (spool history)
//! - audit reconciliation sheet: expected vs physically counted meters

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::SpoolRepository;

use super::error::Result;
use super::spool_ledger::{BatchOutcome, SpoolLedger, UsageTally};

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportWindow {
    /// Local calendar day at a fixed UTC offset. `None` if the offset is out of
    /// range or the day cannot be represented.
    pub fn for_day(date: NaiveDate, utc_offset_minutes: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
        let start = offset
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .single()?
            .with_timezone(&Utc);
        let to = start + TimeDelta::days(1) - TimeDelta::nanoseconds(1);
        Some(Self { from: start, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at <= self.to
    }
}

/// One spool line of the daily report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpoolLine {
    pub serial: String,
    pub used: f64,
    pub wasted: f64,
    /// `used + wasted` inside the window
    pub consumed: f64,
    pub closures: usize,
    /// Current remaining length; `None` when the spool is not registered
    pub remaining: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpoolReport {
    pub window: ReportWindow,
    pub team: Option<String>,
    pub closures_total: usize,
    pub closures_without_spool: usize,
    pub spools: Vec<DailySpoolLine>,
}

/// Cable drawn from a spool while it was assigned to a crew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentUsage {
    pub serial: String,
    pub window: ReportWindow,
    pub initial_quantity: f64,
    pub used: f64,
    pub wasted: f64,
    pub closures: usize,
    pub remaining: f64,
}

/// A physical count taken during an audit. The count may still be missing
/// while the audit is being filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalCount {
    pub serial: String,
    #[serde(default)]
    pub physical_quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationLine {
    Counted {
        serial: String,
        baseline_quantity: f64,
        usage_since_base: f64,
        expected_quantity: f64,
        physical_quantity: Option<f64>,
        /// `physical - expected`; negative means cable is missing
        discrepancy: Option<f64>,
    },
    NotFound {
        serial: String,
        physical_quantity: Option<f64>,
    },
}

impl<R: SpoolRepository> SpoolLedger<R> {
    /// Per-spool consumption for the closures inside `window`, optionally
    /// limited to one crew, with each spool's current remaining length.
    ///
    /// Each degraded reading is reported once: window closures after the
    /// spool's baseline were already counted by the remaining computation.
    pub async fn daily_report(
        &self,
        window: ReportWindow,
        team: Option<&str>,
    ) -> Result<DailySpoolReport> {
        let closures: Vec<_> = self
            .repository()
            .find_closures_between(window.from, window.to)
            .await?
            .into_iter()
            .filter(|c| team.is_none() || c.team.as_deref() == team)
            .collect();

        let mut by_spool: BTreeMap<String, Vec<_>> = BTreeMap::new();
        let mut closures_without_spool = 0;
        for closure in &closures {
            match &closure.spool_serial {
                Some(serial) => by_spool.entry(serial.clone()).or_default().push(closure),
                None => closures_without_spool += 1,
            }
        }

        let serials: Vec<String> = by_spool.keys().cloned().collect();
        let remaining: HashMap<String, (f64, DateTime<Utc>)> = self
            .batch_remaining(&serials)
            .await?
            .iter()
            .filter_map(BatchOutcome::resolved)
            .map(|r| (r.serial.clone(), (r.current_quantity, r.baseline_date)))
            .collect();

        let spools = by_spool
            .into_iter()
            .map(|(serial, closures)| {
                let resolved = remaining.get(&serial).copied();
                let (since_baseline, before_baseline): (Vec<_>, Vec<_>) = closures
                    .into_iter()
                    .partition(|c| resolved.is_some_and(|(_, as_of)| c.created_at > as_of));

                let fresh = UsageTally::from_closures(before_baseline);
                self.record_degraded(&fresh);
                let tally = fresh.merge(UsageTally::from_closures_quiet(since_baseline));
                DailySpoolLine {
                    remaining: resolved.map(|(quantity, _)| quantity),
                    serial,
                    used: tally.used,
                    wasted: tally.wasted,
                    consumed: tally.total(),
                    closures: tally.closures,
                }
            })
            .collect::<Vec<_>>();

        info!(
            from = %window.from,
            to = %window.to,
            team = team.unwrap_or("*"),
            spools = spools.len(),
            "Built daily spool report"
        );

        Ok(DailySpoolReport {
            window,
            team: team.map(str::to_string),
            closures_total: closures.len(),
            closures_without_spool,
            spools,
        })
    }

    /// Usage of one spool with `from <= created_at <= to`, measured against the
    /// quantity handed to the crew
    pub async fn assignment_usage(
        &self,
        serial: &str,
        initial_quantity: f64,
        window: ReportWindow,
    ) -> Result<AssignmentUsage> {
        let closures = self
            .repository()
            .find_spool_closures_between(serial, window.from, window.to)
            .await?;
        let tally = UsageTally::from_closures(&closures);
        self.record_degraded(&tally);

        Ok(AssignmentUsage {
            serial: serial.to_string(),
            window,
            initial_quantity,
            used: tally.used,
            wasted: tally.wasted,
            closures: tally.closures,
            remaining: initial_quantity - tally.used - tally.wasted,
        })
    }

    /// Compare physical counts against what the ledger expects on each reel
    pub async fn reconcile(&self, counts: &[PhysicalCount]) -> Result<Vec<ReconciliationLine>> {
        let serials: Vec<String> = counts.iter().map(|c| c.serial.clone()).collect();
        let outcomes: HashMap<String, BatchOutcome> = self
            .batch_remaining(&serials)
            .await?
            .into_iter()
            .map(|o| (o.serial().to_string(), o))
            .collect();

        let lines = counts
            .iter()
            .map(|count| match outcomes.get(&count.serial).and_then(BatchOutcome::resolved) {
                Some(remaining) => ReconciliationLine::Counted {
                    serial: count.serial.clone(),
                    baseline_quantity: remaining.baseline_quantity,
                    usage_since_base: remaining.usage_since_base,
                    expected_quantity: remaining.current_quantity,
                    physical_quantity: count.physical_quantity,
                    discrepancy: count
                        .physical_quantity
                        .map(|physical| physical - remaining.current_quantity),
                },
                None => ReconciliationLine::NotFound {
                    serial: count.serial.clone(),
                    physical_quantity: count.physical_quantity,
                },
            })
            .collect();
        Ok(lines)
    }
}
