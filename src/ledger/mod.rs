//! Spool consumption accounting
//!
//! The remaining length of a spool is never stored. It is recomputed on
//! demand from two record streams:
//!
//! - **Baseline**: the latest COMPLETED audit of the spool, or its
//!   registration quantity and date when it was never audited
//! - **Usage**: every closure against the spool created strictly after the
//!   baseline timestamp, `used + wasted` meters each
//!
//! `current = baseline - usage`. The result is not clamped; a negative value
//! means somebody mis-typed a reading or skipped a recount, and operators need
//! to see that.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spoolbox::ledger::SpoolLedger;
//! use spoolbox::store::FjallStore;
//!
//! let ledger = SpoolLedger::new(FjallStore::open("data/spools")?);
//! let remaining = ledger.get_remaining("CAR-001").await?;
//! println!("{} m left", remaining.current_quantity);
//! ```

pub mod error;
pub mod report;
pub mod spool_ledger;

pub use error::{LedgerError, Result};
pub use report::{
    AssignmentUsage, DailySpoolLine, DailySpoolReport, PhysicalCount, ReconciliationLine,
    ReportWindow,
};
pub use spool_ledger::{
    Baseline, BaselineSource, BatchOutcome, SpoolLedger, SpoolRemaining, UsageTally,
    suggest_status, tally_usage,
};
