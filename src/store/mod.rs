//! Read access to spool, audit and closure records
//!
//! The ledger never talks to a database directly. It goes through
//! [`SpoolRepository`], which has two backends in this crate:
//!
//! - [`FjallStore`]: embedded LSM key-value store used by the server and CLI
//! - [`MemoryStore`]: maps behind a lock, for tests and tooling
//!
//! ## Partition layout (Fjall)
//!
//! - `spools`: `spool:{serial}` -> Spool (JSON)
//! - `audits`: `audit:{serial}:{ts}:{audit_id}` -> AuditRecord (JSON)
//! - `closures`: `closure:{ts}:{id}` -> ClosureRecord (JSON)
//! - `spool_closures`: `spool_closure:{serial}:{ts}:{id}` -> ClosureRecord (JSON)
//!
//! `{ts}` is a sortable encoding of the record timestamp, so prefix scans come
//! back in chronological order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spoolbox::store::{FjallStore, SpoolRepository};
//!
//! let store = FjallStore::open("data/spools")?;
//! let spool = store.find_spool("CAR-0001").await?;
//! ```
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{AuditRecord, ClosureRecord, Spool};

pub mod dataset;
pub mod error;
pub mod fjall_store;
pub mod memory;
pub mod partitions;

pub use dataset::{Dataset, ImportStats};
pub use error::{Result, StoreError};
pub use fjall_store::{FjallStore, StoreStats};
pub use memory::MemoryStore;

/// Query capabilities the ledger needs from the durable store
#[async_trait]
pub trait SpoolRepository: Send + Sync {
    /// Look up a registered spool
    async fn find_spool(&self, serial: &str) -> Result<Option<Spool>>;

    /// Most recent COMPLETED audit line for a spool, by `audited_at`
    async fn find_latest_completed_audit(&self, serial: &str) -> Result<Option<AuditRecord>>;

    /// Closures of a spool created strictly after `after`
    async fn find_closures_after(
        &self,
        serial: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>>;

    /// Closures of a spool with `from <= created_at <= to`
    async fn find_spool_closures_between(
        &self,
        serial: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>>;

    /// All closures with `from <= created_at <= to`, with or without a spool
    async fn find_closures_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>>;

    /// Batch spool lookup. Unknown serials are absent from the map.
    async fn find_spools(&self, serials: &[String]) -> Result<HashMap<String, Spool>> {
        let mut found = HashMap::with_capacity(serials.len());
        for serial in serials {
            if let Some(spool) = self.find_spool(serial).await? {
                found.insert(serial.clone(), spool);
            }
        }
        Ok(found)
    }

    /// Batch baseline lookup. Serials without a completed audit are absent.
    async fn find_latest_completed_audits(
        &self,
        serials: &[String],
    ) -> Result<HashMap<String, AuditRecord>> {
        let mut found = HashMap::with_capacity(serials.len());
        for serial in serials {
            if let Some(audit) = self.find_latest_completed_audit(serial).await? {
                found.insert(serial.clone(), audit);
            }
        }
        Ok(found)
    }
}

/// Keep the latest completed audit per serial, ties resolved by the later entry
pub(crate) fn latest_completed<'a, I>(audits: I) -> HashMap<String, AuditRecord>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let mut latest: HashMap<String, AuditRecord> = HashMap::new();
    for audit in audits.into_iter().filter(|a| a.is_completed()) {
        match latest.get(&audit.spool_serial) {
            Some(current) if current.audited_at > audit.audited_at => {}
            _ => {
                latest.insert(audit.spool_serial.clone(), audit.clone());
            }
        }
    }
    latest
}
