//! In-memory repository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::{AuditRecord, ClosureRecord, Spool};

use super::dataset::{Dataset, ImportStats};
use super::error::Result;
use super::{SpoolRepository, latest_completed};

#[derive(Debug, Default)]
struct Tables {
    spools: HashMap<String, Spool>,
    audits: Vec<AuditRecord>,
    closures: Vec<ClosureRecord>,
}

/// Repository holding every record in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-loaded with a dataset
    pub fn from_dataset(dataset: Dataset) -> Self {
        let tables = Tables {
            spools: dataset
                .spools
                .into_iter()
                .map(|s| (s.serial_number.clone(), s))
                .collect(),
            audits: dataset.audits,
            closures: dataset.closures,
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn insert_spool(&self, spool: Spool) {
        let mut tables = self.tables.write().await;
        tables.spools.insert(spool.serial_number.clone(), spool);
    }

    pub async fn insert_audit(&self, audit: AuditRecord) {
        self.tables.write().await.audits.push(audit);
    }

    pub async fn insert_closure(&self, closure: ClosureRecord) {
        self.tables.write().await.closures.push(closure);
    }

    pub async fn import(&self, dataset: Dataset) -> ImportStats {
        let stats = dataset.stats();
        let mut tables = self.tables.write().await;
        for spool in dataset.spools {
            tables.spools.insert(spool.serial_number.clone(), spool);
        }
        tables.audits.extend(dataset.audits);
        tables.closures.extend(dataset.closures);
        stats
    }
}

#[async_trait]
impl SpoolRepository for MemoryStore {
    async fn find_spool(&self, serial: &str) -> Result<Option<Spool>> {
        Ok(self.tables.read().await.spools.get(serial).cloned())
    }

    async fn find_latest_completed_audit(&self, serial: &str) -> Result<Option<AuditRecord>> {
        let tables = self.tables.read().await;
        let mut latest = latest_completed(tables.audits.iter().filter(|a| a.spool_serial == serial));
        Ok(latest.remove(serial))
    }

    async fn find_closures_after(
        &self,
        serial: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .closures
            .iter()
            .filter(|c| c.references(serial) && c.created_at > after)
            .cloned()
            .collect())
    }

    async fn find_spool_closures_between(
        &self,
        serial: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .closures
            .iter()
            .filter(|c| c.references(serial) && c.created_at >= from && c.created_at <= to)
            .cloned()
            .collect())
    }

    async fn find_closures_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>> {
        let tables = self.tables.read().await;
        let mut closures: Vec<ClosureRecord> = tables
            .closures
            .iter()
            .filter(|c| c.created_at >= from && c.created_at <= to)
            .cloned()
            .collect();
        closures.sort_by_key(|c| c.created_at);
        Ok(closures)
    }

    async fn find_spools(&self, serials: &[String]) -> Result<HashMap<String, Spool>> {
        let tables = self.tables.read().await;
        Ok(serials
            .iter()
            .filter_map(|serial| {
                tables
                    .spools
                    .get(serial)
                    .map(|spool| (serial.clone(), spool.clone()))
            })
            .collect())
    }

    async fn find_latest_completed_audits(
        &self,
        serials: &[String],
    ) -> Result<HashMap<String, AuditRecord>> {
        let tables = self.tables.read().await;
        Ok(latest_completed(
            tables.audits.iter().filter(|a| serials.contains(&a.spool_serial)),
        ))
    }
}
