use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::Serialize;
use tracing::{debug, info};

use crate::model::{AuditRecord, ClosureRecord, Spool};

use super::dataset::{Dataset, ImportStats};
use super::error::Result;
use super::partitions::{
    decode_spool_closure_key, encode_audit_key, encode_audit_prefix, encode_closure_key,
    encode_closure_range, encode_spool_closure_key, encode_spool_closure_range, encode_spool_key,
};
use super::{SpoolRepository, latest_completed};

/// Fjall-backed persistent storage for spools, audits and closures
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    spools: PartitionHandle,
    audits: PartitionHandle,
    closures: PartitionHandle,
    spool_closures: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let spools = keyspace.open_partition("spools", PartitionCreateOptions::default())?;
        let audits = keyspace.open_partition("audits", PartitionCreateOptions::default())?;
        let closures = keyspace.open_partition("closures", PartitionCreateOptions::default())?;
        let spool_closures =
            keyspace.open_partition("spool_closures", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            spools,
            audits,
            closures,
            spool_closures,
        })
    }

    /// Register or overwrite a spool
    pub fn put_spool(&self, spool: &Spool) -> Result<()> {
        let key = encode_spool_key(&spool.serial_number);
        self.spools.insert(key, serde_json::to_vec(spool)?)?;
        debug!("Stored spool: {}", spool.serial_number);
        Ok(())
    }

    /// Record one audit line
    pub fn put_audit(&self, audit: &AuditRecord) -> Result<()> {
        let key = encode_audit_key(&audit.spool_serial, audit.audited_at, &audit.audit_id);
        self.audits.insert(key, serde_json::to_vec(audit)?)?;
        debug!(
            "Stored audit {} for spool {}",
            audit.audit_id, audit.spool_serial
        );
        Ok(())
    }

    /// Record a closure, indexing it under its spool when it has one
    pub fn put_closure(&self, closure: &ClosureRecord) -> Result<()> {
        let value = serde_json::to_vec(closure)?;
        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.closures,
            encode_closure_key(closure.created_at, &closure.id),
            value.clone(),
        );
        if let Some(serial) = &closure.spool_serial {
            batch.insert(
                &self.spool_closures,
                encode_spool_closure_key(serial, closure.created_at, &closure.id),
                value,
            );
        }
        batch.commit()?;
        debug!("Stored closure: {}", closure.id);
        Ok(())
    }

    /// Write every record of a dataset
    pub fn import(&self, dataset: &Dataset) -> Result<ImportStats> {
        info!(
            spools = dataset.spools.len(),
            audits = dataset.audits.len(),
            closures = dataset.closures.len(),
            "Importing dataset"
        );
        for spool in &dataset.spools {
            self.put_spool(spool)?;
        }
        for audit in &dataset.audits {
            self.put_audit(audit)?;
        }
        for closure in &dataset.closures {
            self.put_closure(closure)?;
        }
        self.persist()?;
        Ok(dataset.stats())
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Cheap read used by the health check
    pub fn ping(&self) -> Result<()> {
        self.spools.first_key_value()?;
        Ok(())
    }

    /// Record counts per partition (full scan)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut spool_count = 0;
        let mut audit_count = 0;
        let mut closure_count = 0;

        for item in self.spools.iter() {
            item?;
            spool_count += 1;
        }

        for item in self.audits.iter() {
            item?;
            audit_count += 1;
        }

        for item in self.closures.iter() {
            item?;
            closure_count += 1;
        }

        Ok(StoreStats {
            spool_count,
            audit_count,
            closure_count,
        })
    }

    fn scan_spool_closures(
        &self,
        serial: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ClosureRecord>> {
        let (start, end) = encode_spool_closure_range(serial, from, to);
        let mut closures = Vec::new();
        for item in self.spool_closures.range(start..end) {
            let (key, value) = item?;
            // Skip neighbours whose serial merely shares our prefix
            match decode_spool_closure_key(&key) {
                Some((key_serial, _, _)) if key_serial == serial => {}
                _ => continue,
            }
            closures.push(serde_json::from_slice(&value)?);
        }
        Ok(closures)
    }
}

#[async_trait]
impl SpoolRepository for FjallStore {
    async fn find_spool(&self, serial: &str) -> Result<Option<Spool>> {
        match self.spools.get(encode_spool_key(serial))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn find_latest_completed_audit(&self, serial: &str) -> Result<Option<AuditRecord>> {
        let mut latest: Option<AuditRecord> = None;
        for item in self.audits.prefix(encode_audit_prefix(serial)) {
            let (_, value) = item?;
            let audit: AuditRecord = serde_json::from_slice(&value)?;
            if audit.spool_serial != serial || !audit.is_completed() {
                continue;
            }
            if latest
                .as_ref()
                .is_none_or(|current| audit.audited_at >= current.audited_at)
            {
                latest = Some(audit);
            }
        }
        Ok(latest)
    }

    async fn find_closures_after(
        &self,
        serial: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>> {
        let closures = self
            .scan_spool_closures(serial, after, None)?
            .into_iter()
            .filter(|c| c.created_at > after)
            .collect();
        Ok(closures)
    }

    async fn find_spool_closures_between(
        &self,
        serial: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>> {
        if from > to {
            return Ok(Vec::new());
        }
        let closures = self
            .scan_spool_closures(serial, from, Some(to))?
            .into_iter()
            .filter(|c| c.created_at >= from && c.created_at <= to)
            .collect();
        Ok(closures)
    }

    async fn find_closures_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClosureRecord>> {
        if from > to {
            return Ok(Vec::new());
        }
        let (start, end) = encode_closure_range(from, to);
        let mut closures = Vec::new();
        for item in self.closures.range(start..end) {
            let (_, value) = item?;
            let closure: ClosureRecord = serde_json::from_slice(&value)?;
            if closure.created_at >= from && closure.created_at <= to {
                closures.push(closure);
            }
        }
        Ok(closures)
    }

    /// One pass over the audit partition for the whole batch
    async fn find_latest_completed_audits(
        &self,
        serials: &[String],
    ) -> Result<HashMap<String, AuditRecord>> {
        let wanted: HashSet<&str> = serials.iter().map(String::as_str).collect();
        let mut matching = Vec::new();
        for item in self.audits.iter() {
            let (_, value) = item?;
            let audit: AuditRecord = serde_json::from_slice(&value)?;
            if wanted.contains(audit.spool_serial.as_str()) {
                matching.push(audit);
            }
        }
        Ok(latest_completed(&matching))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub spool_count: usize,
    pub audit_count: usize,
    pub closure_count: usize,
}
