//! JSON dataset used to seed a store
//!
//! ```json
//! {
//!   "spools":   [{ "serial_number": "CAR-001", "initial_quantity": 1000, "created_at": "2026-01-05T08:00:00Z" }],
//!   "audits":   [{ "audit_id": "...", "spool_serial": "CAR-001", "physical_quantity": 800, "audited_at": "...", "status": "COMPLETED" }],
//!   "closures": [{ "id": "...", "spool_serial": "CAR-001", "meters_used": "120m", "meters_wasted": "5", "created_at": "..." }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{AuditRecord, ClosureRecord, Spool};

use super::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub spools: Vec<Spool>,
    #[serde(default)]
    pub audits: Vec<AuditRecord>,
    #[serde(default)]
    pub closures: Vec<ClosureRecord>,
}

/// Record counts written by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub spools: usize,
    pub audits: usize,
    pub closures: usize,
}

impl Dataset {
    /// Read a dataset from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn stats(&self) -> ImportStats {
        ImportStats {
            spools: self.spools.len(),
            audits: self.audits.len(),
            closures: self.closures.len(),
        }
    }
}
