//! Spool, audit and closure records
//!
//! These mirror the rows the portal keeps in its relational backend. The
//! ledger only ever reads them.

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a spool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpoolStatus {
    #[default]
    Available,
    Assigned,
    Depleted,
    Retired,
}

/// A registered reel of fiber cable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct Spool {
    #[builder(into)]
    pub serial_number: String,
    /// Meters on the reel at registration
    pub initial_quantity: f64,
    #[builder(default)]
    #[serde(default)]
    pub status: SpoolStatus,
    pub created_at: DateTime<Utc>,
}

/// Audit batches stay PENDING while technicians are still counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    #[default]
    Pending,
    Completed,
}

/// One spool line of a physical recount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct AuditRecord {
    /// Audit batch this line belongs to
    #[builder(default = Uuid::now_v7())]
    pub audit_id: Uuid,
    #[builder(into)]
    pub spool_serial: String,
    /// Meters physically measured on the reel
    pub physical_quantity: f64,
    pub audited_at: DateTime<Utc>,
    #[builder(default)]
    #[serde(default)]
    pub status: AuditStatus,
    #[builder(into)]
    #[serde(default)]
    pub team: Option<String>,
}

impl AuditRecord {
    pub fn is_completed(&self) -> bool {
        self.status == AuditStatus::Completed
    }
}

/// A completed field job and the cable it consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct ClosureRecord {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,
    #[builder(into)]
    #[serde(default)]
    pub spool_serial: Option<String>,
    /// Free text as typed by the technician
    #[builder(into)]
    #[serde(default)]
    pub meters_used: Option<String>,
    #[builder(into)]
    #[serde(default)]
    pub meters_wasted: Option<String>,
    #[builder(into)]
    #[serde(default)]
    pub team: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClosureRecord {
    pub fn references(&self, serial: &str) -> bool {
        self.spool_serial.as_deref() == Some(serial)
    }
}
