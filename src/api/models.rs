//! Request and response bodies of the HTTP API
//!
//! Ledger types (`Baseline`, `SpoolRemaining`, `BatchOutcome`, reports) are
//! serialized as-is; this module only adds the envelopes around them.
//!
//! Batch request:
//!
//! ```json
//! { "serials": ["CAR-001", "CAR-002"] }
//! ```
//!
//! Reconciliation request:
//!
//! ```json
//! { "counts": [{ "serial": "CAR-001", "physical_quantity": 412.5 }] }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{BatchOutcome, PhysicalCount, ReconciliationLine};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BatchRemainingRequest {
    pub serials: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchRemainingResponse {
    pub results: Vec<BatchOutcome>,
    pub not_found: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsageQuery {
    pub since: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UsageResponse {
    pub serial: String,
    pub since: DateTime<Utc>,
    pub used: f64,
    pub wasted: f64,
    pub total: f64,
    pub closures: usize,
    pub degraded_readings: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssignmentQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub initial_quantity: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DailyReportQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconciliationRequest {
    pub counts: Vec<PhysicalCount>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReconciliationResponse {
    pub lines: Vec<ReconciliationLine>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
}
