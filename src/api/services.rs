use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};

use super::{
    models::{
        AssignmentQuery, BatchRemainingRequest, BatchRemainingResponse, DailyReportQuery,
        HealthResponse, ReconciliationRequest, ReconciliationResponse, UsageQuery, UsageResponse,
    },
    state::AppState,
    utils, validation,
};
use crate::api::error::ApiError;
use crate::ledger::{AssignmentUsage, Baseline, DailySpoolReport, SpoolRemaining};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Baseline of one spool (GET /spools/{serial}/baseline)
pub async fn get_baseline(
    State(state): State<AppState>,
    serial: Result<Path<String>, PathRejection>,
) -> ApiResult<Baseline> {
    let Path(serial) = serial?;
    Ok(Json(state.ledger.get_baseline(&serial).await?))
}

/// Usage since an arbitrary instant (GET /spools/{serial}/usage?since=)
///
/// Does not require the spool to be registered; unknown serials sum to zero.
pub async fn get_usage(
    State(state): State<AppState>,
    serial: Result<Path<String>, PathRejection>,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> ApiResult<UsageResponse> {
    let Path(serial) = serial?;
    let Query(UsageQuery { since }) = query?;

    let tally = state.ledger.sum_usage_since(&serial, since).await?;
    Ok(Json(UsageResponse {
        serial,
        since,
        used: tally.used,
        wasted: tally.wasted,
        total: tally.total(),
        closures: tally.closures,
        degraded_readings: tally.degraded,
    }))
}

/// Remaining length of one spool (GET /spools/{serial}/remaining)
pub async fn get_remaining(
    State(state): State<AppState>,
    serial: Result<Path<String>, PathRejection>,
) -> ApiResult<SpoolRemaining> {
    let Path(serial) = serial?;
    let remaining = state.ledger.get_remaining(&serial).await?;
    if remaining.suggested_status != remaining.status {
        debug!(
            serial = %remaining.serial,
            stored = ?remaining.status,
            suggested = ?remaining.suggested_status,
            "Spool status out of date"
        );
    }
    Ok(Json(remaining))
}

/// Usage during an assignment (GET /spools/{serial}/assignment-usage)
pub async fn get_assignment_usage(
    State(state): State<AppState>,
    serial: Result<Path<String>, PathRejection>,
    query: Result<Query<AssignmentQuery>, QueryRejection>,
) -> ApiResult<AssignmentUsage> {
    let Path(serial) = serial?;
    let Query(query) = query?;
    if !query.initial_quantity.is_finite() {
        return Err(ApiError::InvalidPayload(
            "initial_quantity must be a finite number".to_string(),
        ));
    }

    let window = utils::window_between(query.from, query.to)?;
    let usage = state
        .ledger
        .assignment_usage(&serial, query.initial_quantity, window)
        .await?;
    Ok(Json(usage))
}

/// Remaining length of many spools (POST /spools/remaining)
///
/// Unknown serials come back as `not_found` entries; the call only fails as
/// a whole when the store does.
pub async fn batch_remaining(
    State(state): State<AppState>,
    body: Result<Json<BatchRemainingRequest>, JsonRejection>,
) -> ApiResult<BatchRemainingResponse> {
    let Json(request) = body?;
    let serials =
        validation::normalize_serials(request.serials, state.config.server.api.max_batch_serials)?;

    let results = state.ledger.batch_remaining(&serials).await?;
    let not_found = results.iter().filter(|r| r.resolved().is_none()).count();
    if not_found > 0 {
        warn!(requested = serials.len(), not_found, "Batch contained unknown spools");
    }

    Ok(Json(BatchRemainingResponse { results, not_found }))
}

/// Per-spool usage for one local day (GET /reports/daily?date=&team=)
pub async fn daily_report(
    State(state): State<AppState>,
    query: Result<Query<DailyReportQuery>, QueryRejection>,
) -> ApiResult<DailySpoolReport> {
    let Query(query) = query?;
    let window = utils::day_window(query.date, state.config.report.utc_offset_minutes)?;
    let team = utils::team_filter(query.team.as_deref());

    Ok(Json(state.ledger.daily_report(window, team).await?))
}

/// Expected vs counted meters (POST /reconciliations)
pub async fn reconcile(
    State(state): State<AppState>,
    body: Result<Json<ReconciliationRequest>, JsonRejection>,
) -> ApiResult<ReconciliationResponse> {
    let Json(request) = body?;
    let counts =
        validation::normalize_counts(request.counts, state.config.server.api.max_batch_serials)?;

    let lines = state.ledger.reconcile(&counts).await?;
    Ok(Json(ReconciliationResponse { lines }))
}

/// Counter snapshot (GET /operators/metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Health check endpoint (GET /health)
///
/// Returns 503 Service Unavailable when the store cannot be read.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let store_status = match state.store().ping() {
        Ok(_) => "healthy".to_string(),
        Err(err) => {
            warn!(error = %err, "Store health check failed");
            "unhealthy".to_string()
        }
    };
    components.insert("fjall".to_string(), store_status);

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall_status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
