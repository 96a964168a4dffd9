//! Pure helpers shared by the request handlers

use chrono::{DateTime, NaiveDate, Utc};

use super::error::ApiError;
use super::validation::RequestValidationError;
use crate::ledger::ReportWindow;

/// Inclusive window from explicit bounds; rejects `from > to`
pub fn window_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<ReportWindow, ApiError> {
    if from > to {
        return Err(RequestValidationError::InvertedWindow {
            from: from.to_rfc3339(),
            to: to.to_rfc3339(),
        }
        .into());
    }
    Ok(ReportWindow { from, to })
}

/// Local day window for the daily report
pub fn day_window(date: NaiveDate, utc_offset_minutes: i32) -> Result<ReportWindow, ApiError> {
    ReportWindow::for_day(date, utc_offset_minutes)
        .ok_or_else(|| ApiError::InvalidPayload(format!("date {date} cannot be reported")))
}

/// Blank team filters mean "all teams"
pub fn team_filter(team: Option<&str>) -> Option<&str> {
    team.map(str::trim).filter(|t| !t.is_empty())
}
