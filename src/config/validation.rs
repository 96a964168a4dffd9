use super::models::Config;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Largest offset any real time zone uses (UTC+14)
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.api.max_batch_serials must be positive")]
    ZeroBatchLimit,

    #[error("server.api.max_payload_bytes must be positive")]
    ZeroPayloadLimit,

    #[error("store.fjall_path must not be empty")]
    EmptyStorePath,

    #[error("report.utc_offset_minutes out of range: {0} (limit ±840)")]
    UtcOffsetOutOfRange(i32),

    #[error("telemetry.log_filter '{filter}' is invalid: {reason}")]
    InvalidLogFilter { filter: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api_limits(config)?;
    validate_store(config)?;
    validate_report(config)?;
    validate_telemetry(config)?;
    Ok(())
}

fn validate_api_limits(config: &Config) -> Result<(), ValidationError> {
    if config.server.api.max_batch_serials == 0 {
        return Err(ValidationError::ZeroBatchLimit);
    }
    if config.server.api.max_payload_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroPayloadLimit);
    }
    Ok(())
}

fn validate_store(config: &Config) -> Result<(), ValidationError> {
    if config.store.fjall_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyStorePath);
    }
    Ok(())
}

fn validate_report(config: &Config) -> Result<(), ValidationError> {
    let offset = config.report.utc_offset_minutes;
    if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&offset) {
        return Err(ValidationError::UtcOffsetOutOfRange(offset));
    }
    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    let filter = &config.telemetry.log_filter;
    EnvFilter::try_new(filter).map_err(|e| ValidationError::InvalidLogFilter {
        filter: filter.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}
