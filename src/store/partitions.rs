//! Key layout and encoding utilities for Fjall partitions
//!
//! Partition structure:
//! - `spools`: spool:{serial} -> Spool (JSON)
//! - `audits`: audit:{serial}:{ts}:{audit_id} -> AuditRecord (JSON)
//! - `closures`: closure:{ts}:{id} -> ClosureRecord (JSON)
//! - `spool_closures`: spool_closure:{serial}:{ts}:{id} -> ClosureRecord (JSON)
//!
//! Serials may themselves contain `:`, so a prefix scan for `A` also walks the
//! keys of `A:B`. Callers filter on the decoded record's serial.
use chrono::{DateTime, Utc};
use uuid::Uuid;

const SIGN_BIT: u64 = 1 << 63;

/// Upper bound suffix for a range scan; sorts after every digit and uuid char
const RANGE_END: &str = "~";

/// Encode a timestamp as a fixed-width decimal that sorts chronologically,
/// pre-epoch values included
pub fn encode_ts(at: DateTime<Utc>) -> String {
    let micros = at.timestamp_micros();
    format!("{:020}", (micros as u64) ^ SIGN_BIT)
}

/// Decode a timestamp produced by [`encode_ts`] (microsecond precision)
pub fn decode_ts(encoded: &str) -> Option<DateTime<Utc>> {
    let raw: u64 = encoded.parse().ok()?;
    DateTime::from_timestamp_micros((raw ^ SIGN_BIT) as i64)
}

/// Encode a spool key: spool:{serial}
pub fn encode_spool_key(serial: &str) -> Vec<u8> {
    format!("spool:{}", serial).into_bytes()
}

/// Encode an audit key: audit:{serial}:{ts}:{audit_id}
pub fn encode_audit_key(serial: &str, at: DateTime<Utc>, audit_id: &Uuid) -> Vec<u8> {
    format!("audit:{}:{}:{}", serial, encode_ts(at), audit_id).into_bytes()
}

/// Encode an audit prefix for a spool scan: audit:{serial}:
pub fn encode_audit_prefix(serial: &str) -> Vec<u8> {
    format!("audit:{}:", serial).into_bytes()
}

/// Encode a closure key: closure:{ts}:{id}
pub fn encode_closure_key(at: DateTime<Utc>, id: &Uuid) -> Vec<u8> {
    format!("closure:{}:{}", encode_ts(at), id).into_bytes()
}

/// Key range covering every closure from `from` through `to`
pub fn encode_closure_range(from: DateTime<Utc>, to: DateTime<Utc>) -> (Vec<u8>, Vec<u8>) {
    (
        format!("closure:{}", encode_ts(from)).into_bytes(),
        format!("closure:{}:{}", encode_ts(to), RANGE_END).into_bytes(),
    )
}

/// Encode a per-spool closure key: spool_closure:{serial}:{ts}:{id}
pub fn encode_spool_closure_key(serial: &str, at: DateTime<Utc>, id: &Uuid) -> Vec<u8> {
    format!("spool_closure:{}:{}:{}", serial, encode_ts(at), id).into_bytes()
}

/// Key range covering a spool's closures from `from` through `to`.
/// `to = None` leaves the range open-ended.
pub fn encode_spool_closure_range(
    serial: &str,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
) -> (Vec<u8>, Vec<u8>) {
    let start = format!("spool_closure:{}:{}", serial, encode_ts(from));
    let end = match to {
        Some(to) => format!("spool_closure:{}:{}:{}", serial, encode_ts(to), RANGE_END),
        None => format!("spool_closure:{}:{}", serial, RANGE_END),
    };
    (start.into_bytes(), end.into_bytes())
}

/// Decode a per-spool closure key -> (serial, timestamp, closure id)
pub fn decode_spool_closure_key(key: &[u8]) -> Option<(String, DateTime<Utc>, Uuid)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let rest = key_str.strip_prefix("spool_closure:")?;
    let mut parts = rest.rsplitn(3, ':');
    let id = Uuid::parse_str(parts.next()?).ok()?;
    let at = decode_ts(parts.next()?)?;
    let serial = parts.next()?.to_string();
    Some((serial, at, id))
}
