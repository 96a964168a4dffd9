//! Free-text meter readings
//!
//! Closures record cable usage as whatever the technician typed: `"150"`,
//! `"150m"`, `"150 mts"`, sometimes garbage. Every character that is not an
//! ASCII digit or `.` is dropped before parsing; anything that still fails to
//! parse into a finite number counts as zero.

use std::fmt;

/// Outcome of interpreting one free-text reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Missing or blank input. Contributes zero and is not worth a warning.
    Empty,
    /// Input was already a plain number
    Clean(f64),
    /// Number recovered after stripping units or other noise
    Stripped(f64),
    /// Non-blank input that did not survive sanitization
    Unparsable,
}

impl Reading {
    /// Meters this reading contributes to a sum
    pub fn meters(&self) -> f64 {
        match self {
            Reading::Clean(value) | Reading::Stripped(value) => *value,
            Reading::Empty | Reading::Unparsable => 0.0,
        }
    }

    /// True when a non-blank reading degraded to zero
    pub fn is_degraded(&self) -> bool {
        matches!(self, Reading::Unparsable)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Empty => f.write_str("empty"),
            Reading::Clean(value) => write!(f, "{}m", value),
            Reading::Stripped(value) => write!(f, "{}m (stripped)", value),
            Reading::Unparsable => f.write_str("unparsable"),
        }
    }
}

/// Classify a raw reading. `None` stands for a missing column value.
pub fn parse_reading(raw: Option<&str>) -> Reading {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Reading::Empty,
    };

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if cleaned == raw {
                Reading::Clean(value)
            } else {
                Reading::Stripped(value)
            }
        }
        _ => Reading::Unparsable,
    }
}

/// Sanitize a free-text reading into non-negative meters
///
/// ```
/// use spoolbox::meters::sanitize;
///
/// assert_eq!(sanitize("150m"), 150.0);
/// assert_eq!(sanitize("abc"), 0.0);
/// ```
pub fn sanitize(raw: &str) -> f64 {
    parse_reading(Some(raw)).meters()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize("150m"), 150.0);
        assert_eq!(sanitize("abc"), 0.0);
        assert_eq!(sanitize(""), 0.0);
        assert_eq!(sanitize("12.5"), 12.5);
    }

    #[test]
    fn test_sanitize_strips_sign_and_spaces() {
        // The minus sign is noise like any other character
        assert_eq!(sanitize("-5"), 5.0);
        assert_eq!(sanitize(" 1 200 mts "), 1200.0);
    }

    #[test]
    fn test_sanitize_multiple_dots_is_zero() {
        assert_eq!(sanitize("1.2.3"), 0.0);
        assert_eq!(sanitize("."), 0.0);
    }

    #[test]
    fn test_sanitize_overflow_is_zero() {
        let huge = "9".repeat(400);
        assert_eq!(sanitize(&huge), 0.0);
    }

    #[test]
    fn test_parse_reading_classification() {
        assert_eq!(parse_reading(None), Reading::Empty);
        assert_eq!(parse_reading(Some("   ")), Reading::Empty);
        assert_eq!(parse_reading(Some("40")), Reading::Clean(40.0));
        assert_eq!(parse_reading(Some("40m")), Reading::Stripped(40.0));
        assert_eq!(parse_reading(Some("n/a")), Reading::Unparsable);
    }

    #[test]
    fn test_only_unparsable_is_degraded() {
        assert!(parse_reading(Some("??")).is_degraded());
        assert!(!parse_reading(None).is_degraded());
        assert!(!parse_reading(Some("7 m")).is_degraded());
    }
}
