use thiserror::Error;

use crate::ledger::PhysicalCount;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("{field} must contain at least one serial")]
    Empty { field: &'static str },
    #[error("{field} holds {count} entries, limit is {limit}")]
    TooMany {
        field: &'static str,
        count: usize,
        limit: usize,
    },
    #[error("{field}[{index}] is blank")]
    BlankSerial { field: &'static str, index: usize },
    #[error("counts[{index}].physical_quantity must be a finite number")]
    NonFiniteCount { index: usize },
    #[error("window start {from} is after its end {to}")]
    InvertedWindow { from: String, to: String },
}

fn check_len(field: &'static str, count: usize, limit: usize) -> Result<(), RequestValidationError> {
    if count == 0 {
        return Err(RequestValidationError::Empty { field });
    }
    if count > limit {
        return Err(RequestValidationError::TooMany { field, count, limit });
    }
    Ok(())
}

/// Trim serials and enforce the batch limit
pub fn normalize_serials(
    serials: Vec<String>,
    limit: usize,
) -> Result<Vec<String>, RequestValidationError> {
    check_len("serials", serials.len(), limit)?;
    serials
        .into_iter()
        .enumerate()
        .map(|(index, serial)| {
            let trimmed = serial.trim();
            if trimmed.is_empty() {
                Err(RequestValidationError::BlankSerial {
                    field: "serials",
                    index,
                })
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

/// Same rules as [`normalize_serials`], plus finite physical counts
pub fn normalize_counts(
    counts: Vec<PhysicalCount>,
    limit: usize,
) -> Result<Vec<PhysicalCount>, RequestValidationError> {
    check_len("counts", counts.len(), limit)?;
    counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| {
            let serial = count.serial.trim();
            if serial.is_empty() {
                return Err(RequestValidationError::BlankSerial {
                    field: "counts",
                    index,
                });
            }
            if count.physical_quantity.is_some_and(|q| !q.is_finite()) {
                return Err(RequestValidationError::NonFiniteCount { index });
            }
            Ok(PhysicalCount {
                serial: serial.to_string(),
                physical_quantity: count.physical_quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serials(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_serials_are_trimmed() {
        let result = normalize_serials(serials(&[" CAR-001 ", "CAR-002"]), 10).unwrap();
        assert_eq!(result, serials(&["CAR-001", "CAR-002"]));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert_eq!(
            normalize_serials(Vec::new(), 10),
            Err(RequestValidationError::Empty { field: "serials" })
        );
    }

    #[test]
    fn test_batch_limit() {
        let result = normalize_serials(serials(&["A", "B", "C"]), 2);
        assert_eq!(
            result,
            Err(RequestValidationError::TooMany {
                field: "serials",
                count: 3,
                limit: 2
            })
        );
    }

    #[test]
    fn test_blank_serial_reports_index() {
        let result = normalize_serials(serials(&["A", "  "]), 10);
        assert_eq!(
            result,
            Err(RequestValidationError::BlankSerial {
                field: "serials",
                index: 1
            })
        );
    }

    #[test]
    fn test_counts_keep_missing_quantity() {
        let counts = vec![PhysicalCount {
            serial: " CAR-001".to_string(),
            physical_quantity: None,
        }];
        let result = normalize_counts(counts, 10).unwrap();
        assert_eq!(result[0].serial, "CAR-001");
        assert_eq!(result[0].physical_quantity, None);
    }
}
