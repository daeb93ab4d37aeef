//! Data Validator for Transaction Records

use crate::error::{FieldError, ValidationError};
use crate::record::{RawAmount, RawField, RawTransaction, TransactionRecord, TransactionStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Naive timestamp layouts accepted besides RFC 3339 (interpreted as UTC)
const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M",
];

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Amount valid range (currency units)
    pub amount_range: (f64, f64),
    /// Maximum identifier length (bytes)
    pub max_identifier_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            amount_range: (0.0, 1.0e12),
            max_identifier_len: 256,
        }
    }
}

/// Data validator for transaction records
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a boundary record into a [`RawTransaction`].
    ///
    /// All fields are checked; the error lists every missing or malformed one.
    pub fn validate(&self, record: &TransactionRecord) -> Result<RawTransaction, ValidationError> {
        let mut errors = Vec::new();

        let amount = match &record.amount {
            None => {
                errors.push(FieldError::Missing(RawField::Amount));
                None
            }
            Some(raw) => match self.parse_amount(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
        };

        let sender_id = self.take_identifier(RawField::SenderId, &record.sender_id, &mut errors);
        let receiver_id =
            self.take_identifier(RawField::ReceiverId, &record.receiver_id, &mut errors);

        let status = match record.status.as_deref() {
            None => {
                errors.push(FieldError::Missing(RawField::Status));
                None
            }
            Some(label) => {
                let parsed = TransactionStatus::parse(label);
                if parsed.is_none() {
                    errors.push(FieldError::Malformed {
                        field: RawField::Status,
                        reason: format!("unknown status '{}', expected SUCCESS or FAILED", label),
                    });
                }
                parsed
            }
        };

        let timestamp = match record.timestamp.as_deref() {
            None => {
                errors.push(FieldError::Missing(RawField::Timestamp));
                None
            }
            Some(text) => {
                let parsed = parse_timestamp(text);
                if parsed.is_none() {
                    errors.push(FieldError::Malformed {
                        field: RawField::Timestamp,
                        reason: format!("unrecognised timestamp '{}'", text),
                    });
                }
                parsed
            }
        };

        match (amount, sender_id, receiver_id, status, timestamp) {
            (Some(amount), Some(sender_id), Some(receiver_id), Some(status), Some(timestamp))
                if errors.is_empty() =>
            {
                Ok(RawTransaction::from_parts(
                    amount,
                    sender_id,
                    receiver_id,
                    status,
                    timestamp,
                ))
            }
            _ => {
                debug!(fields = ?errors.iter().map(|e| e.field().as_str()).collect::<Vec<_>>(),
                    "Transaction record rejected");
                Err(ValidationError::new(errors))
            }
        }
    }

    /// Parse a boundary amount and check it against the configured range
    pub fn parse_amount(&self, raw: &RawAmount) -> Result<f64, FieldError> {
        let value = match raw {
            RawAmount::Number(value) => *value,
            RawAmount::Text(text) => text.trim().parse::<f64>().map_err(|_| FieldError::Malformed {
                field: RawField::Amount,
                reason: format!("'{}' is not a number", text),
            })?,
        };
        self.validate_amount(value)?;
        Ok(value)
    }

    /// Validate an amount against the configured range
    pub fn validate_amount(&self, amount: f64) -> Result<(), FieldError> {
        if !amount.is_finite() {
            return Err(FieldError::Malformed {
                field: RawField::Amount,
                reason: format!("{} is not a finite number", amount),
            });
        }
        let (min, max) = self.config.amount_range;
        if amount < min || amount > max {
            Err(FieldError::OutOfRange {
                field: RawField::Amount,
                value: amount,
                min,
                max,
            })
        } else {
            Ok(())
        }
    }

    fn take_identifier(
        &self,
        field: RawField,
        value: &Option<String>,
        errors: &mut Vec<FieldError>,
    ) -> Option<String> {
        let Some(value) = value else {
            errors.push(FieldError::Missing(field));
            return None;
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            errors.push(FieldError::Malformed {
                field,
                reason: "identifier is empty".to_string(),
            });
            None
        } else if trimmed.len() > self.config.max_identifier_len {
            errors.push(FieldError::Malformed {
                field,
                reason: format!(
                    "identifier longer than {} bytes",
                    self.config.max_identifier_len
                ),
            });
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

/// Parse a timestamp as RFC 3339, or as one of the naive layouts in UTC
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}
