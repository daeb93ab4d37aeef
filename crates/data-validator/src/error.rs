//! Validation Error Types

use crate::record::RawField;
use std::fmt;
use thiserror::Error;

/// Problem with a single raw field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Missing required field
    #[error("missing required field: {0}")]
    Missing(RawField),

    /// Field present but unparseable
    #[error("{field} is malformed: {reason}")]
    Malformed { field: RawField, reason: String },

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: RawField,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl FieldError {
    /// The raw field this error refers to
    pub fn field(&self) -> RawField {
        match self {
            FieldError::Missing(field) => *field,
            FieldError::Malformed { field, .. } => *field,
            FieldError::OutOfRange { field, .. } => *field,
        }
    }
}

/// Errors during transaction validation.
///
/// Carries every offending field of the record, never just the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// Create an error from a non-empty list of field errors
    pub fn new(errors: Vec<FieldError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    /// Individual field errors, in field order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Names of every field that failed validation
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field().as_str()).collect()
    }

    /// Whether the given field is among the failures
    pub fn names(&self, field: RawField) -> bool {
        self.errors.iter().any(|e| e.field() == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transaction ({} field(s)): ", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}
