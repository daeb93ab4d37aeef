//! Transaction Validation
//!
//! Turns loosely populated boundary records into validated raw transactions,
//! reporting every missing or malformed field at once.

mod error;
mod record;
mod validator;

pub use error::{FieldError, ValidationError};
pub use record::{RawAmount, RawField, RawTransaction, TransactionRecord, TransactionStatus};
pub use validator::{parse_timestamp, ValidationConfig, Validator};
