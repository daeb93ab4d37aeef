//! Transaction records at the boundary and after validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw transaction fields a feature can be derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawField {
    Amount,
    SenderId,
    ReceiverId,
    Status,
    Timestamp,
}

impl RawField {
    /// Every raw field, in record order
    pub const ALL: [RawField; 5] = [
        RawField::Amount,
        RawField::SenderId,
        RawField::ReceiverId,
        RawField::Status,
        RawField::Timestamp,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RawField::Amount => "amount",
            RawField::SenderId => "sender_id",
            RawField::ReceiverId => "receiver_id",
            RawField::Status => "status",
            RawField::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for RawField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    /// Numeric code used by the feature vector (SUCCESS = 0, FAILED = 1)
    pub fn code(&self) -> u8 {
        match self {
            TransactionStatus::Success => 0,
            TransactionStatus::Failed => 1,
        }
    }

    /// Parse a status label, case-insensitively
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(TransactionStatus::Success),
            "FAILED" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

/// Amount as sent by the client: a JSON number or a numeric string.
///
/// Anything else that deserializes as text is kept verbatim so the validator can
/// report it as malformed alongside the other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawAmount::Number(value) => write!(f, "{}", value),
            RawAmount::Text(text) => f.write_str(text),
        }
    }
}

/// Transaction as it arrives at the boundary.
///
/// Every field is optional so that a record missing several fields can be reported
/// in one pass. Aliases accept the historical CSV column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Amount in currency units
    #[serde(default, alias = "Amount (INR)", alias = "Amount_INR")]
    pub amount: Option<RawAmount>,

    /// Sender identifier
    #[serde(default, alias = "Sender UPI ID")]
    pub sender_id: Option<String>,

    /// Receiver identifier
    #[serde(default, alias = "Receiver UPI ID")]
    pub receiver_id: Option<String>,

    /// Status label (SUCCESS | FAILED)
    #[serde(default, alias = "Status")]
    pub status: Option<String>,

    /// Timestamp (RFC 3339 or `YYYY-MM-DD HH:MM[:SS]`, UTC)
    #[serde(default, alias = "Timestamp")]
    pub timestamp: Option<String>,
}

impl TransactionRecord {
    /// Build a complete record
    pub fn new(
        amount: f64,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        status: TransactionStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let status = match status {
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        };
        Self {
            amount: Some(RawAmount::Number(amount)),
            sender_id: Some(sender_id.into()),
            receiver_id: Some(receiver_id.into()),
            status: Some(status.to_string()),
            timestamp: Some(timestamp.to_rfc3339()),
        }
    }
}

/// Validated transaction. Only produced by [`crate::Validator`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTransaction {
    amount: f64,
    sender_id: String,
    receiver_id: String,
    status: TransactionStatus,
    timestamp: DateTime<Utc>,
}

impl RawTransaction {
    pub(crate) fn from_parts(
        amount: f64,
        sender_id: String,
        receiver_id: String,
        status: TransactionStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            amount,
            sender_id,
            receiver_id,
            status,
            timestamp,
        }
    }

    /// Amount in currency units (non-negative, finite)
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Sender identifier
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Receiver identifier
    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    /// Settlement status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Transaction instant
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
