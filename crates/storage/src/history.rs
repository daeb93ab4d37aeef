//! Historical Transaction Batches
//!
//! Labeled CSV exports with the column names of the payment-app dataset
//! (`Amount (INR)`, `Sender UPI ID`, `Receiver UPI ID`, `Status`, `Timestamp`) and an
//! `is_fraud` label column. Extra columns are ignored.

use crate::StorageError;
use data_validator::{RawAmount, TransactionRecord};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// A boundary record with its fraud label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    /// 0-based position in the loaded batch
    pub row: usize,
    pub record: TransactionRecord,
    pub is_fraud: bool,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(default, alias = "Amount (INR)", alias = "Amount_INR")]
    amount: Option<RawAmount>,
    #[serde(default, alias = "Sender UPI ID")]
    sender_id: Option<String>,
    #[serde(default, alias = "Receiver UPI ID")]
    receiver_id: Option<String>,
    #[serde(default, alias = "Status")]
    status: Option<String>,
    #[serde(default, alias = "Timestamp")]
    timestamp: Option<String>,
    #[serde(default, alias = "Is Fraud")]
    is_fraud: Option<String>,
}

fn parse_label(row: usize, value: Option<&str>) -> Result<bool, StorageError> {
    let raw = value.unwrap_or("").trim();
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(StorageError::InvalidLabel {
            row,
            value: raw.to_string(),
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Read labeled records from any CSV source, numbering rows from `first_row`
pub fn read_labeled(reader: impl Read, first_row: usize) -> Result<Vec<LabeledRecord>, StorageError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for (offset, result) in csv.deserialize::<HistoryRow>().enumerate() {
        let row = first_row + offset;
        let raw = result?;
        let is_fraud = parse_label(row, raw.is_fraud.as_deref())?;
        records.push(LabeledRecord {
            row,
            record: TransactionRecord {
                amount: raw.amount,
                sender_id: non_empty(raw.sender_id),
                receiver_id: non_empty(raw.receiver_id),
                status: non_empty(raw.status),
                timestamp: non_empty(raw.timestamp),
            },
            is_fraud,
        });
    }
    Ok(records)
}

/// Read one labeled CSV file
pub fn read_labeled_csv(path: impl AsRef<Path>) -> Result<Vec<LabeledRecord>, StorageError> {
    read_labeled_csvs(&[path])
}

/// Read and concatenate several labeled CSV files in order
pub fn read_labeled_csvs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<LabeledRecord>, StorageError> {
    let mut records = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
        let batch = read_labeled(file, records.len())?;
        let fraud = batch.iter().filter(|r| r.is_fraud).count();
        info!(
            path = %path.display(),
            rows = batch.len(),
            fraud,
            "Historical batch loaded"
        );
        records.extend(batch);
    }
    Ok(records)
}
