//! Population Aggregates
//!
//! Per-identifier counts and previous-transaction lookups feeding the
//! `derived-aggregate` features. Training computes them once over the whole batch;
//! scoring reads a running aggregate.

use chrono::{DateTime, Utc};
use data_validator::RawTransaction;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Aggregate values for one transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Transactions by the same sender in the known population
    pub sender_count: u64,
    /// Transactions to the same receiver in the known population
    pub receiver_count: u64,
    /// Sender's previous transaction, if any
    pub previous_sender_timestamp: Option<DateTime<Utc>>,
}

impl TransactionContext {
    /// Seconds since the sender's previous transaction, clamped at zero
    pub fn gap_seconds(&self, at: DateTime<Utc>) -> Option<f64> {
        self.previous_sender_timestamp
            .map(|previous| ((at - previous).num_milliseconds() as f64 / 1000.0).max(0.0))
    }
}

/// Source of aggregate values for a transaction
pub trait PopulationStats {
    /// Aggregate values for the given transaction
    fn context_for(&self, tx: &RawTransaction) -> TransactionContext;
}

impl PopulationStats for TransactionContext {
    fn context_for(&self, _tx: &RawTransaction) -> TransactionContext {
        self.clone()
    }
}

/// Aggregates over a full historical batch.
///
/// Counts are totals over the batch per identifier. The previous timestamp of each
/// row comes from a stable chronological replay of the batch.
#[derive(Debug, Clone)]
pub struct HistoricalPopulation {
    contexts: Vec<TransactionContext>,
    distinct_senders: usize,
    distinct_receivers: usize,
}

impl HistoricalPopulation {
    /// Compute aggregates once over the batch
    pub fn from_batch(transactions: &[RawTransaction]) -> Self {
        let mut sender_totals: HashMap<&str, u64> = HashMap::new();
        let mut receiver_totals: HashMap<&str, u64> = HashMap::new();
        for tx in transactions {
            *sender_totals.entry(tx.sender_id()).or_insert(0) += 1;
            *receiver_totals.entry(tx.receiver_id()).or_insert(0) += 1;
        }

        let mut order: Vec<usize> = (0..transactions.len()).collect();
        order.sort_by_key(|&i| transactions[i].timestamp());

        let mut previous = vec![None; transactions.len()];
        let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for i in order {
            let tx = &transactions[i];
            previous[i] = last_seen.insert(tx.sender_id(), tx.timestamp());
        }

        let contexts = transactions
            .iter()
            .zip(previous)
            .map(|(tx, previous_sender_timestamp)| TransactionContext {
                sender_count: sender_totals[tx.sender_id()],
                receiver_count: receiver_totals[tx.receiver_id()],
                previous_sender_timestamp,
            })
            .collect();

        debug!(
            transactions = transactions.len(),
            senders = sender_totals.len(),
            receivers = receiver_totals.len(),
            "Historical population computed"
        );

        Self {
            contexts,
            distinct_senders: sender_totals.len(),
            distinct_receivers: receiver_totals.len(),
        }
    }

    /// Per-row aggregates, aligned with the input batch
    pub fn contexts(&self) -> &[TransactionContext] {
        &self.contexts
    }

    pub fn distinct_senders(&self) -> usize {
        self.distinct_senders
    }

    pub fn distinct_receivers(&self) -> usize {
        self.distinct_receivers
    }
}

#[derive(Debug, Default)]
struct SenderActivity {
    count: u64,
    last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct AggregateState {
    senders: HashMap<String, SenderActivity>,
    receivers: HashMap<String, u64>,
}

impl AggregateState {
    fn context_for(&self, tx: &RawTransaction) -> TransactionContext {
        let sender = self.senders.get(tx.sender_id());
        TransactionContext {
            sender_count: sender.map_or(0, |s| s.count) + 1,
            receiver_count: self.receivers.get(tx.receiver_id()).copied().unwrap_or(0) + 1,
            previous_sender_timestamp: sender.and_then(|s| s.last_seen),
        }
    }

    fn observe(&mut self, tx: &RawTransaction) {
        let sender = self.senders.entry(tx.sender_id().to_string()).or_default();
        sender.count += 1;
        sender.last_seen = Some(match sender.last_seen {
            Some(last) => last.max(tx.timestamp()),
            None => tx.timestamp(),
        });
        *self.receivers.entry(tx.receiver_id().to_string()).or_insert(0) += 1;
    }
}

/// Running aggregate maintained by the online path.
///
/// Counts returned by [`PopulationStats::context_for`] include the transaction being
/// scored; call [`RunningAggregate::observe`] once it has been processed.
#[derive(Debug, Default)]
pub struct RunningAggregate {
    state: RwLock<AggregateState>,
}

impl RunningAggregate {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the aggregate from a historical batch
    pub fn from_history(transactions: &[RawTransaction]) -> Self {
        let aggregate = Self::new();
        for tx in transactions {
            aggregate.observe(tx);
        }
        info!(
            transactions = transactions.len(),
            senders = aggregate.sender_count(),
            "Running aggregate seeded from history"
        );
        aggregate
    }

    /// Record a processed transaction
    pub fn observe(&self, tx: &RawTransaction) {
        self.state.write().observe(tx);
    }

    /// Run `process` on the transaction's context and record the transaction if it
    /// succeeds.
    ///
    /// The context read and the update happen under one write guard, so concurrent
    /// transactions from the same sender each see the ones recorded before them.
    pub fn observe_with<T, E>(
        &self,
        tx: &RawTransaction,
        process: impl FnOnce(&TransactionContext) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut state = self.state.write();
        let context = state.context_for(tx);
        let output = process(&context)?;
        state.observe(tx);
        Ok(output)
    }

    /// Number of distinct senders observed
    pub fn sender_count(&self) -> usize {
        self.state.read().senders.len()
    }

    /// Number of distinct receivers observed
    pub fn receiver_count(&self) -> usize {
        self.state.read().receivers.len()
    }
}

impl PopulationStats for RunningAggregate {
    fn context_for(&self, tx: &RawTransaction) -> TransactionContext {
        self.state.read().context_for(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use data_validator::{TransactionRecord, TransactionStatus, Validator};

    fn tx(sender: &str, receiver: &str, offset_secs: i64) -> RawTransaction {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs);
        Validator::default()
            .validate(&TransactionRecord::new(
                100.0,
                sender,
                receiver,
                TransactionStatus::Success,
                at,
            ))
            .unwrap()
    }

    #[test]
    fn test_batch_counts_are_totals() {
        let batch = vec![tx("a", "x", 0), tx("a", "y", 60), tx("b", "x", 30)];
        let population = HistoricalPopulation::from_batch(&batch);
        let contexts = population.contexts();
        assert_eq!(contexts[0].sender_count, 2);
        assert_eq!(contexts[0].receiver_count, 2);
        assert_eq!(contexts[2].sender_count, 1);
        assert_eq!(population.distinct_senders(), 2);
        assert_eq!(population.distinct_receivers(), 2);
    }

    #[test]
    fn test_batch_gaps_follow_chronology() {
        // Rows deliberately out of time order
        let batch = vec![tx("a", "x", 300), tx("a", "x", 0), tx("a", "x", 120)];
        let population = HistoricalPopulation::from_batch(&batch);
        let contexts = population.contexts();
        assert_eq!(contexts[1].previous_sender_timestamp, None);
        assert_eq!(contexts[2].gap_seconds(batch[2].timestamp()), Some(120.0));
        assert_eq!(contexts[0].gap_seconds(batch[0].timestamp()), Some(180.0));
    }

    #[test]
    fn test_running_aggregate_includes_current() {
        let aggregate = RunningAggregate::new();
        let first = tx("a", "x", 0);
        let ctx = aggregate.context_for(&first);
        assert_eq!(ctx.sender_count, 1);
        assert_eq!(ctx.receiver_count, 1);
        assert!(ctx.previous_sender_timestamp.is_none());

        aggregate.observe(&first);
        let second = tx("a", "x", 120);
        let ctx = aggregate.context_for(&second);
        assert_eq!(ctx.sender_count, 2);
        assert_eq!(ctx.gap_seconds(second.timestamp()), Some(120.0));
    }

    #[test]
    fn test_running_aggregate_clamps_late_arrivals() {
        let aggregate = RunningAggregate::from_history(&[tx("a", "x", 600)]);
        let late = tx("a", "x", 0);
        let ctx = aggregate.context_for(&late);
        assert_eq!(ctx.gap_seconds(late.timestamp()), Some(0.0));

        aggregate.observe(&late);
        let ctx = aggregate.context_for(&tx("a", "x", 700));
        assert_eq!(
            ctx.previous_sender_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 10, 0).unwrap())
        );
    }

    #[test]
    fn test_observe_with_skips_failures() {
        let aggregate = RunningAggregate::new();
        let result: Result<(), &str> = aggregate.observe_with(&tx("a", "x", 0), |_| Err("rejected"));
        assert_eq!(result, Err("rejected"));
        assert_eq!(aggregate.sender_count(), 0);

        let count = aggregate
            .observe_with(&tx("a", "x", 0), |ctx| Ok::<_, ()>(ctx.sender_count))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(aggregate.sender_count(), 1);
    }

    #[test]
    fn test_concurrent_observers_see_distinct_counts() {
        let aggregate = RunningAggregate::new();
        let shared = &aggregate;
        let mut counts: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(move |t| {
                    scope.spawn(move || {
                        (0..50)
                            .map(|i| {
                                let tx = tx("a", "x", t * 1_000 + i);
                                shared
                                    .observe_with(&tx, |ctx| Ok::<_, ()>(ctx.sender_count))
                                    .unwrap()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        counts.sort_unstable();
        assert_eq!(counts, (1..=200).collect::<Vec<u64>>());
    }
}
