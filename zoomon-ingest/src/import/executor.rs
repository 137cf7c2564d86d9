//! Bounded-concurrency settle-all execution
//!
//! A fixed number of workers drains the input sequence; every record
//! settles with an outcome and no failure aborts the batch. The result
//! vector is indexed like the input regardless of completion order.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Per-record result of a settle-all batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Success { id: String },
    Failure { id: String, error: String },
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RecordOutcome::Success { .. })
    }

    /// Business id of the record this outcome belongs to
    pub fn id(&self) -> &str {
        match self {
            RecordOutcome::Success { id } => id,
            RecordOutcome::Failure { id, .. } => id,
        }
    }
}

/// Run `f` over every item with at most `worker_count` records in flight.
///
/// `result[i]` always corresponds to `items[i]`; completion order does not
/// leak into the output. `f` itself must not panic; failures are values.
pub async fn settle_all<T, F, Fut>(items: Vec<T>, worker_count: usize, f: F) -> Vec<RecordOutcome>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = RecordOutcome>,
{
    let total = items.len();
    let mut settled: Vec<Option<RecordOutcome>> = Vec::with_capacity(total);
    settled.resize_with(total, || None);

    let mut outcomes = stream::iter(items.into_iter().enumerate().map(|(index, item)| {
        let fut = f(item);
        async move { (index, fut.await) }
    }))
    .buffer_unordered(worker_count.max(1));

    while let Some((index, outcome)) = outcomes.next().await {
        settled[index] = Some(outcome);
    }

    settled
        .into_iter()
        .map(|slot| slot.expect("every input index settles exactly once"))
        .collect()
}
