use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::BufferError;

/// Outcome of one batched remote call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Indices (into the submitted slice) the remote side refused
    pub rejected: Vec<usize>,
}

impl BatchReport {
    pub fn accepted() -> Self {
        Self::default()
    }

    pub fn rejected(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            rejected: indices.into_iter().collect(),
        }
    }
}

/// A remote endpoint that accepts records in batches and may reject a subset
#[async_trait]
pub trait BatchWriter: Send + Sync {
    async fn write_batch(&self, key: &str, items: &[Vec<u8>]) -> Result<BatchReport, BufferError>;
}

/// Bounds for partial-failure retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Write a batch, resubmitting only the rejected subset until it is accepted
///
/// A non-partial error from the writer aborts immediately. Returns the number
/// of attempts used.
pub async fn write_with_retry<W>(
    writer: &W,
    key: &str,
    items: Vec<Vec<u8>>,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<u32, BufferError>
where
    W: BatchWriter + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut pending = items;
    let mut backoff = policy.initial_backoff;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(BufferError::Cancelled);
        }

        let report = writer.write_batch(key, &pending).await?;
        if let Some(&index) = report.rejected.iter().find(|idx| **idx >= pending.len()) {
            warn!(key, index, len = pending.len(), "Batch writer reported an unknown index");
            return Err(BufferError::InvalidReport {
                index,
                len: pending.len(),
            });
        }
        let rejected: HashSet<usize> = report.rejected.into_iter().collect();
        pending = pending
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| rejected.contains(idx))
            .map(|(_, item)| item)
            .collect();

        if pending.is_empty() {
            debug!(key, attempt, "Batch accepted");
            return Ok(attempt);
        }

        warn!(key, attempt, remaining = pending.len(), "Batch partially rejected");
        if attempt == max_attempts {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(BufferError::Cancelled),
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(policy.max_backoff);
    }

    Err(BufferError::RetriesExhausted {
        attempts: max_attempts,
        remaining: pending.len(),
    })
}
