use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Bounded channel that tolerates producers and consumers shutting down in any order
///
/// Closing is idempotent. A send after close, or one blocked on a full
/// channel while it closes, drops its item instead of failing or hanging.
///
/// # Example
/// ```rust,ignore
/// let channel = Arc::new(Channel::new(64));
/// let mut rx = channel.receiver().unwrap();
/// channel.send(Message::new().with_data("a")).await;
/// channel.close();
/// channel.close(); // no-op
/// assert!(!channel.send(Message::new()).await);
/// ```
#[derive(Debug)]
pub struct Channel<T> {
    sender: Mutex<Option<mpsc::Sender<T>>>,
    receiver: Mutex<Option<mpsc::Receiver<T>>>,
    closed: CancellationToken,
}

impl<T> Channel<T> {
    /// Create a channel holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            closed: CancellationToken::new(),
        }
    }

    /// Send an item, waiting for capacity
    ///
    /// Returns false when the item was dropped because the channel is closed
    /// or its receiver is gone.
    pub async fn send(&self, item: T) -> bool {
        // Clone under the guard so close and send never interleave on the same sender.
        let sender = guard(&self.sender).clone();
        let Some(sender) = sender else {
            return false;
        };

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => false,
            sent = sender.send(item) => sent.is_ok(),
        }
    }

    /// Close the channel; the receiver drains what was sent and then ends
    pub fn close(&self) {
        guard(&self.sender).take();
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Take the receiving end; only the first caller gets it
    pub fn receiver(&self) -> Option<mpsc::Receiver<T>> {
        guard(&self.receiver).take()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
