use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::error::TransformError;
use crate::message::Message;

/// A unit of work applied to one message, producing zero or more messages
///
/// Implementations are shared by a stage's worker pool and must guard any
/// internal state. A stateful transform flushes on a control message and
/// always forwards the control message after its own output.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError>;

    /// Release resources when the transform is discarded
    async fn close(&self) -> Result<(), TransformError> {
        Ok(())
    }
}

/// Run messages through a list of transforms in order
///
/// Every output of one transform becomes an input of the next.
pub async fn apply(
    transforms: &[Arc<dyn Transformer>],
    messages: Vec<Message>,
) -> Result<Vec<Message>, TransformError> {
    let mut current = messages;
    for transform in transforms {
        let mut next = Vec::with_capacity(current.len());
        for message in current {
            next.extend(transform.transform(message).await?);
        }
        current = next;
    }
    Ok(current)
}

/// Run a complete batch: the data messages followed by one control message
///
/// Buffered state in every transform is flushed into the returned output,
/// which ends with the propagated control message.
pub async fn apply_all(
    transforms: &[Arc<dyn Transformer>],
    messages: Vec<Message>,
) -> Result<Vec<Message>, TransformError> {
    let mut output = apply(transforms, messages).await?;
    output.extend(apply(transforms, vec![Message::control()]).await?);
    Ok(output)
}

/// Lock a std mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits each data message twice
    struct Duplicate;

    #[async_trait]
    impl Transformer for Duplicate {
        async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
            if message.is_control() {
                return Ok(vec![message]);
            }
            Ok(vec![message.clone(), message])
        }
    }

    /// Counts data messages and reports the count on control
    struct Counter(Mutex<usize>);

    #[async_trait]
    impl Transformer for Counter {
        async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
            let mut count = lock(&self.0);
            if message.is_control() {
                let total = Message::new().with_data(count.to_string());
                *count = 0;
                return Ok(vec![total, message]);
            }
            *count += 1;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn apply_feeds_outputs_forward() {
        let transforms: Vec<Arc<dyn Transformer>> = vec![Arc::new(Duplicate), Arc::new(Duplicate)];
        let out = apply(&transforms, vec![Message::new().with_data("a")]).await.unwrap();
        assert_eq!(out.len(), 4);
    }

    #[tokio::test]
    async fn apply_all_flushes_and_ends_with_control() {
        let transforms: Vec<Arc<dyn Transformer>> =
            vec![Arc::new(Duplicate), Arc::new(Counter(Mutex::new(0)))];
        let inputs = vec![Message::new().with_data("a"), Message::new().with_data("b")];

        let out = apply_all(&transforms, inputs).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].data(), b"4");
        assert!(out[1].is_control());
    }
}
