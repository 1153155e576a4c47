use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::error::TransformError;
use super::policy::{AbortOnError, ErrorPolicy};
use super::transformer::Transformer;
use crate::condition::Condition;
use crate::message::Message;

/// A configured transform: condition gate plus error policy
///
/// Data messages that fail the condition pass through unmodified. Control
/// messages always reach the transform so buffered state is never stranded.
pub struct Stage {
    name: String,
    inner: Box<dyn Transformer>,
    condition: Option<Condition>,
    policy: Arc<dyn ErrorPolicy>,
}

impl Stage {
    pub fn new(name: impl Into<String>, inner: Box<dyn Transformer>) -> Self {
        Self {
            name: name.into(),
            inner,
            condition: None,
            policy: Arc::new(AbortOnError),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn gate(&self, message: &Message) -> Result<bool, TransformError> {
        match &self.condition {
            Some(condition) if !message.is_control() => Ok(condition.evaluate(message).await?),
            _ => Ok(true),
        }
    }

    async fn run(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        if !self.gate(&message).await? {
            trace!(transform = %self.name, "Condition not met, passing through");
            return Ok(vec![message]);
        }
        self.inner.transform(message).await
    }
}

#[async_trait]
impl Transformer for Stage {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        // Only keep a copy when the policy could forward it.
        let fallback = (self.policy.continues() && !message.is_control()).then(|| message.clone());

        match self.run(message).await {
            Ok(output) => Ok(output),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => match fallback {
                Some(original) if self.policy.handle_transform_error(&self.name, &e) => {
                    Ok(vec![original])
                }
                _ => Err(e),
            },
        }
    }

    async fn close(&self) -> Result<(), TransformError> {
        self.inner.close().await
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("condition", &self.condition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferError;
    use crate::condition::{Inspector, Operator};
    use crate::condition::ConditionError;
    use crate::transform::policy::SkipErrors;

    struct Upper;

    #[async_trait]
    impl Transformer for Upper {
        async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
            let upper = message.data().to_ascii_uppercase();
            message.set_data(upper);
            Ok(vec![message])
        }
    }

    struct Fail(fn() -> TransformError);

    #[async_trait]
    impl Transformer for Fail {
        async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
            if message.is_control() {
                return Ok(vec![message]);
            }
            Err((self.0)())
        }
    }

    struct StartsWithA;

    #[async_trait]
    impl Inspector for StartsWithA {
        async fn inspect(&self, message: &Message) -> Result<bool, ConditionError> {
            Ok(message.data().starts_with(b"a"))
        }
    }

    fn gated() -> Stage {
        Stage::new("upper", Box::new(Upper))
            .with_condition(Condition::new(Operator::All, vec![Box::new(StartsWithA)]))
    }

    #[tokio::test]
    async fn false_condition_passes_through() {
        let out = gated().transform(Message::new().with_data("bcd")).await.unwrap();
        assert_eq!(out[0].data(), b"bcd");

        let out = gated().transform(Message::new().with_data("abc")).await.unwrap();
        assert_eq!(out[0].data(), b"ABC");
    }

    #[tokio::test]
    async fn control_bypasses_condition() {
        let out = gated().transform(Message::control()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_control());
    }

    #[tokio::test]
    async fn abort_policy_propagates() {
        let stage = Stage::new("err", Box::new(Fail(|| TransformError::failed("err", "x"))));
        assert!(stage.transform(Message::new().with_data("a")).await.is_err());
    }

    #[tokio::test]
    async fn skip_policy_forwards_input() {
        let stage = Stage::new("err", Box::new(Fail(|| TransformError::failed("err", "x"))))
            .with_policy(Arc::new(SkipErrors));
        let out = stage.transform(Message::new().with_data("keep")).await.unwrap();
        assert_eq!(out[0].data(), b"keep");
    }

    #[tokio::test]
    async fn buffer_errors_are_never_skipped() {
        let stage = Stage::new(
            "agg",
            Box::new(Fail(|| BufferError::ItemTooLarge { size: 9, max: 1 }.into())),
        )
        .with_policy(Arc::new(SkipErrors));
        let err = stage.transform(Message::new().with_data("a")).await.unwrap_err();
        assert!(matches!(err, TransformError::Buffer(_)));
    }
}
