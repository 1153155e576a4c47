use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::channel::Channel;
use super::error::PipelineError;
use crate::message::Message;
use crate::transform::{TransformError, Transformer};

/// Default bound of every stage channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Runs an ordered transform list as a graph of concurrent stages
///
/// N transforms are wired through N+1 channels: the caller owns the first
/// (ingest) and the last (sink), the executor creates the rest. Every stage
/// runs a worker pool of `concurrency` tasks over its input; a control
/// message waits for the stage's in-flight data before it is applied, so a
/// flush always observes every earlier add.
///
/// # Example
/// ```rust,ignore
/// let executor = StreamExecutor::new(stages).with_concurrency(4);
/// let output = executor.run(messages, CancellationToken::new()).await?;
/// ```
pub struct StreamExecutor {
    transforms: Vec<Arc<dyn Transformer>>,
    concurrency: usize,
    capacity: usize,
}

impl StreamExecutor {
    pub fn new(transforms: Vec<Arc<dyn Transformer>>) -> Self {
        Self {
            transforms,
            concurrency: 1,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the per-stage worker pool size (minimum 1)
    ///
    /// Above 1, output order within a stage is no longer guaranteed.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the bound of every channel (minimum 1)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn transforms(&self) -> &[Arc<dyn Transformer>] {
        &self.transforms
    }

    /// Drive every stage until the input is exhausted or an error occurs
    ///
    /// The output channel is closed on return in every case. The first error
    /// cancels the remaining stages and is returned; cancelling `cancel`
    /// stops every stage promptly with [`PipelineError::Cancelled`].
    pub async fn execute(
        &self,
        input: mpsc::Receiver<Message>,
        output: Arc<Channel<Message>>,
        cancel: CancellationToken,
    ) -> Result<(), PipelineError> {
        let cancel = cancel.child_token();
        let stages: Vec<Arc<dyn Transformer>> = if self.transforms.is_empty() {
            vec![Arc::new(Forward)]
        } else {
            self.transforms.clone()
        };

        let mut workers = JoinSet::new();
        let mut receiver = input;
        let last = stages.len() - 1;

        for (index, transform) in stages.into_iter().enumerate() {
            let (stage_output, next) = if index == last {
                (output.clone(), None)
            } else {
                let channel = Arc::new(Channel::new(self.capacity));
                let next = channel.receiver();
                (channel, next)
            };

            workers.spawn(run_stage(
                index,
                transform,
                receiver,
                stage_output,
                self.concurrency,
                cancel.clone(),
            ));

            match next {
                Some(next) => receiver = next,
                None => break,
            }
        }

        let mut first: Option<PipelineError> = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = flatten("stage", joined) {
                cancel.cancel();
                // Keep the root cause over the cancellations it triggered.
                let replace = match &first {
                    None => true,
                    Some(PipelineError::Cancelled) => !matches!(e, PipelineError::Cancelled),
                    Some(_) => false,
                };
                if replace {
                    first = Some(e);
                }
            }
        }
        output.close();

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Push `messages` and one trailing control message through the graph
    ///
    /// Starts the drain before the workers and the workers before the
    /// producer, and returns every message that reached the end, control
    /// message last.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>, PipelineError> {
        let ingest = Arc::new(Channel::new(self.capacity));
        let sink = Arc::new(Channel::new(self.capacity));
        let (Some(input), Some(mut drained)) = (ingest.receiver(), sink.receiver()) else {
            return Err(PipelineError::Incomplete);
        };

        let drain = async move {
            let mut collected = Vec::new();
            while let Some(message) = drained.recv().await {
                collected.push(message);
            }
            collected
        };
        let execute = self.execute(input, sink, cancel.clone());
        let produce = async {
            for message in messages.into_iter().chain(std::iter::once(Message::control())) {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = ingest.send(message) => if !sent { break },
                }
            }
            ingest.close();
        };

        let (collected, executed, ()) = tokio::join!(drain, execute, produce);
        executed?;
        Ok(collected)
    }
}

/// Stage used when no transforms are configured
struct Forward;

#[async_trait]
impl Transformer for Forward {
    async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
        Ok(vec![message])
    }
}

async fn run_stage(
    index: usize,
    transform: Arc<dyn Transformer>,
    mut input: mpsc::Receiver<Message>,
    output: Arc<Channel<Message>>,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<(), PipelineError> {
    debug!(stage = index, concurrency, "Stage started");
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut in_flight = JoinSet::new();

    let result: Result<(), PipelineError> = async {
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    flatten(index, joined)?;
                    continue;
                }
                message = input.recv() => message,
            };
            let Some(message) = message else {
                return Ok(());
            };

            if message.is_control() {
                while let Some(joined) = in_flight.join_next().await {
                    flatten(index, joined)?;
                }
                debug!(stage = index, "Flushing stage");
                process(transform.as_ref(), message, &output, &cancel).await?;
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                permit = permits.clone().acquire_owned() => {
                    permit.map_err(|_| PipelineError::Cancelled)?
                }
            };
            let transform = transform.clone();
            let output = output.clone();
            let cancel = cancel.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                process(transform.as_ref(), message, &output, &cancel).await
            });
        }
    }
    .await;

    let result = match result {
        Ok(()) => {
            let mut drained = Ok(());
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = flatten(index, joined) {
                    drained = drained.and(Err(e));
                }
            }
            drained
        }
        Err(e) => {
            in_flight.shutdown().await;
            Err(e)
        }
    };

    output.close();
    match &result {
        Ok(()) => debug!(stage = index, "Stage finished"),
        Err(PipelineError::Cancelled) => debug!(stage = index, "Stage cancelled"),
        Err(e) => warn!(stage = index, error = %e, "Stage failed"),
    }
    result
}

/// Apply one transform and forward its outputs
async fn process(
    transform: &dyn Transformer,
    message: Message,
    output: &Channel<Message>,
    cancel: &CancellationToken,
) -> Result<(), PipelineError> {
    let outputs = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        outputs = transform.transform(message) => outputs?,
    };

    for message in outputs {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            // A closed downstream drops the message; cancellation carries the cause.
            _ = output.send(message) => {}
        }
    }
    Ok(())
}

fn flatten(
    stage: impl std::fmt::Display,
    joined: Result<Result<(), PipelineError>, JoinError>,
) -> Result<(), PipelineError> {
    joined.map_err(|e| PipelineError::panicked(stage.to_string(), e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Append(&'static str);

    #[async_trait]
    impl Transformer for Append {
        async fn transform(&self, mut message: Message) -> Result<Vec<Message>, TransformError> {
            if message.is_control() {
                return Ok(vec![message]);
            }
            let mut data = message.data().to_vec();
            data.extend_from_slice(self.0.as_bytes());
            message.set_data(data);
            Ok(vec![message])
        }
    }

    /// Holds data messages until control, sleeping per message to expose races
    struct SlowCollect(Mutex<Vec<Vec<u8>>>);

    #[async_trait]
    impl Transformer for SlowCollect {
        async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
            if message.is_control() {
                let items = std::mem::take(&mut *self.0.lock().unwrap());
                let joined = items.join(&b","[..]);
                return Ok(vec![Message::new().with_data(joined), message]);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.0.lock().unwrap().push(message.data().to_vec());
            Ok(Vec::new())
        }
    }

    struct Fail;

    #[async_trait]
    impl Transformer for Fail {
        async fn transform(&self, message: Message) -> Result<Vec<Message>, TransformError> {
            if message.is_control() {
                return Ok(vec![message]);
            }
            Err(TransformError::failed("fail", "boom"))
        }
    }

    struct Hang;

    #[async_trait]
    impl Transformer for Hang {
        async fn transform(&self, _message: Message) -> Result<Vec<Message>, TransformError> {
            std::future::pending().await
        }
    }

    fn inputs(items: &[&str]) -> Vec<Message> {
        items.iter().map(|s| Message::new().with_data(*s)).collect()
    }

    #[tokio::test]
    async fn stages_apply_in_order() {
        let executor = StreamExecutor::new(vec![Arc::new(Append("1")), Arc::new(Append("2"))]);
        let out = executor
            .run(inputs(&["a", "b"]), CancellationToken::new())
            .await
            .unwrap();

        let data: Vec<_> = out.iter().map(|m| m.to_string()).collect();
        assert_eq!(data, vec!["a12", "b12", ""]);
        assert!(out[2].is_control());
    }

    #[tokio::test]
    async fn control_waits_for_in_flight_messages() {
        let executor = StreamExecutor::new(vec![Arc::new(SlowCollect(Mutex::new(Vec::new())))])
            .with_concurrency(8);
        let out = executor
            .run(inputs(&["a", "b", "c", "d"]), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        let mut items: Vec<_> = out[0].to_string().split(',').map(String::from).collect();
        items.sort();
        assert_eq!(items, vec!["a", "b", "c", "d"]);
        assert!(out[1].is_control());
    }

    #[tokio::test]
    async fn first_error_is_returned() {
        let executor = StreamExecutor::new(vec![Arc::new(Append("x")), Arc::new(Fail)]);
        let err = executor
            .run(inputs(&["a"]), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transform(TransformError::Failed { .. })));
    }

    #[tokio::test]
    async fn cancellation_stops_blocked_stages() {
        let executor = StreamExecutor::new(vec![Arc::new(Hang)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(1),
            executor.run(inputs(&["a"]), cancel),
        )
        .await
        .expect("executor should stop")
        .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn empty_transform_list_forwards() {
        let out = StreamExecutor::new(Vec::new())
            .run(inputs(&["a"]), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].data(), b"a");
    }
}
