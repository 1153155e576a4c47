use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::channel::Channel;
use super::error::PipelineError;
use super::executor::StreamExecutor;
use crate::io::{IoError, Sink};
use crate::message::Message;

/// Wires a source, an executor and a sink into one running pipeline
///
/// Tasks start in a fixed order: the sink first, then the transform stages,
/// then ingest, so no producer ever writes into a channel nobody reads.
///
/// # Example
/// ```rust,ignore
/// let running = Orchestrator::start(source, executor, WriterSink::stdout());
/// running.block(CancellationToken::new()).await?;
/// ```
pub struct Orchestrator;

impl Orchestrator {
    pub fn start<S, K>(source: S, executor: Arc<StreamExecutor>, sink: K) -> Running
    where
        S: Stream<Item = Result<Message, IoError>> + Send + 'static,
        K: Sink + 'static,
    {
        let tracker = TaskTracker::new();
        let kill = CancellationToken::new();
        // One slot per task: ingest, transforms, sink.
        let (errs_tx, errs) = mpsc::channel(3);
        let (done_tx, done) = oneshot::channel();

        let ingest = Arc::new(Channel::new(executor.capacity()));
        let output = Arc::new(Channel::new(executor.capacity()));

        match (ingest.receiver(), output.receiver()) {
            (Some(input), Some(delivered)) => {
                tracker.spawn(run_sink(sink, delivered, done_tx, errs_tx.clone(), kill.clone()));
                tracker.spawn({
                    let errs = errs_tx.clone();
                    let kill = kill.clone();
                    async move {
                        if let Err(e) = executor.execute(input, output, kill).await {
                            report(&errs, e);
                        }
                    }
                });
                tracker.spawn(run_ingest(source, ingest, errs_tx, kill.clone()));
            }
            // Freshly created channels always hand out their receivers.
            _ => report(&errs_tx, PipelineError::Incomplete),
        }
        tracker.close();

        Running {
            tracker,
            kill,
            errs,
            done,
        }
    }
}

/// Handle to a started pipeline
pub struct Running {
    tracker: TaskTracker,
    kill: CancellationToken,
    errs: mpsc::Receiver<PipelineError>,
    done: oneshot::Receiver<()>,
}

impl Running {
    /// Tracker over every pipeline task; empty once [`Running::block`] returns
    pub fn tracker(&self) -> TaskTracker {
        self.tracker.clone()
    }

    /// Stop every task immediately without waiting for completion
    pub fn kill(&self) {
        self.kill.cancel();
    }

    /// A handle that stops every task, usable while [`Running::block`] waits
    pub fn kill_switch(&self) -> CancellationToken {
        self.kill.clone()
    }

    /// Wait for the pipeline to finish, fail, or be cancelled
    ///
    /// Returns once, with the first of: `ctx` cancelled, the first stage
    /// error, or the sink signalling that all output was delivered. Every
    /// pipeline task has exited by the time this returns.
    pub async fn block(mut self, ctx: CancellationToken) -> Result<(), PipelineError> {
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(PipelineError::Cancelled),
            _ = self.kill.cancelled() => Err(PipelineError::Cancelled),
            Some(e) = self.errs.recv() => Err(e),
            done = &mut self.done => match done {
                Ok(()) => Ok(()),
                // The sink quit without finishing; wait for the stage that caused it.
                Err(_) => Err(self.errs.recv().await.unwrap_or(PipelineError::Incomplete)),
            },
        };

        self.kill.cancel();
        self.tracker.wait().await;

        match &result {
            Ok(()) => info!("Pipeline finished"),
            Err(e) => info!(error = %e, "Pipeline stopped"),
        }
        result
    }
}

fn report(errs: &mpsc::Sender<PipelineError>, error: PipelineError) {
    // Only the first error matters; a full queue already holds one.
    let _ = errs.try_send(error);
}

async fn run_ingest<S>(
    source: S,
    ingest: Arc<Channel<Message>>,
    errs: mpsc::Sender<PipelineError>,
    kill: CancellationToken,
) where
    S: Stream<Item = Result<Message, IoError>> + Send + 'static,
{
    let mut source = std::pin::pin!(source);
    let mut count = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = kill.cancelled() => break,
            next = source.next() => next,
        };
        let (message, last) = match next {
            Some(Ok(message)) => (message, false),
            Some(Err(e)) => {
                report(&errs, e.into());
                break;
            }
            None => (Message::control(), true),
        };

        tokio::select! {
            biased;
            _ = kill.cancelled() => break,
            _ = ingest.send(message) => {}
        }
        if last {
            break;
        }
        count += 1;
    }

    ingest.close();
    debug!(count, "Ingest finished");
}

async fn run_sink<K: Sink>(
    mut sink: K,
    mut delivered: mpsc::Receiver<Message>,
    done: oneshot::Sender<()>,
    errs: mpsc::Sender<PipelineError>,
    kill: CancellationToken,
) {
    let result: Result<(), IoError> = async {
        let mut flushed = false;
        loop {
            let message = tokio::select! {
                biased;
                _ = kill.cancelled() => return Ok(()),
                message = delivered.recv() => message,
            };
            match message {
                Some(message) if message.is_control() => {
                    sink.flush().await?;
                    flushed = true;
                }
                Some(message) => sink.deliver(message).await?,
                None => break,
            }
        }
        sink.close().await?;
        // Input that ended without the control message was cut short upstream.
        if flushed {
            let _ = done.send(());
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        report(&errs, e.into());
    }
}
