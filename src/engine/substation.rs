use std::fmt;
use std::sync::Arc;

use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::EngineError;
use crate::config::{ConfigError, PipelineConfig, Settings};
use crate::io::{IoError, Sink};
use crate::message::Message;
use crate::storage::Resources;
use crate::streaming::{DEFAULT_CHANNEL_CAPACITY, Orchestrator, StreamExecutor};
use crate::transform::{TransformRegistry, Transformer, apply};

/// A loaded configuration: the built transform list plus the resources it uses
///
/// # Example
/// ```rust,ignore
/// let config = PipelineConfig::from_file("config.json").await?;
/// let sub = Substation::from_config(config)?;
/// let output = sub.transform(Message::new().with_data(r#"{"a":1}"#)).await?;
/// sub.close().await?;
/// ```
pub struct Substation {
    config: PipelineConfig,
    resources: Resources,
    registry: TransformRegistry,
    transforms: Vec<Arc<dyn Transformer>>,
    concurrency: usize,
}

impl Substation {
    /// Build with default process settings and the built-in transforms
    pub fn new(config: PipelineConfig, resources: Resources) -> Result<Self, EngineError> {
        Self::with_registry(config, resources, &Settings::default(), TransformRegistry::default())
    }

    /// Build with stores constructed from the document's `kv_stores`
    pub fn from_config(config: PipelineConfig) -> Result<Self, EngineError> {
        let resources = Resources::from_config(&config.kv_stores)?;
        Self::new(config, resources)
    }

    pub fn with_registry(
        config: PipelineConfig,
        resources: Resources,
        settings: &Settings,
        registry: TransformRegistry,
    ) -> Result<Self, EngineError> {
        if config.transforms.is_empty() {
            return Err(ConfigError::NoTransforms.into());
        }

        let transforms = registry.build_all(&config.transforms, &resources)?;
        let concurrency = settings.concurrency_for(config.concurrency);
        debug!(transforms = transforms.len(), concurrency, "Configuration loaded");

        Ok(Self {
            config,
            resources,
            registry,
            transforms,
            concurrency,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn transforms(&self) -> &[Arc<dyn Transformer>] {
        &self.transforms
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run one message through every transform in order
    ///
    /// Stateful transforms keep what they buffer until a control message
    /// is passed in.
    pub async fn transform(&self, message: Message) -> Result<Vec<Message>, EngineError> {
        Ok(apply(&self.transforms, vec![message]).await?)
    }

    /// An executor over this configuration's transforms
    pub fn executor(&self) -> StreamExecutor {
        StreamExecutor::new(self.transforms.clone())
            .with_concurrency(self.concurrency)
            .with_capacity(self.config.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY))
    }

    /// Stream a source through the configuration into a sink
    pub async fn run<S, K>(&self, source: S, sink: K, ctx: CancellationToken) -> Result<(), EngineError>
    where
        S: Stream<Item = Result<Message, IoError>> + Send + 'static,
        K: Sink + 'static,
    {
        info!(
            transforms = self.transforms.len(),
            concurrency = self.concurrency,
            "Starting pipeline"
        );
        let running = Orchestrator::start(source, Arc::new(self.executor()), sink);
        Ok(running.block(ctx).await?)
    }

    /// Close every transform, then every store
    ///
    /// All transforms are closed even if one fails; the first failure is returned.
    pub async fn close(&self) -> Result<(), EngineError> {
        let mut first = None;
        for transform in &self.transforms {
            if let Err(e) = transform.close().await {
                warn!(error = %e, "Failed to close transform");
                first.get_or_insert(e);
            }
        }
        self.resources.close().await;

        match first {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Substation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.config.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl fmt::Debug for Substation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substation")
            .field("transforms", &self.transforms.len())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
