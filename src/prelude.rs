//! Prelude module for convenient imports
//!
//! Import everything you need with: `use substation::prelude::*;`

pub use tokio_util::sync::CancellationToken;

// Message types
pub use crate::message::{Key, Message, MessageError, Value};

// Configuration types
pub use crate::config::{ConfigError, ErrorMode, PipelineConfig, Settings, TransformConfig};

// Condition types
pub use crate::condition::{Condition, ConditionError, Inspector, InspectorRegistry, Operator};

// Transform types
pub use crate::transform::{
    Stage, TransformError, TransformRegistry, Transformer, apply, apply_all,
};

// Buffer types
pub use crate::buffer::{
    BatchReport, BatchWriter, Buffer, BufferConfig, BufferError, PartitionedBuffer, RetryPolicy,
};

// Storage types
pub use crate::storage::{KvStore, MemoryKvStore, Resources, StorageError};

// IO types
pub use crate::io::{BatchSink, CollectSink, IoError, LineSource, Sink, WriterSink};

// Streaming types
pub use crate::streaming::{Channel, Orchestrator, PipelineError, Running, StreamExecutor};

// Engine types
pub use crate::engine::{EngineError, Substation, TestOutcome, TestReport};

// App types
pub use crate::app::{AppError, CliApp, Command, init_logging};
