pub mod channel;
pub mod error;
pub mod executor;
pub mod orchestrator;

// Re-export commonly used types
pub use channel::Channel;
pub use error::PipelineError;
pub use executor::{DEFAULT_CHANNEL_CAPACITY, StreamExecutor};
pub use orchestrator::{Orchestrator, Running};
