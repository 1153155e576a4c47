pub mod error;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use error::IoError;
pub use sink::{BatchSink, CollectSink, Sink, WriterSink};
pub use source::{LineSource, MessageStream};
