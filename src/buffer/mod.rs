pub mod batch;
pub mod error;
pub mod partitioned;
pub mod retry;

// Re-export commonly used types
pub use batch::{Buffer, BufferConfig, ByteSize, Rejected};
pub use error::BufferError;
pub use partitioned::{Batch, PartitionedBuffer};
pub use retry::{BatchReport, BatchWriter, RetryPolicy, write_with_retry};
