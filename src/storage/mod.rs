pub mod concurrent;
pub mod error;
pub mod resources;
pub mod traits;

// Re-export commonly used types
pub use concurrent::{MemoryKvStore, MemoryStoreSettings};
pub use error::StorageError;
pub use resources::{Resources, build_store};
pub use traits::KvStore;
