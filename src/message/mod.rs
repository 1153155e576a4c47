pub mod error;
pub mod key;
#[allow(clippy::module_inception)]
pub mod message;
pub mod path;
pub mod value;

// Re-export commonly used types
pub use error::MessageError;
pub use key::{Field, Key};
pub use message::{Message, bytes_to_json};
pub use path::Path;
pub use value::Value;
