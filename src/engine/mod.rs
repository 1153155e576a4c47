pub mod error;
pub mod selftest;
pub mod substation;

// Re-export commonly used types
pub use error::EngineError;
pub use selftest::{TestOutcome, TestReport};
pub use substation::Substation;
