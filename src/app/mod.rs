pub mod cli;
pub mod command;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use cli::CliApp;
pub use command::Command;
pub use error::AppError;
pub use logging::init_logging;
