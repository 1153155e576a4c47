pub mod document;
pub mod duration;
pub mod error;
pub mod object;
pub mod settings;

// Re-export commonly used types
pub use document::{
    ConditionConfig, ErrorMode, InspectorConfig, PipelineConfig, StoreConfig, TestConfig,
    TransformConfig, decode_settings,
};
pub use duration::{deserialize_duration, parse_duration};
pub use error::ConfigError;
pub use object::ObjectSettings;
pub use settings::Settings;
