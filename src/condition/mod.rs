pub mod error;
pub mod inspectors;
pub mod operator;
pub mod registry;

// Re-export commonly used types
pub use error::ConditionError;
pub use inspectors::{
    FormatJson, MetaCondition, MetaNegate, NumberCompare, NumberOp, StringCompare, StringOp,
};
pub use operator::{Condition, Inspector, Operator};
pub use registry::{InspectorConstructor, InspectorRegistry};
