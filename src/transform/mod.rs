pub mod aggregate;
pub mod enrich;
pub mod error;
pub mod meta;
pub mod object;
pub mod policy;
pub mod registry;
pub mod send;
pub mod stage;
pub mod string;
pub mod transformer;
pub mod utility;

// Re-export commonly used types
pub use aggregate::{AggregateFromArray, AggregateFromString, AggregateToArray, AggregateToString};
pub use enrich::{KvStoreItemGet, KvStoreItemSet, KvStoreItemSettings};
pub use error::TransformError;
pub use meta::{MetaSwitch, SwitchCase};
pub use object::{ObjectCopy, ObjectDelete, ObjectInsert};
pub use policy::{AbortOnError, ErrorPolicy, SilentSkip, SkipErrors};
pub use registry::{BuildContext, TransformConstructor, TransformRegistry};
pub use send::{Destination, SendBatch};
pub use stage::Stage;
pub use string::{StringAppend, StringCase};
pub use transformer::{Transformer, apply, apply_all};
pub use utility::{UtilityControl, UtilityDrop, UtilityErr, UtilityMessage};
