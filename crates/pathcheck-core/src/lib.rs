pub mod error;
pub mod id;
pub mod key;
pub mod memory;
pub mod model;
pub mod schema;
pub mod traverse;
pub mod value;

// Re-export commonly used types
pub use error::CoreError;
pub use id::{ModelId, NodeId};
pub use key::CanonicalKey;
pub use memory::{MemoryModel, NodeRecord};
pub use model::Model;
pub use schema::{KindDef, PropertyDef, Range, Schema};
pub use value::{Slot, Value};
