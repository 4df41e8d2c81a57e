//! Storage collaborator for warmpath.
//!
//! [`GraphStore`] is the contract the engine reads through; the in-memory
//! backend implements it for tests and embedded use.

mod memory;
mod traits;

pub use memory::InMemoryGraphStore;
pub use traits::{GraphStore, StorageError, StoreCounts};
