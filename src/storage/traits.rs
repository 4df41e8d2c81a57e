//! Abstract storage contract for the relationship graph.
//!
//! The engine never owns persistence. It reads people and edges through
//! [`GraphStore`] and leaves writes (including applying merges) to callers,
//! who are expected to run them inside their own transaction.

use thiserror::Error;

use crate::edge::{Edge, EdgeKey};
use crate::person::{Organization, OrganizationId, Person, PersonId};

/// Errors raised by a storage backend.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StorageError {
    /// Person not found (write paths only; reads return `Ok(None)`).
    #[error("Person not found: {0}")]
    PersonNotFound(PersonId),

    /// Edge not found.
    #[error("Edge not found: {} -> {} ({})", .0.from, .0.to, .0.relationship_type)]
    EdgeNotFound(EdgeKey),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend did not answer in time.
    #[error("Storage timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Raw counts a backend can produce cheaply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Non-deleted people.
    pub people: u64,
    /// Non-deleted organizations.
    pub organizations: u64,
    /// Edges whose endpoints are both non-deleted.
    pub edges: u64,
}

/// Storage contract consumed by the engine.
///
/// Reads return soft-deleted records as stored; filtering them is the
/// engine's job. Implementations must be safe to share across threads.
pub trait GraphStore: Send + Sync {
    /// Get a person by ID.
    fn get_person(&self, id: PersonId) -> Result<Option<Person>, StorageError>;

    /// Get an organization by ID.
    fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StorageError>;

    /// Edges whose `from` is `id`.
    fn get_outgoing_edges(&self, id: PersonId) -> Result<Vec<Edge>, StorageError>;

    /// Edges whose `to` is `id`.
    fn get_incoming_edges(&self, id: PersonId) -> Result<Vec<Edge>, StorageError>;

    /// All non-deleted people.
    fn get_all_people(&self) -> Result<Vec<Person>, StorageError>;

    /// Raw record counts. Edges touching a deleted person are not counted.
    fn get_stats(&self) -> Result<StoreCounts, StorageError>;

    /// Insert or replace a person.
    fn upsert_person(&self, person: Person) -> Result<(), StorageError>;

    /// Insert or replace an organization.
    fn upsert_organization(&self, organization: Organization) -> Result<(), StorageError>;

    /// Insert or replace the edge identified by `edge.key()`.
    fn upsert_edge(&self, edge: Edge) -> Result<(), StorageError>;

    /// Remove an edge. Returns error if not found.
    fn delete_edge(&self, key: &EdgeKey) -> Result<(), StorageError>;
}
