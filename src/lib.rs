//! # warmpath - relationship graph engine for warm introductions
//!
//! warmpath answers "who can introduce me to this person?" over a directed,
//! weighted graph of people. It scores relationships from their interaction
//! history, ranks introduction paths, and flags duplicate contact records
//! produced by overlapping data sources.
//!
//! ## Core Concepts
//!
//! - **Person**: a canonical contact record, possibly merged from several sources
//! - **Edge**: a directed relationship with a strength in [0, 1] and the factors behind it
//! - **Path**: an introduction route, ranked by average strength with a per-hop penalty
//! - **ResolutionMatch**: a likely duplicate with a recommendation and field-level evidence
//!
//! Persistence is owned by a [`GraphStore`] implementation; the engine only
//! reads through it.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use warmpath::{Edge, GraphService, InMemoryGraphStore, Person, PathOptions};
//!
//! let store = InMemoryGraphStore::new();
//! let me = Person::new("Me");
//! let alice = Person::new("Alice");
//! let bob = Person::new("Bob");
//! let (me_id, alice_id, bob_id) = (me.id, alice.id, bob.id);
//! for p in [me, alice, bob] {
//!     store.insert_person(p)?;
//! }
//! store.insert_edge(Edge::with_strength(me_id, alice_id, 0.9))?;
//! store.insert_edge(Edge::with_strength(alice_id, bob_id, 0.6))?;
//!
//! let service = GraphService::new(Arc::new(store));
//! let found = service.find_paths(me_id, bob_id, Some(PathOptions::default().max_hops(2)))?;
//! let best = &found.paths[0];
//! let why = service.explain_path(best)?;
//! assert_eq!(why.recommended_introducer.person_id, alice_id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod clock;
pub mod config;
pub mod edge;
pub mod error;
pub mod person;
pub mod value;

// Algorithms
pub mod pathfinding;
pub mod resolution;
pub mod scoring;

// Storage and orchestration
pub mod service;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{GraphConfig, PathDefaults, ResolutionConfig, ScoringConfig};
pub use edge::{Edge, EdgeKey, RelationshipType};
pub use error::{RecordKind, ValidationError, WarmpathError, WarmpathResult};
pub use person::{Organization, OrganizationId, Person, PersonId};
pub use value::{Metadata, MetadataValue};

pub use pathfinding::{
    CancellationToken, Path, PathFinder, PathOptions, PathPreferences, PathSearchResult,
    SearchMetadata,
};
pub use resolution::{
    plan_merge, EntityResolver, MatchEvidence, MatchMethod, MergePlan, OrganizationDirectory,
    Recommendation, ResolutionMatch,
};
pub use scoring::{
    calculate_strength, calculate_strength_factors, EdgeScore, InteractionHistory,
    StrengthFactors, StrengthWeights,
};
pub use service::{GraphService, GraphStats, PathExplanation};
pub use storage::{GraphStore, InMemoryGraphStore, StorageError, StoreCounts};
