//! Introduction path search.
//!
//! A level-synchronous BFS over outgoing edges, bounded by `max_hops` and
//! filtered by `min_strength`, followed by ranking on average strength with a
//! per-hop length penalty.

mod cancel;
mod finder;
mod path;

pub use cancel::CancellationToken;
pub use finder::{PathFinder, DEFAULT_LENGTH_PENALTY};
pub use path::{
    average_strength, length_penalty_for, score_edges, Path, PathOptions, PathPreferences,
    PathSearchResult, SearchMetadata, ALREADY_CONNECTED,
};
