//! Path, search options and search results.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PathDefaults;
use crate::edge::Edge;
use crate::error::ValidationError;
use crate::person::{Person, PersonId};

/// Explanation returned when source and target are the same person.
pub const ALREADY_CONNECTED: &str = "Source and target are the same person; already connected.";

/// An introduction route: `nodes[i]` is linked to `nodes[i + 1]` by `edges[i]`.
///
/// Paths are computed on demand and never stored by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// People along the route, source first, target last.
    pub nodes: Vec<Person>,
    /// Edges between consecutive nodes.
    pub edges: Vec<Edge>,
    /// Ranking score: average strength times the length penalty.
    pub score: f64,
    /// One-line human summary.
    pub explanation: String,
}

impl Path {
    /// Number of edges.
    #[must_use]
    pub fn hop_count(&self) -> usize {
        self.edges.len()
    }

    /// Mean strength of the edges, 0 for an edgeless path.
    #[must_use]
    pub fn average_strength(&self) -> f64 {
        average_strength(&self.edges)
    }

    /// Edge that reaches the target.
    #[must_use]
    pub fn final_edge(&self) -> Option<&Edge> {
        self.edges.last()
    }

    /// Ids of `nodes`, in order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<PersonId> {
        self.nodes.iter().map(|p| p.id).collect()
    }

    /// True when no person appears twice.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.nodes.iter().all(|p| seen.insert(p.id))
    }

    /// Checks that nodes and edges line up.
    ///
    /// # Errors
    ///
    /// `EmptyPath` without nodes, `MalformedPath` when the edge count is not
    /// one less than the node count or an edge does not join its neighbours.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nodes.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if self.edges.len() + 1 != self.nodes.len() {
            return Err(ValidationError::MalformedPath {
                reason: format!(
                    "{} nodes require {} edges, found {}",
                    self.nodes.len(),
                    self.nodes.len() - 1,
                    self.edges.len()
                ),
            });
        }
        for (i, edge) in self.edges.iter().enumerate() {
            let (from, to) = (&self.nodes[i], &self.nodes[i + 1]);
            if edge.from != from.id || edge.to != to.id {
                return Err(ValidationError::MalformedPath {
                    reason: format!("edge {i} does not connect {} to {}", from.id, to.id),
                });
            }
        }
        Ok(())
    }
}

/// Mean strength over `edges`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_strength(edges: &[Edge]) -> f64 {
    if edges.is_empty() {
        return 0.0;
    }
    edges.iter().map(|e| e.strength).sum::<f64>() / edges.len() as f64
}

/// `length_penalty^(hops - 1)`: a direct hop is not penalized.
#[must_use]
pub fn length_penalty_for(hops: usize, length_penalty: f64) -> f64 {
    let extra = i32::try_from(hops.saturating_sub(1)).unwrap_or(i32::MAX);
    length_penalty.powi(extra)
}

/// Ranking score of an edge sequence: average strength times length penalty.
#[must_use]
pub fn score_edges(edges: &[Edge], length_penalty: f64) -> f64 {
    if edges.is_empty() {
        return 0.0;
    }
    average_strength(edges) * length_penalty_for(edges.len(), length_penalty)
}

/// Soft preferences applied when ranking equally scored paths.
///
/// Nothing here filters paths out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPreferences {
    /// Relationship tags to steer away from.
    pub avoid_relationship_types: Vec<String>,
    /// Channels the caller would like to use.
    pub preferred_channels: Vec<String>,
    /// Locations (person `location` metadata) to favour for introducers.
    pub preferred_locations: Vec<String>,
}

impl PathPreferences {
    /// True when no preference is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.avoid_relationship_types.is_empty()
            && self.preferred_channels.is_empty()
            && self.preferred_locations.is_empty()
    }

    /// Preference bonus of a path: +1 per edge on a preferred channel, +1 per
    /// non-source node in a preferred location, -1 per edge of an avoided type.
    #[must_use]
    pub fn bonus(&self, nodes: &[Person], edges: &[Edge]) -> i64 {
        if self.is_empty() {
            return 0;
        }
        let mut bonus = 0i64;
        for edge in edges {
            if self
                .preferred_channels
                .iter()
                .any(|c| edge.has_channel(c))
            {
                bonus += 1;
            }
            if self
                .avoid_relationship_types
                .iter()
                .any(|t| t.trim().eq_ignore_ascii_case(edge.relationship_type.as_str()))
            {
                bonus -= 1;
            }
        }
        for node in nodes.iter().skip(1) {
            if let Some(location) = node.location() {
                if self
                    .preferred_locations
                    .iter()
                    .any(|l| l.trim().eq_ignore_ascii_case(location.trim()))
                {
                    bonus += 1;
                }
            }
        }
        bonus
    }
}

/// Options for a path search.
///
/// # Example
/// ```
/// use warmpath::PathOptions;
///
/// let options = PathOptions::default().max_hops(2).min_strength(0.5);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Longest path searched, in edges. At least 1.
    pub max_hops: usize,
    /// Edges weaker than this are never traversed.
    pub min_strength: f64,
    /// Paths returned after ranking.
    pub max_results: usize,
    /// Soft tie-break preferences.
    pub preferences: PathPreferences,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self::from(&PathDefaults::default())
    }
}

impl From<&PathDefaults> for PathOptions {
    fn from(defaults: &PathDefaults) -> Self {
        Self {
            max_hops: defaults.max_hops,
            min_strength: defaults.min_strength,
            max_results: defaults.max_results,
            preferences: PathPreferences::default(),
        }
    }
}

impl PathOptions {
    /// Sets `max_hops`.
    #[must_use]
    pub const fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Sets `min_strength`.
    #[must_use]
    pub const fn min_strength(mut self, min_strength: f64) -> Self {
        self.min_strength = min_strength;
        self
    }

    /// Sets `max_results`.
    #[must_use]
    pub const fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Sets the ranking preferences.
    #[must_use]
    pub fn preferences(mut self, preferences: PathPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Rejects options that cannot drive a search.
    ///
    /// # Errors
    ///
    /// `MaxHopsOutOfRange` when `max_hops < 1`, `MinStrengthOutOfRange` when
    /// `min_strength` is outside [0, 1], `MaxResultsZero` when no result is
    /// requested.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_hops < 1 {
            return Err(ValidationError::MaxHopsOutOfRange {
                value: self.max_hops,
            });
        }
        if !(0.0..=1.0).contains(&self.min_strength) {
            return Err(ValidationError::MinStrengthOutOfRange {
                value: self.min_strength,
            });
        }
        if self.max_results == 0 {
            return Err(ValidationError::MaxResultsZero);
        }
        Ok(())
    }
}

/// Observability counters for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Nodes whose outgoing edges were fetched.
    pub nodes_explored: usize,
    /// Outgoing edges examined, including those below `min_strength`.
    pub edges_evaluated: usize,
    /// BFS levels fully processed.
    pub levels_completed: usize,
    /// Wall time of the search.
    pub duration_ms: u64,
}

/// Outcome of a path search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSearchResult {
    /// Ranked best-first, at most `max_results`.
    pub paths: Vec<Path>,
    /// The resolved target.
    pub target_person: Person,
    /// Traversal counters.
    pub search_metadata: SearchMetadata,
    /// Set when the search short-circuits (for example [`ALREADY_CONNECTED`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the search ran, from the caller's clock.
    pub searched_at: DateTime<Utc>,
}
