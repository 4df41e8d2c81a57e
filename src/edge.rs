//! Directed relationship edges.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::person::PersonId;
use crate::scoring::{StrengthFactors, StrengthWeights};
use crate::value::Metadata;

/// Relationship tag carried by an edge.
///
/// Serialized as a plain string so that ingestion adapters can introduce new
/// tags without a schema change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationshipType {
    /// General acquaintance
    Knows,
    /// Shared employer, past or present
    WorkedAt,
    /// Direct reporting line
    ReportsTo,
    /// Any other tag
    Custom(String),
}

impl RelationshipType {
    /// Lowercase tag, as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Knows => "knows",
            Self::WorkedAt => "worked_at",
            Self::ReportsTo => "reports_to",
            Self::Custom(tag) => tag,
        }
    }
}

impl Default for RelationshipType {
    fn default() -> Self {
        Self::Knows
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RelationshipType {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "knows" => Self::Knows,
            "worked_at" => Self::WorkedAt,
            "reports_to" => Self::ReportsTo,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for RelationshipType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<RelationshipType> for String {
    fn from(tag: RelationshipType) -> Self {
        tag.as_str().to_string()
    }
}

/// Identity of an edge within a store: one edge per (from, to, type).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Person the relationship starts from.
    pub from: PersonId,
    /// Person the relationship points to.
    pub to: PersonId,
    /// Kind of relationship.
    pub relationship_type: RelationshipType,
}

/// A directed relationship between two people.
///
/// `strength` is the weighted sum of `strength_factors`; the constructors in
/// this module keep the two in sync.
///
/// # Examples
///
/// ```
/// use warmpath::{Edge, PersonId};
///
/// let edge = Edge::with_strength(PersonId::new(), PersonId::new(), 0.8)
///     .with_channel("email")
///     .with_source("gmail");
/// assert!((edge.strength - 0.8).abs() < 1e-12);
/// assert_eq!(edge.interaction_count, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Person the relationship starts from.
    pub from: PersonId,
    /// Person the relationship points to.
    pub to: PersonId,

    /// Kind of relationship.
    #[serde(default)]
    pub relationship_type: RelationshipType,

    /// Weighted sum of `strength_factors`, in [0, 1].
    pub strength: f64,
    /// Components behind `strength`.
    pub strength_factors: StrengthFactors,

    /// Names of the ingestion sources that contributed evidence.
    #[serde(default)]
    pub sources: BTreeSet<String>,

    /// Communication channels observed on this relationship.
    #[serde(default)]
    pub channels: BTreeSet<String>,

    /// Earliest observed interaction.
    pub first_seen_at: DateTime<Utc>,
    /// Latest observed interaction.
    pub last_seen_at: DateTime<Utc>,
    /// Interactions observed, at least 1.
    pub interaction_count: u64,

    /// Free-form attributes from ingestion.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Edge {
    /// Creates an edge whose strength is computed from `factors`.
    #[must_use]
    pub fn from_factors(
        from: PersonId,
        to: PersonId,
        factors: StrengthFactors,
        weights: &StrengthWeights,
    ) -> Self {
        let now = Utc::now();
        Self {
            from,
            to,
            relationship_type: RelationshipType::Knows,
            strength: factors.strength(weights),
            strength_factors: factors,
            sources: BTreeSet::new(),
            channels: BTreeSet::new(),
            first_seen_at: now,
            last_seen_at: now,
            interaction_count: 1,
            metadata: Metadata::new(),
        }
    }

    /// Creates an edge with a given strength.
    ///
    /// All four factors are set to `strength`, so the strength is reproduced
    /// by the default weights (or any weight set summing to 1.0).
    #[must_use]
    pub fn with_strength(from: PersonId, to: PersonId, strength: f64) -> Self {
        let strength = strength.clamp(0.0, 1.0);
        Self::from_factors(
            from,
            to,
            StrengthFactors::uniform(strength),
            &StrengthWeights::default(),
        )
        .with_exact_strength(strength)
    }

    // Keeps the caller's value bit-for-bit instead of the re-summed float.
    fn with_exact_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Sets the relationship type.
    #[must_use]
    pub fn with_type(mut self, relationship_type: impl Into<RelationshipType>) -> Self {
        self.relationship_type = relationship_type.into();
        self
    }

    /// Records a communication channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.insert(channel.into());
        self
    }

    /// Records a contributing source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.insert(source.into());
        self
    }

    /// Sets the observation window and interaction count.
    ///
    /// `last` is raised to `first` if it precedes it, and the count is at
    /// least 1 since an edge only exists once something was observed.
    #[must_use]
    pub fn seen(mut self, first: DateTime<Utc>, last: DateTime<Utc>, interactions: u64) -> Self {
        self.first_seen_at = first;
        self.last_seen_at = last.max(first);
        self.interaction_count = interactions.max(1);
        self
    }

    /// Recomputes `strength` from the stored factors.
    pub fn rescore(&mut self, weights: &StrengthWeights) {
        self.strength = self.strength_factors.strength(weights);
    }

    /// Store identity of this edge.
    #[must_use]
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from,
            to: self.to,
            relationship_type: self.relationship_type.clone(),
        }
    }

    /// Returns true when `channel` was observed on this edge (case-insensitive).
    #[must_use]
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c.eq_ignore_ascii_case(channel.trim()))
    }
}
