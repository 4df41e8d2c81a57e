//! Graph-wide statistics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::edge::Edge;
use crate::person::PersonId;
use crate::storage::StoreCounts;

/// Activity attributed to one ingestion source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    /// Distinct people reached by edges carrying this source.
    pub contacts: u64,
    /// Interactions recorded on those edges.
    pub interactions: u64,
}

/// Aggregated view of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Non-deleted people.
    pub total_people: u64,
    /// Non-deleted organizations.
    pub total_organizations: u64,
    /// Edges between non-deleted people. Every edge figure below covers the
    /// same set.
    pub total_edges: u64,
    /// Edges per person.
    pub average_connections: f64,
    /// Edges with strength at or above the configured threshold.
    pub strong_edges: u64,
    /// Interactions on edges last seen inside the trailing window.
    pub recent_interactions: u64,
    /// Activity per ingestion source.
    pub by_source: BTreeMap<String, SourceStats>,
    /// Clock reading the figures were computed at.
    pub computed_at: DateTime<Utc>,
}

/// Combines raw store counts with edge-level aggregates.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn aggregate<'a>(
    counts: StoreCounts,
    edges: impl IntoIterator<Item = &'a Edge>,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> GraphStats {
    let window_start = Duration::try_days(config.recent_window_days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut strong_edges = 0u64;
    let mut recent_interactions = 0u64;
    let mut sources: BTreeMap<String, (BTreeSet<PersonId>, u64)> = BTreeMap::new();

    for edge in edges {
        if edge.strength >= config.strong_edge_threshold {
            strong_edges += 1;
        }
        if edge.last_seen_at >= window_start && edge.last_seen_at <= now {
            recent_interactions = recent_interactions.saturating_add(edge.interaction_count);
        }
        for source in &edge.sources {
            let entry = sources.entry(source.clone()).or_default();
            entry.0.insert(edge.to);
            entry.1 = entry.1.saturating_add(edge.interaction_count);
        }
    }

    let average_connections = if counts.people == 0 {
        0.0
    } else {
        counts.edges as f64 / counts.people as f64
    };

    GraphStats {
        total_people: counts.people,
        total_organizations: counts.organizations,
        total_edges: counts.edges,
        average_connections,
        strong_edges,
        recent_interactions,
        by_source: sources
            .into_iter()
            .map(|(name, (contacts, interactions))| {
                (
                    name,
                    SourceStats {
                        contacts: contacts.len() as u64,
                        interactions,
                    },
                )
            })
            .collect(),
        computed_at: now,
    }
}
