//! Path explanations.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::error::WarmpathResult;
use crate::pathfinding::{length_penalty_for, score_edges, Path};
use crate::person::{Person, PersonId};
use crate::scoring::calculate_recency_factor_with_half_life;

/// Channel suggested when no edge on the path records one.
pub const DEFAULT_CHANNEL: &str = "email";

/// Sources on an edge beyond which evidence quality stops improving.
const EVIDENCE_SATURATION: usize = 3;

/// Ranking factors recomputed for a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplanationFactors {
    /// Strength of the first edge (source to first hop).
    pub introducer_strength: f64,
    /// Weakest strength after the first edge; equals the first edge for direct paths.
    pub downstream_strength: f64,
    /// Penalty applied for the hop count.
    pub length_penalty: f64,
    /// Mean recency factor over all edges.
    pub recency: f64,
    /// Mean corroboration, from the number of ingestion sources per edge.
    pub evidence_quality: f64,
}

/// Per-edge view of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct EdgeBreakdown {
    pub from: PersonId,
    pub to: PersonId,
    pub from_name: String,
    pub to_name: String,
    pub relationship_type: String,
    pub strength: f64,
    /// Recency factor at explanation time, not the stored one.
    pub recency: f64,
    pub channels: Vec<String>,
}

/// Who to ask for the introduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedIntroducer {
    /// The first hop after the source.
    pub person_id: PersonId,
    /// Display name of the introducer.
    pub name: String,
    /// Why this person, in one sentence.
    pub rationale: String,
}

/// Human-facing account of why a path ranks where it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathExplanation {
    /// Score recomputed from the path's edges.
    pub score: f64,
    /// Number of edges.
    pub hop_count: usize,
    /// Components of the score.
    pub factors: ExplanationFactors,
    /// One entry per edge, in path order.
    pub edges: Vec<EdgeBreakdown>,
    /// Multi-sentence narrative.
    pub reasoning: String,
    /// Who to ask.
    pub recommended_introducer: RecommendedIntroducer,
    /// Best channel for the first ask.
    pub suggested_channel: String,
}

fn recency_label(recency: f64) -> &'static str {
    if recency >= 0.7 {
        "recent"
    } else if recency >= 0.4 {
        "somewhat dated"
    } else {
        "stale"
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

/// Most frequent channel across `path`, ties broken alphabetically.
#[must_use]
pub fn suggested_channel(path: &Path) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for channel in path.edges.iter().flat_map(|e| e.channels.iter()) {
        let key = channel.trim().to_lowercase();
        if !key.is_empty() {
            *counts.entry(key).or_default() += 1;
        }
    }
    // BTreeMap iterates alphabetically; keep the first of equal counts.
    counts
        .into_iter()
        .fold(None::<(String, usize)>, |best, (channel, n)| match best {
            Some((_, top)) if top >= n => best,
            _ => Some((channel, n)),
        })
        .map_or_else(|| DEFAULT_CHANNEL.to_string(), |(channel, _)| channel)
}

fn recommend_introducer(path: &Path) -> RecommendedIntroducer {
    // Intermediate nodes are nodes[1..n-1]; the outgoing edge of nodes[i] is edges[i].
    let bottleneck = path
        .edges
        .iter()
        .enumerate()
        .skip(1)
        .fold(None::<(usize, f64)>, |best, (i, e)| match best {
            Some((_, s)) if s <= e.strength => best,
            _ => Some((i, e.strength)),
        });

    match bottleneck {
        Some((i, strength)) => {
            let introducer = &path.nodes[i];
            let next = &path.nodes[i + 1];
            RecommendedIntroducer {
                person_id: introducer.id,
                name: introducer.display_name().to_string(),
                rationale: format!(
                    "{}'s relationship with {} ({strength:.2}) is the weakest link on this path; \
                     ask {} for the introduction and give them context.",
                    introducer.display_name(),
                    next.display_name(),
                    introducer.display_name()
                ),
            }
        }
        None => {
            let target = &path.nodes[path.nodes.len() - 1];
            RecommendedIntroducer {
                person_id: target.id,
                name: target.display_name().to_string(),
                rationale: format!(
                    "You already know {}; reach out directly.",
                    target.display_name()
                ),
            }
        }
    }
}

/// Recomputes ranking factors for `path` as of `now`.
///
/// # Errors
///
/// `Validation` when the path is empty or its edges do not join its nodes.
pub fn explain_path(
    path: &Path,
    config: &GraphConfig,
    now: DateTime<Utc>,
) -> WarmpathResult<PathExplanation> {
    path.validate()?;

    let half_life = config.scoring.recency_half_life_days;
    let penalty = config.paths.length_penalty;

    if path.edges.is_empty() {
        let only = &path.nodes[0];
        return Ok(PathExplanation {
            score: 0.0,
            hop_count: 0,
            factors: ExplanationFactors {
                introducer_strength: 0.0,
                downstream_strength: 0.0,
                length_penalty: 1.0,
                recency: 0.0,
                evidence_quality: 0.0,
            },
            edges: Vec::new(),
            reasoning: format!(
                "{} is the start of the path; no introduction needed.",
                only.display_name()
            ),
            recommended_introducer: RecommendedIntroducer {
                person_id: only.id,
                name: only.display_name().to_string(),
                rationale: "Source and target are the same person.".to_string(),
            },
            suggested_channel: DEFAULT_CHANNEL.to_string(),
        });
    }

    let edges: Vec<EdgeBreakdown> = path
        .edges
        .iter()
        .enumerate()
        .map(|(i, e)| EdgeBreakdown {
            from: e.from,
            to: e.to,
            from_name: path.nodes[i].display_name().to_string(),
            to_name: path.nodes[i + 1].display_name().to_string(),
            relationship_type: e.relationship_type.to_string(),
            strength: e.strength,
            recency: calculate_recency_factor_with_half_life(e.last_seen_at, now, half_life),
            channels: e.channels.iter().cloned().collect(),
        })
        .collect();

    let introducer_strength = path.edges[0].strength;
    let downstream_strength = path.edges[1..]
        .iter()
        .map(|e| e.strength)
        .reduce(f64::min)
        .unwrap_or(introducer_strength);
    #[allow(clippy::cast_precision_loss)]
    let evidence_quality = mean(path.edges.iter().map(|e| {
        e.sources.len().min(EVIDENCE_SATURATION) as f64 / EVIDENCE_SATURATION as f64
    }));
    let factors = ExplanationFactors {
        introducer_strength,
        downstream_strength,
        length_penalty: length_penalty_for(path.edges.len(), penalty),
        recency: mean(edges.iter().map(|e| e.recency)),
        evidence_quality,
    };
    let score = score_edges(&path.edges, penalty);

    let source = path.nodes[0].display_name();
    let target = path.nodes[path.nodes.len() - 1].display_name();
    let hops = path.edges.len();
    let mut reasoning = if hops == 1 {
        format!("{source} knows {target} directly (strength {introducer_strength:.2}).")
    } else {
        let via = path.nodes[1..hops]
            .iter()
            .map(Person::display_name)
            .collect::<Vec<_>>()
            .join(", then ");
        format!(
            "{source} can reach {target} in {hops} hops through {via}. The first relationship \
             has strength {introducer_strength:.2} and the weakest link after it is \
             {downstream_strength:.2}; a length penalty of {:.2} gives a score of {score:.2}.",
            factors.length_penalty
        )
    };
    let _ = write!(
        reasoning,
        " Interactions along the path are {} (recency {:.2}).",
        recency_label(factors.recency),
        factors.recency
    );

    Ok(PathExplanation {
        score,
        hop_count: hops,
        factors,
        edges,
        reasoning,
        recommended_introducer: recommend_introducer(path),
        suggested_channel: suggested_channel(path),
    })
}
