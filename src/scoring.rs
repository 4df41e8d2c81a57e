//! Relationship strength scoring.
//!
//! Converts the interaction history between two people into four factors in
//! [0, 1] and combines them into a single strength score with a fixed
//! weighted sum. Everything here is pure: time enters as an explicit `now`.

use std::collections::BTreeSet;
use std::f64::consts::LN_2;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::ValidationError;

/// Days after which the recency factor halves.
pub const RECENCY_HALF_LIFE_DAYS: f64 = 90.0;

/// Frequency factor when the first and last interaction fall on the same day.
pub const SAME_DAY_FREQUENCY: f64 = 0.5;

/// Mutuality factor for one-way relationships.
pub const ONE_WAY_MUTUALITY: f64 = 0.3;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_MONTH: f64 = 30.0;

/// (interactions per month, factor), checked top-down.
const FREQUENCY_BREAKPOINTS: [(f64, f64); 4] = [(8.0, 1.0), (4.0, 0.8), (2.0, 0.6), (1.0, 0.4)];
const SPARSE_FREQUENCY_SLOPE: f64 = 0.2;
const SPARSE_FREQUENCY_FLOOR: f64 = 0.1;

pub(crate) const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Raw interaction signals between two people.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionHistory {
    /// Earliest interaction.
    pub first_seen_at: DateTime<Utc>,
    /// Latest interaction.
    pub last_seen_at: DateTime<Utc>,
    /// All interactions, in both directions.
    pub interaction_count: u64,
    /// Messages from the first person to the second.
    pub sent_count: u64,
    /// Messages from the second person to the first.
    pub received_count: u64,
    /// Distinct channels used, e.g. `email` or `meeting`.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl InteractionHistory {
    /// Builds the history of a pair from its two directed edges.
    ///
    /// Messages on `forward` count as sent and messages on `reverse` as
    /// received. Returns `None` when neither edge exists.
    #[must_use]
    pub fn from_edges(forward: Option<&Edge>, reverse: Option<&Edge>) -> Option<Self> {
        let first_seen_at = match (forward, reverse) {
            (Some(f), Some(r)) => f.first_seen_at.min(r.first_seen_at),
            (Some(e), None) | (None, Some(e)) => e.first_seen_at,
            (None, None) => return None,
        };
        let last_seen_at = forward
            .into_iter()
            .chain(reverse)
            .map(|e| e.last_seen_at)
            .max()
            .unwrap_or(first_seen_at);

        let sent_count = forward.map_or(0, |e| e.interaction_count);
        let received_count = reverse.map_or(0, |e| e.interaction_count);
        let channels: BTreeSet<String> = forward
            .into_iter()
            .chain(reverse)
            .flat_map(|e| e.channels.iter().cloned())
            .collect();

        Some(Self {
            first_seen_at,
            last_seen_at,
            interaction_count: sent_count.saturating_add(received_count),
            sent_count,
            received_count,
            channels: channels.into_iter().collect(),
        })
    }
}

/// The four contributing factors of an edge strength, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrengthFactors {
    /// Decays with time since the last interaction.
    pub recency: f64,
    /// Interactions per month over the observed span.
    pub frequency: f64,
    /// Balance between sent and received.
    pub mutuality: f64,
    /// Breadth of channels used.
    pub channels: f64,
}

impl StrengthFactors {
    /// Factors that all equal `value`; their weighted sum is `value` under
    /// any weight set summing to 1.0.
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            recency: value,
            frequency: value,
            mutuality: value,
            channels: value,
        }
    }

    /// Combines the factors with `weights`. See [`calculate_strength`].
    #[must_use]
    pub fn strength(&self, weights: &StrengthWeights) -> f64 {
        calculate_strength(self, weights)
    }
}

/// Weights applied to each factor.
///
/// The defaults sum to 1.0. Custom weights are used as-is by
/// [`calculate_strength`]; callers that accept weights from users should run
/// [`StrengthWeights::validate`] first.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthWeights {
    pub recency: f64,
    pub frequency: f64,
    pub mutuality: f64,
    pub channels: f64,
}

impl Default for StrengthWeights {
    fn default() -> Self {
        Self {
            recency: 0.35,
            frequency: 0.30,
            mutuality: 0.20,
            channels: 0.15,
        }
    }
}

impl StrengthWeights {
    /// Sum of all four weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.recency + self.frequency + self.mutuality + self.channels
    }

    /// Checks that every weight is finite and non-negative and that they sum to 1.0.
    ///
    /// # Errors
    ///
    /// `WeightOutOfRange` for a negative or non-finite weight,
    /// `WeightsDoNotSumToOne` otherwise.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("recency", self.recency),
            ("frequency", self.frequency),
            ("mutuality", self.mutuality),
            ("channels", self.channels),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::WeightOutOfRange { name, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}

/// A computed strength together with the factors that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeScore {
    /// Weighted strength, in [0, 1].
    pub strength: f64,
    /// Factors it was computed from.
    pub factors: StrengthFactors,
}

/// Exponential decay of the days elapsed since `last_seen_at`.
///
/// 90 elapsed days yields 0.5. Timestamps in the future count as zero
/// elapsed days.
#[must_use]
pub fn calculate_recency_factor(last_seen_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    calculate_recency_factor_with_half_life(last_seen_at, now, RECENCY_HALF_LIFE_DAYS)
}

/// Same as [`calculate_recency_factor`] with a custom half-life.
#[must_use]
pub fn calculate_recency_factor_with_half_life(
    last_seen_at: DateTime<Utc>,
    now: DateTime<Utc>,
    half_life_days: f64,
) -> f64 {
    if !(half_life_days.is_finite() && half_life_days > 0.0) {
        return 0.0;
    }
    let days = days_between(last_seen_at, now).max(0.0);
    (-LN_2 * days / half_life_days).exp()
}

/// Interaction cadence over the observed span.
///
/// - 0 interactions → 0.0
/// - first and last interaction on the same calendar day → 0.5
/// - otherwise the interactions-per-month rate is bucketed: ≥ 8 → 1.0,
///   ≥ 4 → 0.8, ≥ 2 → 0.6, ≥ 1 → 0.4, below that `0.2 * rate` with a 0.1 floor.
///
/// The span is floored at one day.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_frequency_factor(
    interaction_count: u64,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
) -> f64 {
    if interaction_count == 0 {
        return 0.0;
    }
    if first_seen_at.date_naive() == last_seen_at.date_naive() {
        return SAME_DAY_FREQUENCY;
    }

    let span_days = days_between(first_seen_at, last_seen_at).abs().max(1.0);
    let per_month = interaction_count as f64 / (span_days / DAYS_PER_MONTH);

    FREQUENCY_BREAKPOINTS
        .iter()
        .find(|(rate, _)| per_month >= *rate)
        .map_or_else(
            || (SPARSE_FREQUENCY_SLOPE * per_month).max(SPARSE_FREQUENCY_FLOOR),
            |(_, factor)| *factor,
        )
}

/// Balance between the two directions of a relationship.
///
/// Symmetric in its arguments; 1.0 only when both directions are equal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_mutuality_factor(sent: u64, received: u64) -> f64 {
    match (sent, received) {
        (0, 0) => 0.0,
        (0, _) | (_, 0) => ONE_WAY_MUTUALITY,
        (a, b) => {
            let low = a.min(b) as f64;
            let total = a as f64 + b as f64;
            2.0 * low / total
        }
    }
}

/// Diversity of communication channels.
///
/// Channels are trimmed, lowercased and deduplicated before counting:
/// 0 → 0.0, 1 → 0.4, 2 → 0.7, 3 or more → 1.0.
#[must_use]
pub fn calculate_channels_factor<I, S>(channels: I) -> f64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let distinct: BTreeSet<String> = channels
        .into_iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();

    match distinct.len() {
        0 => 0.0,
        1 => 0.4,
        2 => 0.7,
        _ => 1.0,
    }
}

/// Computes all four factors for a history at time `now`.
#[must_use]
pub fn calculate_strength_factors(history: &InteractionHistory, now: DateTime<Utc>) -> StrengthFactors {
    StrengthFactors {
        recency: calculate_recency_factor(history.last_seen_at, now),
        frequency: calculate_frequency_factor(
            history.interaction_count,
            history.first_seen_at,
            history.last_seen_at,
        ),
        mutuality: calculate_mutuality_factor(history.sent_count, history.received_count),
        channels: calculate_channels_factor(&history.channels),
    }
}

/// Weighted sum of the factors, clamped to [0, 1].
///
/// Out-of-range factors or weights are not an error; only the result is
/// clamped. A non-finite result is treated as 0.
#[must_use]
pub fn calculate_strength(factors: &StrengthFactors, weights: &StrengthWeights) -> f64 {
    let raw = factors.recency * weights.recency
        + factors.frequency * weights.frequency
        + factors.mutuality * weights.mutuality
        + factors.channels * weights.channels;
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Scores a history in one step.
#[must_use]
pub fn score_history(
    history: &InteractionHistory,
    weights: &StrengthWeights,
    now: DateTime<Utc>,
) -> EdgeScore {
    let factors = calculate_strength_factors(history, now);
    EdgeScore {
        strength: calculate_strength(&factors, weights),
        factors,
    }
}

#[allow(clippy::cast_precision_loss)]
fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::person::PersonId;

    fn ts(days_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(days_ago)
    }

    #[test]
    fn strength_bounds_with_default_weights() {
        let w = StrengthWeights::default();
        assert!((calculate_strength(&StrengthFactors::uniform(1.0), &w) - 1.0).abs() < 1e-9);
        assert_eq!(calculate_strength(&StrengthFactors::uniform(0.0), &w), 0.0);

        let steps = [0.0, 0.25, 0.5, 0.75, 1.0];
        for r in steps {
            for f in steps {
                for m in steps {
                    for c in steps {
                        let s = calculate_strength(
                            &StrengthFactors { recency: r, frequency: f, mutuality: m, channels: c },
                            &w,
                        );
                        assert!((0.0..=1.0).contains(&s));
                    }
                }
            }
        }
    }

    #[test]
    fn strength_clamps_out_of_range_inputs() {
        let heavy = StrengthWeights { recency: 2.0, frequency: 2.0, mutuality: 0.0, channels: 0.0 };
        assert_eq!(calculate_strength(&StrengthFactors::uniform(1.0), &heavy), 1.0);

        let negative = StrengthFactors { recency: -3.0, ..StrengthFactors::uniform(0.0) };
        assert_eq!(calculate_strength(&negative, &StrengthWeights::default()), 0.0);

        let nan = StrengthFactors { recency: f64::NAN, ..StrengthFactors::uniform(0.5) };
        assert_eq!(calculate_strength(&nan, &StrengthWeights::default()), 0.0);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let w = StrengthWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn weights_validation() {
        let bad_sum = StrengthWeights { recency: 0.5, ..StrengthWeights::default() };
        assert!(matches!(
            bad_sum.validate(),
            Err(ValidationError::WeightsDoNotSumToOne { .. })
        ));

        let negative = StrengthWeights {
            recency: -0.1,
            frequency: 0.6,
            mutuality: 0.3,
            channels: 0.2,
        };
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::WeightOutOfRange { name: "recency", .. })
        ));
    }

    #[test]
    fn recency_half_life_is_ninety_days() {
        let now = Utc::now();
        let r = calculate_recency_factor(ts(90, now), now);
        assert!((r - 0.5).abs() < 0.01);
        assert!((calculate_recency_factor(now, now) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn recency_strictly_decreasing() {
        let now = Utc::now();
        let mut previous = calculate_recency_factor(now, now);
        for days in [1, 7, 30, 90, 180, 365, 1000] {
            let r = calculate_recency_factor(ts(days, now), now);
            assert!(r < previous, "recency must decrease at {days} days");
            assert!(r > 0.0);
            previous = r;
        }
    }

    #[test]
    fn recency_future_timestamp_is_one() {
        let now = Utc::now();
        assert!((calculate_recency_factor(now + Duration::days(3), now) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn frequency_breakpoints() {
        let now = Utc::now();
        let first = ts(60, now);
        assert_eq!(calculate_frequency_factor(0, first, now), 0.0);
        assert_eq!(calculate_frequency_factor(1, now, now), SAME_DAY_FREQUENCY);
        assert_eq!(calculate_frequency_factor(50, now, now), SAME_DAY_FREQUENCY);
        // 60-day span = 2 months.
        assert_eq!(calculate_frequency_factor(16, first, now), 1.0);
        assert_eq!(calculate_frequency_factor(8, first, now), 0.8);
        assert_eq!(calculate_frequency_factor(4, first, now), 0.6);
        assert_eq!(calculate_frequency_factor(2, first, now), 0.4);
        assert!((calculate_frequency_factor(1, first, now) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn frequency_non_decreasing_in_count() {
        let now = Utc::now();
        let first = ts(365, now);
        let mut previous = 0.0;
        for count in 0..200 {
            let f = calculate_frequency_factor(count, first, now);
            assert!(f >= previous, "frequency dropped at count {count}");
            assert!((0.0..=1.0).contains(&f));
            previous = f;
        }
    }

    #[test]
    fn mutuality_properties() {
        assert_eq!(calculate_mutuality_factor(0, 0), 0.0);
        assert_eq!(calculate_mutuality_factor(7, 0), ONE_WAY_MUTUALITY);
        assert_eq!(calculate_mutuality_factor(0, 7), ONE_WAY_MUTUALITY);
        assert_eq!(calculate_mutuality_factor(5, 5), 1.0);
        for a in 0..20 {
            for b in 0..20 {
                assert_eq!(calculate_mutuality_factor(a, b), calculate_mutuality_factor(b, a));
            }
        }
        assert!(calculate_mutuality_factor(3, 9) < 1.0);
    }

    #[test]
    fn channels_dedupe_and_ordering() {
        let none: [&str; 0] = [];
        assert_eq!(calculate_channels_factor(none), 0.0);
        assert_eq!(calculate_channels_factor(["email"]), 0.4);
        assert_eq!(calculate_channels_factor(["email", "email", "Email "]), 0.4);
        assert_eq!(calculate_channels_factor(["email", "phone"]), 0.7);
        assert_eq!(calculate_channels_factor(["phone", "email"]), 0.7);
        assert_eq!(calculate_channels_factor(["email", "phone", "linkedin"]), 1.0);
        assert_eq!(calculate_channels_factor(["a", "b", "c", "d", "a"]), 1.0);
    }

    #[test]
    fn factors_from_history() {
        let now = Utc::now();
        let history = InteractionHistory {
            first_seen_at: ts(60, now),
            last_seen_at: now,
            interaction_count: 20,
            sent_count: 10,
            received_count: 10,
            channels: vec!["email".into(), "slack".into()],
        };
        let factors = calculate_strength_factors(&history, now);
        assert!((factors.recency - 1.0).abs() < 1e-9);
        assert_eq!(factors.frequency, 1.0);
        assert_eq!(factors.mutuality, 1.0);
        assert_eq!(factors.channels, 0.7);

        let score = score_history(&history, &StrengthWeights::default(), now);
        assert!((score.strength - (0.35 + 0.30 + 0.20 + 0.15 * 0.7)).abs() < 1e-9);
    }

    #[test]
    fn history_from_directed_edges() {
        let now = Utc::now();
        let a = PersonId::new();
        let b = PersonId::new();
        let forward = Edge::with_strength(a, b, 0.5)
            .seen(ts(40, now), ts(10, now), 6)
            .with_channel("email");
        let reverse = Edge::with_strength(b, a, 0.5)
            .seen(ts(50, now), ts(2, now), 2)
            .with_channel("phone");

        let history = InteractionHistory::from_edges(Some(&forward), Some(&reverse)).unwrap();
        assert_eq!(history.sent_count, 6);
        assert_eq!(history.received_count, 2);
        assert_eq!(history.interaction_count, 8);
        assert_eq!(history.first_seen_at, ts(50, now));
        assert_eq!(history.last_seen_at, ts(2, now));
        assert_eq!(history.channels, vec!["email".to_string(), "phone".to_string()]);

        assert!(InteractionHistory::from_edges(None, None).is_none());
        let one_way = InteractionHistory::from_edges(Some(&forward), None).unwrap();
        assert_eq!(one_way.received_count, 0);
    }
}
