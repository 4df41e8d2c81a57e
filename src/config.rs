//! Engine configuration.
//!
//! Every value has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! [scoring]
//! strong_edge_threshold = 0.7
//!
//! [scoring.weights]
//! recency = 0.35
//! frequency = 0.30
//! mutuality = 0.20
//! channels = 0.15
//!
//! [paths]
//! max_hops = 3
//! min_strength = 0.3
//!
//! [resolution]
//! fuzzy_review_threshold = 0.88
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WarmpathError, WarmpathResult};
use crate::scoring::{StrengthWeights, RECENCY_HALF_LIFE_DAYS, WEIGHT_SUM_TOLERANCE};

/// Upper bound for the statistics window, roughly a century.
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Strength scoring and statistics.
    pub scoring: ScoringConfig,
    /// Path search defaults.
    pub paths: PathDefaults,
    /// Duplicate detection.
    pub resolution: ResolutionConfig,
}

/// Strength scoring and graph statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Factor weights, summing to 1.
    pub weights: StrengthWeights,
    /// Days after which the recency factor halves.
    pub recency_half_life_days: f64,
    /// Edges at or above this strength count as strong in statistics.
    pub strong_edge_threshold: f64,
    /// Trailing window for "recent interactions" in statistics.
    pub recent_window_days: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: StrengthWeights::default(),
            recency_half_life_days: RECENCY_HALF_LIFE_DAYS,
            strong_edge_threshold: 0.7,
            recent_window_days: 30,
        }
    }
}

/// Defaults applied when a path search does not specify options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathDefaults {
    /// Longest path searched, in edges.
    pub max_hops: usize,
    /// Weakest edge a path may use.
    pub min_strength: f64,
    /// Paths returned per search.
    pub max_results: usize,
    /// Multiplier applied once per hop beyond the first.
    pub length_penalty: f64,
}

impl Default for PathDefaults {
    fn default() -> Self {
        Self {
            max_hops: 3,
            min_strength: 0.3,
            max_results: 3,
            length_penalty: 0.8,
        }
    }
}

/// Duplicate detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Score given to a shared handle on the same platform.
    pub social_handle_score: f64,
    /// Fuzzy scores at or above this go to review.
    pub fuzzy_review_threshold: f64,
    /// Fuzzy scores at or above this may auto-merge when both orgs agree.
    pub fuzzy_auto_merge_threshold: f64,
    /// Name similarity required before the fuzzy layer runs.
    pub name_min_similarity: f64,
    /// Organization similarity required for auto-merge.
    pub org_min_similarity: f64,
    /// Name share of the combined score. With `org_weight`, sums to 1.
    pub name_weight: f64,
    /// Organization share of the combined score.
    pub org_weight: f64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            social_handle_score: 0.95,
            fuzzy_review_threshold: 0.88,
            fuzzy_auto_merge_threshold: 0.95,
            name_min_similarity: 0.85,
            org_min_similarity: 0.80,
            name_weight: 0.6,
            org_weight: 0.4,
        }
    }
}

impl GraphConfig {
    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// `Config` when the document does not parse, `Validation` when a value
    /// is out of range.
    pub fn from_toml_str(s: &str) -> WarmpathResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| WarmpathError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Config` when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> WarmpathResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WarmpathError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Checks weights and thresholds.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.scoring.weights.validate()?;

        let half_life = self.scoring.recency_half_life_days;
        if !(half_life.is_finite() && half_life > 0.0) {
            return Err(ValidationError::WeightOutOfRange {
                name: "recency_half_life_days",
                value: half_life,
            });
        }

        let window = self.scoring.recent_window_days;
        if !(0..=MAX_RECENT_WINDOW_DAYS).contains(&window) {
            return Err(ValidationError::RecentWindowOutOfRange {
                value: window,
                max: MAX_RECENT_WINDOW_DAYS,
            });
        }

        if self.paths.max_hops == 0 {
            return Err(ValidationError::MaxHopsOutOfRange { value: 0 });
        }
        if self.paths.max_results == 0 {
            return Err(ValidationError::MaxResultsZero);
        }
        if !(0.0..=1.0).contains(&self.paths.min_strength) {
            return Err(ValidationError::MinStrengthOutOfRange {
                value: self.paths.min_strength,
            });
        }

        let r = &self.resolution;
        for (name, value) in [
            ("strong_edge_threshold", self.scoring.strong_edge_threshold),
            ("length_penalty", self.paths.length_penalty),
            ("social_handle_score", r.social_handle_score),
            ("fuzzy_review_threshold", r.fuzzy_review_threshold),
            ("fuzzy_auto_merge_threshold", r.fuzzy_auto_merge_threshold),
            ("name_min_similarity", r.name_min_similarity),
            ("org_min_similarity", r.org_min_similarity),
            ("name_weight", r.name_weight),
            ("org_weight", r.org_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidThreshold { name, value });
            }
        }

        let sum = r.name_weight + r.org_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::MatchWeightsDoNotSumToOne { sum });
        }

        if r.fuzzy_auto_merge_threshold < r.fuzzy_review_threshold {
            return Err(ValidationError::InvalidThreshold {
                name: "fuzzy_auto_merge_threshold",
                value: r.fuzzy_auto_merge_threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = GraphConfig::from_toml_str("").unwrap();
        assert_eq!(config, GraphConfig::default());
        assert_eq!(config.paths.max_hops, 3);
        assert_eq!(config.resolution.fuzzy_review_threshold, 0.88);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GraphConfig::from_toml_str(
            r#"
            [paths]
            max_hops = 4

            [scoring.weights]
            recency = 0.25
            frequency = 0.25
            mutuality = 0.25
            channels = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.max_hops, 4);
        assert_eq!(config.paths.min_strength, 0.3);
        assert_eq!(config.scoring.weights.recency, 0.25);
        assert_eq!(config.scoring.strong_edge_threshold, 0.7);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = GraphConfig::from_toml_str(
            r#"
            [scoring.weights]
            recency = 0.9
            "#,
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = GraphConfig::from_toml_str("[paths\nmax_hops = ").unwrap_err();
        assert!(matches!(err, WarmpathError::Config(_)));
    }

    #[test]
    fn zero_hops_rejected() {
        let err = GraphConfig::from_toml_str("[paths]\nmax_hops = 0\n").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn inverted_fuzzy_thresholds_rejected() {
        let mut config = GraphConfig::default();
        config.resolution.fuzzy_auto_merge_threshold = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidThreshold { name: "fuzzy_auto_merge_threshold", .. })
        ));
    }

    #[test]
    fn recent_window_is_bounded() {
        let err =
            GraphConfig::from_toml_str("[scoring]\nrecent_window_days = 9223372036854775807")
                .unwrap_err();
        assert!(matches!(
            err,
            WarmpathError::Validation(ValidationError::RecentWindowOutOfRange { .. })
        ));

        let err = GraphConfig::from_toml_str("[scoring]\nrecent_window_days = -1").unwrap_err();
        assert!(err.is_validation());

        let config = GraphConfig::from_toml_str("[scoring]\nrecent_window_days = 36500").unwrap();
        assert_eq!(config.scoring.recent_window_days, MAX_RECENT_WINDOW_DAYS);
    }

    #[test]
    fn match_weights_must_sum_to_one() {
        let err = GraphConfig::from_toml_str(
            r#"
            [resolution]
            name_weight = 1.0
            org_weight = 1.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WarmpathError::Validation(ValidationError::MatchWeightsDoNotSumToOne { sum })
                if sum == 2.0
        ));

        let config = GraphConfig::from_toml_str(
            "[resolution]\nname_weight = 0.7\norg_weight = 0.3\n",
        )
        .unwrap();
        assert_eq!(config.resolution.name_weight, 0.7);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warmpath.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[resolution]\nname_min_similarity = 0.9").unwrap();

        let config = GraphConfig::from_file(&path).unwrap();
        assert_eq!(config.resolution.name_min_similarity, 0.9);

        let missing = GraphConfig::from_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, WarmpathError::Config(_)));
    }
}
