//! Duplicate contact detection.
//!
//! The resolver is pure: callers hand it a target and a candidate pool and
//! get back classified matches with field-level evidence. Applying a merge
//! is left to the caller; [`plan_merge`] only describes the result.

mod matcher;
mod merge;
mod similarity;

pub use matcher::{
    EntityResolver, MatchEvidence, MatchMethod, OrganizationDirectory, Recommendation,
    ResolutionMatch,
};
pub use merge::{plan_merge, MergePlan};
pub use similarity::{
    best_name_similarity, levenshtein, normalize_email, normalize_handle, normalize_name,
    normalize_phone, normalized_similarity,
};
