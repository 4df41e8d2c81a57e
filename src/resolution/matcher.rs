//! Layered duplicate detection.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ResolutionConfig;
use crate::person::{OrganizationId, Person, PersonId};
use crate::resolution::similarity::{
    best_name_similarity, normalize_email, normalize_handle, normalize_name, normalize_phone,
    normalized_similarity,
};

/// Which layer produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// A normalized email address is shared.
    ExactEmail,
    /// A phone number is shared, compared on digits only.
    ExactPhone,
    /// The same handle on the same platform.
    SocialHandle,
    /// Similar names, weighted with organization similarity when known.
    FuzzyNameOrganization,
}

/// What the caller should do with a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Safe to merge without human review.
    AutoMerge,
    /// Needs human confirmation.
    ReviewQueue,
    /// Not a duplicate. Never returned by [`EntityResolver::find_matches`].
    Reject,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoMerge => write!(f, "auto_merge"),
            Self::ReviewQueue => write!(f, "review_queue"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Field-level audit trail for a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvidence {
    /// Field compared, e.g. `email` or `organization`.
    pub field: String,
    /// Raw value on the target.
    pub target_value: String,
    /// Raw value on the candidate.
    pub candidate_value: String,
    /// Similarity of the two values, in [0, 1].
    pub similarity: f64,
}

impl MatchEvidence {
    fn new(
        field: impl Into<String>,
        target_value: impl Into<String>,
        candidate_value: impl Into<String>,
        similarity: f64,
    ) -> Self {
        Self {
            field: field.into(),
            target_value: target_value.into(),
            candidate_value: candidate_value.into(),
            similarity,
        }
    }
}

/// A candidate classified as a likely duplicate of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionMatch {
    /// Person duplicates were searched for.
    pub target_id: PersonId,
    /// Likely duplicate.
    pub candidate_id: PersonId,
    /// Match confidence, in [0, 1].
    pub score: f64,
    /// Layer that produced the match.
    pub method: MatchMethod,
    /// Suggested handling.
    pub recommendation: Recommendation,
    /// Fields that support the match.
    pub evidence: Vec<MatchEvidence>,
}

/// Organization names keyed by id, used by the fuzzy layer.
#[derive(Debug, Clone, Default)]
pub struct OrganizationDirectory {
    names: HashMap<OrganizationId, String>,
}

impl OrganizationDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or renames an organization.
    pub fn insert(&mut self, id: OrganizationId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Name for `id`, if known.
    #[must_use]
    pub fn name(&self, id: OrganizationId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of organizations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no organization is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(OrganizationId, S)> for OrganizationDirectory {
    fn from_iter<T: IntoIterator<Item = (OrganizationId, S)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }
}

/// Compares persons against a target and classifies likely duplicates.
///
/// Layers run in order (email, phone, social handle, fuzzy name plus
/// organization). The exact layers all recommend `auto_merge`, so the first
/// one that fires decides the match and later layers are skipped for that
/// candidate.
///
/// Matching never consults the clock or any random source: identical inputs
/// yield identical results.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    config: ResolutionConfig,
    organizations: OrganizationDirectory,
}

impl EntityResolver {
    /// Creates a resolver with no organization names loaded.
    ///
    /// `config` is taken as given; use [`crate::GraphConfig::validate`] to
    /// reject inconsistent thresholds up front.
    #[must_use]
    pub fn new(config: ResolutionConfig) -> Self {
        Self {
            config,
            organizations: OrganizationDirectory::default(),
        }
    }

    /// Organization names used by the fuzzy layer.
    #[must_use]
    pub fn with_organizations(mut self, organizations: OrganizationDirectory) -> Self {
        self.organizations = organizations;
        self
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Returns the duplicates of `target` found in `candidates`, best first.
    ///
    /// The target itself and soft-deleted candidates are ignored; rejected
    /// candidates are omitted.
    #[must_use]
    pub fn find_matches(&self, target: &Person, candidates: &[Person]) -> Vec<ResolutionMatch> {
        let mut matches: Vec<ResolutionMatch> = candidates
            .iter()
            .filter(|c| c.id != target.id && !c.is_deleted())
            .filter_map(|c| self.match_candidate(target, c))
            .filter(|m| m.recommendation != Recommendation::Reject)
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        matches
    }

    /// Classifies one candidate, including `Reject` outcomes of the fuzzy layer.
    #[must_use]
    pub fn match_candidate(&self, target: &Person, candidate: &Person) -> Option<ResolutionMatch> {
        let found = Self::match_email(target, candidate)
            .or_else(|| Self::match_phone(target, candidate))
            .or_else(|| self.match_social(target, candidate))
            .or_else(|| self.match_fuzzy(target, candidate));
        if let Some(m) = &found {
            trace!(
                target_id = %target.id,
                candidate_id = %candidate.id,
                method = ?m.method,
                score = m.score,
                recommendation = %m.recommendation,
                "resolution layer hit"
            );
        }
        found
    }

    fn exact(
        target: &Person,
        candidate: &Person,
        score: f64,
        method: MatchMethod,
        evidence: Vec<MatchEvidence>,
    ) -> Option<ResolutionMatch> {
        if evidence.is_empty() {
            return None;
        }
        Some(ResolutionMatch {
            target_id: target.id,
            candidate_id: candidate.id,
            score,
            method,
            recommendation: Recommendation::AutoMerge,
            evidence,
        })
    }

    fn match_email(target: &Person, candidate: &Person) -> Option<ResolutionMatch> {
        let evidence = shared_values(&target.emails, &candidate.emails, normalize_email)
            .into_iter()
            .map(|(t, c)| MatchEvidence::new("email", t, c, 1.0))
            .collect();
        Self::exact(target, candidate, 1.0, MatchMethod::ExactEmail, evidence)
    }

    fn match_phone(target: &Person, candidate: &Person) -> Option<ResolutionMatch> {
        let evidence = shared_values(&target.phones, &candidate.phones, normalize_phone)
            .into_iter()
            .map(|(t, c)| MatchEvidence::new("phone", t, c, 1.0))
            .collect();
        Self::exact(target, candidate, 1.0, MatchMethod::ExactPhone, evidence)
    }

    fn match_social(&self, target: &Person, candidate: &Person) -> Option<ResolutionMatch> {
        let mut evidence = Vec::new();
        for (platform, handle) in &target.social_handles {
            let key = normalize_handle(handle);
            if key.is_empty() {
                continue;
            }
            for (other_platform, other_handle) in &candidate.social_handles {
                if platform.trim().eq_ignore_ascii_case(other_platform.trim())
                    && normalize_handle(other_handle) == key
                {
                    evidence.push(MatchEvidence::new(
                        format!("social:{}", platform.trim().to_lowercase()),
                        handle.as_str(),
                        other_handle.as_str(),
                        1.0,
                    ));
                }
            }
        }
        Self::exact(
            target,
            candidate,
            self.config.social_handle_score,
            MatchMethod::SocialHandle,
            evidence,
        )
    }

    fn organization_similarity(
        &self,
        target: &Person,
        candidate: &Person,
    ) -> Option<(String, String, f64)> {
        let (t_org, c_org) = (target.organization_id?, candidate.organization_id?);
        let t_name = self.organizations.name(t_org);
        let c_name = self.organizations.name(c_org);
        if t_org == c_org {
            let label = t_name.map_or_else(|| t_org.to_string(), str::to_string);
            return Some((label.clone(), label, 1.0));
        }
        let (t_name, c_name) = (t_name?, c_name?);
        let similarity = normalized_similarity(&normalize_name(t_name), &normalize_name(c_name));
        Some((t_name.to_string(), c_name.to_string(), similarity))
    }

    fn match_fuzzy(&self, target: &Person, candidate: &Person) -> Option<ResolutionMatch> {
        let cfg = &self.config;
        let (t_name, c_name, name_sim) = best_name_similarity(&target.names, &candidate.names)?;
        if name_sim < cfg.name_min_similarity {
            return None;
        }

        let mut evidence = vec![MatchEvidence::new("name", t_name, c_name, name_sim)];
        let org = self.organization_similarity(target, candidate);
        let score = match &org {
            Some((t_org, c_org, org_sim)) => {
                evidence.push(MatchEvidence::new(
                    "organization",
                    t_org.as_str(),
                    c_org.as_str(),
                    *org_sim,
                ));
                (cfg.name_weight * name_sim + cfg.org_weight * org_sim).clamp(0.0, 1.0)
            }
            None => name_sim,
        };

        let org_ok = org
            .as_ref()
            .is_some_and(|(_, _, sim)| *sim >= cfg.org_min_similarity);
        let recommendation = if score >= cfg.fuzzy_auto_merge_threshold && org_ok {
            Recommendation::AutoMerge
        } else if score >= cfg.fuzzy_review_threshold {
            Recommendation::ReviewQueue
        } else {
            Recommendation::Reject
        };

        Some(ResolutionMatch {
            target_id: target.id,
            candidate_id: candidate.id,
            score,
            method: MatchMethod::FuzzyNameOrganization,
            recommendation,
            evidence,
        })
    }
}

/// Pairs of raw values whose normalized forms agree, in target order.
fn shared_values<'a>(
    target: &'a [String],
    candidate: &'a [String],
    normalize: fn(&str) -> String,
) -> Vec<(&'a str, &'a str)> {
    let mut out = Vec::new();
    for t in target {
        let key = normalize(t);
        if key.is_empty() {
            continue;
        }
        if let Some(c) = candidate.iter().find(|c| normalize(c) == key) {
            out.push((t.as_str(), c.as_str()));
        }
    }
    out
}
