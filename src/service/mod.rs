//! Graph service: the public entry point of the engine.
//!
//! [`GraphService`] wires the storage collaborator, configuration and clock
//! into the scorer, the path finder and the entity resolver. It holds no
//! mutable state, so one instance can serve concurrent callers.

mod explain;
mod stats;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::GraphConfig;
use crate::edge::Edge;
use crate::error::{WarmpathError, WarmpathResult};
use crate::pathfinding::{CancellationToken, Path, PathFinder, PathOptions, PathSearchResult};
use crate::person::{Person, PersonId};
use crate::resolution::{EntityResolver, OrganizationDirectory, ResolutionMatch};
use crate::scoring::{
    calculate_recency_factor_with_half_life, calculate_strength, calculate_strength_factors,
    EdgeScore, InteractionHistory, StrengthWeights,
};
use crate::storage::GraphStore;

pub use explain::{
    explain_path, suggested_channel, EdgeBreakdown, ExplanationFactors, PathExplanation,
    RecommendedIntroducer, DEFAULT_CHANNEL,
};
pub use stats::{GraphStats, SourceStats};

/// Strongest edge, keeping the first of equal strength.
fn strongest(edges: impl IntoIterator<Item = Edge>) -> Option<Edge> {
    edges.into_iter().fold(None, |best: Option<Edge>, e| match best {
        Some(b) if b.strength >= e.strength => Some(b),
        _ => Some(e),
    })
}

/// Orchestrates path search, scoring, explanation, deduplication and stats.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use warmpath::{Edge, GraphService, InMemoryGraphStore, Person};
///
/// let store = InMemoryGraphStore::new();
/// let me = Person::new("Me");
/// let bob = Person::new("Bob");
/// let (me_id, bob_id) = (me.id, bob.id);
/// store.insert_person(me).unwrap();
/// store.insert_person(bob).unwrap();
/// store.insert_edge(Edge::with_strength(me_id, bob_id, 0.8)).unwrap();
///
/// let service = GraphService::new(Arc::new(store));
/// let result = service.find_paths(me_id, bob_id, None).unwrap();
/// assert_eq!(result.paths.len(), 1);
/// ```
pub struct GraphService {
    store: Arc<dyn GraphStore>,
    config: GraphConfig,
    clock: Arc<dyn Clock>,
}

impl GraphService {
    /// Creates a service with default configuration and the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            config: GraphConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a service with a validated configuration.
    ///
    /// # Errors
    ///
    /// `Validation` when `config` is out of range.
    pub fn with_config(store: Arc<dyn GraphStore>, config: GraphConfig) -> WarmpathResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source used for recency and timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn finder(&self) -> PathFinder<'_> {
        PathFinder::new(self.store.as_ref())
            .with_clock(self.clock.as_ref())
            .with_length_penalty(self.config.paths.length_penalty)
    }

    fn require_person(&self, id: PersonId, operation: &'static str) -> WarmpathResult<Person> {
        self.store
            .get_person(id)
            .map_err(WarmpathError::storage(operation))?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| WarmpathError::person_not_found(id, operation))
    }

    /// Ranked introduction paths from `source` to `target`.
    ///
    /// `None` options fall back to the configured path defaults.
    ///
    /// # Errors
    ///
    /// See [`PathFinder::find_paths`].
    pub fn find_paths(
        &self,
        source: PersonId,
        target: PersonId,
        options: Option<PathOptions>,
    ) -> WarmpathResult<PathSearchResult> {
        self.find_paths_with_cancel(source, target, options, &CancellationToken::new())
    }

    /// [`find_paths`](Self::find_paths) with cooperative cancellation.
    ///
    /// # Errors
    ///
    /// See [`PathFinder::find_paths_with_cancel`].
    pub fn find_paths_with_cancel(
        &self,
        source: PersonId,
        target: PersonId,
        options: Option<PathOptions>,
        cancel: &CancellationToken,
    ) -> WarmpathResult<PathSearchResult> {
        let options = options.unwrap_or_else(|| PathOptions::from(&self.config.paths));
        debug!(%source, %target, ?options, "find_paths");

        let result = self
            .finder()
            .find_paths_with_cancel(source, target, &options, cancel)?;

        info!(
            %source,
            %target,
            paths = result.paths.len(),
            nodes_explored = result.search_metadata.nodes_explored,
            duration_ms = result.search_metadata.duration_ms,
            "find_paths completed"
        );
        Ok(result)
    }

    /// Relationship score between two people, with its factors.
    ///
    /// Returns `None` when no edge links them in either direction.
    ///
    /// # Errors
    ///
    /// `Validation` for custom weights that do not sum to 1.0, `NotFound`
    /// for an unknown or deleted person, `Storage` when the store fails.
    pub fn score_relationship(
        &self,
        from: PersonId,
        to: PersonId,
        weights: Option<&StrengthWeights>,
    ) -> WarmpathResult<Option<EdgeScore>> {
        const OPERATION: &str = "calculate_strength";

        let weights = match weights {
            Some(w) => {
                w.validate()?;
                *w
            }
            None => self.config.scoring.weights,
        };
        self.require_person(from, OPERATION)?;
        self.require_person(to, OPERATION)?;

        let forward = strongest(
            self.store
                .get_outgoing_edges(from)
                .map_err(WarmpathError::storage(OPERATION))?
                .into_iter()
                .filter(|e| e.to == to),
        );
        let reverse = strongest(
            self.store
                .get_incoming_edges(from)
                .map_err(WarmpathError::storage(OPERATION))?
                .into_iter()
                .filter(|e| e.from == to),
        );

        let Some(history) = InteractionHistory::from_edges(forward.as_ref(), reverse.as_ref())
        else {
            return Ok(None);
        };

        let now = self.clock.now();
        let mut factors = calculate_strength_factors(&history, now);
        factors.recency = calculate_recency_factor_with_half_life(
            history.last_seen_at,
            now,
            self.config.scoring.recency_half_life_days,
        );
        Ok(Some(EdgeScore {
            strength: calculate_strength(&factors, &weights),
            factors,
        }))
    }

    /// Strength in [0, 1] of the relationship between `from` and `to`.
    ///
    /// People with no edge between them score 0.
    ///
    /// # Errors
    ///
    /// See [`score_relationship`](Self::score_relationship).
    pub fn calculate_strength(
        &self,
        from: PersonId,
        to: PersonId,
        weights: Option<&StrengthWeights>,
    ) -> WarmpathResult<f64> {
        debug!(%from, %to, custom_weights = weights.is_some(), "calculate_strength");
        let strength = self
            .score_relationship(from, to, weights)?
            .map_or(0.0, |s| s.strength);
        info!(%from, %to, strength, "calculate_strength completed");
        Ok(strength)
    }

    /// Recomputes the ranking factors of `path` and explains them.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or inconsistent path.
    pub fn explain_path(&self, path: &Path) -> WarmpathResult<PathExplanation> {
        debug!(hops = path.hop_count(), "explain_path");
        let explanation = explain_path(path, &self.config, self.clock.now())?;
        info!(
            hops = explanation.hop_count,
            introducer = %explanation.recommended_introducer.person_id,
            channel = %explanation.suggested_channel,
            "explain_path completed"
        );
        Ok(explanation)
    }

    /// Likely duplicates of `person_id` among all other people.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown or deleted person, `Storage` when the store
    /// fails.
    pub fn find_duplicates(&self, person_id: PersonId) -> WarmpathResult<Vec<ResolutionMatch>> {
        const OPERATION: &str = "find_duplicates";
        let started = Instant::now();
        debug!(%person_id, "find_duplicates");

        let target = self.require_person(person_id, OPERATION)?;
        let pool = self
            .store
            .get_all_people()
            .map_err(WarmpathError::storage(OPERATION))?;
        let organizations = self.organization_directory(&target, &pool)?;

        let matches = EntityResolver::new(self.config.resolution.clone())
            .with_organizations(organizations)
            .find_matches(&target, &pool);

        info!(
            %person_id,
            candidates = pool.len(),
            matches = matches.len(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "find_duplicates completed"
        );
        Ok(matches)
    }

    fn organization_directory(
        &self,
        target: &Person,
        pool: &[Person],
    ) -> WarmpathResult<OrganizationDirectory> {
        let ids: BTreeSet<_> = std::iter::once(target)
            .chain(pool)
            .filter_map(|p| p.organization_id)
            .collect();
        let mut directory = OrganizationDirectory::new();
        for id in ids {
            let org = self
                .store
                .get_organization(id)
                .map_err(WarmpathError::storage("find_duplicates.organizations"))?;
            if let Some(org) = org.filter(|o| !o.is_deleted()) {
                directory.insert(id, org.name);
            }
        }
        Ok(directory)
    }

    /// Graph-wide counts and activity.
    ///
    /// # Errors
    ///
    /// `Storage` when the store fails.
    pub fn get_stats(&self) -> WarmpathResult<GraphStats> {
        const OPERATION: &str = "get_stats";
        debug!("get_stats");

        let counts = self
            .store
            .get_stats()
            .map_err(WarmpathError::storage(OPERATION))?;
        let people = self
            .store
            .get_all_people()
            .map_err(WarmpathError::storage(OPERATION))?;
        // Same edge population as `counts.edges`: both endpoints live.
        let live: BTreeSet<PersonId> = people.iter().map(|p| p.id).collect();
        let mut edges = Vec::new();
        for person in &people {
            edges.extend(
                self.store
                    .get_outgoing_edges(person.id)
                    .map_err(WarmpathError::storage(OPERATION))?
                    .into_iter()
                    .filter(|e| live.contains(&e.to)),
            );
        }

        let stats = stats::aggregate(counts, &edges, &self.config.scoring, self.clock.now());
        info!(
            people = stats.total_people,
            edges = stats.total_edges,
            strong_edges = stats.strong_edges,
            "get_stats completed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ValidationError;
    use crate::person::Organization;
    use crate::resolution::Recommendation;
    use crate::storage::InMemoryGraphStore;

    fn add(store: &InMemoryGraphStore, name: &str) -> PersonId {
        let p = Person::new(name);
        let id = p.id;
        store.insert_person(p).unwrap();
        id
    }

    #[test]
    fn strength_combines_both_directions() {
        let now = Utc::now();
        let store = InMemoryGraphStore::new();
        let (a, b) = (add(&store, "a"), add(&store, "b"));
        store
            .insert_edge(
                Edge::with_strength(a, b, 0.5)
                    .seen(now - Duration::days(60), now, 10)
                    .with_channel("email"),
            )
            .unwrap();
        store
            .insert_edge(
                Edge::with_strength(b, a, 0.5)
                    .seen(now - Duration::days(60), now, 10)
                    .with_channel("slack"),
            )
            .unwrap();

        let service = GraphService::new(Arc::new(store)).with_clock(Arc::new(FixedClock(now)));
        let score = service.score_relationship(a, b, None).unwrap().unwrap();
        assert!((score.factors.recency - 1.0).abs() < 1e-12);
        assert_eq!(score.factors.frequency, 1.0);
        assert_eq!(score.factors.mutuality, 1.0);
        assert_eq!(score.factors.channels, 0.7);
        let expected = 0.35 + 0.30 + 0.20 + 0.15 * 0.7;
        assert!((score.strength - expected).abs() < 1e-9);
        assert_eq!(service.calculate_strength(a, b, None).unwrap(), score.strength);
    }

    #[test]
    fn strength_without_edges_is_zero() {
        let store = InMemoryGraphStore::new();
        let (a, b) = (add(&store, "a"), add(&store, "b"));
        let service = GraphService::new(Arc::new(store));
        assert_eq!(service.calculate_strength(a, b, None).unwrap(), 0.0);
    }

    #[test]
    fn strength_rejects_bad_weights_and_unknown_people() {
        let store = InMemoryGraphStore::new();
        let a = add(&store, "a");
        let service = GraphService::new(Arc::new(store));
        let weights = StrengthWeights {
            recency: 0.5,
            frequency: 0.5,
            mutuality: 0.5,
            channels: 0.5,
        };
        let err = service
            .calculate_strength(a, a, Some(&weights))
            .unwrap_err();
        assert!(matches!(
            err,
            WarmpathError::Validation(ValidationError::WeightsDoNotSumToOne { .. })
        ));
        assert!(service
            .calculate_strength(a, PersonId::new(), None)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn custom_weights_are_applied() {
        let now = Utc::now();
        let store = InMemoryGraphStore::new();
        let (a, b) = (add(&store, "a"), add(&store, "b"));
        store
            .insert_edge(Edge::with_strength(a, b, 0.5).seen(now, now, 1))
            .unwrap();
        let service = GraphService::new(Arc::new(store)).with_clock(Arc::new(FixedClock(now)));
        let recency_only = StrengthWeights {
            recency: 1.0,
            frequency: 0.0,
            mutuality: 0.0,
            channels: 0.0,
        };
        let s = service.calculate_strength(a, b, Some(&recency_only)).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn options_default_to_config() {
        let store = InMemoryGraphStore::new();
        let (a, b) = (add(&store, "a"), add(&store, "b"));
        store.insert_edge(Edge::with_strength(a, b, 0.4)).unwrap();
        let mut config = GraphConfig::default();
        config.paths.min_strength = 0.5;
        let service = GraphService::with_config(Arc::new(store), config).unwrap();
        assert!(service.find_paths(a, b, None).unwrap().paths.is_empty());
        let relaxed = PathOptions::default().min_strength(0.1);
        assert_eq!(service.find_paths(a, b, Some(relaxed)).unwrap().paths.len(), 1);
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = GraphConfig::default();
        config.paths.max_hops = 0;
        let result = GraphService::with_config(Arc::new(InMemoryGraphStore::new()), config);
        assert!(result.is_err_and(|e| e.is_validation()));

        let mut config = GraphConfig::default();
        config.scoring.recent_window_days = i64::MAX;
        let result = GraphService::with_config(Arc::new(InMemoryGraphStore::new()), config);
        assert!(result.is_err_and(|e| e.is_validation()));

        let mut config = GraphConfig::default();
        config.resolution.org_weight = 1.0;
        let result = GraphService::with_config(Arc::new(InMemoryGraphStore::new()), config);
        assert!(matches!(
            result,
            Err(WarmpathError::Validation(ValidationError::MatchWeightsDoNotSumToOne { .. }))
        ));
    }

    #[test]
    fn timestamps_follow_the_service_clock() {
        let at = Utc::now() - Duration::days(10);
        let store = InMemoryGraphStore::new();
        let (a, b) = (add(&store, "a"), add(&store, "b"));
        store.insert_edge(Edge::with_strength(a, b, 0.8)).unwrap();
        let service = GraphService::new(Arc::new(store)).with_clock(Arc::new(FixedClock(at)));

        assert_eq!(service.find_paths(a, b, None).unwrap().searched_at, at);
        assert_eq!(service.get_stats().unwrap().computed_at, at);
    }

    #[test]
    fn duplicates_use_organization_names() {
        let store = InMemoryGraphStore::new();
        let acme = Organization::new("Acme Corp");
        let acme_dupe = Organization::new("ACME Corp.");
        let (acme_id, dupe_id) = (acme.id, acme_dupe.id);
        store.upsert_organization(acme).unwrap();
        store.upsert_organization(acme_dupe).unwrap();

        let a = Person::new("Maria Garcia").with_organization(acme_id);
        let b = Person::new("Maria Garcia").with_organization(dupe_id);
        let c = Person::new("Maria Garcia");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        for p in [a, b, c] {
            store.insert_person(p).unwrap();
        }

        let service = GraphService::new(Arc::new(store));
        let matches = service.find_duplicates(a_id).unwrap();
        assert_eq!(matches.len(), 2);
        let by_b = matches.iter().find(|m| m.candidate_id == b_id).unwrap();
        assert_eq!(by_b.recommendation, Recommendation::AutoMerge);
        let by_c = matches.iter().find(|m| m.candidate_id == c_id).unwrap();
        assert_eq!(by_c.recommendation, Recommendation::ReviewQueue);
    }

    #[test]
    fn explain_uses_service_clock() {
        let now = Utc::now();
        let store = InMemoryGraphStore::new();
        let (a, b) = (add(&store, "a"), add(&store, "b"));
        store
            .insert_edge(Edge::with_strength(a, b, 0.8).seen(now - Duration::days(100), now - Duration::days(90), 2))
            .unwrap();
        let service = GraphService::new(Arc::new(store)).with_clock(Arc::new(FixedClock(now)));
        let path = service.find_paths(a, b, None).unwrap().paths.remove(0);
        let explanation = service.explain_path(&path).unwrap();
        assert!((explanation.factors.recency - 0.5).abs() < 1e-9);
    }
}
