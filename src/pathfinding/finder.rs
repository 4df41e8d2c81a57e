//! Breadth-first introduction path search.

use std::cmp::Ordering;
use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::hash_map::Entry as HashEntry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::edge::Edge;
use crate::error::{ValidationError, WarmpathError, WarmpathResult};
use crate::pathfinding::cancel::CancellationToken;
use crate::pathfinding::path::{
    average_strength, score_edges, Path, PathOptions, PathSearchResult, SearchMetadata,
    ALREADY_CONNECTED,
};
use crate::person::{Person, PersonId};
use crate::storage::GraphStore;

/// Score multiplier per hop beyond the first.
pub const DEFAULT_LENGTH_PENALTY: f64 = 0.8;

const OPERATION: &str = "find_paths";

/// A route under construction.
#[derive(Debug, Clone)]
struct Partial {
    tail: PersonId,
    nodes: Vec<PersonId>,
    edges: Vec<Edge>,
    strength_sum: f64,
}

impl Partial {
    fn root(id: PersonId) -> Self {
        Self {
            tail: id,
            nodes: vec![id],
            edges: Vec::new(),
            strength_sum: 0.0,
        }
    }

    fn extend(&self, edge: &Edge) -> Self {
        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.extend_from_slice(&self.nodes);
        nodes.push(edge.to);
        let mut edges = Vec::with_capacity(self.edges.len() + 1);
        edges.extend_from_slice(&self.edges);
        edges.push(edge.clone());
        Self {
            tail: edge.to,
            nodes,
            edges,
            strength_sum: self.strength_sum + edge.strength,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> f64 {
        if self.edges.is_empty() {
            0.0
        } else {
            self.strength_sum / self.edges.len() as f64
        }
    }

    fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.edges.last().map(|e| e.last_seen_at)
    }

    /// Compares two partials of equal length: stronger, then more recent final edge.
    fn outranks(&self, other: &Self) -> bool {
        match self.average().total_cmp(&other.average()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.last_seen() > other.last_seen(),
        }
    }
}

fn keep_best<K: Ord>(map: &mut BTreeMap<K, Partial>, key: K, candidate: Partial) {
    match map.entry(key) {
        BTreeEntry::Vacant(slot) => {
            slot.insert(candidate);
        }
        BTreeEntry::Occupied(mut slot) => {
            if candidate.outranks(slot.get()) {
                slot.insert(candidate);
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Renders `"Ana → Ben → Cleo (2 hops, average strength 0.75)"`.
fn describe(nodes: &[Person], edges: &[Edge]) -> String {
    let mut out = nodes
        .iter()
        .map(Person::display_name)
        .collect::<Vec<_>>()
        .join(" → ");
    let avg = average_strength(edges);
    if edges.len() == 1 {
        let _ = write!(out, " (direct connection, strength {avg:.2})");
    } else {
        let _ = write!(out, " ({} hops, average strength {avg:.2})", edges.len());
    }
    out
}

/// Enumerates and ranks introduction paths over a [`GraphStore`].
///
/// Every search allocates its own frontier and visited set, so one finder
/// (or many) can serve concurrent searches.
pub struct PathFinder<'a> {
    store: &'a dyn GraphStore,
    clock: &'a dyn Clock,
    length_penalty: f64,
}

impl<'a> PathFinder<'a> {
    /// Creates a finder reading from `store`, stamped by the system clock.
    #[must_use]
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            clock: &SystemClock,
            length_penalty: DEFAULT_LENGTH_PENALTY,
        }
    }

    /// Clock used for `searched_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Per-hop score multiplier. Must lie in [0, 1]; searches reject
    /// anything else, NaN included.
    #[must_use]
    pub const fn with_length_penalty(mut self, length_penalty: f64) -> Self {
        self.length_penalty = length_penalty;
        self
    }

    fn validate(&self, options: &PathOptions) -> Result<(), ValidationError> {
        options.validate()?;
        if !(0.0..=1.0).contains(&self.length_penalty) {
            return Err(ValidationError::InvalidThreshold {
                name: "length_penalty",
                value: self.length_penalty,
            });
        }
        Ok(())
    }

    /// Finds up to `options.max_results` paths from `source` to `target`.
    ///
    /// # Errors
    ///
    /// `Validation` for bad options, `NotFound` when either endpoint is
    /// missing or soft-deleted, `Storage` when the store fails.
    pub fn find_paths(
        &self,
        source: PersonId,
        target: PersonId,
        options: &PathOptions,
    ) -> WarmpathResult<PathSearchResult> {
        self.find_paths_with_cancel(source, target, options, &CancellationToken::new())
    }

    /// Like [`find_paths`](Self::find_paths), checking `cancel` before each BFS level.
    ///
    /// # Errors
    ///
    /// As `find_paths`, plus `Cancelled` once `cancel` fires.
    pub fn find_paths_with_cancel(
        &self,
        source: PersonId,
        target: PersonId,
        options: &PathOptions,
        cancel: &CancellationToken,
    ) -> WarmpathResult<PathSearchResult> {
        let started = Instant::now();
        self.validate(options)?;

        let source_person = self.require_person(source)?;
        let target_person = self.require_person(target)?;

        debug!(
            %source,
            %target,
            max_hops = options.max_hops,
            min_strength = options.min_strength,
            "path search started"
        );

        if source == target {
            return Ok(PathSearchResult {
                paths: Vec::new(),
                target_person,
                search_metadata: SearchMetadata {
                    duration_ms: elapsed_ms(started),
                    ..SearchMetadata::default()
                },
                note: Some(ALREADY_CONNECTED.to_string()),
                searched_at: self.clock.now(),
            });
        }

        // `None` marks a person that must not be traversed (missing or deleted).
        let mut people: HashMap<PersonId, Option<Person>> = HashMap::new();
        people.insert(source, Some(source_person));
        people.insert(target, Some(target_person.clone()));

        let mut visited: HashSet<PersonId> = HashSet::from([source]);
        let mut frontier = vec![Partial::root(source)];
        let mut candidates: BTreeMap<Vec<PersonId>, Partial> = BTreeMap::new();
        let mut metadata = SearchMetadata::default();

        for depth in 1..=options.max_hops {
            if frontier.is_empty() {
                break;
            }
            if cancel.is_cancelled() {
                debug!(%source, %target, depth, "path search cancelled");
                return Err(WarmpathError::Cancelled {
                    operation: OPERATION,
                });
            }

            let mut next: BTreeMap<PersonId, Partial> = BTreeMap::new();
            for partial in &frontier {
                let mut edges = self
                    .store
                    .get_outgoing_edges(partial.tail)
                    .map_err(WarmpathError::storage("find_paths.outgoing_edges"))?;
                metadata.nodes_explored += 1;
                edges.sort_by(|a, b| {
                    b.strength
                        .total_cmp(&a.strength)
                        .then_with(|| a.to.cmp(&b.to))
                });

                for edge in &edges {
                    metadata.edges_evaluated += 1;
                    if edge.from != partial.tail || !(edge.strength >= options.min_strength) {
                        continue;
                    }
                    if edge.to == target {
                        let found = partial.extend(edge);
                        keep_best(&mut candidates, found.nodes.clone(), found);
                        continue;
                    }
                    if depth == options.max_hops || visited.contains(&edge.to) {
                        continue;
                    }
                    if !self.is_traversable(edge.to, &mut people)? {
                        continue;
                    }
                    keep_best(&mut next, edge.to, partial.extend(edge));
                }
            }

            visited.extend(next.keys().copied());
            frontier = next.into_values().collect();
            metadata.levels_completed = depth;
            trace!(
                depth,
                frontier = frontier.len(),
                candidates = candidates.len(),
                edges_evaluated = metadata.edges_evaluated,
                "bfs level complete"
            );
        }

        let mut ranked = candidates
            .into_values()
            .map(|candidate| self.materialize(candidate, &people, options))
            .collect::<WarmpathResult<Vec<_>>>()?;

        ranked.sort_by(|(a, a_bonus), (b, b_bonus)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b_bonus.cmp(a_bonus))
                .then_with(|| {
                    let a_seen = a.final_edge().map(|e| e.last_seen_at);
                    let b_seen = b.final_edge().map(|e| e.last_seen_at);
                    b_seen.cmp(&a_seen)
                })
                .then_with(|| a.node_ids().cmp(&b.node_ids()))
        });
        let total_found = ranked.len();
        ranked.truncate(options.max_results);

        metadata.duration_ms = elapsed_ms(started);
        debug!(
            %source,
            %target,
            found = total_found,
            returned = ranked.len(),
            nodes_explored = metadata.nodes_explored,
            edges_evaluated = metadata.edges_evaluated,
            duration_ms = metadata.duration_ms,
            "path search finished"
        );

        Ok(PathSearchResult {
            paths: ranked.into_iter().map(|(path, _)| path).collect(),
            target_person,
            search_metadata: metadata,
            note: None,
            searched_at: self.clock.now(),
        })
    }

    fn require_person(&self, id: PersonId) -> WarmpathResult<Person> {
        self.store
            .get_person(id)
            .map_err(WarmpathError::storage("find_paths.get_person"))?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| WarmpathError::person_not_found(id, OPERATION))
    }

    fn is_traversable(
        &self,
        id: PersonId,
        people: &mut HashMap<PersonId, Option<Person>>,
    ) -> WarmpathResult<bool> {
        if let Some(entry) = people.get(&id) {
            return Ok(entry.is_some());
        }
        let person = self
            .store
            .get_person(id)
            .map_err(WarmpathError::storage("find_paths.get_person"))?
            .filter(|p| !p.is_deleted());
        let traversable = person.is_some();
        if let HashEntry::Vacant(slot) = people.entry(id) {
            slot.insert(person);
        }
        Ok(traversable)
    }

    fn materialize(
        &self,
        candidate: Partial,
        people: &HashMap<PersonId, Option<Person>>,
        options: &PathOptions,
    ) -> WarmpathResult<(Path, i64)> {
        let nodes = candidate
            .nodes
            .iter()
            .map(|id| {
                people.get(id).cloned().flatten().ok_or_else(|| {
                    WarmpathError::internal(format!("path node {id} was not loaded"))
                })
            })
            .collect::<WarmpathResult<Vec<Person>>>()?;

        let bonus = options.preferences.bonus(&nodes, &candidate.edges);
        let path = Path {
            score: score_edges(&candidate.edges, self.length_penalty),
            explanation: describe(&nodes, &candidate.edges),
            nodes,
            edges: candidate.edges,
        };
        Ok((path, bonus))
    }
}
