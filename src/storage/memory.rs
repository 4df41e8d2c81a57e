//! In-memory storage backend.
//!
//! Thread-safe implementation of [`GraphStore`] for embedded usage, tests and
//! benchmarks. It is also the reference for what the engine expects from a
//! real backend: edges are returned in a stable order and soft-deleted people
//! stay readable by id.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use crate::edge::{Edge, EdgeKey};
use crate::person::{Organization, OrganizationId, Person, PersonId};
use crate::storage::traits::{GraphStore, StorageError, StoreCounts};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct GraphState {
    people: HashMap<PersonId, Person>,
    organizations: HashMap<OrganizationId, Organization>,
    edges: HashMap<EdgeKey, Edge>,
    outgoing: HashMap<PersonId, BTreeSet<EdgeKey>>,
    incoming: HashMap<PersonId, BTreeSet<EdgeKey>>,
}

impl GraphState {
    fn collect_edges(&self, keys: Option<&BTreeSet<EdgeKey>>) -> Vec<Edge> {
        keys.map(|keys| {
            keys.iter()
                .filter_map(|k| self.edges.get(k).cloned())
                .collect()
        })
        .unwrap_or_default()
    }

    fn unindex(&mut self, key: &EdgeKey) {
        if let Some(set) = self.outgoing.get_mut(&key.from) {
            set.remove(key);
            if set.is_empty() {
                self.outgoing.remove(&key.from);
            }
        }
        if let Some(set) = self.incoming.get_mut(&key.to) {
            set.remove(key);
            if set.is_empty() {
                self.incoming.remove(&key.to);
            }
        }
    }
}

/// Thread-safe in-memory graph store.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new person. Returns error if the ID already exists.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` when the ID is taken.
    pub fn insert_person(&self, person: Person) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("person.insert"))?;
        if state.people.contains_key(&person.id) {
            return Err(StorageError::DuplicateKey(person.id.to_string()));
        }
        state.people.insert(person.id, person);
        Ok(())
    }

    /// Insert a new edge. Both endpoints must already exist.
    ///
    /// # Errors
    ///
    /// `PersonNotFound` for a missing endpoint, `DuplicateKey` when an edge
    /// with the same key exists.
    pub fn insert_edge(&self, edge: Edge) -> Result<(), StorageError> {
        let key = edge.key();
        {
            let state = self.state.read().map_err(|_| lock_err("edge.insert"))?;
            if state.edges.contains_key(&key) {
                return Err(StorageError::DuplicateKey(format!(
                    "{} -> {} ({})",
                    key.from, key.to, key.relationship_type
                )));
            }
        }
        self.upsert_edge(edge)
    }

    /// Number of stored edges.
    ///
    /// # Errors
    ///
    /// `BackendError` if the lock is poisoned.
    pub fn edge_count(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("edge.count"))?;
        Ok(state.edges.len())
    }
}

impl GraphStore for InMemoryGraphStore {
    fn get_person(&self, id: PersonId) -> Result<Option<Person>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("person.get"))?;
        Ok(state.people.get(&id).cloned())
    }

    fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("organization.get"))?;
        Ok(state.organizations.get(&id).cloned())
    }

    fn get_outgoing_edges(&self, id: PersonId) -> Result<Vec<Edge>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("edge.outgoing"))?;
        Ok(state.collect_edges(state.outgoing.get(&id)))
    }

    fn get_incoming_edges(&self, id: PersonId) -> Result<Vec<Edge>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("edge.incoming"))?;
        Ok(state.collect_edges(state.incoming.get(&id)))
    }

    fn get_all_people(&self) -> Result<Vec<Person>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("person.all"))?;
        let mut people: Vec<Person> = state
            .people
            .values()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect();
        people.sort_by_key(|p| p.id);
        Ok(people)
    }

    fn get_stats(&self) -> Result<StoreCounts, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("stats"))?;
        let people = state.people.values().filter(|p| !p.is_deleted()).count();
        let organizations = state
            .organizations
            .values()
            .filter(|o| !o.is_deleted())
            .count();
        let live = |id: &PersonId| state.people.get(id).is_some_and(|p| !p.is_deleted());
        let edges = state
            .edges
            .keys()
            .filter(|k| live(&k.from) && live(&k.to))
            .count();
        Ok(StoreCounts {
            people: people as u64,
            organizations: organizations as u64,
            edges: edges as u64,
        })
    }

    fn upsert_person(&self, person: Person) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("person.upsert"))?;
        state.people.insert(person.id, person);
        Ok(())
    }

    fn upsert_organization(&self, organization: Organization) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("organization.upsert"))?;
        state.organizations.insert(organization.id, organization);
        Ok(())
    }

    fn upsert_edge(&self, edge: Edge) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("edge.upsert"))?;
        for endpoint in [edge.from, edge.to] {
            if !state.people.contains_key(&endpoint) {
                return Err(StorageError::PersonNotFound(endpoint));
            }
        }

        let key = edge.key();
        state.outgoing.entry(key.from).or_default().insert(key.clone());
        state.incoming.entry(key.to).or_default().insert(key.clone());
        state.edges.insert(key, edge);
        Ok(())
    }

    fn delete_edge(&self, key: &EdgeKey) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("edge.delete"))?;
        if state.edges.remove(key).is_none() {
            return Err(StorageError::EdgeNotFound(key.clone()));
        }
        state.unindex(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn store_with_pair() -> (InMemoryGraphStore, PersonId, PersonId) {
        let store = InMemoryGraphStore::new();
        let a = Person::new("Ana");
        let b = Person::new("Ben");
        let (a_id, b_id) = (a.id, b.id);
        store.insert_person(a).unwrap();
        store.insert_person(b).unwrap();
        (store, a_id, b_id)
    }

    #[test]
    fn person_insert_get_and_duplicate() {
        let store = InMemoryGraphStore::new();
        let person = Person::new("Ana");
        let id = person.id;
        store.insert_person(person.clone()).unwrap();
        assert_eq!(store.get_person(id).unwrap().unwrap().display_name(), "Ana");
        assert!(matches!(
            store.insert_person(person),
            Err(StorageError::DuplicateKey(_))
        ));
        assert!(store.get_person(PersonId::new()).unwrap().is_none());
    }

    #[test]
    fn edges_are_indexed_both_ways() {
        let (store, a, b) = store_with_pair();
        store.insert_edge(Edge::with_strength(a, b, 0.7)).unwrap();
        store
            .insert_edge(Edge::with_strength(a, b, 0.4).with_type("worked_at"))
            .unwrap();

        assert_eq!(store.get_outgoing_edges(a).unwrap().len(), 2);
        assert_eq!(store.get_incoming_edges(b).unwrap().len(), 2);
        assert!(store.get_outgoing_edges(b).unwrap().is_empty());
        assert_eq!(store.edge_count().unwrap(), 2);
    }

    #[test]
    fn edge_requires_existing_endpoints() {
        let (store, a, _) = store_with_pair();
        let ghost = PersonId::new();
        assert!(matches!(
            store.upsert_edge(Edge::with_strength(a, ghost, 0.5)),
            Err(StorageError::PersonNotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn upsert_edge_replaces_and_delete_unindexes() {
        let (store, a, b) = store_with_pair();
        store.upsert_edge(Edge::with_strength(a, b, 0.2)).unwrap();
        store.upsert_edge(Edge::with_strength(a, b, 0.9)).unwrap();
        let edges = store.get_outgoing_edges(a).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].strength, 0.9);

        let key = edges[0].key();
        assert!(matches!(
            store.insert_edge(Edge::with_strength(a, b, 0.1)),
            Err(StorageError::DuplicateKey(_))
        ));
        store.delete_edge(&key).unwrap();
        assert!(store.get_outgoing_edges(a).unwrap().is_empty());
        assert!(store.get_incoming_edges(b).unwrap().is_empty());
        assert!(matches!(
            store.delete_edge(&key),
            Err(StorageError::EdgeNotFound(_))
        ));
    }

    #[test]
    fn soft_deleted_people_hidden_from_listing_and_counts() {
        let (store, a, b) = store_with_pair();
        store.insert_edge(Edge::with_strength(a, b, 0.9)).unwrap();
        store.insert_edge(Edge::with_strength(b, a, 0.4)).unwrap();
        assert_eq!(store.get_stats().unwrap().edges, 2);

        let mut person = store.get_person(a).unwrap().unwrap();
        person.soft_delete(Utc::now());
        store.upsert_person(person).unwrap();

        assert_eq!(store.get_all_people().unwrap().len(), 1);
        let counts = store.get_stats().unwrap();
        assert_eq!(counts.people, 1);
        // Edges touching a deleted person are not counted in either direction.
        assert_eq!(counts.edges, 0);
        assert!(store.get_person(a).unwrap().unwrap().is_deleted());
    }

    #[test]
    fn stats_counts_organizations() {
        let store = InMemoryGraphStore::new();
        store.upsert_organization(Organization::new("Acme")).unwrap();
        let counts = store.get_stats().unwrap();
        assert_eq!(counts.organizations, 1);
        assert_eq!(counts.people, 0);
        assert_eq!(counts.edges, 0);
    }
}
