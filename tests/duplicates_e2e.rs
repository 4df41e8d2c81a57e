use std::sync::Arc;

use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warmpath::{
    plan_merge, GraphService, GraphStore, InMemoryGraphStore, MatchMethod, Organization, Person,
    Recommendation,
};

/// Log output for failing runs, enabled with `RUST_LOG=warmpath=debug`.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn shared_email_is_the_only_duplicate() {
    init_tracing();
    let store = InMemoryGraphStore::new();
    let a = Person::new("Ana Souza").with_email("a@x.com");
    let b = Person::new("Dr. A. Souza-Lima").with_email("a@x.com");
    let c = Person::new("Carlos Mendes").with_email("carlos@y.org");
    let (a_id, b_id) = (a.id, b.id);
    for p in [a, b, c] {
        store.insert_person(p).unwrap();
    }

    let service = GraphService::new(Arc::new(store));
    let matches = service.find_duplicates(a_id).unwrap();
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.candidate_id, b_id);
    assert_eq!(m.target_id, a_id);
    assert_eq!(m.score, 1.0);
    assert_eq!(m.method, MatchMethod::ExactEmail);
    assert_eq!(m.recommendation, Recommendation::AutoMerge);
    assert_eq!(m.evidence[0].target_value, "a@x.com");
}

#[test]
fn deleted_people_are_neither_targets_nor_candidates() {
    init_tracing();
    let store = InMemoryGraphStore::new();
    let a = Person::new("Ana").with_phone("+1 555 0100");
    let mut gone = Person::new("Ana").with_phone("1-555-0100");
    gone.soft_delete(Utc::now());
    let (a_id, gone_id) = (a.id, gone.id);
    store.insert_person(a).unwrap();
    store.insert_person(gone).unwrap();

    let service = GraphService::new(Arc::new(store));
    assert!(service.find_duplicates(a_id).unwrap().is_empty());
    assert!(service.find_duplicates(gone_id).unwrap_err().is_not_found());
}

#[test]
fn fuzzy_match_with_shared_organization_and_advisory_merge_plan() {
    init_tracing();
    let store = InMemoryGraphStore::new();
    let acme = Organization::new("Acme Corporation");
    let acme_id = acme.id;
    store.upsert_organization(acme).unwrap();

    let target = Person::new("Katherine Johnson")
        .with_organization(acme_id)
        .with_email("kj@acme.com");
    let close = Person::new("Katharine Johnson")
        .with_organization(acme_id)
        .with_email("katharine@gmail.com");
    let far = Person::new("Kevin Jones").with_organization(acme_id);
    let (target_id, close_id) = (target.id, close.id);
    for p in [target, close, far] {
        store.insert_person(p).unwrap();
    }

    let store = Arc::new(store);
    let service = GraphService::new(store.clone());
    let matches = service.find_duplicates(target_id).unwrap();
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m.candidate_id, close_id);
    assert_eq!(m.method, MatchMethod::FuzzyNameOrganization);
    // 0.6 * (16/17) + 0.4 * 1.0
    assert!(m.score > 0.95);
    assert_eq!(m.recommendation, Recommendation::AutoMerge);
    assert!(m.evidence.iter().any(|e| e.field == "organization"));

    let primary = store.get_person(target_id).unwrap().unwrap();
    let duplicate = store.get_person(close_id).unwrap().unwrap();
    let plan = plan_merge(&primary, &duplicate);
    assert_eq!(plan.merged.id, target_id);
    assert_eq!(plan.merged.emails.len(), 2);
    assert_eq!(plan.merged.previous_ids, vec![close_id]);
    // Planning does not write.
    assert!(store.get_person(target_id).unwrap().unwrap().previous_ids.is_empty());
}

#[test]
fn results_are_reproducible() {
    init_tracing();
    let store = InMemoryGraphStore::new();
    let target = Person::new("Jordan Lee").with_social_handle("twitter", "@jlee");
    let target_id = target.id;
    store.insert_person(target).unwrap();
    for i in 0..20 {
        let p = if i % 3 == 0 {
            Person::new(format!("Jordan Le{i}"))
        } else {
            Person::new(format!("Someone {i}")).with_social_handle("Twitter", "JLee")
        };
        store.insert_person(p).unwrap();
    }

    let service = GraphService::new(Arc::new(store));
    let first = service.find_duplicates(target_id).unwrap();
    let second = service.find_duplicates(target_id).unwrap();
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| {
        w[0].score > w[1].score
            || (w[0].score == w[1].score && w[0].candidate_id < w[1].candidate_id)
    }));
}
