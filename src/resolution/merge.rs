//! Advisory merge planning for confirmed duplicates.

use serde::{Deserialize, Serialize};

use crate::person::{Person, PersonId};
use crate::resolution::similarity::{normalize_email, normalize_phone};
use crate::value::merge_metadata;

/// The record a merge would produce. Nothing is written by planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Surviving record, keeping the primary id.
    pub merged: Person,
    /// The duplicate folded into `merged`.
    pub absorbed_id: PersonId,
}

/// Folds `duplicate` into `primary`.
///
/// Primary values win on conflict. Names, emails and phones are unioned in
/// order (emails and phones compared after normalization), and the duplicate's
/// id plus its own lineage are appended to `previous_ids`.
#[must_use]
pub fn plan_merge(primary: &Person, duplicate: &Person) -> MergePlan {
    let mut merged = primary.clone();

    for name in &duplicate.names {
        merged.add_name(name.clone());
    }
    for email in &duplicate.emails {
        let key = normalize_email(email);
        if !merged.emails.iter().any(|e| normalize_email(e) == key) {
            merged.add_email(email.clone());
        }
    }
    for phone in &duplicate.phones {
        let key = normalize_phone(phone);
        if !merged.phones.iter().any(|p| normalize_phone(p) == key) {
            merged.add_phone(phone.clone());
        }
    }
    for (platform, handle) in &duplicate.social_handles {
        merged
            .social_handles
            .entry(platform.clone())
            .or_insert_with(|| handle.clone());
    }

    if merged.title.is_none() {
        merged.title.clone_from(&duplicate.title);
    }
    if merged.organization_id.is_none() {
        merged.organization_id = duplicate.organization_id;
    }
    merged.metadata = merge_metadata(&primary.metadata, &duplicate.metadata);

    merged.record_previous_id(duplicate.id);
    for id in &duplicate.previous_ids {
        merged.record_previous_id(*id);
    }

    merged.created_at = primary.created_at.min(duplicate.created_at);
    merged.updated_at = primary.updated_at.max(duplicate.updated_at);

    MergePlan {
        merged,
        absorbed_id: duplicate.id,
    }
}
