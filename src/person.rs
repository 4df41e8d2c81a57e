//! Person and organization records.
//!
//! These are the canonical, source-agnostic records produced by ingestion
//! adapters. The engine only reads them; merges are applied by the caller
//! through the storage collaborator.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::{Metadata, MetadataValue};

/// Metadata key holding a person's location, used by path preferences.
pub const LOCATION_KEY: &str = "location";

/// Globally unique, stable person identifier.
///
/// # Examples
///
/// ```
/// use warmpath::PersonId;
///
/// let id = PersonId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(Uuid);

impl PersonId {
    /// Creates a new random person ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a person ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Derives a stable ID from an external key (for example an ingestion
    /// adapter's contact key). The same key always yields the same ID.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil person ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for PersonId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Globally unique organization identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(Uuid);

impl OrganizationId {
    /// Creates a new random organization ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable ID from an external key.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes()))
    }
}

impl Default for OrganizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A canonical contact record.
///
/// `names`, `emails` and `phones` keep ingestion order; the first name is the
/// display name. `previous_ids` records merge lineage and only grows.
///
/// # Examples
///
/// ```
/// use warmpath::Person;
///
/// let person = Person::new("Ada Lovelace").with_email("ada@example.com");
/// assert_eq!(person.display_name(), "Ada Lovelace");
/// assert!(!person.is_deleted());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Canonical id.
    pub id: PersonId,

    /// Known names, display name first.
    #[serde(default)]
    pub names: Vec<String>,

    /// Email addresses as ingested.
    #[serde(default)]
    pub emails: Vec<String>,

    /// Phone numbers as ingested.
    #[serde(default)]
    pub phones: Vec<String>,

    /// Social platform → handle.
    #[serde(default)]
    pub social_handles: BTreeMap<String, String>,

    /// Job title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Current organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,

    /// Ids of records merged into this one.
    #[serde(default)]
    pub previous_ids: Vec<PersonId>,

    /// Free-form attributes from ingestion.
    #[serde(default)]
    pub metadata: Metadata,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker. Deleted records are never traversed or matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Person {
    /// Creates a new person with a single name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(PersonId::new(), name)
    }

    /// Creates a new person with a specific ID.
    #[must_use]
    pub fn with_id(id: PersonId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        let name = name.into();
        Self {
            id,
            names: if name.trim().is_empty() { Vec::new() } else { vec![name] },
            emails: Vec::new(),
            phones: Vec::new(),
            social_handles: BTreeMap::new(),
            title: None,
            organization_id: None,
            previous_ids: Vec::new(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Adds an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.add_email(email);
        self
    }

    /// Adds a phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.add_phone(phone);
        self
    }

    /// Sets the handle for a platform.
    #[must_use]
    pub fn with_social_handle(
        mut self,
        platform: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        self.social_handles.insert(platform.into(), handle.into());
        self
    }

    /// Sets the job title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the current organization.
    #[must_use]
    pub const fn with_organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Sets one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Adds a name unless it is already present.
    pub fn add_name(&mut self, name: impl Into<String>) {
        push_unique(&mut self.names, name.into());
    }

    /// Adds an email unless it is already present.
    pub fn add_email(&mut self, email: impl Into<String>) {
        push_unique(&mut self.emails, email.into());
    }

    /// Adds a phone number unless it is already present.
    pub fn add_phone(&mut self, phone: impl Into<String>) {
        push_unique(&mut self.phones, phone.into());
    }

    /// Appends a merged-away identifier to the lineage.
    ///
    /// Lineage is append-only: existing entries are never removed or reordered.
    pub fn record_previous_id(&mut self, id: PersonId) {
        if id != self.id && !self.previous_ids.contains(&id) {
            self.previous_ids.push(id);
        }
    }

    /// Returns the first name, or `"Unknown"` when the record has none.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.names.first().map_or("Unknown", String::as_str)
    }

    /// Returns the `location` metadata entry when it is a string.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.metadata.get(LOCATION_KEY).and_then(MetadataValue::as_str)
    }

    /// Returns true once the record has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Marks the record as soft-deleted.
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.updated_at = at;
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.trim().is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Person {}

impl std::hash::Hash for Person {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An organization a person can belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Canonical id.
    pub id: OrganizationId,

    /// Display name.
    pub name: String,

    /// Primary web domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Free-form attributes from ingestion.
    #[serde(default)]
    pub metadata: Metadata,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// Soft-delete marker. Deleted records are never traversed or matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    /// Creates a new organization.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OrganizationId::new(),
            name: name.into(),
            domain: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Sets the primary domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// True once soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
