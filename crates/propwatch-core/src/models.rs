//! Core data models for propwatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the document (wiki page, record, ...) a change set
/// belongs to. Captured once at change-set construction; the engine
/// never reaches back into the upstream page store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Stable upstream page/document id.
    pub page_id: i64,
    /// Namespace the document lives in.
    pub namespace: i32,
    /// Human-readable title.
    pub title: String,
    /// Categories the document is currently filed under, used for
    /// watch-group matching.
    pub categories: Vec<String>,
}

impl DocumentRef {
    pub fn new(page_id: i64, namespace: i32, title: impl Into<String>) -> Self {
        Self {
            page_id,
            namespace,
            title: title.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }
}

/// A single property delta within a change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Property identifier. Must be non-empty; the upstream detector is
    /// known to emit unnamed records when the last value of a property
    /// is removed, and those are filtered as noise during
    /// normalization.
    pub property: String,
    /// Serialized value before the change. `None` for insertions.
    pub old_value: Option<String>,
    /// Serialized value after the change. `None` for deletions.
    pub new_value: Option<String>,
}

impl ChangeRecord {
    pub fn new(
        property: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            property: property.into(),
            old_value,
            new_value,
        }
    }

    /// A record is storable when it names a property and carries at
    /// least one value. Anything else is upstream noise.
    pub fn is_valid(&self) -> bool {
        !self.property.is_empty() && (self.old_value.is_some() || self.new_value.is_some())
    }
}

/// A property whose value was replaced in one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedProperty {
    pub property: String,
    pub old_value: String,
    pub new_value: String,
}

/// A property value added in one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertedProperty {
    pub property: String,
    pub value: String,
}

/// A property value removed in one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedProperty {
    pub property: String,
    pub value: String,
}

/// Raw change event as produced by the upstream structured-data store
/// when it finalizes an edit. Treated as opaque input; normalization
/// into [`ChangeRecord`]s happens in [`crate::changeset::ChangeSet::from_raw`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChangeEvent {
    pub modifications: Vec<ModifiedProperty>,
    pub insertions: Vec<InsertedProperty>,
    pub deletions: Vec<DeletedProperty>,
}

impl RawChangeEvent {
    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty() && self.insertions.is_empty() && self.deletions.is_empty()
    }
}

/// Matching criteria for a watch group. Empty lists are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCriteria {
    /// Namespaces this group watches. Empty means every namespace.
    pub namespaces: Vec<i32>,
    /// Categories this group watches. Empty means every category; a
    /// non-empty list matches when it intersects the document's
    /// categories.
    pub categories: Vec<String>,
}

impl GroupCriteria {
    /// Evaluate the criteria against a document. The database layer
    /// mirrors this logic in SQL; this form exists for in-memory
    /// collaborators and tests.
    pub fn matches(&self, document: &DocumentRef) -> bool {
        let ns_ok = self.namespaces.is_empty() || self.namespaces.contains(&document.namespace);
        let cat_ok = self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| document.categories.contains(c));
        ns_ok && cat_ok
    }
}

/// A user-defined watch group: criteria selecting documents, plus the
/// members to notify when a selected document changes. Administered
/// outside the engine; consumed read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchGroup {
    pub id: Uuid,
    pub name: String,
    pub criteria: GroupCriteria,
    /// User ids to notify. Never mutated by the notifier.
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for creating a watch group.
#[derive(Debug, Clone)]
pub struct CreateGroupRequest {
    pub name: String,
    pub criteria: GroupCriteria,
}

/// Per-user profile as exposed by the external user directory.
///
/// `last_notified_at` / `last_watched_at` are the deduplication
/// markers: the gate fires only when the last notification predates
/// the last watch-state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub preferred_language: Option<String>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub last_watched_at: Option<DateTime<Utc>>,
}

/// Outcome of persisting a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Store-assigned change-set id.
    pub id: Uuid,
    /// Number of change-record rows written. Zero means every
    /// candidate record was filtered as noise and the caller must not
    /// notify group members.
    pub inserted_count: i64,
}

impl PersistOutcome {
    /// Whether the change set wrote at least one real record. This is
    /// the at-most-once notification trigger.
    pub fn inserted(&self) -> bool {
        self.inserted_count > 0
    }
}

/// Summary row for change-set listings (per document or per group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetSummary {
    pub id: Uuid,
    pub page_id: i64,
    pub title: String,
    pub actor: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub record_count: i64,
}
