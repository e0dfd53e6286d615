//! Collaborator traits at the engine's boundaries.
//!
//! These traits define the seams toward the change-set store, the
//! watch-group registry, the external user directory, and the outbound
//! mail transport, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::changeset::ChangeSet;
use crate::error::Result;
use crate::models::{
    ChangeSetSummary, CreateGroupRequest, DocumentRef, PersistOutcome, UserProfile, WatchGroup,
};

/// Persistence for change sets and their records.
#[async_trait]
pub trait ChangeSetRepository: Send + Sync {
    /// Persist a new change set and its records in one atomic unit.
    ///
    /// The matched `groups` are used only for per-group bookkeeping
    /// rows; persistence itself does not depend on them. On success
    /// the store-assigned id is written back into `set`. Persisting a
    /// set that already has an id is an invalid-input error. A zero
    /// `inserted_count` means every candidate record was filtered as
    /// noise and the caller must not notify.
    async fn persist(&self, set: &mut ChangeSet, groups: &[WatchGroup]) -> Result<PersistOutcome>;

    /// Load a change set by store id, records in persistence order.
    async fn load(&self, id: Uuid) -> Result<ChangeSet>;

    /// Recent change sets for one document, newest first.
    async fn list_for_document(&self, page_id: i64, limit: i64) -> Result<Vec<ChangeSetSummary>>;

    /// Recent change sets recorded against one watch group, newest
    /// first.
    async fn list_for_group(&self, group_id: Uuid, limit: i64) -> Result<Vec<ChangeSetSummary>>;
}

/// Read access to watch-group definitions.
#[async_trait]
pub trait WatchGroupRepository: Send + Sync {
    /// Groups whose criteria currently select the document, members
    /// included. Evaluated fresh on every call: group definitions can
    /// change between events and a stale match would silently miss
    /// notifications.
    async fn matching_groups(&self, document: &DocumentRef) -> Result<Vec<WatchGroup>>;

    /// Fetch one group by id.
    async fn get(&self, id: Uuid) -> Result<Option<WatchGroup>>;

    /// Member user ids for one group.
    async fn members(&self, group_id: Uuid) -> Result<Vec<Uuid>>;

    /// Create a group (administration/fixtures; the engine itself only
    /// reads).
    async fn create(&self, req: CreateGroupRequest) -> Result<Uuid>;

    /// Delete a group and its membership rows.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Add a member to a group. Idempotent.
    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()>;

    /// Remove a member from a group.
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()>;
}

/// External user-account directory owning notification state.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a user's profile, or `None` for an unknown id.
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>>;

    /// Advance a user's last-notified marker. Last-writer-wins is
    /// acceptable: the marker only moves forward, and a stale value
    /// risks one extra notification, never a missed one.
    async fn set_last_notified(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Outbound mail transport. Fire-and-forget: the engine neither
/// queues nor retries failed sends.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str, locale: Option<&str>) -> Result<()>;
}

/// Rendering of a change set into notification subject and body.
/// Extension point; a plain-text default lives in propwatch-notify.
pub trait ChangeSetRenderer: Send + Sync {
    fn subject(&self, set: &ChangeSet) -> String;
    fn body(&self, set: &ChangeSet) -> String;
}
