//! Change-set construction and normalization.
//!
//! A [`ChangeSet`] is the normalized record of all property changes
//! attributed to one document edit. It is built once from the upstream
//! store's raw event and is immutable afterwards, except for the
//! deferred fields (`actor`, `occurred_at`, store-assigned `id`) which
//! may each be set exactly once before the first persist.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{ChangeRecord, DocumentRef, RawChangeEvent};

/// Normalized record of one document edit's property changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    id: Option<Uuid>,
    document: DocumentRef,
    actor: Option<Uuid>,
    occurred_at: Option<DateTime<Utc>>,
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Normalize a raw change event into an ordered change set.
    ///
    /// Record order is deterministic: all modifications in event
    /// order, then all insertions, then all deletions. Records with an
    /// empty property identifier are dropped here; the upstream
    /// detector emits them when the last value of a property is
    /// removed, and they carry no usable information.
    pub fn from_raw(document: DocumentRef, event: &RawChangeEvent) -> Self {
        let records = normalize(event);
        Self {
            id: None,
            document,
            actor: None,
            occurred_at: None,
            records,
        }
    }

    /// Reconstruct a change set previously loaded from the store.
    pub fn restored(
        id: Uuid,
        document: DocumentRef,
        actor: Uuid,
        occurred_at: DateTime<Utc>,
        records: Vec<ChangeRecord>,
    ) -> Self {
        Self {
            id: Some(id),
            document,
            actor: Some(actor),
            occurred_at: Some(occurred_at),
            records,
        }
    }

    /// Store-assigned id. `None` until the first successful persist.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    /// Whether this change set has not been persisted yet.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn actor(&self) -> Option<Uuid> {
        self.actor
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.occurred_at
    }

    /// Normalized records, in persistence order.
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Set the acting user. May be called once, before persisting.
    pub fn set_actor(&mut self, actor: Uuid) -> Result<()> {
        if self.actor.is_some() {
            return Err(Error::InvalidInput("change set actor already set".into()));
        }
        self.actor = Some(actor);
        Ok(())
    }

    /// Set the edit timestamp. May be called once, before persisting.
    pub fn set_occurred_at(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.occurred_at.is_some() {
            return Err(Error::InvalidInput(
                "change set timestamp already set".into(),
            ));
        }
        self.occurred_at = Some(at);
        Ok(())
    }

    /// Record the store-assigned id. Called by the store on first
    /// successful insert; a second assignment is an error.
    pub fn assign_id(&mut self, id: Uuid) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::InvalidInput(
                "change set already has a store id".into(),
            ));
        }
        self.id = Some(id);
        Ok(())
    }
}

/// Concatenate modifications, insertions, deletions, dropping records
/// that fail the validity invariant. Pure and order-preserving, so a
/// fixed raw event always yields an identical sequence.
fn normalize(event: &RawChangeEvent) -> Vec<ChangeRecord> {
    let mut records = Vec::with_capacity(
        event.modifications.len() + event.insertions.len() + event.deletions.len(),
    );

    for m in &event.modifications {
        records.push(ChangeRecord::new(
            m.property.clone(),
            Some(m.old_value.clone()),
            Some(m.new_value.clone()),
        ));
    }
    for i in &event.insertions {
        records.push(ChangeRecord::new(
            i.property.clone(),
            None,
            Some(i.value.clone()),
        ));
    }
    for d in &event.deletions {
        records.push(ChangeRecord::new(
            d.property.clone(),
            Some(d.value.clone()),
            None,
        ));
    }

    records.retain(ChangeRecord::is_valid);
    records
}
