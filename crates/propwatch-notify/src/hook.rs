//! Entry point wiring a raw upstream change event through
//! normalization, matching, persistence, and notification.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use propwatch_core::{
    ChangeSet, ChangeSetRepository, DocumentRef, RawChangeEvent, Result, WatchGroupRepository,
};

use crate::notifier::{GroupNotifier, MemberNotifyResult};

/// Notification results for one matched group.
#[derive(Debug, Clone)]
pub struct GroupNotifySummary {
    pub group_id: Uuid,
    pub results: Vec<MemberNotifyResult>,
}

/// Outcome of handling one raw change event.
#[derive(Debug, Clone)]
pub struct ChangeOutcome {
    /// Store-assigned change-set id.
    pub changeset_id: Uuid,
    /// Number of change records written.
    pub inserted_count: i64,
    /// Ids of the watch groups whose criteria matched the document,
    /// in notification order.
    pub matched_groups: Vec<Uuid>,
    /// Per-group notification results. Empty when nothing was
    /// inserted or nothing matched.
    pub notifications: Vec<GroupNotifySummary>,
}

/// Orchestrates one change-event handling cycle:
/// normalize, match, persist, then notify each matched group.
///
/// Safe to invoke concurrently for different documents; all state
/// lives behind the shared collaborators.
pub struct WatchlistHook {
    changesets: Arc<dyn ChangeSetRepository>,
    groups: Arc<dyn WatchGroupRepository>,
    notifier: GroupNotifier,
}

impl WatchlistHook {
    pub fn new(
        changesets: Arc<dyn ChangeSetRepository>,
        groups: Arc<dyn WatchGroupRepository>,
        notifier: GroupNotifier,
    ) -> Self {
        Self {
            changesets,
            groups,
            notifier,
        }
    }

    /// Handle one finalized upstream change to a document's
    /// properties.
    ///
    /// The acting user is an explicit parameter, not ambient state.
    /// `occurred_at` defaults to the persistence time when `None`.
    ///
    /// A store failure aborts the event; nothing is notified for a
    /// change set that did not visibly persist, and a change set whose
    /// records were all filtered as noise (`inserted_count == 0`) is
    /// persisted but never notified.
    pub async fn on_raw_change(
        &self,
        document: DocumentRef,
        event: &RawChangeEvent,
        actor: Uuid,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<ChangeOutcome> {
        let start = Instant::now();
        let page_id = document.page_id;

        let mut set = ChangeSet::from_raw(document.clone(), event);
        set.set_actor(actor)?;
        if let Some(at) = occurred_at {
            set.set_occurred_at(at)?;
        }

        let mut matched = self.groups.matching_groups(&document).await?;
        // Ascending group id keeps the notification order reproducible.
        matched.sort_by_key(|g| g.id);

        let outcome = match self.changesets.persist(&mut set, &matched).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    subsystem = "hook",
                    op = "persist",
                    page_id,
                    error = %e,
                    "Change set persistence failed, aborting event"
                );
                return Err(e);
            }
        };

        let mut notifications = Vec::new();
        if outcome.inserted() {
            for group in &matched {
                let results = self.notifier.notify_group(group, &set).await;
                notifications.push(GroupNotifySummary {
                    group_id: group.id,
                    results,
                });
            }
        }

        info!(
            subsystem = "hook",
            op = "on_raw_change",
            changeset_id = %outcome.id,
            page_id,
            record_count = outcome.inserted_count,
            group_count = matched.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Change event handled"
        );

        Ok(ChangeOutcome {
            changeset_id: outcome.id,
            inserted_count: outcome.inserted_count,
            matched_groups: matched.iter().map(|g| g.id).collect(),
            notifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MemberOutcome;
    use crate::testutil::{
        group_of, InMemoryChangeSetStore, InMemoryDirectory, InMemoryGroupRegistry,
        RecordingTransport,
    };
    use propwatch_core::{DeletedProperty, Error, GroupCriteria, ModifiedProperty};

    struct Harness {
        store: Arc<InMemoryChangeSetStore>,
        registry: Arc<InMemoryGroupRegistry>,
        directory: Arc<InMemoryDirectory>,
        transport: Arc<RecordingTransport>,
        hook: WatchlistHook,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryChangeSetStore::new());
        let registry = Arc::new(InMemoryGroupRegistry::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let transport = Arc::new(RecordingTransport::new());
        let hook = WatchlistHook::new(
            store.clone(),
            registry.clone(),
            GroupNotifier::new(directory.clone(), transport.clone()),
        );
        Harness {
            store,
            registry,
            directory,
            transport,
            hook,
        }
    }

    fn event() -> RawChangeEvent {
        RawChangeEvent {
            modifications: vec![ModifiedProperty {
                property: "Population".into(),
                old_value: "100".into(),
                new_value: "200".into(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_happy_path_persists_and_notifies() {
        let h = harness();
        let alice = h.directory.add_user("alice@example.com");
        let mut group = group_of(vec![alice]);
        group.criteria = GroupCriteria {
            namespaces: vec![0],
            categories: vec![],
        };
        h.registry.add_group(group.clone());

        let doc = DocumentRef::new(7, 0, "Berlin");
        let outcome = h
            .hook
            .on_raw_change(doc, &event(), Uuid::now_v7(), None)
            .await
            .unwrap();

        assert_eq!(outcome.inserted_count, 1);
        assert_eq!(outcome.matched_groups, vec![group.id]);
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(
            outcome.notifications[0].results[0].outcome,
            MemberOutcome::Notified
        );
        assert_eq!(h.transport.sent().len(), 1);
        assert_eq!(h.store.stored_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_matched_groups_still_persists() {
        let h = harness();

        let doc = DocumentRef::new(7, 0, "Berlin");
        let outcome = h
            .hook
            .on_raw_change(doc, &event(), Uuid::now_v7(), None)
            .await
            .unwrap();

        assert_eq!(outcome.inserted_count, 1);
        assert!(outcome.matched_groups.is_empty());
        assert!(outcome.notifications.is_empty());
        assert_eq!(h.store.stored_count(), 1);
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_noise_only_event_is_not_notified() {
        let h = harness();
        let alice = h.directory.add_user("alice@example.com");
        h.registry.add_group(group_of(vec![alice]));

        let noise = RawChangeEvent {
            deletions: vec![DeletedProperty {
                property: "".into(),
                value: "D".into(),
            }],
            ..Default::default()
        };
        let doc = DocumentRef::new(7, 0, "Berlin");
        let outcome = h
            .hook
            .on_raw_change(doc, &noise, Uuid::now_v7(), None)
            .await
            .unwrap();

        assert_eq!(outcome.inserted_count, 0);
        assert_eq!(outcome.matched_groups.len(), 1);
        assert!(outcome.notifications.is_empty());
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_event() {
        let h = harness();
        let alice = h.directory.add_user("alice@example.com");
        h.registry.add_group(group_of(vec![alice]));
        h.store.fail_next_persist();

        let doc = DocumentRef::new(7, 0, "Berlin");
        let err = h
            .hook
            .on_raw_change(doc, &event(), Uuid::now_v7(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Database(_)));
        assert!(h.transport.sent().is_empty());
        assert_eq!(h.store.stored_count(), 0);
    }

    #[tokio::test]
    async fn test_groups_notified_in_ascending_id_order() {
        let h = harness();
        let alice = h.directory.add_user("alice@example.com");

        // Registration order deliberately scrambled.
        let g1 = group_of(vec![alice]);
        let g2 = group_of(vec![alice]);
        let g3 = group_of(vec![alice]);
        h.registry.add_group(g2.clone());
        h.registry.add_group(g3.clone());
        h.registry.add_group(g1.clone());

        let mut expected = vec![g1.id, g2.id, g3.id];
        expected.sort();

        let doc = DocumentRef::new(7, 0, "Berlin");
        let outcome = h
            .hook
            .on_raw_change(doc, &event(), Uuid::now_v7(), None)
            .await
            .unwrap();

        assert_eq!(outcome.matched_groups, expected);
        let notified: Vec<Uuid> = outcome.notifications.iter().map(|n| n.group_id).collect();
        assert_eq!(notified, expected);
    }

    #[tokio::test]
    async fn test_member_in_two_groups_notified_once_per_cycle_gap() {
        // Two groups match; the first cycle notifies, which closes the
        // gate for the second group in the same event. The member must
        // have a watch timestamp, otherwise the gate always fires.
        let h = harness();
        let alice = h.directory.add_user("alice@example.com");
        h.directory
            .set_last_watched(alice, Utc::now() - chrono::Duration::hours(1));
        h.registry.add_group(group_of(vec![alice]));
        h.registry.add_group(group_of(vec![alice]));

        let doc = DocumentRef::new(7, 0, "Berlin");
        let outcome = h
            .hook
            .on_raw_change(doc, &event(), Uuid::now_v7(), None)
            .await
            .unwrap();

        assert_eq!(outcome.notifications.len(), 2);
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_timestamp_is_persisted() {
        let h = harness();
        let at = Utc::now() - chrono::Duration::hours(3);

        let doc = DocumentRef::new(7, 0, "Berlin");
        let outcome = h
            .hook
            .on_raw_change(doc, &event(), Uuid::now_v7(), Some(at))
            .await
            .unwrap();

        let loaded = h.store.load(outcome.changeset_id).await.unwrap();
        assert_eq!(loaded.occurred_at(), Some(at));
    }
}
