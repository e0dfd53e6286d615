//! In-memory fakes of the collaborator traits for notifier and hook
//! tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use propwatch_core::{
    new_v7, ChangeSet, ChangeSetRepository, ChangeSetSummary, CreateGroupRequest, DocumentRef,
    Error, GroupCriteria, MailTransport, PersistOutcome, Result, UserDirectory, UserProfile,
    WatchGroup, WatchGroupRepository,
};

/// A group with wildcard criteria and the given members.
pub fn group_of(members: Vec<Uuid>) -> WatchGroup {
    let now = Utc::now();
    WatchGroup {
        id: new_v7(),
        name: "test-group".into(),
        criteria: GroupCriteria::default(),
        members,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory user directory with switchable per-user failures.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashMap<Uuid, UserProfile>>,
    failing_lookups: Mutex<HashSet<Uuid>>,
    failing_marker_writes: Mutex<HashSet<Uuid>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str) -> Uuid {
        let id = new_v7();
        self.users.lock().unwrap().insert(
            id,
            UserProfile {
                id,
                email: Some(email.to_string()),
                preferred_language: None,
                last_notified_at: None,
                last_watched_at: None,
            },
        );
        id
    }

    pub fn user(&self, id: Uuid) -> UserProfile {
        self.users.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn set_last_watched(&self, id: Uuid, at: DateTime<Utc>) {
        self.users
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .last_watched_at = Some(at);
    }

    pub fn set_last_notified(&self, id: Uuid, at: DateTime<Utc>) {
        self.users
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .last_notified_at = Some(at);
    }

    pub fn set_language(&self, id: Uuid, language: &str) {
        self.users
            .lock()
            .unwrap()
            .get_mut(&id)
            .unwrap()
            .preferred_language = Some(language.to_string());
    }

    pub fn fail_lookup(&self, id: Uuid) {
        self.failing_lookups.lock().unwrap().insert(id);
    }

    pub fn fail_marker_write(&self, id: Uuid) {
        self.failing_marker_writes.lock().unwrap().insert(id);
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        if self.failing_lookups.lock().unwrap().contains(&id) {
            return Err(Error::Directory("simulated lookup failure".into()));
        }
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn set_last_notified(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if self.failing_marker_writes.lock().unwrap().contains(&id) {
            return Err(Error::Directory("simulated marker write failure".into()));
        }
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| Error::Directory(format!("unknown user {id}")))?;
        user.last_notified_at = Some(at);
        Ok(())
    }
}

/// One message accepted by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub locale: Option<String>,
}

/// Mail transport recording sends, with per-address failures.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMail>>,
    failing_addresses: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: &str) {
        self.failing_addresses
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, to: &str, subject: &str, body: &str, locale: Option<&str>) -> Result<()> {
        if self.failing_addresses.lock().unwrap().contains(to) {
            return Err(Error::Dispatch("simulated send failure".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            locale: locale.map(String::from),
        });
        Ok(())
    }
}

/// In-memory change-set store mirroring the persistence contract.
#[derive(Default)]
pub struct InMemoryChangeSetStore {
    sets: Mutex<HashMap<Uuid, (ChangeSet, Vec<Uuid>)>>,
    fail_next: Mutex<bool>,
}

impl InMemoryChangeSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next persist call fail like a store-transaction error.
    pub fn fail_next_persist(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn stored_count(&self) -> usize {
        self.sets.lock().unwrap().len()
    }
}

#[async_trait]
impl ChangeSetRepository for InMemoryChangeSetStore {
    async fn persist(&self, set: &mut ChangeSet, groups: &[WatchGroup]) -> Result<PersistOutcome> {
        if set.id().is_some() {
            return Err(Error::InvalidInput(
                "change set has already been persisted".into(),
            ));
        }
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(Error::Database(sqlx::Error::PoolClosed));
        }

        let id = new_v7();
        let inserted_count = set.records().len() as i64;
        set.assign_id(id)?;

        let group_ids = if inserted_count > 0 {
            groups.iter().map(|g| g.id).collect()
        } else {
            Vec::new()
        };
        self.sets
            .lock()
            .unwrap()
            .insert(id, (set.clone(), group_ids));

        Ok(PersistOutcome { id, inserted_count })
    }

    async fn load(&self, id: Uuid) -> Result<ChangeSet> {
        self.sets
            .lock()
            .unwrap()
            .get(&id)
            .map(|(set, _)| set.clone())
            .ok_or(Error::ChangeSetNotFound(id))
    }

    async fn list_for_document(&self, page_id: i64, limit: i64) -> Result<Vec<ChangeSetSummary>> {
        Ok(self
            .sets
            .lock()
            .unwrap()
            .values()
            .filter(|(set, _)| set.document().page_id == page_id)
            .take(limit as usize)
            .map(|(set, _)| summary(set))
            .collect())
    }

    async fn list_for_group(&self, group_id: Uuid, limit: i64) -> Result<Vec<ChangeSetSummary>> {
        Ok(self
            .sets
            .lock()
            .unwrap()
            .values()
            .filter(|(_, groups)| groups.contains(&group_id))
            .take(limit as usize)
            .map(|(set, _)| summary(set))
            .collect())
    }
}

fn summary(set: &ChangeSet) -> ChangeSetSummary {
    ChangeSetSummary {
        id: set.id().unwrap_or_else(Uuid::nil),
        page_id: set.document().page_id,
        title: set.document().title.clone(),
        actor: set.actor().unwrap_or_else(Uuid::nil),
        occurred_at: set.occurred_at().unwrap_or_else(Utc::now),
        record_count: set.records().len() as i64,
    }
}

/// In-memory watch-group registry evaluating criteria in process.
#[derive(Default)]
pub struct InMemoryGroupRegistry {
    groups: Mutex<Vec<WatchGroup>>,
}

impl InMemoryGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&self, group: WatchGroup) {
        self.groups.lock().unwrap().push(group);
    }
}

#[async_trait]
impl WatchGroupRepository for InMemoryGroupRegistry {
    async fn matching_groups(&self, document: &DocumentRef) -> Result<Vec<WatchGroup>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.criteria.matches(document))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<WatchGroup>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn members(&self, group_id: Uuid) -> Result<Vec<Uuid>> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id == group_id)
            .map(|g| g.members.clone())
            .ok_or(Error::GroupNotFound(group_id))
    }

    async fn create(&self, req: CreateGroupRequest) -> Result<Uuid> {
        let now = Utc::now();
        let group = WatchGroup {
            id: new_v7(),
            name: req.name,
            criteria: req.criteria,
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let id = group.id;
        self.groups.lock().unwrap().push(group);
        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.groups.lock().unwrap().retain(|g| g.id != id);
        Ok(())
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut groups = self.groups.lock().unwrap();
        let group = groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(Error::GroupNotFound(group_id))?;
        if !group.members.contains(&user_id) {
            group.members.push(user_id);
        }
        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut groups = self.groups.lock().unwrap();
        let group = groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(Error::GroupNotFound(group_id))?;
        group.members.retain(|m| *m != user_id);
        Ok(())
    }
}
