//! Group notification: gate evaluation, dispatch, and marker updates.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use propwatch_core::{
    ChangeSet, ChangeSetRenderer, MailTransport, NotificationGate, UserDirectory, WatchGroup,
};

use crate::render::PlainTextRenderer;

/// Per-member outcome of one group notification cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOutcome {
    /// Mail dispatched and last-notified marker advanced.
    Notified,
    /// Gate declined: missing/invalid address or already notified
    /// since the last watch-state change.
    SkippedGate,
    /// The directory has no profile for this member id.
    SkippedUnknownUser,
    /// The directory lookup itself failed.
    LookupFailed(String),
    /// The transport reported a send failure; the marker was not
    /// advanced.
    DispatchFailed(String),
    /// Mail was dispatched but the marker write failed. The member may
    /// be re-notified on a later event; a notification is never lost
    /// this way.
    StateWriteFailed(String),
}

/// One member's result within a group notification cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberNotifyResult {
    pub user_id: Uuid,
    pub outcome: MemberOutcome,
}

/// Notifies the members of a matched watch group about a change set.
///
/// Failures are member-local by construction: the cycle is a fold over
/// members producing one [`MemberNotifyResult`] each, and no outcome
/// short-circuits the rest of the group.
pub struct GroupNotifier {
    directory: Arc<dyn UserDirectory>,
    transport: Arc<dyn MailTransport>,
    renderer: Arc<dyn ChangeSetRenderer>,
}

impl GroupNotifier {
    pub fn new(directory: Arc<dyn UserDirectory>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            directory,
            transport,
            renderer: Arc::new(PlainTextRenderer::new()),
        }
    }

    /// Replace the default plain-text renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ChangeSetRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Notify every member of `group` that passes the gate.
    pub async fn notify_group(
        &self,
        group: &WatchGroup,
        set: &ChangeSet,
    ) -> Vec<MemberNotifyResult> {
        let subject = self.renderer.subject(set);
        let body = self.renderer.body(set);

        let mut results = Vec::with_capacity(group.members.len());
        for &user_id in &group.members {
            let outcome = self.notify_member(user_id, &subject, &body).await;
            results.push(MemberNotifyResult { user_id, outcome });
        }

        let notified = results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    MemberOutcome::Notified | MemberOutcome::StateWriteFailed(_)
                )
            })
            .count();
        info!(
            subsystem = "notify",
            component = "notifier",
            op = "notify_group",
            group_id = %group.id,
            changeset_id = ?set.id(),
            member_count = group.members.len(),
            notified_count = notified,
            "Group notification cycle finished"
        );

        results
    }

    async fn notify_member(&self, user_id: Uuid, subject: &str, body: &str) -> MemberOutcome {
        let user = match self.directory.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(
                    subsystem = "notify",
                    component = "notifier",
                    user_id = %user_id,
                    "Member unknown to directory, skipping"
                );
                return MemberOutcome::SkippedUnknownUser;
            }
            Err(e) => {
                warn!(
                    subsystem = "notify",
                    component = "notifier",
                    user_id = %user_id,
                    error = %e,
                    "Directory lookup failed, skipping member"
                );
                return MemberOutcome::LookupFailed(e.to_string());
            }
        };

        if !NotificationGate::should_notify(&user) {
            debug!(
                subsystem = "notify",
                component = "notifier",
                user_id = %user_id,
                "Gate declined notification"
            );
            return MemberOutcome::SkippedGate;
        }

        // The gate only passes users with a present, valid address.
        let Some(email) = user.email.as_deref() else {
            return MemberOutcome::SkippedGate;
        };

        if let Err(e) = self
            .transport
            .send(email, subject, body, user.preferred_language.as_deref())
            .await
        {
            warn!(
                subsystem = "notify",
                component = "notifier",
                user_id = %user_id,
                error = %e,
                "Mail dispatch failed, continuing with remaining members"
            );
            return MemberOutcome::DispatchFailed(e.to_string());
        }

        // Marker advances only after a successful dispatch. A failed
        // write risks one duplicate notification later, never a lost
        // one, so it is logged and not retried.
        if let Err(e) = self.directory.set_last_notified(user_id, Utc::now()).await {
            warn!(
                subsystem = "notify",
                component = "notifier",
                user_id = %user_id,
                error = %e,
                "Failed to advance last-notified marker after dispatch"
            );
            return MemberOutcome::StateWriteFailed(e.to_string());
        }

        MemberOutcome::Notified
    }
}
