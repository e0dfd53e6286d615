//! Per-user notification deduplication gate.
//!
//! The gate decides whether a group member should receive mail for a
//! change set, based solely on the member's profile: contact address
//! validity and the last-notified / last-watched markers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::UserProfile;

/// Minimal address shape check: one `@`, no whitespace, a dot in the
/// domain part. Deliverability is the transport's problem.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"));

/// Validate an email address shape.
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_RE.is_match(address)
}

/// Stateless notification gate.
pub struct NotificationGate;

impl NotificationGate {
    /// Decide whether `user` should be notified of the current change
    /// set.
    ///
    /// Returns `false` silently when the user has no usable email
    /// address. Otherwise fires iff the user was never notified, never
    /// stamped a watch time, or the last notification predates the
    /// last watch-state change.
    ///
    /// The comparison is a strict `<`: equal timestamps do not trigger
    /// a second notification, so a single logical event stamping both
    /// fields cannot cause a duplicate send.
    pub fn should_notify(user: &UserProfile) -> bool {
        let Some(email) = user.email.as_deref() else {
            return false;
        };
        if !is_valid_email(email) {
            return false;
        }

        match (user.last_notified_at, user.last_watched_at) {
            (None, _) | (_, None) => true,
            (Some(last_notify), Some(last_watch)) => last_notify < last_watch,
        }
    }
}
