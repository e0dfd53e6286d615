//! # propwatch-notify
//!
//! Group notification and change-event orchestration for propwatch.
//!
//! This crate provides:
//! - [`GroupNotifier`]: per-member gate evaluation, mail dispatch, and
//!   last-notified marker updates, with member-local failure isolation
//! - [`WatchlistHook`]: the entry point invoked when the upstream
//!   structured-data store finalizes a change to a document
//! - [`PlainTextRenderer`]: the default change-set mail rendering
//! - [`HttpMailTransport`]: mail dispatch through an HTTP relay

pub mod hook;
pub mod mailer;
pub mod notifier;
pub mod render;

#[cfg(test)]
mod testutil;

pub use hook::{ChangeOutcome, GroupNotifySummary, WatchlistHook};
pub use mailer::{HttpMailTransport, MailerConfig, DEFAULT_MAIL_TIMEOUT_SECS};
pub use notifier::{GroupNotifier, MemberNotifyResult, MemberOutcome};
pub use render::PlainTextRenderer;
