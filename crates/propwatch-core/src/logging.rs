//! Structured logging field name constants for propwatch.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (failed dispatch, failed marker write) |
//! | INFO  | Operation completions (persist, notify cycle) |
//! | DEBUG | Decision points (gate outcomes, match counts) |

/// Subsystem originating the log event.
/// Values: "db", "notify", "hook"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "changesets", "groups", "notifier", "mailer"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "persist", "match", "notify_group", "send"
pub const OPERATION: &str = "op";

/// Change set UUID being operated on.
pub const CHANGESET_ID: &str = "changeset_id";

/// Watch group UUID.
pub const GROUP_ID: &str = "group_id";

/// User UUID a notification decision applies to.
pub const USER_ID: &str = "user_id";

/// Upstream document/page id.
pub const PAGE_ID: &str = "page_id";

/// Number of change records written or rendered.
pub const RECORD_COUNT: &str = "record_count";

/// Number of watch groups matched for a document.
pub const GROUP_COUNT: &str = "group_count";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";
