//! # propwatch-core
//!
//! Core types, traits, and the notification gate for the propwatch
//! change-watch engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the propwatch database and notification crates
//! depend on: change-set normalization, the per-user deduplication
//! gate, and the collaborator seams toward the store, the group
//! registry, the user directory, and the mail transport.

pub mod changeset;
pub mod error;
pub mod gate;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use changeset::ChangeSet;
pub use error::{Error, Result};
pub use gate::{is_valid_email, NotificationGate};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
