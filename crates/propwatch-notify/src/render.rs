//! Default plain-text rendering of change sets for notification mail.
//!
//! Rendering is a [`ChangeSetRenderer`] extension point; richer
//! formats (HTML digests, localized templates) plug in without
//! touching the notifier.

use propwatch_core::{ChangeSet, ChangeSetRenderer};

/// Plain-text renderer: one subject line naming the document, one
/// bullet per change record.
#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeSetRenderer for PlainTextRenderer {
    fn subject(&self, set: &ChangeSet) -> String {
        format!("Properties changed on {}", set.document().title)
    }

    fn body(&self, set: &ChangeSet) -> String {
        let mut body = format!(
            "The following property changes were detected on {}:\n\n",
            set.document().title
        );

        for record in set.records() {
            let line = match (record.old_value.as_deref(), record.new_value.as_deref()) {
                (Some(old), Some(new)) => {
                    format!("* {}: '{}' changed to '{}'\n", record.property, old, new)
                }
                (None, Some(new)) => format!("* {}: '{}' added\n", record.property, new),
                (Some(old), None) => format!("* {}: '{}' removed\n", record.property, old),
                // Normalization drops valueless records before they get here.
                (None, None) => continue,
            };
            body.push_str(&line);
        }

        if let Some(at) = set.occurred_at() {
            body.push_str(&format!("\nChanged at {}\n", at.to_rfc3339()));
        }

        body
    }
}
