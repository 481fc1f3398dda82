//! Activity log entries.
//!
//! One entry per domain add/delete and per auto-check start, stop and
//! completion. Writing them is fire-and-forget from the caller's side.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Add,
    Delete,
    AutoStart,
    AutoStop,
    AutoCheck,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Add => "add",
            ActivityAction::Delete => "delete",
            ActivityAction::AutoStart => "auto_start",
            ActivityAction::AutoStop => "auto_stop",
            ActivityAction::AutoCheck => "auto_check",
        }
    }
}

/// Entry handed to an [`ActivitySink`](crate::repositories::ActivitySink).
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub action: ActivityAction,

    /// Raw domain string for domain events, empty for sweep events
    pub domain: String,

    pub domain_host_key: String,

    pub brand_id: Option<Uuid>,

    pub note: String,

    /// Who caused the event; `None` for the system
    pub actor: Option<Uuid>,

    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(action: ActivityAction) -> Self {
        Self {
            action,
            domain: String::new(),
            domain_host_key: String::new(),
            brand_id: None,
            note: String::new(),
            actor: None,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
