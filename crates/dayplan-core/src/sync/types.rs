//! Core types for calendar synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a remote calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Tentative => "tentative",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a provider status string. Unknown values default to confirmed,
    /// matching the provider's own default.
    pub fn parse(s: &str) -> Self {
        match s {
            "tentative" => EventStatus::Tentative,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

/// Per-(user, calendar) sync cursor and enablement flag.
///
/// An empty `sync_token` means the next sync for this calendar must be a
/// full sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub user: String,
    pub calendar_id: String,
    pub calendar_name: String,
    pub calendar_color: String,
    pub sync_token: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub is_enabled: bool,
}

/// Local mirror of a remote calendar event.
///
/// Cancelled events are never stored; a cancellation deletes the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEvent {
    pub user: String,
    pub calendar_id: String,
    pub remote_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub location: String,
    pub description: String,
    pub status: EventStatus,
    pub etag: String,
}

/// A single mutation from the provider's change feed.
#[derive(Debug, Clone)]
pub enum EventChange {
    /// Create or update the cached event with this remote id.
    Upsert(CachedEvent),
    /// Delete the cached event with this remote id, if present.
    Delete(String),
}

/// Result of one sync invocation for one calendar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
    pub calendar_id: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub errors: Vec<String>,
    pub full_sync_performed: bool,
}

impl SyncResult {
    /// Empty result for a calendar.
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            ..Default::default()
        }
    }

    /// Whether the sync completed without recorded errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
