//! Calendar provider port.
//!
//! The sync engine talks to a remote calendar service through the
//! [`CalendarProvider`] trait so it can be driven by a stub in tests and
//! stay agnostic of the concrete provider.

pub mod google;

pub use google::GoogleCalendarProvider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::sync::types::{CachedEvent, EventStatus};

/// A calendar discoverable through the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCalendar {
    pub id: String,
    pub name: String,
    pub color: String,
    pub primary: bool,
}

/// An event item as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub location: String,
    pub description: String,
    pub status: EventStatus,
    pub etag: String,
}

impl ProviderEvent {
    /// Convert into a cache row for `(user, calendar_id)`.
    pub fn into_cached(self, user: &str, calendar_id: &str) -> CachedEvent {
        CachedEvent {
            user: user.to_string(),
            calendar_id: calendar_id.to_string(),
            remote_id: self.id,
            title: self.title,
            start: self.start,
            end: self.end,
            all_day: self.all_day,
            location: self.location,
            description: self.description,
            status: self.status,
            etag: self.etag,
        }
    }
}

/// One page of an event listing.
///
/// `next_sync_token` is only present on the final page (when
/// `next_page_token` is absent).
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub items: Vec<ProviderEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

/// Capability interface over a remote calendar service.
///
/// Calls are page-at-a-time; the sync engine owns pagination and its
/// termination guard.
pub trait CalendarProvider {
    /// List all calendars the user has access to.
    fn list_calendars(&self) -> Result<Vec<ProviderCalendar>, SyncError>;

    /// List events within a bounded time window (full sync).
    fn list_events_full(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<EventPage, SyncError>;

    /// List events changed since `sync_token` (incremental sync).
    ///
    /// Fails with [`SyncError::ExpiredCursor`] when the token is no
    /// longer valid.
    fn list_events_changed(
        &self,
        calendar_id: &str,
        sync_token: &str,
        page_token: Option<&str>,
    ) -> Result<EventPage, SyncError>;
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "dayplan";

    pub fn get(key: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
