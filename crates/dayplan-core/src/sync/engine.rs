//! Calendar sync engine.
//!
//! Drives the per-calendar sync state machine against a
//! [`CalendarProvider`] and commits results through [`CalendarDb`]:
//!
//! - empty stored cursor: full sync over a bounded time window, replacing
//!   the whole cache for that calendar atomically
//! - stored cursor: incremental sync applying the provider's change feed
//! - expired cursor: clear the token and fall back to exactly one full
//!   sync within the same invocation
//!
//! Failures are isolated per calendar; one broken calendar never aborts
//! the others.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, SyncError};
use crate::provider::CalendarProvider;
use crate::storage::CalendarDb;
use crate::sync::types::{CachedEvent, EventChange, EventStatus, SyncResult};

/// Upper bound on pages fetched per listing. A provider that keeps
/// returning page tokens past this is treated as broken.
pub const MAX_SYNC_PAGES: usize = 50;

/// Default full-sync window, matching the provider's retention horizon.
pub const DEFAULT_DAYS_BACK: i64 = 30;
pub const DEFAULT_DAYS_FORWARD: i64 = 365;

pub struct SyncEngine<'a> {
    provider: &'a dyn CalendarProvider,
    db: &'a CalendarDb,
    days_back: i64,
    days_forward: i64,
}

impl<'a> SyncEngine<'a> {
    pub fn new(provider: &'a dyn CalendarProvider, db: &'a CalendarDb) -> Self {
        Self {
            provider,
            db,
            days_back: DEFAULT_DAYS_BACK,
            days_forward: DEFAULT_DAYS_FORWARD,
        }
    }

    /// Override the full-sync time window (days back, days forward).
    pub fn with_window(mut self, days_back: i64, days_forward: i64) -> Self {
        self.days_back = days_back;
        self.days_forward = days_forward;
        self
    }

    /// Sync every enabled calendar for `user`.
    ///
    /// When the user has no sync state yet, discovers the provider's
    /// calendars, enables each, and syncs them all. A user without
    /// provider credentials is skipped with an empty result list.
    pub fn sync_all(&self, user: &str) -> Result<Vec<SyncResult>> {
        let mut states = self.db.enabled_sync_states(user)?;
        if states.is_empty() {
            match self.provider.list_calendars() {
                Ok(calendars) => {
                    for calendar in calendars {
                        self.db
                            .ensure_sync_state(user, &calendar.id, &calendar.name, &calendar.color)?;
                    }
                }
                Err(SyncError::NoCredentials) => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
            states = self.db.enabled_sync_states(user)?;
        }

        let mut results = Vec::with_capacity(states.len());
        for state in states {
            match self.sync_calendar(user, &state.calendar_id) {
                Ok(result) => results.push(result),
                Err(crate::error::CoreError::Sync(SyncError::NoCredentials)) => {
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }

    /// Sync one calendar, choosing full or incremental from the stored
    /// cursor. Provider failures are recorded in the returned result;
    /// only storage failures and missing credentials become `Err`.
    pub fn sync_calendar(&self, user: &str, calendar_id: &str) -> Result<SyncResult> {
        let state = self.db.get_or_create_sync_state(user, calendar_id)?;
        let mut result = SyncResult::new(calendar_id);

        if state.sync_token.is_empty() {
            self.full_sync(user, calendar_id, &mut result)?;
        } else {
            self.incremental_sync(user, calendar_id, &state.sync_token, &mut result)?;
        }
        Ok(result)
    }

    /// Replace the calendar's whole cache from a bounded-window listing.
    /// Nothing is committed unless the listing completes.
    fn full_sync(&self, user: &str, calendar_id: &str, result: &mut SyncResult) -> Result<()> {
        let now = Utc::now();
        let time_min = now - Duration::days(self.days_back);
        let time_max = now + Duration::days(self.days_forward);

        match self.fetch_window(calendar_id, time_min, time_max) {
            Ok((items, sync_token)) => {
                let events: Vec<CachedEvent> = items
                    .into_iter()
                    .filter(|e| e.status != EventStatus::Cancelled)
                    .map(|e| e.into_cached(user, calendar_id))
                    .collect();
                let (deleted, created) =
                    self.db
                        .replace_calendar_events(user, calendar_id, &events, &sync_token, now)?;
                result.deleted += deleted;
                result.created += created;
                result.full_sync_performed = true;
                Ok(())
            }
            Err(SyncError::NoCredentials) => Err(SyncError::NoCredentials.into()),
            Err(e) => {
                result.errors.push(e.to_string());
                Ok(())
            }
        }
    }

    /// Apply the provider's change feed since `sync_token`. An expired
    /// cursor clears the stored token and falls back to one full sync.
    fn incremental_sync(
        &self,
        user: &str,
        calendar_id: &str,
        sync_token: &str,
        result: &mut SyncResult,
    ) -> Result<()> {
        match self.fetch_changes(user, calendar_id, sync_token) {
            Ok((changes, new_token)) => {
                let (created, updated, deleted) =
                    self.db
                        .apply_changes(user, calendar_id, &changes, &new_token, Utc::now())?;
                result.created += created;
                result.updated += updated;
                result.deleted += deleted;
                Ok(())
            }
            Err(SyncError::ExpiredCursor) => {
                self.db.clear_sync_token(user, calendar_id)?;
                self.full_sync(user, calendar_id, result)
            }
            Err(SyncError::NoCredentials) => Err(SyncError::NoCredentials.into()),
            Err(e) => {
                result.errors.push(e.to_string());
                Ok(())
            }
        }
    }

    fn fetch_window(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<(Vec<crate::provider::ProviderEvent>, String), SyncError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_SYNC_PAGES {
            let page = self.provider.list_events_full(
                calendar_id,
                time_min,
                time_max,
                page_token.as_deref(),
            )?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok((items, page.next_sync_token.unwrap_or_default())),
            }
        }
        Err(SyncError::Provider(format!(
            "calendar {calendar_id}: listing exceeded {MAX_SYNC_PAGES} pages"
        )))
    }

    fn fetch_changes(
        &self,
        user: &str,
        calendar_id: &str,
        sync_token: &str,
    ) -> Result<(Vec<EventChange>, String), SyncError> {
        let mut changes = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_SYNC_PAGES {
            let page =
                self.provider
                    .list_events_changed(calendar_id, sync_token, page_token.as_deref())?;
            for item in page.items {
                if item.status == EventStatus::Cancelled {
                    changes.push(EventChange::Delete(item.id));
                } else {
                    changes.push(EventChange::Upsert(item.into_cached(user, calendar_id)));
                }
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok((changes, page.next_sync_token.unwrap_or_default())),
            }
        }
        Err(SyncError::Provider(format!(
            "calendar {calendar_id}: change feed exceeded {MAX_SYNC_PAGES} pages"
        )))
    }
}
