//! SQLite-based storage for calendar sync state and cached events.
//!
//! Holds the per-(user, calendar) sync cursors and the local mirror of
//! remote events. Every sync commit (event diff + cursor update) runs as
//! a single transaction so a reader never observes a half-applied sync.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::sync::types::{CachedEvent, EventChange, EventStatus, SyncState};

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Build a SyncState from a database row
fn row_to_sync_state(row: &rusqlite::Row) -> Result<SyncState, rusqlite::Error> {
    let last_synced: Option<String> = row.get(5)?;
    Ok(SyncState {
        user: row.get(0)?,
        calendar_id: row.get(1)?,
        calendar_name: row.get(2)?,
        calendar_color: row.get(3)?,
        sync_token: row.get(4)?,
        last_synced_at: last_synced.map(|s| parse_datetime_fallback(&s)),
        is_enabled: row.get(6)?,
    })
}

/// Build a CachedEvent from a database row
fn row_to_cached_event(row: &rusqlite::Row) -> Result<CachedEvent, rusqlite::Error> {
    let start: String = row.get(4)?;
    let end: String = row.get(5)?;
    let status: String = row.get(9)?;
    Ok(CachedEvent {
        user: row.get(0)?,
        calendar_id: row.get(1)?,
        remote_id: row.get(2)?,
        title: row.get(3)?,
        start: parse_datetime_fallback(&start),
        end: parse_datetime_fallback(&end),
        all_day: row.get(6)?,
        location: row.get(7)?,
        description: row.get(8)?,
        status: EventStatus::parse(&status),
        etag: row.get(10)?,
    })
}

const EVENT_COLUMNS: &str =
    "user, calendar_id, remote_id, title, start_at, end_at, all_day, location, description, status, etag";

/// SQLite database for calendar sync state and the event cache.
pub struct CalendarDb {
    conn: Connection,
}

impl CalendarDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/dayplan/dayplan.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("dayplan.db");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sync_state (
                user            TEXT NOT NULL,
                calendar_id     TEXT NOT NULL,
                calendar_name   TEXT NOT NULL DEFAULT '',
                calendar_color  TEXT NOT NULL DEFAULT '',
                sync_token      TEXT NOT NULL DEFAULT '',
                last_synced_at  TEXT,
                is_enabled      INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                UNIQUE(user, calendar_id)
            );

            CREATE TABLE IF NOT EXISTS cached_events (
                user         TEXT NOT NULL,
                calendar_id  TEXT NOT NULL,
                remote_id    TEXT NOT NULL,
                title        TEXT NOT NULL DEFAULT '',
                start_at     TEXT NOT NULL,
                end_at       TEXT NOT NULL,
                all_day      INTEGER NOT NULL DEFAULT 0,
                location     TEXT NOT NULL DEFAULT '',
                description  TEXT NOT NULL DEFAULT '',
                status       TEXT NOT NULL DEFAULT 'confirmed',
                etag         TEXT NOT NULL DEFAULT '',
                synced_at    TEXT NOT NULL,
                UNIQUE(user, calendar_id, remote_id)
            );

            -- Create indexes for common query patterns
            CREATE INDEX IF NOT EXISTS idx_cached_events_user_range
                ON cached_events(user, start_at, end_at);
            CREATE INDEX IF NOT EXISTS idx_cached_events_user_calendar
                ON cached_events(user, calendar_id);",
        )?;
        Ok(())
    }

    // === Sync state ===

    /// Get the sync state for a calendar, creating a disabled-token row on
    /// first discovery.
    pub fn get_or_create_sync_state(
        &self,
        user: &str,
        calendar_id: &str,
    ) -> Result<SyncState, rusqlite::Error> {
        if let Some(state) = self.get_sync_state(user, calendar_id)? {
            return Ok(state);
        }
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sync_state (user, calendar_id, calendar_name, created_at, updated_at)
             VALUES (?1, ?2, ?2, ?3, ?3)",
            params![user, calendar_id, now],
        )?;
        self.get_sync_state(user, calendar_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Get the sync state for a calendar, if any.
    pub fn get_sync_state(
        &self,
        user: &str,
        calendar_id: &str,
    ) -> Result<Option<SyncState>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT user, calendar_id, calendar_name, calendar_color, sync_token,
                        last_synced_at, is_enabled
                 FROM sync_state WHERE user = ?1 AND calendar_id = ?2",
                params![user, calendar_id],
                row_to_sync_state,
            )
            .optional()
    }

    /// Register a discovered calendar with sync enabled. Idempotent:
    /// re-discovery of an already-known calendar is a no-op.
    pub fn ensure_sync_state(
        &self,
        user: &str,
        calendar_id: &str,
        calendar_name: &str,
        calendar_color: &str,
    ) -> Result<(), rusqlite::Error> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO sync_state
                 (user, calendar_id, calendar_name, calendar_color, is_enabled,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![user, calendar_id, calendar_name, calendar_color, now],
        )?;
        Ok(())
    }

    /// All sync states with sync enabled for a user.
    pub fn enabled_sync_states(&self, user: &str) -> Result<Vec<SyncState>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT user, calendar_id, calendar_name, calendar_color, sync_token,
                    last_synced_at, is_enabled
             FROM sync_state WHERE user = ?1 AND is_enabled = 1
             ORDER BY calendar_id",
        )?;
        let states = stmt
            .query_map(params![user], row_to_sync_state)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    /// All sync states for a user, enabled or not.
    pub fn all_sync_states(&self, user: &str) -> Result<Vec<SyncState>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT user, calendar_id, calendar_name, calendar_color, sync_token,
                    last_synced_at, is_enabled
             FROM sync_state WHERE user = ?1 ORDER BY calendar_id",
        )?;
        let states = stmt
            .query_map(params![user], row_to_sync_state)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(states)
    }

    /// Enable or disable sync for a calendar. Returns false if the
    /// calendar is unknown.
    pub fn set_sync_enabled(
        &self,
        user: &str,
        calendar_id: &str,
        enabled: bool,
    ) -> Result<bool, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE sync_state SET is_enabled = ?3, updated_at = ?4
             WHERE user = ?1 AND calendar_id = ?2",
            params![user, calendar_id, enabled, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Clear the stored sync cursor, forcing the next sync to be full.
    pub fn clear_sync_token(&self, user: &str, calendar_id: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE sync_state SET sync_token = '', updated_at = ?3
             WHERE user = ?1 AND calendar_id = ?2",
            params![user, calendar_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // === Event cache ===

    /// Replace the whole event cache for a calendar and store the new
    /// cursor in a single transaction (full sync commit).
    ///
    /// Returns `(deleted, created)` row counts.
    pub fn replace_calendar_events(
        &self,
        user: &str,
        calendar_id: &str,
        events: &[CachedEvent],
        sync_token: &str,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), rusqlite::Error> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        let result: Result<(usize, usize), rusqlite::Error> = (|| {
            let deleted = self.conn.execute(
                "DELETE FROM cached_events WHERE user = ?1 AND calendar_id = ?2",
                params![user, calendar_id],
            )?;
            for event in events {
                self.insert_event(event, now)?;
            }
            self.store_cursor(user, calendar_id, sync_token, now)?;
            Ok((deleted, events.len()))
        })();
        match result {
            Ok(counts) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(counts)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    /// Apply an incremental change feed and store the new cursor in a
    /// single transaction (incremental sync commit).
    ///
    /// Returns `(created, updated, deleted)` counts. A deletion only
    /// counts when a cached row actually existed.
    pub fn apply_changes(
        &self,
        user: &str,
        calendar_id: &str,
        changes: &[EventChange],
        sync_token: &str,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize, usize), rusqlite::Error> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        let result: Result<(usize, usize, usize), rusqlite::Error> = (|| {
            let (mut created, mut updated, mut deleted) = (0, 0, 0);
            for change in changes {
                match change {
                    EventChange::Delete(remote_id) => {
                        let removed = self.conn.execute(
                            "DELETE FROM cached_events
                             WHERE user = ?1 AND calendar_id = ?2 AND remote_id = ?3",
                            params![user, calendar_id, remote_id],
                        )?;
                        if removed > 0 {
                            deleted += 1;
                        }
                    }
                    EventChange::Upsert(event) => {
                        let exists: Option<i64> = self
                            .conn
                            .query_row(
                                "SELECT 1 FROM cached_events
                                 WHERE user = ?1 AND calendar_id = ?2 AND remote_id = ?3",
                                params![user, calendar_id, event.remote_id],
                                |row| row.get(0),
                            )
                            .optional()?;
                        self.insert_event(event, now)?;
                        if exists.is_some() {
                            updated += 1;
                        } else {
                            created += 1;
                        }
                    }
                }
            }
            self.store_cursor(user, calendar_id, sync_token, now)?;
            Ok((created, updated, deleted))
        })();
        match result {
            Ok(counts) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(counts)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    fn insert_event(&self, event: &CachedEvent, now: DateTime<Utc>) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cached_events
                 (user, calendar_id, remote_id, title, start_at, end_at, all_day,
                  location, description, status, etag, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                event.user,
                event.calendar_id,
                event.remote_id,
                event.title,
                event.start.to_rfc3339(),
                event.end.to_rfc3339(),
                event.all_day,
                event.location,
                event.description,
                event.status.as_str(),
                event.etag,
                now.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn store_cursor(
        &self,
        user: &str,
        calendar_id: &str,
        sync_token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE sync_state SET sync_token = ?3, last_synced_at = ?4, updated_at = ?4
             WHERE user = ?1 AND calendar_id = ?2",
            params![user, calendar_id, sync_token, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Cached confirmed/tentative events of enabled calendars overlapping
    /// `[start, end]`, ordered by start time.
    pub fn events_in_range(
        &self,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CachedEvent>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM cached_events
             WHERE user = ?1
               AND status IN ('confirmed', 'tentative')
               AND start_at <= ?3 AND end_at >= ?2
               AND calendar_id IN
                   (SELECT calendar_id FROM sync_state
                    WHERE user = ?1 AND is_enabled = 1)
             ORDER BY start_at"
        ))?;
        let events = stmt
            .query_map(
                params![user, start.to_rfc3339(), end.to_rfc3339()],
                row_to_cached_event,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// All cached events for one calendar, ordered by start time.
    pub fn events_for_calendar(
        &self,
        user: &str,
        calendar_id: &str,
    ) -> Result<Vec<CachedEvent>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM cached_events
             WHERE user = ?1 AND calendar_id = ?2 ORDER BY start_at"
        ))?;
        let events = stmt
            .query_map(params![user, calendar_id], row_to_cached_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
