//! Sync engine tests against a scripted in-memory provider.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::SyncError;
use crate::provider::{CalendarProvider, EventPage, ProviderCalendar, ProviderEvent};
use crate::storage::CalendarDb;
use crate::sync::engine::{SyncEngine, MAX_SYNC_PAGES};
use crate::sync::types::EventStatus;

type PageScript = RefCell<HashMap<String, VecDeque<Result<EventPage, SyncError>>>>;

/// Provider double driven by pre-scripted responses per calendar.
#[derive(Default)]
struct StubProvider {
    calendars: RefCell<Vec<ProviderCalendar>>,
    no_credentials: bool,
    full_pages: PageScript,
    changed_pages: PageScript,
    full_calls: Cell<usize>,
    changed_calls: Cell<usize>,
}

impl StubProvider {
    fn with_calendars(ids: &[&str]) -> Self {
        let stub = Self::default();
        for id in ids {
            stub.calendars.borrow_mut().push(ProviderCalendar {
                id: id.to_string(),
                name: format!("Calendar {id}"),
                color: "#4285f4".to_string(),
                primary: false,
            });
        }
        stub
    }

    fn script_full(&self, calendar_id: &str, page: Result<EventPage, SyncError>) {
        self.full_pages
            .borrow_mut()
            .entry(calendar_id.to_string())
            .or_default()
            .push_back(page);
    }

    fn script_changed(&self, calendar_id: &str, page: Result<EventPage, SyncError>) {
        self.changed_pages
            .borrow_mut()
            .entry(calendar_id.to_string())
            .or_default()
            .push_back(page);
    }
}

impl CalendarProvider for StubProvider {
    fn list_calendars(&self) -> Result<Vec<ProviderCalendar>, SyncError> {
        if self.no_credentials {
            return Err(SyncError::NoCredentials);
        }
        Ok(self.calendars.borrow().clone())
    }

    fn list_events_full(
        &self,
        calendar_id: &str,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
        _page_token: Option<&str>,
    ) -> Result<EventPage, SyncError> {
        self.full_calls.set(self.full_calls.get() + 1);
        self.full_pages
            .borrow_mut()
            .get_mut(calendar_id)
            .and_then(|pages| pages.pop_front())
            .unwrap_or_else(|| Err(SyncError::Provider("unscripted full page".to_string())))
    }

    fn list_events_changed(
        &self,
        calendar_id: &str,
        _sync_token: &str,
        _page_token: Option<&str>,
    ) -> Result<EventPage, SyncError> {
        self.changed_calls.set(self.changed_calls.get() + 1);
        self.changed_pages
            .borrow_mut()
            .get_mut(calendar_id)
            .and_then(|pages| pages.pop_front())
            .unwrap_or_else(|| Err(SyncError::Provider("unscripted changed page".to_string())))
    }
}

fn event(id: &str, hour: u32, status: EventStatus) -> ProviderEvent {
    ProviderEvent {
        id: id.to_string(),
        title: format!("Event {id}"),
        start: Utc.with_ymd_and_hms(2025, 3, 5, hour, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 3, 5, hour + 1, 0, 0).unwrap(),
        all_day: false,
        location: String::new(),
        description: String::new(),
        status,
        etag: format!("etag-{id}"),
    }
}

fn final_page(items: Vec<ProviderEvent>, sync_token: &str) -> EventPage {
    EventPage {
        items,
        next_page_token: None,
        next_sync_token: Some(sync_token.to_string()),
    }
}

fn middle_page(items: Vec<ProviderEvent>, page_token: &str) -> EventPage {
    EventPage {
        items,
        next_page_token: Some(page_token.to_string()),
        next_sync_token: None,
    }
}

#[test]
fn empty_token_triggers_full_sync_and_skips_cancelled() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full(
        "cal-1",
        Ok(final_page(
            vec![
                event("a", 9, EventStatus::Confirmed),
                event("b", 11, EventStatus::Cancelled),
                event("c", 14, EventStatus::Tentative),
            ],
            "tok-1",
        )),
    );

    let engine = SyncEngine::new(&provider, &db);
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(result.is_ok());
    assert!(result.full_sync_performed);
    assert_eq!(result.created, 2);
    let state = db.get_sync_state("u1", "cal-1").unwrap().unwrap();
    assert_eq!(state.sync_token, "tok-1");
    assert_eq!(db.events_for_calendar("u1", "cal-1").unwrap().len(), 2);
}

#[test]
fn full_sync_accumulates_pages() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full(
        "cal-1",
        Ok(middle_page(vec![event("a", 9, EventStatus::Confirmed)], "p2")),
    );
    provider.script_full(
        "cal-1",
        Ok(final_page(vec![event("b", 11, EventStatus::Confirmed)], "tok-1")),
    );

    let engine = SyncEngine::new(&provider, &db);
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert_eq!(result.created, 2);
    assert_eq!(provider.full_calls.get(), 2);
}

#[test]
fn stored_token_triggers_incremental_sync() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full(
        "cal-1",
        Ok(final_page(
            vec![
                event("a", 9, EventStatus::Confirmed),
                event("b", 11, EventStatus::Confirmed),
            ],
            "tok-1",
        )),
    );
    let engine = SyncEngine::new(&provider, &db);
    engine.sync_calendar("u1", "cal-1").unwrap();

    provider.script_changed(
        "cal-1",
        Ok(final_page(
            vec![
                event("a", 10, EventStatus::Confirmed),
                event("b", 11, EventStatus::Cancelled),
                event("c", 15, EventStatus::Confirmed),
            ],
            "tok-2",
        )),
    );
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(!result.full_sync_performed);
    assert_eq!((result.created, result.updated, result.deleted), (1, 1, 1));
    let state = db.get_sync_state("u1", "cal-1").unwrap().unwrap();
    assert_eq!(state.sync_token, "tok-2");
    let events = db.events_for_calendar("u1", "cal-1").unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.remote_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn second_sync_with_no_changes_is_idempotent() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full(
        "cal-1",
        Ok(final_page(vec![event("a", 9, EventStatus::Confirmed)], "tok-1")),
    );
    let engine = SyncEngine::new(&provider, &db);
    engine.sync_calendar("u1", "cal-1").unwrap();

    provider.script_changed("cal-1", Ok(final_page(vec![], "tok-2")));
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(result.is_ok());
    assert_eq!((result.created, result.updated, result.deleted), (0, 0, 0));
    assert_eq!(db.events_for_calendar("u1", "cal-1").unwrap().len(), 1);
}

#[test]
fn expired_cursor_falls_back_to_exactly_one_full_sync() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full(
        "cal-1",
        Ok(final_page(vec![event("a", 9, EventStatus::Confirmed)], "tok-stale")),
    );
    let engine = SyncEngine::new(&provider, &db);
    engine.sync_calendar("u1", "cal-1").unwrap();

    provider.script_changed("cal-1", Err(SyncError::ExpiredCursor));
    provider.script_full(
        "cal-1",
        Ok(final_page(
            vec![
                event("b", 10, EventStatus::Confirmed),
                event("c", 12, EventStatus::Confirmed),
            ],
            "tok-fresh",
        )),
    );
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(result.is_ok());
    assert!(result.full_sync_performed);
    assert_eq!(result.created, 2);
    assert_eq!(provider.changed_calls.get(), 1);
    assert_eq!(provider.full_calls.get(), 2);
    let state = db.get_sync_state("u1", "cal-1").unwrap().unwrap();
    assert_eq!(state.sync_token, "tok-fresh");
    // Full sync replaced the stale cache wholesale.
    let events = db.events_for_calendar("u1", "cal-1").unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.remote_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[test]
fn fallback_failure_does_not_retry_again() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full(
        "cal-1",
        Ok(final_page(vec![event("a", 9, EventStatus::Confirmed)], "tok-stale")),
    );
    let engine = SyncEngine::new(&provider, &db);
    engine.sync_calendar("u1", "cal-1").unwrap();

    provider.script_changed("cal-1", Err(SyncError::ExpiredCursor));
    provider.script_full("cal-1", Err(SyncError::Provider("boom".to_string())));
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(!result.is_ok());
    assert_eq!(provider.full_calls.get(), 2);
    // Token stays cleared so the next invocation starts with a full sync.
    let state = db.get_sync_state("u1", "cal-1").unwrap().unwrap();
    assert!(state.sync_token.is_empty());
}

#[test]
fn provider_error_is_recorded_and_commits_nothing() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    provider.script_full("cal-1", Err(SyncError::Provider("503".to_string())));

    let engine = SyncEngine::new(&provider, &db);
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(!result.is_ok());
    assert!(!result.full_sync_performed);
    assert!(db.events_for_calendar("u1", "cal-1").unwrap().is_empty());
    let state = db.get_sync_state("u1", "cal-1").unwrap().unwrap();
    assert!(state.sync_token.is_empty());
}

#[test]
fn runaway_pagination_aborts_without_committing() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::default();
    for i in 0..=MAX_SYNC_PAGES {
        provider.script_full(
            "cal-1",
            Ok(middle_page(
                vec![event(&format!("e{i}"), 9, EventStatus::Confirmed)],
                "again",
            )),
        );
    }

    let engine = SyncEngine::new(&provider, &db);
    let result = engine.sync_calendar("u1", "cal-1").unwrap();

    assert!(!result.is_ok());
    assert!(result.errors[0].contains("pages"));
    assert_eq!(provider.full_calls.get(), MAX_SYNC_PAGES);
    assert!(db.events_for_calendar("u1", "cal-1").unwrap().is_empty());
}

#[test]
fn sync_all_discovers_and_enables_calendars() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::with_calendars(&["cal-1", "cal-2"]);
    provider.script_full("cal-1", Ok(final_page(vec![event("a", 9, EventStatus::Confirmed)], "t1")));
    provider.script_full("cal-2", Ok(final_page(vec![], "t2")));

    let engine = SyncEngine::new(&provider, &db);
    let results = engine.sync_all("u1").unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_ok() && r.full_sync_performed));
    let states = db.enabled_sync_states("u1").unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].calendar_name, "Calendar cal-1");
}

#[test]
fn sync_all_skips_discovery_when_states_exist() {
    let db = CalendarDb::open_memory().unwrap();
    db.ensure_sync_state("u1", "cal-1", "Work", "").unwrap();
    let provider = StubProvider::with_calendars(&["cal-1", "cal-2"]);
    provider.script_full("cal-1", Ok(final_page(vec![], "t1")));

    let engine = SyncEngine::new(&provider, &db);
    let results = engine.sync_all("u1").unwrap();

    assert_eq!(results.len(), 1);
    assert!(db.get_sync_state("u1", "cal-2").unwrap().is_none());
}

#[test]
fn sync_all_without_credentials_skips_user() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider {
        no_credentials: true,
        ..Default::default()
    };

    let engine = SyncEngine::new(&provider, &db);
    let results = engine.sync_all("u1").unwrap();

    assert!(results.is_empty());
    assert!(db.all_sync_states("u1").unwrap().is_empty());
}

#[test]
fn one_failing_calendar_does_not_abort_the_rest() {
    let db = CalendarDb::open_memory().unwrap();
    let provider = StubProvider::with_calendars(&["cal-1", "cal-2"]);
    provider.script_full("cal-1", Err(SyncError::Provider("500".to_string())));
    provider.script_full(
        "cal-2",
        Ok(final_page(vec![event("a", 9, EventStatus::Confirmed)], "t2")),
    );

    let engine = SyncEngine::new(&provider, &db);
    let results = engine.sync_all("u1").unwrap();

    assert_eq!(results.len(), 2);
    let failed = results.iter().find(|r| r.calendar_id == "cal-1").unwrap();
    let synced = results.iter().find(|r| r.calendar_id == "cal-2").unwrap();
    assert!(!failed.is_ok());
    assert!(synced.is_ok());
    assert_eq!(db.events_for_calendar("u1", "cal-2").unwrap().len(), 1);
}
