//! Google Calendar provider client.
//!
//! Talks to the Calendar v3 REST API with a bearer token stored in the OS
//! keyring (`dayplan auth set-token`). Acquiring the token (OAuth flow) is
//! out of scope for the core.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::keyring_store;
use super::{CalendarProvider, EventPage, ProviderCalendar, ProviderEvent};
use crate::error::SyncError;
use crate::sync::types::EventStatus;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: u32 = 250;

/// Keyring entry holding the Calendar API access token.
pub const ACCESS_TOKEN_KEY: &str = "google_access_token";

/// Google Calendar API client.
pub struct GoogleCalendarProvider {
    base_url: String,
    /// Fixed token for tests; `None` means look up the keyring per call.
    token_override: Option<String>,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl GoogleCalendarProvider {
    /// Create a client that reads its access token from the OS keyring.
    pub fn new() -> Result<Self, SyncError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (used by HTTP tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| SyncError::Provider(format!("failed to start runtime: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            token_override: None,
            client: Client::new(),
            runtime,
        })
    }

    /// Use a fixed access token instead of the keyring.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token_override = Some(token.into());
        self
    }

    fn access_token(&self) -> Result<String, SyncError> {
        if let Some(token) = &self.token_override {
            return Ok(token.clone());
        }
        keyring_store::get(ACCESS_TOKEN_KEY)
            .map_err(|e| SyncError::Provider(format!("keyring lookup failed: {e}")))?
            .filter(|t| !t.is_empty())
            .ok_or(SyncError::NoCredentials)
    }

    /// GET a provider URL and return the parsed JSON body.
    ///
    /// HTTP 410 means the sync cursor is no longer valid.
    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, SyncError> {
        let token = self.access_token()?;
        let (status, body): (StatusCode, Value) = self.runtime.block_on(async {
            let resp = self
                .client
                .get(url)
                .query(query)
                .bearer_auth(&token)
                .send()
                .await?;
            let status = resp.status();
            let body = resp.json().await.unwrap_or(Value::Null);
            Ok::<_, reqwest::Error>((status, body))
        })?;

        if status == StatusCode::GONE {
            return Err(SyncError::ExpiredCursor);
        }
        if !status.is_success() {
            let detail = body
                .get("error")
                .map(|e| e.to_string())
                .unwrap_or_else(|| status.to_string());
            return Err(SyncError::Provider(format!(
                "Calendar API error ({status}): {detail}"
            )));
        }
        Ok(body)
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn parse_page(&self, body: &Value) -> EventPage {
        let items = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(parse_event)
                    .collect::<Vec<ProviderEvent>>()
            })
            .unwrap_or_default();

        EventPage {
            items,
            next_page_token: body["nextPageToken"].as_str().map(str::to_string),
            next_sync_token: body["nextSyncToken"].as_str().map(str::to_string),
        }
    }
}

impl CalendarProvider for GoogleCalendarProvider {
    fn list_calendars(&self) -> Result<Vec<ProviderCalendar>, SyncError> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let body = self.get_json(&url, &query)?;

            if let Some(items) = body["items"].as_array() {
                for item in items {
                    let Some(id) = item["id"].as_str() else {
                        continue;
                    };
                    calendars.push(ProviderCalendar {
                        id: id.to_string(),
                        name: item["summary"].as_str().unwrap_or("Untitled").to_string(),
                        color: item["backgroundColor"]
                            .as_str()
                            .unwrap_or("#4285f4")
                            .to_string(),
                        primary: item["primary"].as_bool().unwrap_or(false),
                    });
                }
            }

            match body["nextPageToken"].as_str() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(calendars)
    }

    fn list_events_full(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<EventPage, SyncError> {
        let url = self.events_url(calendar_id);
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let max_results = PAGE_SIZE.to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("timeMin", &time_min),
            ("timeMax", &time_max),
            ("singleEvents", "true"),
            ("maxResults", &max_results),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let body = self.get_json(&url, &query)?;
        Ok(self.parse_page(&body))
    }

    fn list_events_changed(
        &self,
        calendar_id: &str,
        sync_token: &str,
        page_token: Option<&str>,
    ) -> Result<EventPage, SyncError> {
        let url = self.events_url(calendar_id);
        let max_results = PAGE_SIZE.to_string();

        let mut query: Vec<(&str, &str)> =
            vec![("syncToken", sync_token), ("maxResults", &max_results)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let body = self.get_json(&url, &query)?;
        Ok(self.parse_page(&body))
    }
}

/// Parse one event item. Items missing both `date` and `dateTime` are
/// malformed and skipped rather than failing the batch, except cancelled
/// items: the change feed reports those as bare tombstones carrying only
/// an id and status, and only the id matters downstream.
fn parse_event(item: &Value) -> Option<ProviderEvent> {
    let id = item["id"].as_str()?;
    let status = EventStatus::parse(item["status"].as_str().unwrap_or("confirmed"));

    if status == EventStatus::Cancelled {
        return Some(ProviderEvent {
            id: id.to_string(),
            title: item["summary"].as_str().unwrap_or("").to_string(),
            start: DateTime::UNIX_EPOCH,
            end: DateTime::UNIX_EPOCH,
            all_day: false,
            location: String::new(),
            description: String::new(),
            status,
            etag: item["etag"].as_str().unwrap_or("").to_string(),
        });
    }

    let (start, end, all_day) = if item["start"]["date"].is_string() {
        // All-day event: pinned to midnight UTC.
        let start = parse_all_day(item["start"]["date"].as_str()?)?;
        let end = parse_all_day(item["end"]["date"].as_str()?)?;
        (start, end, true)
    } else if item["start"]["dateTime"].is_string() {
        let start = parse_timestamp(item["start"]["dateTime"].as_str()?)?;
        let end = parse_timestamp(item["end"]["dateTime"].as_str()?)?;
        (start, end, false)
    } else {
        return None;
    };

    Some(ProviderEvent {
        id: id.to_string(),
        title: item["summary"].as_str().unwrap_or("(No title)").to_string(),
        start,
        end,
        all_day,
        location: item["location"].as_str().unwrap_or("").to_string(),
        description: item["description"].as_str().unwrap_or("").to_string(),
        status,
        etag: item["etag"].as_str().unwrap_or("").to_string(),
    })
}

fn parse_all_day(s: &str) -> Option<DateTime<Utc>> {
    let date: NaiveDate = s.parse().ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
