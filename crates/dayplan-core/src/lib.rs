//! # dayplan-core
//!
//! Core library for dayplan, a personal task and time management tool.
//!
//! Two halves:
//!
//! - **Sync**: mirrors a user's external calendars into a local SQLite
//!   cache. [`sync::SyncEngine`] runs full or incremental syncs per
//!   calendar through the [`provider::CalendarProvider`] trait, with
//!   [`provider::GoogleCalendarProvider`] as the concrete backend.
//! - **Planning**: [`planner::DailyPlanner`] deterministically packs
//!   pending tasks into the free time left between cached events and the
//!   configured scheduling windows.
//!
//! Everything is keyed by a user identifier so one database serves
//! multiple users.

pub mod error;
pub mod planner;
pub mod provider;
pub mod storage;
pub mod sync;
pub mod task;

pub use error::{ConfigError, CoreError, DatabaseError, Result, SyncError};
pub use planner::{DailyPlanner, ProposedPlan, TimeSlot};
pub use provider::{CalendarProvider, GoogleCalendarProvider};
pub use storage::{CalendarDb, Config, TaskDb};
pub use sync::{SyncEngine, SyncResult};
pub use task::{Task, TimeHorizon};
