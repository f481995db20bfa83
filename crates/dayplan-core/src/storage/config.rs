//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Per-weekday scheduling windows for the daily planner
//! - Planner defaults (fallback task duration)
//! - The calendar sync fetch window
//!
//! Configuration is stored at `~/.config/dayplan/config.toml`.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::planner::MinuteRange;

/// A scheduling window as configured, `"HH:MM"` bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowRange {
    pub start: String,
    pub end: String,
}

impl WindowRange {
    /// Parse into minutes from midnight. Returns `None` for malformed
    /// or empty (start >= end) windows.
    pub fn to_minutes(&self) -> Option<MinuteRange> {
        let start = parse_hhmm(&self.start)?;
        let end = parse_hhmm(&self.end)?;
        if start >= end {
            return None;
        }
        Some(MinuteRange { start, end })
    }
}

fn parse_hhmm(s: &str) -> Option<i64> {
    let (hours, minutes) = s.split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

fn window(start: &str, end: &str) -> WindowRange {
    WindowRange {
        start: start.to_string(),
        end: end.to_string(),
    }
}

/// Built-in fallback for weekdays with no configured windows:
/// 09:00-12:00 and 14:00-18:00.
pub fn default_windows() -> Vec<WindowRange> {
    vec![window("09:00", "12:00"), window("14:00", "18:00")]
}

/// Per-weekday scheduling windows.
///
/// An empty list for a weekday falls back to [`default_windows`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulingWindows {
    #[serde(default)]
    pub monday: Vec<WindowRange>,
    #[serde(default)]
    pub tuesday: Vec<WindowRange>,
    #[serde(default)]
    pub wednesday: Vec<WindowRange>,
    #[serde(default)]
    pub thursday: Vec<WindowRange>,
    #[serde(default)]
    pub friday: Vec<WindowRange>,
    #[serde(default)]
    pub saturday: Vec<WindowRange>,
    #[serde(default)]
    pub sunday: Vec<WindowRange>,
}

impl SchedulingWindows {
    fn configured(&self, weekday: Weekday) -> &[WindowRange] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Windows for a weekday in minutes from midnight, sorted ascending.
    /// Malformed entries are skipped; an unset weekday uses the defaults.
    pub fn for_weekday(&self, weekday: Weekday) -> Vec<MinuteRange> {
        let configured = self.configured(weekday);
        let source = if configured.is_empty() {
            default_windows()
        } else {
            configured.to_vec()
        };

        let mut ranges: Vec<MinuteRange> =
            source.iter().filter_map(WindowRange::to_minutes).collect();
        ranges.sort();
        ranges
    }
}

/// Planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Fallback duration for tasks without an estimate (minutes).
    #[serde(default = "default_task_minutes")]
    pub default_task_minutes: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_task_minutes: default_task_minutes(),
        }
    }
}

/// Calendar sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How far back a full sync fetches (days).
    #[serde(default = "default_days_back")]
    pub days_back: i64,
    /// How far forward a full sync fetches (days).
    #[serde(default = "default_days_forward")]
    pub days_forward: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            days_forward: default_days_forward(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dayplan/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub windows: SchedulingWindows,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

// Default functions
fn default_task_minutes() -> i64 {
    30
}
fn default_days_back() -> i64 {
    30
}
fn default_days_forward() -> i64 {
    365
}

impl Config {
    /// Path to the configuration file.
    pub fn path() -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file
    /// doesn't exist yet.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Persist the configuration.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::path()?;
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
