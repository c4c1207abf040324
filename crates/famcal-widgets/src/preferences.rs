//! Widget preferences from the app group's shared defaults.

use std::io::ErrorKind;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::app_group::AppGroup;
use crate::error::RefreshError;

pub const MAX_RESULTS_KEY: &str = "widgetMaxResults";
pub const LOOKBACK_DAYS_KEY: &str = "widgetLookbackDays";
pub const LOOKAHEAD_DAYS_KEY: &str = "widgetLookaheadDays";

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 180;
/// Largest accepted lookback or lookahead. Larger values are treated as unset.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub max_results: usize,
    pub lookback_days: i64,
    pub lookahead_days: i64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }
}

impl Preferences {
    /// Build from a defaults table. Missing, mistyped, non-positive or
    /// out-of-range values fall back.
    fn from_table(table: &toml::Table) -> Self {
        let positive = |key: &str| {
            table
                .get(key)
                .and_then(toml::Value::as_integer)
                .filter(|v| *v > 0)
        };
        let days = |key: &str, default: i64| {
            positive(key)
                .filter(|v| {
                    let in_range = *v <= MAX_WINDOW_DAYS;
                    if !in_range {
                        tracing::warn!("Ignoring {} = {}: above {} days", key, v, MAX_WINDOW_DAYS);
                    }
                    in_range
                })
                .unwrap_or(default)
        };
        Self {
            max_results: positive(MAX_RESULTS_KEY)
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(DEFAULT_MAX_RESULTS),
            lookback_days: days(LOOKBACK_DAYS_KEY, DEFAULT_LOOKBACK_DAYS),
            lookahead_days: days(LOOKAHEAD_DAYS_KEY, DEFAULT_LOOKAHEAD_DAYS),
        }
    }

    /// Fetch window around `now`. A bound that does not fit the calendar
    /// falls back to its default offset.
    pub fn window(&self, now: DateTime<Utc>) -> EventWindow {
        let shift = |days: i64, default: i64, forward: bool| {
            let apply = |days: i64| {
                let delta = Duration::try_days(days)?;
                if forward {
                    now.checked_add_signed(delta)
                } else {
                    now.checked_sub_signed(delta)
                }
            };
            apply(days).or_else(|| apply(default)).unwrap_or(now)
        };
        EventWindow {
            start: shift(self.lookback_days, DEFAULT_LOOKBACK_DAYS, false),
            end: shift(self.lookahead_days, DEFAULT_LOOKAHEAD_DAYS, true),
        }
    }
}

/// Inclusive time window handed to the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Read the widget preferences of an app group.
///
/// A missing defaults file means every key is unset. An unreachable container
/// is fatal for the refresh.
pub fn read_preferences(group: &AppGroup) -> Result<Preferences, RefreshError> {
    group.container()?;
    let path = group.preferences_path();

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Preferences::default()),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            return Err(RefreshError::GroupUnreachable(e.to_string()));
        }
    };

    match toml::from_str::<toml::Table>(&contents) {
        Ok(table) => Ok(Preferences::from_table(&table)),
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            Ok(Preferences::default())
        }
    }
}
