//! Timeline entries produced by widget providers.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use famcal_calendar::{DayGroup, DeepLink, MonthGroup, ResolvedEventView};
use famcal_core::Config;
use serde::Serialize;

use crate::app_group::AppGroup;
use crate::error::RefreshError;

/// Earliest a next-event widget asks to be refreshed again.
pub const MIN_REFRESH_DELAY_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    NextEvent,
    FamilyEvents,
}

impl WidgetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NextEvent => "next_event",
            Self::FamilyEvents => "family_events",
        }
    }
}

/// When the widget would like its next refresh. The scheduler may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshPolicy {
    pub after: DateTime<Utc>,
}

impl RefreshPolicy {
    /// Refresh once the regular interval has passed.
    pub fn interval(now: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            after: now + interval,
        }
    }

    /// Refresh when the shown event ends, within `[now + 5 min, now + interval]`.
    pub fn at_event_end(end: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> Self {
        let earliest = now + Duration::minutes(MIN_REFRESH_DELAY_MINUTES);
        Self {
            after: end.max(earliest).min(now + interval),
        }
    }
}

/// A resolved event together with the link that opens it in the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetEvent {
    #[serde(flatten)]
    pub view: ResolvedEventView,
    pub deep_link: String,
}

impl From<ResolvedEventView> for WidgetEvent {
    fn from(view: ResolvedEventView) -> Self {
        let deep_link = DeepLink::for_view(&view).to_url();
        Self { view, deep_link }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetDay {
    pub date: NaiveDate,
    pub events: Vec<WidgetEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<WidgetDay>,
}

impl From<MonthGroup> for WidgetMonth {
    fn from(group: MonthGroup) -> Self {
        Self {
            year: group.year,
            month: group.month,
            days: group
                .days
                .into_iter()
                .map(|DayGroup { date, events }| WidgetDay {
                    date,
                    events: events.into_iter().map(WidgetEvent::from).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimelineContent {
    /// Shown before the first refresh completes.
    Placeholder,
    NextEvent { event: WidgetEvent },
    FamilyEvents { months: Vec<WidgetMonth> },
    Error { error: RefreshError, message: String },
}

impl From<RefreshError> for TimelineContent {
    fn from(error: RefreshError) -> Self {
        let message = error.user_message();
        Self::Error { error, message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub kind: WidgetKind,
    pub date: DateTime<Utc>,
    pub content: TimelineContent,
    pub refresh: RefreshPolicy,
}

impl TimelineEntry {
    pub fn error(&self) -> Option<&RefreshError> {
        match &self.content {
            TimelineContent::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Inputs shared by every provider refresh.
#[derive(Debug, Clone)]
pub struct RefreshContext {
    pub group: AppGroup,
    pub refresh_interval: Duration,
    /// Zone for day grouping. System local time when `None`.
    pub time_zone: Option<Tz>,
}

impl RefreshContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            group: AppGroup::from_config(&config.app_group),
            refresh_interval: Duration::minutes(i64::from(config.widgets.refresh_minutes.max(1))),
            time_zone: config.widgets.parsed_time_zone(),
        }
    }
}

/// A widget surface the scheduler can refresh.
///
/// `refresh` never fails: errors become [`TimelineContent::Error`] entries.
pub trait TimelineProvider: Send + Sync {
    fn kind(&self) -> WidgetKind;

    fn placeholder(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> TimelineEntry {
        TimelineEntry {
            kind: self.kind(),
            date: now,
            content: TimelineContent::Placeholder,
            refresh: RefreshPolicy::interval(now, ctx.refresh_interval),
        }
    }

    fn refresh(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> TimelineEntry;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_refresh_at_event_end() {
        let now = Utc::now();
        let interval = Duration::minutes(30);

        let end = now + Duration::minutes(12);
        assert_eq!(RefreshPolicy::at_event_end(end, now, interval).after, end);

        let soon = now + Duration::minutes(1);
        assert_eq!(
            RefreshPolicy::at_event_end(soon, now, interval).after,
            now + Duration::minutes(5)
        );

        let far = now + Duration::hours(5);
        assert_eq!(RefreshPolicy::at_event_end(far, now, interval).after, now + interval);
    }

    #[test]
    fn test_refresh_interval_shorter_than_minimum_delay() {
        let now = Utc::now();
        let interval = Duration::minutes(1);
        let end = now + Duration::minutes(3);
        assert_eq!(RefreshPolicy::at_event_end(end, now, interval).after, now + interval);
    }

    #[test]
    fn test_error_content_carries_message() {
        let content: TimelineContent = RefreshError::NoCalendars.into();
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "No calendars found.");
        assert_eq!(json["error"]["kind"], "no_calendars");
    }

    #[test]
    fn test_context_from_config() {
        let mut config = Config::default();
        config.widgets.refresh_minutes = 0;
        config.widgets.time_zone = Some("Europe/Berlin".into());

        let ctx = RefreshContext::from_config(&config);
        assert_eq!(ctx.refresh_interval, Duration::minutes(1));
        assert_eq!(ctx.time_zone, Some(chrono_tz::Europe::Berlin));
    }
}
