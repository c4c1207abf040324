//! One refresh: preferences, calendar resolution and upcoming events.
//!
//! Every call opens its own read-only connections and drops them before
//! returning, so widgets can refresh concurrently against the same container.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use famcal_calendar::{
    filter_upcoming, resolve_calendars, shared_calendar_ids, CalendarResolution, EventSource,
    ExternalEvent, RegistryStore, SqliteEventStore,
};
use tracing::instrument;

use crate::app_group::AppGroup;
use crate::error::RefreshError;
use crate::preferences::{read_preferences, EventWindow, Preferences};

/// Everything a provider needs to build its content.
#[derive(Debug, Clone)]
pub struct RefreshSnapshot {
    pub preferences: Preferences,
    pub window: EventWindow,
    pub resolution: CalendarResolution,
    pub shared_calendar_ids: HashSet<String>,
    /// Timed, not yet ended, sorted by start.
    pub events: Vec<ExternalEvent>,
}

/// Events of the given calendars the widgets may show.
///
/// Authorization is checked before anything is fetched. A status that was
/// never determined counts as missing access since a widget cannot prompt.
pub fn fetch_upcoming(
    source: &dyn EventSource,
    calendar_ids: &HashSet<String>,
    window: EventWindow,
    now: DateTime<Utc>,
) -> Result<Vec<ExternalEvent>, RefreshError> {
    let status = source.authorization_status()?;
    if !status.is_authorized() {
        tracing::info!("Calendar access is {}", status.as_str());
        return Err(RefreshError::CalendarAccessRequired);
    }

    let events = source.fetch_events(calendar_ids, window.start, window.end)?;
    let fetched = events.len();
    let upcoming = filter_upcoming(events, now);
    tracing::debug!("{} of {} fetched events are upcoming", upcoming.len(), fetched);
    Ok(upcoming)
}

/// Run the read, resolve and fetch stages against an app group.
#[instrument(skip(group), fields(group = group.identifier()))]
pub fn load_snapshot(group: &AppGroup, now: DateTime<Utc>) -> Result<RefreshSnapshot, RefreshError> {
    let preferences = read_preferences(group)?;

    let (members, links, shared) = {
        let registry = RegistryStore::open_read_only(group.registry_path())?;
        (
            registry.members()?,
            registry.member_calendars()?,
            registry.shared_calendars()?,
        )
    };
    if members.is_empty() {
        return Err(RefreshError::NoMembers);
    }

    let resolution = resolve_calendars(&members, &links, &shared);
    if resolution.is_empty() {
        return Err(RefreshError::NoCalendars);
    }

    let window = preferences.window(now);
    let store = SqliteEventStore::open_read_only(group.event_store_path())?;
    let events = fetch_upcoming(&store, &resolution.calendar_ids(), window, now)?;

    Ok(RefreshSnapshot {
        preferences,
        window,
        shared_calendar_ids: shared_calendar_ids(&shared),
        resolution,
        events,
    })
}
