//! Family calendar data: the member registry, calendar events, and the
//! resolution and grouping that turn them into widget content.

pub mod deep_link;
pub mod error;
pub mod event_store;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod types;

pub use deep_link::DeepLink;
pub use error::CalendarError;
pub use event_store::{EventSource, InMemoryEventSource, SqliteEventStore};
pub use registry::RegistryStore;
pub use resolver::{
    resolve_calendars, shared_calendar_ids, shared_placeholder_id, CalendarInfo,
    CalendarResolution,
};
pub use selector::{filter_upcoming, group_for_display, select_next};
pub use types::{
    AuthorizationStatus, DayGroup, ExternalEvent, MemberCalendarLink, MemberRecord, MonthGroup,
    ResolvedEventView, SharedCalendarRecord,
};
