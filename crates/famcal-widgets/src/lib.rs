//! Home-screen widgets for the family calendar.
//!
//! Each refresh reads the app group's preferences, resolves calendars from the
//! member registry, fetches upcoming events, and turns them into a
//! [`TimelineEntry`]. [`WidgetHost`] schedules refreshes for a set of widgets.

pub mod app_group;
pub mod error;
pub mod family_list;
pub mod host;
pub mod next_event;
pub mod pipeline;
pub mod preferences;
pub mod timeline;

pub use app_group::AppGroup;
pub use error::RefreshError;
pub use family_list::FamilyEventsProvider;
pub use host::WidgetHost;
pub use next_event::NextEventProvider;
pub use pipeline::{fetch_upcoming, load_snapshot, RefreshSnapshot};
pub use preferences::{read_preferences, EventWindow, Preferences};
pub use timeline::{
    RefreshContext, RefreshPolicy, TimelineContent, TimelineEntry, TimelineProvider, WidgetEvent,
    WidgetKind, WidgetMonth,
};
