//! Registry records, calendar events and the views built from them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name shown for a member whose stored name is missing.
pub const UNKNOWN_MEMBER_NAME: &str = "Unknown";

/// Title shown for an event without one.
pub const UNTITLED_EVENT: &str = "Event";

/// Family member as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: Uuid,
    pub name: String,
    pub color_hex: String,
    /// Primary external calendar of this member.
    pub linked_calendar_id: Option<String>,
}

impl MemberRecord {
    /// Build a record, substituting [`UNKNOWN_MEMBER_NAME`] for a missing or blank name.
    pub fn new(
        id: Uuid,
        name: Option<&str>,
        color_hex: &str,
        linked_calendar_id: Option<&str>,
    ) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_MEMBER_NAME);
        Self {
            id,
            name: name.to_string(),
            color_hex: color_hex.to_string(),
            linked_calendar_id: linked_calendar_id.map(ToOwned::to_owned),
        }
    }
}

/// Additional calendar a member linked beyond their primary one.
///
/// Ownership is stored on this side only; members do not reference their links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCalendarLink {
    pub calendar_id: String,
    pub calendar_color_hex: Option<String>,
    pub owner_member_id: Uuid,
}

/// Calendar visible to the whole family rather than one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedCalendarRecord {
    pub calendar_id: String,
    pub display_name: Option<String>,
    pub color_hex: Option<String>,
}

/// Event as returned by the calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub id: String,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub calendar_id: String,
    pub location: Option<String>,
    pub is_all_day: bool,
}

impl ExternalEvent {
    /// Title for display, [`UNTITLED_EVENT`] when missing.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED_EVENT)
    }

    /// Timed event that has not ended yet.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        !self.is_all_day && self.end > now
    }
}

/// Access the user granted to the calendar provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    Restricted,
    #[default]
    NotDetermined,
}

impl AuthorizationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Denied => "denied",
            Self::Restricted => "restricted",
            Self::NotDetermined => "not_determined",
        }
    }

    /// Parse a stored status. Unknown values read as not determined.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "authorized" | "full_access" => Self::Authorized,
            "denied" => Self::Denied,
            "restricted" => Self::Restricted,
            _ => Self::NotDetermined,
        }
    }

    pub fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Event joined with the member (or shared calendar) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEventView {
    pub event: ExternalEvent,
    pub member_id: Uuid,
    pub member_name: String,
    pub color_hex: String,
}

/// Events starting on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub events: Vec<ResolvedEventView>,
}

/// Days of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGroup {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayGroup>,
}

impl MonthGroup {
    /// All events of the month in display order.
    pub fn events(&self) -> impl Iterator<Item = &ResolvedEventView> {
        self.days.iter().flat_map(|day| day.events.iter())
    }
}
