//! Calendar resolution: which member (or shared calendar) a calendar id belongs to.
//!
//! Built fresh on every refresh from three record collections, in this order:
//!
//! 1. each member's linked calendar,
//! 2. additional member calendar links, overwriting step 1 on the same id,
//! 3. shared calendars, only for ids not claimed by steps 1 and 2.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::types::{
    ExternalEvent, MemberCalendarLink, MemberRecord, ResolvedEventView, SharedCalendarRecord,
};

/// Display name of a shared calendar without a name.
pub const SHARED_CALENDAR_NAME: &str = "Shared Calendar";

/// Color of a shared calendar without a color.
pub const SHARED_CALENDAR_COLOR: &str = "#555555";

/// Owner, name and color of one calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarInfo {
    pub owner_member_id: Uuid,
    pub display_name: String,
    pub color_hex: String,
}

/// Lookup from calendar id to [`CalendarInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarResolution {
    entries: HashMap<String, CalendarInfo>,
}

impl CalendarResolution {
    pub fn get(&self, calendar_id: &str) -> Option<&CalendarInfo> {
        self.entries.get(calendar_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every resolved calendar id, for querying the event source.
    pub fn calendar_ids(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Join an event with its calendar's owner. `None` when the calendar is unknown.
    pub fn resolve(&self, event: &ExternalEvent) -> Option<ResolvedEventView> {
        self.get(&event.calendar_id).map(|info| ResolvedEventView {
            event: event.clone(),
            member_id: info.owner_member_id,
            member_name: info.display_name.clone(),
            color_hex: info.color_hex.clone(),
        })
    }
}

/// Stable placeholder owner for a shared calendar.
///
/// Name-based, so two refreshes over the same data produce the same id.
pub fn shared_placeholder_id(calendar_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, calendar_id.as_bytes())
}

/// Ids of every shared calendar record.
pub fn shared_calendar_ids(shared: &[SharedCalendarRecord]) -> HashSet<String> {
    shared
        .iter()
        .map(|s| s.calendar_id.trim())
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Merge members, member calendar links and shared calendars into one lookup.
pub fn resolve_calendars(
    members: &[MemberRecord],
    links: &[MemberCalendarLink],
    shared: &[SharedCalendarRecord],
) -> CalendarResolution {
    let mut entries: HashMap<String, CalendarInfo> = HashMap::new();

    for member in members {
        let Some(calendar_id) = non_blank(member.linked_calendar_id.as_deref()) else {
            continue;
        };
        entries.insert(
            calendar_id.to_string(),
            CalendarInfo {
                owner_member_id: member.id,
                display_name: member.name.clone(),
                color_hex: member.color_hex.clone(),
            },
        );
    }

    let members_by_id: HashMap<Uuid, &MemberRecord> =
        members.iter().map(|m| (m.id, m)).collect();

    for link in links {
        let Some(calendar_id) = non_blank(Some(&link.calendar_id)) else {
            continue;
        };
        let Some(owner) = members_by_id.get(&link.owner_member_id) else {
            tracing::debug!(
                "Skipping calendar {} linked to unknown member {}",
                calendar_id,
                link.owner_member_id
            );
            continue;
        };
        let color_hex = non_blank(link.calendar_color_hex.as_deref()).unwrap_or(&owner.color_hex);
        entries.insert(
            calendar_id.to_string(),
            CalendarInfo {
                owner_member_id: owner.id,
                display_name: owner.name.clone(),
                color_hex: color_hex.to_string(),
            },
        );
    }

    for record in shared {
        let Some(calendar_id) = non_blank(Some(&record.calendar_id)) else {
            continue;
        };
        entries
            .entry(calendar_id.to_string())
            .or_insert_with(|| CalendarInfo {
                owner_member_id: shared_placeholder_id(calendar_id),
                display_name: non_blank(record.display_name.as_deref())
                    .unwrap_or(SHARED_CALENDAR_NAME)
                    .to_string(),
                color_hex: non_blank(record.color_hex.as_deref())
                    .unwrap_or(SHARED_CALENDAR_COLOR)
                    .to_string(),
            });
    }

    CalendarResolution { entries }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn member(name: &str, color: &str, calendar: Option<&str>) -> MemberRecord {
        MemberRecord::new(Uuid::new_v4(), Some(name), color, calendar)
    }

    fn link(calendar_id: &str, color: Option<&str>, owner: &MemberRecord) -> MemberCalendarLink {
        MemberCalendarLink {
            calendar_id: calendar_id.to_string(),
            calendar_color_hex: color.map(ToOwned::to_owned),
            owner_member_id: owner.id,
        }
    }

    fn shared(calendar_id: &str, name: Option<&str>, color: Option<&str>) -> SharedCalendarRecord {
        SharedCalendarRecord {
            calendar_id: calendar_id.to_string(),
            display_name: name.map(ToOwned::to_owned),
            color_hex: color.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn test_member_linked_calendar() {
        let anna = member("Anna", "#FF0000", Some("cal1"));
        let resolution = resolve_calendars(&[anna.clone()], &[], &[]);

        let info = resolution.get("cal1").unwrap();
        assert_eq!(info.owner_member_id, anna.id);
        assert_eq!(info.display_name, "Anna");
        assert_eq!(info.color_hex, "#FF0000");
        assert_eq!(resolution.len(), 1);
    }

    #[test]
    fn test_member_without_calendar_is_ignored() {
        let resolution = resolve_calendars(
            &[member("Anna", "#FF0000", None), member("Bob", "#00FF00", Some(""))],
            &[],
            &[],
        );
        assert!(resolution.is_empty());
    }

    #[test]
    fn test_link_overwrites_member_default() {
        let anna = member("Anna", "#FF0000", Some("cal1"));
        let bob = member("Bob", "#0000FF", None);
        let resolution =
            resolve_calendars(&[anna, bob.clone()], &[link("cal1", Some("#123456"), &bob)], &[]);

        let info = resolution.get("cal1").unwrap();
        assert_eq!(info.owner_member_id, bob.id);
        assert_eq!(info.display_name, "Bob");
        assert_eq!(info.color_hex, "#123456");
    }

    #[test]
    fn test_link_without_color_uses_owner_color() {
        let anna = member("Anna", "#FF0000", None);
        let resolution = resolve_calendars(&[anna.clone()], &[link("cal2", None, &anna)], &[]);
        assert_eq!(resolution.get("cal2").unwrap().color_hex, "#FF0000");
    }

    #[test]
    fn test_link_with_unknown_owner_is_skipped() {
        let anna = member("Anna", "#FF0000", Some("cal1"));
        let stranger = member("Ghost", "#000000", None);
        let resolution =
            resolve_calendars(&[anna], &[link("cal2", Some("#111111"), &stranger)], &[]);

        assert!(resolution.get("cal2").is_none());
        assert_eq!(resolution.len(), 1);
    }

    #[test]
    fn test_shared_never_overwrites_member() {
        let anna = member("Anna", "#FF0000", Some("cal1"));
        let resolution = resolve_calendars(
            &[anna.clone()],
            &[],
            &[shared("cal1", Some("X"), Some("#ABCDEF"))],
        );

        let info = resolution.get("cal1").unwrap();
        assert_eq!(info.display_name, "Anna");
        assert_eq!(info.color_hex, "#FF0000");
        assert_eq!(info.owner_member_id, anna.id);
    }

    #[test]
    fn test_shared_never_overwrites_link() {
        let anna = member("Anna", "#FF0000", None);
        let resolution = resolve_calendars(
            &[anna.clone()],
            &[link("cal2", Some("#00FF00"), &anna)],
            &[shared("cal2", Some("Family"), None)],
        );

        let info = resolution.get("cal2").unwrap();
        assert_eq!(info.display_name, "Anna");
        assert_eq!(info.color_hex, "#00FF00");
    }

    #[test]
    fn test_shared_defaults() {
        let resolution = resolve_calendars(&[], &[], &[shared("family", None, None)]);
        let info = resolution.get("family").unwrap();
        assert_eq!(info.display_name, SHARED_CALENDAR_NAME);
        assert_eq!(info.color_hex, SHARED_CALENDAR_COLOR);
        assert_eq!(info.owner_member_id, shared_placeholder_id("family"));
    }

    #[test]
    fn test_first_shared_record_wins_on_duplicate_ids() {
        let resolution = resolve_calendars(
            &[],
            &[],
            &[shared("family", Some("First"), None), shared("family", Some("Second"), None)],
        );
        assert_eq!(resolution.get("family").unwrap().display_name, "First");
    }

    #[test]
    fn test_placeholder_id_is_stable() {
        assert_eq!(shared_placeholder_id("family"), shared_placeholder_id("family"));
        assert_ne!(shared_placeholder_id("family"), shared_placeholder_id("school"));
    }

    #[test]
    fn test_resolve_event() {
        let anna = member("Anna", "#FF0000", Some("cal1"));
        let resolution = resolve_calendars(&[anna.clone()], &[], &[]);
        let now = chrono::Utc::now();
        let mut event = ExternalEvent {
            id: "e1".to_string(),
            title: None,
            start: now,
            end: now + chrono::Duration::hours(1),
            calendar_id: "cal1".to_string(),
            location: None,
            is_all_day: false,
        };

        let view = resolution.resolve(&event).unwrap();
        assert_eq!(view.member_name, "Anna");
        assert_eq!(view.member_id, anna.id);

        event.calendar_id = "unknown".to_string();
        assert!(resolution.resolve(&event).is_none());
    }

    #[test]
    fn test_shared_calendar_ids() {
        let ids = shared_calendar_ids(&[shared("a", None, None), shared(" ", None, None)]);
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("a"));
    }
}
