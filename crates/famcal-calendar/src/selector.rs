//! Next-event selection and day/month grouping.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::resolver::CalendarResolution;
use crate::types::{DayGroup, ExternalEvent, MonthGroup, ResolvedEventView};

/// Drop all-day and ended events, then stable-sort by start.
pub fn filter_upcoming(events: Vec<ExternalEvent>, now: DateTime<Utc>) -> Vec<ExternalEvent> {
    let mut upcoming: Vec<ExternalEvent> =
        events.into_iter().filter(|e| e.is_upcoming(now)).collect();
    upcoming.sort_by_key(|e| e.start);
    upcoming
}

/// Pick the single event a next-event widget shows.
///
/// Without a target the earliest resolvable event wins. With a target, the
/// earliest event on a shared calendar wins if there is one; otherwise the
/// earliest event of the member whose name matches, ignoring case.
pub fn select_next(
    events: &[ExternalEvent],
    resolution: &CalendarResolution,
    target_member_name: Option<&str>,
    shared_calendar_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> Option<ResolvedEventView> {
    let mut candidates = events.iter().filter(|e| e.is_upcoming(now));

    let target = target_member_name
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let Some(target) = target else {
        return candidates.find_map(|e| resolution.resolve(e));
    };

    let candidates: Vec<&ExternalEvent> = candidates.collect();

    let shared = candidates
        .iter()
        .filter(|e| shared_calendar_ids.contains(&e.calendar_id))
        .find_map(|e| resolution.resolve(e));
    if shared.is_some() {
        return shared;
    }

    let target = target.to_lowercase();
    candidates
        .iter()
        .filter_map(|e| resolution.resolve(e))
        .find(|view| view.member_name.to_lowercase() == target)
}

/// Bucket the first `max_visible` events by local day, then by month.
pub fn group_for_display<Tz: TimeZone>(
    events: &[ExternalEvent],
    resolution: &CalendarResolution,
    max_visible: usize,
    tz: &Tz,
) -> Vec<MonthGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<ResolvedEventView>> = BTreeMap::new();
    for event in events.iter().take(max_visible) {
        let Some(view) = resolution.resolve(event) else {
            tracing::debug!(
                "Dropping event {} from unknown calendar {}",
                event.id,
                event.calendar_id
            );
            continue;
        };
        let date = event.start.with_timezone(tz).date_naive();
        days.entry(date).or_default().push(view);
    }

    let mut months: BTreeMap<(i32, u32), Vec<DayGroup>> = BTreeMap::new();
    for (date, mut events) in days {
        events.sort_by_key(|view| view.event.start);
        months
            .entry((date.year(), date.month()))
            .or_default()
            .push(DayGroup { date, events });
    }

    months
        .into_iter()
        .map(|((year, month), days)| MonthGroup { year, month, days })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::resolver::resolve_calendars;
    use crate::types::{MemberRecord, SharedCalendarRecord};
    use chrono::Duration;
    use uuid::Uuid;

    fn at(now: DateTime<Utc>, id: &str, calendar: &str, start_min: i64, end_min: i64) -> ExternalEvent {
        ExternalEvent {
            id: id.to_string(),
            title: Some(id.to_string()),
            start: now + Duration::minutes(start_min),
            end: now + Duration::minutes(end_min),
            calendar_id: calendar.to_string(),
            location: None,
            is_all_day: false,
        }
    }

    fn family() -> (MemberRecord, MemberRecord, CalendarResolution, HashSet<String>) {
        let anna = MemberRecord::new(Uuid::new_v4(), Some("Anna"), "#FF0000", Some("cal1"));
        let bob = MemberRecord::new(Uuid::new_v4(), Some("Bob"), "#0000FF", Some("cal2"));
        let shared = vec![SharedCalendarRecord {
            calendar_id: "cal9".to_string(),
            display_name: Some("Family".to_string()),
            color_hex: None,
        }];
        let resolution = resolve_calendars(&[anna.clone(), bob.clone()], &[], &shared);
        let shared_ids = crate::resolver::shared_calendar_ids(&shared);
        (anna, bob, resolution, shared_ids)
    }

    #[test]
    fn test_filter_upcoming_drops_all_day_and_ended() {
        let now = Utc::now();
        let mut all_day = at(now, "all-day", "cal1", 0, 60 * 24);
        all_day.is_all_day = true;
        let events = vec![
            at(now, "later", "cal1", 60, 120),
            at(now, "ended", "cal1", -120, -60),
            all_day,
            at(now, "ends-now", "cal1", -60, 0),
            at(now, "sooner", "cal1", 10, 20),
        ];

        let ids: Vec<String> = filter_upcoming(events, now).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["sooner", "later"]);
    }

    #[test]
    fn test_filter_upcoming_is_stable() {
        let now = Utc::now();
        let events = vec![
            at(now, "first", "cal1", 30, 60),
            at(now, "second", "cal2", 30, 60),
        ];
        let ids: Vec<String> = filter_upcoming(events, now).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_select_next_without_target() {
        let now = Utc::now();
        let (_, _, resolution, shared_ids) = family();
        let events = vec![at(now, "e1", "cal1", 10, 70)];

        let view = select_next(&events, &resolution, None, &shared_ids, now).unwrap();
        assert_eq!(view.event.id, "e1");
        assert_eq!(view.member_name, "Anna");
    }

    #[test]
    fn test_select_next_skips_unresolved() {
        let now = Utc::now();
        let (_, _, resolution, shared_ids) = family();
        let events = vec![
            at(now, "orphan", "unknown", 5, 10),
            at(now, "e1", "cal2", 10, 70),
        ];

        let view = select_next(&events, &resolution, None, &shared_ids, now).unwrap();
        assert_eq!(view.event.id, "e1");
    }

    #[test]
    fn test_select_next_shared_overrides_target() {
        let now = Utc::now();
        let (_, _, resolution, shared_ids) = family();
        let events = vec![
            at(now, "family-dinner", "cal9", 5, 60),
            at(now, "bob-practice", "cal2", 30, 90),
        ];

        let view = select_next(&events, &resolution, Some("Bob"), &shared_ids, now).unwrap();
        assert_eq!(view.event.id, "family-dinner");
        assert_eq!(view.member_name, "Family");
    }

    #[test]
    fn test_select_next_target_is_case_insensitive() {
        let now = Utc::now();
        let (_, bob, resolution, shared_ids) = family();
        let events = vec![
            at(now, "anna-1", "cal1", 5, 60),
            at(now, "bob-1", "cal2", 30, 90),
            at(now, "bob-2", "cal2", 40, 90),
        ];

        let view = select_next(&events, &resolution, Some("bOB"), &shared_ids, now).unwrap();
        assert_eq!(view.event.id, "bob-1");
        assert_eq!(view.member_id, bob.id);
    }

    #[test]
    fn test_select_next_target_without_match() {
        let now = Utc::now();
        let (_, _, resolution, shared_ids) = family();
        let events = vec![at(now, "anna-1", "cal1", 5, 60)];

        assert!(select_next(&events, &resolution, Some("Carla"), &shared_ids, now).is_none());
    }

    #[test]
    fn test_select_next_blank_target_means_none() {
        let now = Utc::now();
        let (_, _, resolution, shared_ids) = family();
        let events = vec![at(now, "anna-1", "cal1", 5, 60)];

        let view = select_next(&events, &resolution, Some("  "), &shared_ids, now).unwrap();
        assert_eq!(view.event.id, "anna-1");
    }

    #[test]
    fn test_select_next_rejects_all_day_and_ended() {
        let now = Utc::now();
        let (_, _, resolution, shared_ids) = family();
        let mut all_day = at(now, "all-day", "cal9", -60, 60 * 23);
        all_day.is_all_day = true;
        let events = vec![
            at(now, "ended", "cal1", -120, -10),
            all_day,
            at(now, "ends-now", "cal9", -30, 0),
        ];

        assert!(select_next(&events, &resolution, None, &shared_ids, now).is_none());
        assert!(select_next(&events, &resolution, Some("Anna"), &shared_ids, now).is_none());
    }

    #[test]
    fn test_group_by_day_and_month() {
        let (_, _, resolution, _) = family();
        let base = Utc.with_ymd_and_hms(2026, 1, 30, 9, 0, 0).unwrap();
        let events = vec![
            at(base, "jan30-a", "cal1", 0, 60),
            at(base, "jan30-b", "cal2", 120, 180),
            at(base, "jan31", "cal1", 60 * 24, 60 * 25),
            at(base, "feb02", "cal9", 60 * 24 * 3, 60 * 24 * 3 + 30),
        ];

        let months = group_for_display(&events, &resolution, 10, &Utc);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2026, 1));
        assert_eq!(months[0].days.len(), 2);
        assert_eq!(months[0].days[0].date, NaiveDate::from_ymd_opt(2026, 1, 30).unwrap());
        assert_eq!(months[0].days[0].events.len(), 2);
        assert_eq!((months[1].year, months[1].month), (2026, 2));
        assert_eq!(months[1].days[0].events[0].event.id, "feb02");
    }

    #[test]
    fn test_group_truncates_before_resolving() {
        let (_, _, resolution, _) = family();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let events = vec![
            at(base, "orphan", "unknown", 0, 30),
            at(base, "e1", "cal1", 10, 40),
            at(base, "e2", "cal1", 20, 50),
        ];

        let months = group_for_display(&events, &resolution, 2, &Utc);
        let ids: Vec<&str> = months
            .iter()
            .flat_map(|m| m.events())
            .map(|v| v.event.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e1"]);
    }

    #[test]
    fn test_group_uses_local_day() {
        let (_, _, resolution, _) = family();
        // 02:00 UTC on Mar 2 is still Mar 1 in New York.
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap();
        let events = vec![at(start, "late", "cal1", 0, 60)];

        let months = group_for_display(&events, &resolution, 10, &chrono_tz::America::New_York);
        assert_eq!(months[0].days[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        let months = group_for_display(&events, &resolution, 10, &Utc);
        assert_eq!(months[0].days[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn test_grouped_output_is_ordered_subsequence() {
        let (_, _, resolution, _) = family();
        let base = Utc.with_ymd_and_hms(2026, 5, 28, 8, 0, 0).unwrap();
        let calendars = ["cal1", "unknown", "cal2", "cal9"];
        let events: Vec<ExternalEvent> = (0..24)
            .map(|i| {
                at(
                    base,
                    &format!("e{}", i),
                    calendars[i % calendars.len()],
                    i as i64 * 7 * 60,
                    i as i64 * 7 * 60 + 30,
                )
            })
            .collect();

        for max_visible in [0, 1, 5, 10, 24, 50] {
            let months = group_for_display(&events, &resolution, max_visible, &Utc);
            let flattened: Vec<&ResolvedEventView> = months.iter().flat_map(|m| m.events()).collect();

            let truncated: Vec<&ExternalEvent> = events.iter().take(max_visible).collect();
            let mut cursor = truncated.iter();
            for view in &flattened {
                assert!(cursor.any(|e| e.id == view.event.id), "not a subsequence");
            }
            assert!(flattened
                .windows(2)
                .all(|w| w[0].event.start <= w[1].event.start));
        }
    }

    #[test]
    fn test_group_empty() {
        let (_, _, resolution, _) = family();
        assert!(group_for_display(&[], &resolution, 10, &Utc).is_empty());
    }
}
