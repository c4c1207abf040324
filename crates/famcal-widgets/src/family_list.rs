//! Widget listing the family's upcoming events by day and month.

use chrono::{DateTime, Local, Utc};
use famcal_calendar::{group_for_display, MonthGroup};

use crate::error::RefreshError;
use crate::pipeline::load_snapshot;
use crate::timeline::{
    RefreshContext, RefreshPolicy, TimelineContent, TimelineEntry, TimelineProvider, WidgetKind,
    WidgetMonth,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct FamilyEventsProvider;

impl FamilyEventsProvider {
    fn months(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> Result<Vec<MonthGroup>, RefreshError> {
        let snapshot = load_snapshot(&ctx.group, now)?;
        let max_visible = snapshot.preferences.max_results;

        let months = match ctx.time_zone {
            Some(tz) => group_for_display(&snapshot.events, &snapshot.resolution, max_visible, &tz),
            None => group_for_display(&snapshot.events, &snapshot.resolution, max_visible, &Local),
        };
        if months.is_empty() {
            return Err(RefreshError::NoUpcomingEvents { member: None });
        }
        Ok(months)
    }
}

impl TimelineProvider for FamilyEventsProvider {
    fn kind(&self) -> WidgetKind {
        WidgetKind::FamilyEvents
    }

    fn refresh(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> TimelineEntry {
        let content = match self.months(ctx, now) {
            Ok(months) => {
                let count: usize = months.iter().map(|m| m.events().count()).sum();
                tracing::info!("Family list refreshed with {} events", count);
                TimelineContent::FamilyEvents {
                    months: months.into_iter().map(WidgetMonth::from).collect(),
                }
            }
            Err(error) => {
                tracing::info!("Family list refresh: {}", error);
                error.into()
            }
        };

        TimelineEntry {
            kind: self.kind(),
            date: now,
            content,
            refresh: RefreshPolicy::interval(now, ctx.refresh_interval),
        }
    }
}
