//! Widget showing the single next event, optionally for one member.

use chrono::{DateTime, Utc};
use famcal_calendar::{select_next, ResolvedEventView};

use crate::error::RefreshError;
use crate::pipeline::load_snapshot;
use crate::timeline::{
    RefreshContext, RefreshPolicy, TimelineContent, TimelineEntry, TimelineProvider, WidgetKind,
};

#[derive(Debug, Clone, Default)]
pub struct NextEventProvider {
    /// Member whose events are shown. Shared calendar events are always shown.
    pub target_member: Option<String>,
}

impl NextEventProvider {
    pub fn new(target_member: Option<String>) -> Self {
        let target_member = target_member
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Self { target_member }
    }

    fn next_event(
        &self,
        ctx: &RefreshContext,
        now: DateTime<Utc>,
    ) -> Result<ResolvedEventView, RefreshError> {
        let snapshot = load_snapshot(&ctx.group, now)?;
        select_next(
            &snapshot.events,
            &snapshot.resolution,
            self.target_member.as_deref(),
            &snapshot.shared_calendar_ids,
            now,
        )
        .ok_or_else(|| RefreshError::NoUpcomingEvents {
            member: self.target_member.clone(),
        })
    }
}

impl TimelineProvider for NextEventProvider {
    fn kind(&self) -> WidgetKind {
        WidgetKind::NextEvent
    }

    fn refresh(&self, ctx: &RefreshContext, now: DateTime<Utc>) -> TimelineEntry {
        match self.next_event(ctx, now) {
            Ok(view) => {
                tracing::info!(
                    "Next event for {}: {} at {}",
                    view.member_name,
                    view.event.display_title(),
                    view.event.start
                );
                TimelineEntry {
                    kind: self.kind(),
                    date: now,
                    refresh: RefreshPolicy::at_event_end(view.event.end, now, ctx.refresh_interval),
                    content: TimelineContent::NextEvent { event: view.into() },
                }
            }
            Err(error) => {
                tracing::info!("Next event refresh: {}", error);
                TimelineEntry {
                    kind: self.kind(),
                    date: now,
                    refresh: RefreshPolicy::interval(now, ctx.refresh_interval),
                    content: error.into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_target_is_none() {
        assert_eq!(NextEventProvider::new(Some("   ".into())).target_member, None);
        assert_eq!(
            NextEventProvider::new(Some(" Bob ".into())).target_member,
            Some("Bob".to_string())
        );
    }
}
