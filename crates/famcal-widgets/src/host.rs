//! Scheduler that refreshes every registered widget and publishes the entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RefreshError;
use crate::timeline::{RefreshContext, RefreshPolicy, TimelineEntry, TimelineProvider};

pub struct WidgetHost {
    ctx: Arc<RefreshContext>,
    providers: Vec<Arc<dyn TimelineProvider>>,
}

impl WidgetHost {
    pub fn new(ctx: RefreshContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            providers: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl TimelineProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn placeholders(&self, now: DateTime<Utc>) -> Vec<TimelineEntry> {
        self.providers
            .iter()
            .map(|p| p.placeholder(&self.ctx, now))
            .collect()
    }

    /// Refresh all providers concurrently. Entries come back in registration order.
    pub async fn refresh_all(&self, now: DateTime<Utc>) -> Vec<TimelineEntry> {
        let handles: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let ctx = Arc::clone(&self.ctx);
                let kind = provider.kind();
                (
                    kind,
                    tokio::task::spawn_blocking(move || provider.refresh(&ctx, now)),
                )
            })
            .collect();

        let mut entries = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            match handle.await {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::error!("{} refresh task failed: {}", kind.as_str(), e);
                    entries.push(TimelineEntry {
                        kind,
                        date: now,
                        content: RefreshError::Store("refresh did not complete".to_string()).into(),
                        refresh: RefreshPolicy::interval(now, self.ctx.refresh_interval),
                    });
                }
            }
        }
        entries
    }

    /// Refresh, publish, then sleep until the earliest requested refresh.
    ///
    /// Returns when `cancel` fires or the receiver is dropped. Cancellation is
    /// observed between refreshes, never during one.
    pub async fn run(self, tx: mpsc::Sender<TimelineEntry>, cancel: CancellationToken) {
        tracing::info!("Widget host started with {} widgets", self.providers.len());

        loop {
            let now = Utc::now();
            let entries = self.refresh_all(now).await;
            let next_refresh = entries
                .iter()
                .map(|entry| entry.refresh.after)
                .min()
                .unwrap_or(now + self.ctx.refresh_interval);

            for entry in entries {
                if tx.send(entry).await.is_err() {
                    tracing::info!("Timeline receiver closed, stopping widget host");
                    return;
                }
            }

            let wait = (next_refresh - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tracing::debug!("Next widget refresh at {}", next_refresh);

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Widget host cancelled");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::app_group::AppGroup;
    use crate::family_list::FamilyEventsProvider;
    use crate::next_event::NextEventProvider;
    use crate::timeline::{TimelineContent, WidgetKind};

    fn host(container: &std::path::Path) -> WidgetHost {
        let ctx = RefreshContext {
            group: AppGroup::new("group.test", container),
            refresh_interval: chrono::Duration::minutes(30),
            time_zone: None,
        };
        WidgetHost::new(ctx)
            .with_provider(NextEventProvider::default())
            .with_provider(FamilyEventsProvider)
    }

    #[tokio::test]
    async fn test_refresh_all_keeps_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(&dir.path().join("missing"));
        assert_eq!(host.len(), 2);

        let entries = host.refresh_all(Utc::now()).await;
        let kinds: Vec<WidgetKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![WidgetKind::NextEvent, WidgetKind::FamilyEvents]);
        for entry in &entries {
            assert!(matches!(entry.error(), Some(RefreshError::GroupUnreachable(_))));
        }
    }

    #[tokio::test]
    async fn test_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let entries = host.placeholders(Utc::now());
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.content == TimelineContent::Placeholder));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(host.run(tx, cancel.clone()));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, WidgetKind::NextEvent);
        assert_eq!(second.kind, WidgetKind::FamilyEvents);

        cancel.cancel();
        task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_when_receiver_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        host.run(tx, CancellationToken::new()).await;
    }
}
