//! Calendar event sources.
//!
//! [`EventSource`] is the seam to the platform calendar provider. The SQLite
//! store mirrors provider events into the shared container; the in-memory
//! source backs tests and previews.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::instrument;

use crate::error::CalendarError;
use crate::types::{AuthorizationStatus, ExternalEvent};

const AUTHORIZATION_KEY: &str = "authorization_status";
const REQUIRED_TABLES: [&str; 2] = ["events", "provider_state"];

/// Read access to the calendar provider.
pub trait EventSource: Send {
    /// Access the user granted to calendars.
    fn authorization_status(&self) -> Result<AuthorizationStatus, CalendarError>;

    /// Events on the given calendars overlapping `[start, end]`.
    ///
    /// May include all-day and already-ended events; callers filter them.
    fn fetch_events(
        &self,
        calendar_ids: &HashSet<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, CalendarError>;
}

/// SQLite mirror of provider events.
pub struct SqliteEventStore {
    conn: Connection,
}

impl SqliteEventStore {
    /// Open an existing store without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, CalendarError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CalendarError::EventStoreMissing(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let store = Self { conn };
        store.check_model()?;
        Ok(store)
    }

    /// Create (or open for writing) a store at the given path.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CalendarError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, CalendarError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), CalendarError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT NOT NULL,
                calendar_id TEXT NOT NULL,
                title TEXT,
                location TEXT,
                start_ms INTEGER NOT NULL,
                end_ms INTEGER NOT NULL,
                all_day INTEGER NOT NULL,
                PRIMARY KEY (id, calendar_id)
            );

            CREATE TABLE IF NOT EXISTS provider_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_calendar ON events(calendar_id);
            CREATE INDEX IF NOT EXISTS idx_events_start ON events(start_ms);
            "#,
        )?;
        Ok(())
    }

    fn check_model(&self) -> Result<(), CalendarError> {
        for table in REQUIRED_TABLES {
            let count: i32 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![table],
                |row| row.get(0),
            )?;
            if count == 0 {
                return Err(CalendarError::ModelNotFound(format!(
                    "event store missing table {}",
                    table
                )));
            }
        }
        Ok(())
    }

    /// Store an event (insert or replace by id and calendar).
    pub fn store_event(&self, event: &ExternalEvent) -> Result<(), CalendarError> {
        if event.end < event.start {
            return Err(CalendarError::InvalidEventData(format!(
                "event {} ends before it starts",
                event.id
            )));
        }

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO events
            (id, calendar_id, title, location, start_ms, end_ms, all_day)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                event.id,
                event.calendar_id,
                event.title,
                event.location,
                event.start.timestamp_millis(),
                event.end.timestamp_millis(),
                event.is_all_day as i32,
            ],
        )?;
        Ok(())
    }

    /// Delete an event.
    pub fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        self.conn.execute(
            "DELETE FROM events WHERE id = ?1 AND calendar_id = ?2",
            params![event_id, calendar_id],
        )?;
        Ok(())
    }

    /// Record the access the user granted to the provider.
    pub fn set_authorization_status(
        &self,
        status: AuthorizationStatus,
    ) -> Result<(), CalendarError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO provider_state (key, value) VALUES (?1, ?2)",
            params![AUTHORIZATION_KEY, status.as_str()],
        )?;
        Ok(())
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<ExternalEvent> {
        let all_day: i32 = row.get(6)?;

        Ok(ExternalEvent {
            id: row.get(0)?,
            calendar_id: row.get(1)?,
            title: row.get(2)?,
            location: row.get(3)?,
            start: Self::timestamp(row, 4)?,
            end: Self::timestamp(row, 5)?,
            is_all_day: all_day != 0,
        })
    }

    /// Millisecond column as a UTC instant. Out-of-range values fail the row.
    fn timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let ms: i64 = row.get(idx)?;
        DateTime::from_timestamp_millis(ms).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Integer,
                format!("timestamp {} ms out of range", ms).into(),
            )
        })
    }
}

impl EventSource for SqliteEventStore {
    fn authorization_status(&self) -> Result<AuthorizationStatus, CalendarError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM provider_state WHERE key = ?1",
                params![AUTHORIZATION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value
            .as_deref()
            .map(AuthorizationStatus::parse)
            .unwrap_or_default())
    }

    #[instrument(skip(self, calendar_ids), fields(calendars = calendar_ids.len()), level = "debug")]
    fn fetch_events(
        &self,
        calendar_ids: &HashSet<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, CalendarError> {
        if calendar_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<&str> = calendar_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            r#"
            SELECT id, calendar_id, title, location, start_ms, end_ms, all_day
            FROM events
            WHERE start_ms <= ?1 AND end_ms >= ?2 AND calendar_id IN ({})
            ORDER BY start_ms ASC, rowid ASC
            "#,
            placeholders
        );

        let mut values: Vec<rusqlite::types::Value> = vec![
            end.timestamp_millis().into(),
            start.timestamp_millis().into(),
        ];
        values.extend(ids.iter().map(|id| rusqlite::types::Value::from(id.to_string())));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::row_to_event)?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Event source held in memory.
#[derive(Debug, Default)]
pub struct InMemoryEventSource {
    events: Mutex<Vec<ExternalEvent>>,
    status: Mutex<AuthorizationStatus>,
}

impl InMemoryEventSource {
    /// Authorized source holding the given events.
    pub fn authorized(events: Vec<ExternalEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            status: Mutex::new(AuthorizationStatus::Authorized),
        }
    }

    pub fn set_authorization_status(&self, status: AuthorizationStatus) {
        *self.status.lock() = status;
    }

    pub fn push(&self, event: ExternalEvent) {
        self.events.lock().push(event);
    }
}

impl EventSource for InMemoryEventSource {
    fn authorization_status(&self) -> Result<AuthorizationStatus, CalendarError> {
        Ok(*self.status.lock())
    }

    fn fetch_events(
        &self,
        calendar_ids: &HashSet<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, CalendarError> {
        Ok(self
            .events
            .lock()
            .iter()
            .filter(|e| calendar_ids.contains(&e.calendar_id))
            .filter(|e| e.start <= end && e.end >= start)
            .cloned()
            .collect())
    }
}
