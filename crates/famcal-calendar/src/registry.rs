//! SQLite registry of family members and their calendars.
//!
//! The main app is the only writer. Widgets open the file read-only so they
//! never contend for the write lock.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};
use tracing::instrument;
use uuid::Uuid;

use crate::error::CalendarError;
use crate::types::{MemberCalendarLink, MemberRecord, SharedCalendarRecord};

/// Schema version stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const REQUIRED_TABLES: [&str; 3] = ["members", "member_calendars", "shared_calendars"];

/// Registry of members, member calendar links and shared calendars.
pub struct RegistryStore {
    conn: Connection,
}

impl RegistryStore {
    /// Open an existing registry without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, CalendarError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CalendarError::RegistryMissing(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let store = Self { conn };
        store.check_model()?;
        Ok(store)
    }

    /// Create (or open for writing) a registry at the given path.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CalendarError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory registry (for testing).
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
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                name TEXT,
                color_hex TEXT NOT NULL,
                linked_calendar_id TEXT
            );

            CREATE TABLE IF NOT EXISTS member_calendars (
                calendar_id TEXT NOT NULL,
                calendar_color_hex TEXT,
                owner_member_id TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS shared_calendars (
                calendar_id TEXT NOT NULL,
                display_name TEXT,
                color_hex TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_member_calendars_owner ON member_calendars(owner_member_id);
            "#,
        )?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Verify the tables exist and the schema version is one we can read.
    fn check_model(&self) -> Result<(), CalendarError> {
        for table in REQUIRED_TABLES {
            let count: i32 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![table],
                |row| row.get(0),
            )?;
            if count == 0 {
                return Err(CalendarError::ModelNotFound(format!("missing table {}", table)));
            }
        }

        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version != SCHEMA_VERSION {
            return Err(CalendarError::ModelLoadFailed(format!(
                "schema version {} (expected {})",
                version, SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    /// All members. Rows with an unreadable id are skipped.
    #[instrument(skip(self), level = "debug")]
    pub fn members(&self) -> Result<Vec<MemberRecord>, CalendarError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color_hex, linked_calendar_id FROM members ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut members = Vec::new();
        for row in rows {
            let (id, name, color_hex, linked) = row?;
            let Some(id) = parse_id(&id, "members.id") else {
                continue;
            };
            members.push(MemberRecord::new(
                id,
                name.as_deref(),
                &color_hex,
                linked.as_deref(),
            ));
        }
        Ok(members)
    }

    /// All additional member calendar links.
    #[instrument(skip(self), level = "debug")]
    pub fn member_calendars(&self) -> Result<Vec<MemberCalendarLink>, CalendarError> {
        let mut stmt = self.conn.prepare(
            "SELECT calendar_id, calendar_color_hex, owner_member_id FROM member_calendars ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut links = Vec::new();
        for row in rows {
            let (calendar_id, calendar_color_hex, owner) = row?;
            let Some(owner_member_id) = parse_id(&owner, "member_calendars.owner_member_id")
            else {
                continue;
            };
            links.push(MemberCalendarLink {
                calendar_id,
                calendar_color_hex,
                owner_member_id,
            });
        }
        Ok(links)
    }

    /// All shared calendars.
    #[instrument(skip(self), level = "debug")]
    pub fn shared_calendars(&self) -> Result<Vec<SharedCalendarRecord>, CalendarError> {
        let mut stmt = self.conn.prepare(
            "SELECT calendar_id, display_name, color_hex FROM shared_calendars ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SharedCalendarRecord {
                calendar_id: row.get(0)?,
                display_name: row.get(1)?,
                color_hex: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Store a member (insert or replace by id).
    pub fn store_member(&self, member: &MemberRecord) -> Result<(), CalendarError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO members (id, name, color_hex, linked_calendar_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                member.id.to_string(),
                member.name,
                member.color_hex,
                member.linked_calendar_id,
            ],
        )?;
        Ok(())
    }

    /// Store an additional calendar for a member.
    pub fn store_member_calendar(&self, link: &MemberCalendarLink) -> Result<(), CalendarError> {
        self.conn.execute(
            "INSERT INTO member_calendars (calendar_id, calendar_color_hex, owner_member_id) VALUES (?1, ?2, ?3)",
            params![
                link.calendar_id,
                link.calendar_color_hex,
                link.owner_member_id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Store a shared calendar.
    pub fn store_shared_calendar(&self, shared: &SharedCalendarRecord) -> Result<(), CalendarError> {
        self.conn.execute(
            "INSERT INTO shared_calendars (calendar_id, display_name, color_hex) VALUES (?1, ?2, ?3)",
            params![shared.calendar_id, shared.display_name, shared.color_hex],
        )?;
        Ok(())
    }
}

fn parse_id(raw: &str, field: &str) -> Option<Uuid> {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("Skipping row with invalid {} '{}': {}", field, raw, e);
            None
        }
    }
}
