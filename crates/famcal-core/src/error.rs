//! Error types shared by the famcal crates.
//!
//! Storage failures keep the SQLite detail in `Display` and offer a short
//! `user_message()` for anything shown to the family.

use thiserror::Error;

/// Top-level error of a famcal process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Widget refresh errors mapped from the widget crate.
    #[error("Refresh error: {0}")]
    Refresh(String),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Database(e) => e.user_message(),
            AppError::Refresh(_) => "Calendar refresh failed. It will be retried.",
        }
    }
}

/// SQLite failures of the registry or the event store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => {
                "Unable to access local data. Try opening the app."
            }
            DatabaseError::QueryFailed(_) => "A data operation failed. Please try again.",
            DatabaseError::Corruption(_) => {
                "Local data may be corrupted. Consider resetting app data."
            }
        }
    }
}

/// Classify a `rusqlite::Error` by what the user can do about it.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::DatabaseCorrupt
                    || err.code == rusqlite::ErrorCode::NotADatabase =>
            {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                DatabaseError::ConnectionFailed(self.to_string())
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let db_err = DatabaseError::QueryFailed("boom".into());
        let app_err: AppError = db_err.into();
        assert!(matches!(app_err, AppError::Database(DatabaseError::QueryFailed(_))));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Database(DatabaseError::Corruption("page 3".into()));
        assert_eq!(
            app_err.user_message(),
            "Local data may be corrupted. Consider resetting app data."
        );
        assert!(app_err.to_string().contains("page 3"));

        let app_err = AppError::Refresh("No calendars found.".into());
        assert_eq!(
            app_err.user_message(),
            "Calendar refresh failed. It will be retried."
        );
    }

    #[test]
    fn test_missing_directory_maps_to_connection_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = rusqlite::Connection::open(dir.path().join("nope").join("x.sqlite")).unwrap_err();
        assert!(matches!(
            err.into_database_error(),
            DatabaseError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn test_corrupt_file_maps_to_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.sqlite");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        let err = rusqlite::Connection::open(&path)
            .and_then(|conn| {
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
            })
            .unwrap_err();
        assert!(matches!(err.into_database_error(), DatabaseError::Corruption(_)));
    }
}
