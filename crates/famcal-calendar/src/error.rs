//! Calendar-specific error types.

use std::path::PathBuf;

use famcal_core::{DatabaseError, RusqliteErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Registry database not found at {0}")]
    RegistryMissing(PathBuf),

    #[error("Event store not found at {0}")]
    EventStoreMissing(PathBuf),

    #[error("Data model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load data model: {0}")]
    ModelLoadFailed(String),

    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    #[error("Invalid deep link: {0}")]
    InvalidDeepLink(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for CalendarError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.into_database_error())
    }
}

impl CalendarError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::RegistryMissing(_) => "Database not initialized yet.".to_string(),
            Self::EventStoreMissing(_) => "Calendar events are not available yet.".to_string(),
            Self::ModelNotFound(_) => "Data model not found".to_string(),
            Self::ModelLoadFailed(_) => "Failed to load data model.".to_string(),
            Self::InvalidEventData(msg) => format!("Invalid event: {}", msg),
            Self::InvalidDeepLink(_) => "This link cannot be opened.".to_string(),
            Self::Database(e) => e.user_message().to_string(),
        }
    }

    /// Whether a later refresh may succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RegistryMissing(_)
                | Self::EventStoreMissing(_)
                | Self::Database(DatabaseError::QueryFailed(_))
                | Self::Database(DatabaseError::ConnectionFailed(_))
        )
    }
}
