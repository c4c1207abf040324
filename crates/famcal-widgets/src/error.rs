//! Reportable refresh states.

use famcal_calendar::CalendarError;
use famcal_core::AppError;
use serde::Serialize;
use thiserror::Error;

/// Why a refresh produced no content. Terminal for that refresh only.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RefreshError {
    #[error("App group container not accessible: {0}")]
    GroupUnreachable(String),

    #[error("Registry or event store not created yet")]
    DatabaseMissing,

    #[error("Data model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load data model: {0}")]
    ModelLoadFailed(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("No family members configured")]
    NoMembers,

    #[error("No calendars found")]
    NoCalendars,

    #[error("Calendar access not granted")]
    CalendarAccessRequired,

    #[error("No upcoming events")]
    NoUpcomingEvents { member: Option<String> },
}

impl RefreshError {
    /// Text shown in the widget.
    pub fn user_message(&self) -> String {
        match self {
            Self::GroupUnreachable(_) => "App groups not accessible".to_string(),
            Self::DatabaseMissing => "Database not initialized yet.".to_string(),
            Self::ModelNotFound(_) => "Data model not found".to_string(),
            Self::ModelLoadFailed(_) => "Failed to load data model.".to_string(),
            Self::Store(detail) => format!("Error: {}", detail),
            Self::NoMembers => "No family members configured.".to_string(),
            Self::NoCalendars => "No calendars found.".to_string(),
            Self::CalendarAccessRequired => {
                "Calendar access required — enable in Settings".to_string()
            }
            Self::NoUpcomingEvents { member: None } => "No upcoming events".to_string(),
            Self::NoUpcomingEvents {
                member: Some(member),
            } => format!("No upcoming events for {}", member),
        }
    }

    /// Empty states are expected; everything else points at a broken setup.
    pub fn is_empty_state(&self) -> bool {
        matches!(
            self,
            Self::NoMembers | Self::NoCalendars | Self::NoUpcomingEvents { .. }
        )
    }
}

impl From<CalendarError> for RefreshError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::RegistryMissing(_) | CalendarError::EventStoreMissing(_) => {
                tracing::warn!("{}", err);
                Self::DatabaseMissing
            }
            CalendarError::ModelNotFound(detail) => Self::ModelNotFound(detail),
            CalendarError::ModelLoadFailed(detail) => Self::ModelLoadFailed(detail),
            other => {
                if other.is_transient() {
                    tracing::warn!("Store failure during refresh, will retry: {:?}", other);
                } else {
                    tracing::error!("Store failure during refresh: {:?}", other);
                }
                Self::Store(other.user_message())
            }
        }
    }
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        AppError::Refresh(err.user_message())
    }
}
