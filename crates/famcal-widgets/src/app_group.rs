//! Shared container readable by the app and all its widgets.

use std::path::{Path, PathBuf};

use famcal_core::AppGroupConfig;

use crate::error::RefreshError;

/// Shared key-value defaults, at the container root.
pub const PREFERENCES_FILE: &str = "preferences.toml";

/// Member registry written by the main app.
pub const REGISTRY_PATH: &str = "Library/FamilyCalendar.sqlite";

/// Mirror of the calendar provider's events.
pub const EVENT_STORE_PATH: &str = "Library/Events.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppGroup {
    identifier: String,
    container: PathBuf,
}

impl AppGroup {
    pub fn new(identifier: impl Into<String>, container: impl Into<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            container: container.into(),
        }
    }

    pub fn from_config(config: &AppGroupConfig) -> Self {
        Self::new(config.identifier.clone(), config.container_path.clone())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The container directory, if it can be reached.
    pub fn container(&self) -> Result<&Path, RefreshError> {
        match std::fs::metadata(&self.container) {
            Ok(meta) if meta.is_dir() => Ok(&self.container),
            Ok(_) => Err(RefreshError::GroupUnreachable(format!(
                "{} is not a directory",
                self.container.display()
            ))),
            Err(e) => {
                tracing::error!(
                    "App group {} unreachable at {}: {}",
                    self.identifier,
                    self.container.display(),
                    e
                );
                Err(RefreshError::GroupUnreachable(e.to_string()))
            }
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.container.join(PREFERENCES_FILE)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.container.join(REGISTRY_PATH)
    }

    pub fn event_store_path(&self) -> PathBuf {
        self.container.join(EVENT_STORE_PATH)
    }
}
