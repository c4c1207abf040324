use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

const DEFAULT_GROUP_IDENTIFIER: &str = "group.famcal.shared";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Shared container used by the app and its widgets
    #[serde(default)]
    pub app_group: AppGroupConfig,

    /// Widget refresh settings
    #[serde(default)]
    pub widgets: WidgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppGroupConfig {
    /// Group identifier, e.g. `group.famcal.shared`
    pub identifier: String,

    /// Directory backing the group container
    pub container_path: PathBuf,
}

fn default_container_path(identifier: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("famcal")
        .join(identifier)
}

impl Default for AppGroupConfig {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_GROUP_IDENTIFIER.to_string(),
            container_path: default_container_path(DEFAULT_GROUP_IDENTIFIER),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Upper bound between two refreshes, in minutes (default: 30)
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// IANA zone used to bucket events by day. System local time when unset.
    #[serde(default)]
    pub time_zone: Option<String>,

    /// Member shown by the next-event widget when none is given explicitly
    #[serde(default)]
    pub target_member: Option<String>,
}

fn default_refresh_minutes() -> u32 {
    30
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            refresh_minutes: default_refresh_minutes(),
            time_zone: None,
            target_member: None,
        }
    }
}

impl WidgetConfig {
    /// Parsed time zone, `None` when unset or unparseable.
    pub fn parsed_time_zone(&self) -> Option<chrono_tz::Tz> {
        self.time_zone
            .as_deref()
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .and_then(|tz| tz.parse().ok())
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("famcal");

        Self {
            config_dir,
            app_group: AppGroupConfig::default(),
            widgets: WidgetConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating default if it doesn't exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.app_group.identifier.trim().is_empty() {
            result.add_error("app_group.identifier", "Group identifier must not be empty");
        }

        let container = &self.app_group.container_path;
        if container.as_os_str().is_empty() {
            result.add_error("app_group.container_path", "Container path must not be empty");
        } else if !container.exists() {
            result.add_warning(
                "app_group.container_path",
                format!("Container does not exist yet: {}", container.display()),
            );
        } else if !container.is_dir() {
            result.add_error(
                "app_group.container_path",
                format!("Path is not a directory: {}", container.display()),
            );
        }

        if self.widgets.refresh_minutes == 0 {
            result.add_error(
                "widgets.refresh_minutes",
                "Refresh interval must be greater than 0",
            );
        } else if self.widgets.refresh_minutes > 1440 {
            result.add_warning(
                "widgets.refresh_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if let Some(tz) = self.widgets.time_zone.as_deref() {
            if !tz.trim().is_empty() && tz.trim().parse::<chrono_tz::Tz>().is_err() {
                result.add_error("widgets.time_zone", format!("Unknown time zone: {}", tz));
            }
        }

        result
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("famcal");

        Ok(config_dir.join("config.toml"))
    }
}
