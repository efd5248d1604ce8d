//! Explicit configuration context for the attendance core.
//!
//! # Responsibility
//! - Load settings from TOML with defaults for every field.
//! - Validate the fallback venue/event naming used by auto-provisioning.
//!
//! # Invariants
//! - No process-wide mutable state: callers build a `CoreConfig` and pass
//!   what each service needs.
//! - A `FallbackPolicy` can only be built from a validated config, so event
//!   naming never fails at record time.

use crate::logging::{default_log_level, normalize_level};
use crate::model::event::EVENT_NAME_MAX_CHARS;
use crate::model::venue::{validate_venue_name, ValidVenueName};
use crate::repo::event_repo::FallbackEvent;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter, Write};
use std::path::{Path, PathBuf};

const DEFAULT_FALLBACK_VENUE_NAME: &str = "Main Venue";
const DEFAULT_FALLBACK_EVENT_NAME_FORMAT: &str = "%d/%m/%Y";

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config syntax: {message}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings for one core instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file. `None` means an in-memory database.
    pub database_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Name of the venue created when the ledger needs one and none exist.
    pub fallback_venue_name: String,
    /// `strftime` pattern used to name auto-provisioned events.
    pub fallback_event_name_format: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            fallback_venue_name: DEFAULT_FALLBACK_VENUE_NAME.to_string(),
            fallback_event_name_format: DEFAULT_FALLBACK_EVENT_NAME_FORMAT.to_string(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every field that can be wrong independently of storage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    log_dir.display()
                )));
            }
        }
        self.fallback_policy().map(|_| ())
    }

    /// Builds the auto-provisioning policy for the participation ledger.
    pub fn fallback_policy(&self) -> Result<FallbackPolicy, ConfigError> {
        let venue = validate_venue_name(&self.fallback_venue_name).map_err(|err| {
            ConfigError::Invalid(format!("fallback_venue_name: {err}"))
        })?;

        let format = self.fallback_event_name_format.clone();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "fallback_event_name_format `{format}` is not a valid date pattern"
            )));
        }

        let sample = NaiveDate::from_ymd_opt(2000, 12, 31)
            .ok_or_else(|| ConfigError::Invalid("sample date out of range".to_string()))?;
        let rendered = render_date(&format, sample)?;
        let rendered = rendered.trim();
        if rendered.is_empty() || rendered.chars().count() > EVENT_NAME_MAX_CHARS {
            return Err(ConfigError::Invalid(format!(
                "fallback_event_name_format must render between 1 and {EVENT_NAME_MAX_CHARS} characters"
            )));
        }

        Ok(FallbackPolicy { venue, format })
    }
}

/// Validated naming rules for auto-provisioned venue/event rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    venue: ValidVenueName,
    format: String,
}

impl FallbackPolicy {
    /// Venue/event request for an event held on `date`.
    pub fn event_for(&self, date: NaiveDate) -> FallbackEvent {
        let event_name = render_date(&self.format, date)
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|_| date.format("%Y-%m-%d").to_string());
        FallbackEvent {
            venue: self.venue.clone(),
            date,
            event_name,
        }
    }

    pub fn venue_name(&self) -> &str {
        &self.venue.name
    }
}

fn render_date(format: &str, date: NaiveDate) -> Result<String, ConfigError> {
    let mut rendered = String::new();
    write!(rendered, "{}", date.format_with_items(StrftimeItems::new(format))).map_err(|_| {
        ConfigError::Invalid(format!("date pattern `{format}` cannot be rendered"))
    })?;
    Ok(rendered)
}
