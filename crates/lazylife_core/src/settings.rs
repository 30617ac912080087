//! Per-user tracker settings.
//!
//! # Responsibility
//! - Validate user-facing configuration once, at the boundary.
//! - Carry the IANA zone that defines a user's day boundary.
//!
//! # Invariants
//! - `user_id` is non-blank after trim.
//! - `timezone` is a known IANA zone name.

use crate::logging::{default_log_level, normalize_level};
use chrono_tz::Tz;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from settings validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    EmptyUserId,
    UnknownTimezone(String),
    InvalidLogLevel(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUserId => write!(f, "user id must not be blank"),
            Self::UnknownTimezone(value) => write!(f, "unknown IANA time zone `{value}`"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for SettingsError {}

/// Validated settings for one user session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub user_id: String,
    pub timezone: Tz,
    pub log_level: &'static str,
}

impl TrackerSettings {
    /// Builds settings from raw strings using the build-mode log level.
    pub fn new(user_id: &str, timezone: &str) -> Result<Self, SettingsError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SettingsError::EmptyUserId);
        }
        Ok(Self {
            user_id: user_id.to_string(),
            timezone: parse_timezone(timezone)?,
            log_level: default_log_level(),
        })
    }

    /// Overrides the log level (`trace|debug|info|warn|error`).
    pub fn with_log_level(mut self, level: &str) -> Result<Self, SettingsError> {
        self.log_level = normalize_level(level).map_err(SettingsError::InvalidLogLevel)?;
        Ok(self)
    }
}

/// Parses an IANA zone name such as `Europe/Berlin`.
pub fn parse_timezone(value: &str) -> Result<Tz, SettingsError> {
    let trimmed = value.trim();
    trimmed
        .parse::<Tz>()
        .map_err(|_| SettingsError::UnknownTimezone(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_timezone, SettingsError, TrackerSettings};

    #[test]
    fn settings_trim_and_validate() {
        let settings = TrackerSettings::new("  user-1 ", " Europe/Paris ").unwrap();
        assert_eq!(settings.user_id, "user-1");
        assert_eq!(settings.timezone, chrono_tz::Europe::Paris);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert_eq!(
            parse_timezone("Mars/Olympus").unwrap_err(),
            SettingsError::UnknownTimezone("Mars/Olympus".to_string())
        );
    }

    #[test]
    fn blank_user_is_rejected() {
        assert_eq!(
            TrackerSettings::new(" ", "UTC").unwrap_err(),
            SettingsError::EmptyUserId
        );
    }

    #[test]
    fn log_level_override_is_normalized() {
        let settings = TrackerSettings::new("u", "UTC")
            .unwrap()
            .with_log_level("WARNING")
            .unwrap();
        assert_eq!(settings.log_level, "warn");
        assert!(TrackerSettings::new("u", "UTC")
            .unwrap()
            .with_log_level("loud")
            .is_err());
    }
}
