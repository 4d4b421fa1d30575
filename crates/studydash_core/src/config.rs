//! Runtime configuration for the dashboard and its front ends.
//!
//! # Invariants
//! - `Default` is always a usable configuration.
//! - Malformed overrides are ignored with a warning; they never fail startup.

use crate::agenda::ticker::DEFAULT_CADENCE;
use crate::logging::default_log_level;
use crate::model::user::OwnerId;
use chrono::{FixedOffset, Local, Offset, Weekday};
use log::warn;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

pub const ENV_WEEK_START: &str = "STUDYDASH_WEEK_START";
pub const ENV_UTC_OFFSET_MINUTES: &str = "STUDYDASH_UTC_OFFSET_MINUTES";
pub const ENV_COUNTDOWN_SECS: &str = "STUDYDASH_COUNTDOWN_SECS";
pub const ENV_DEFAULT_LIMIT: &str = "STUDYDASH_DEFAULT_LIMIT";
pub const ENV_DB: &str = "STUDYDASH_DB";
pub const ENV_LOG_LEVEL: &str = "STUDYDASH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STUDYDASH_LOG_DIR";
pub const ENV_OWNER: &str = "STUDYDASH_OWNER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// First day of the calendar week used by the `ThisWeek` bucket.
    pub week_start: Weekday,
    /// Offset in which calendar dates and labels are computed.
    pub utc_offset: FixedOffset,
    pub countdown_cadence: Duration,
    /// Row cap applied when a view does not set its own limit.
    pub default_limit: Option<usize>,
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub owner_id: OwnerId,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            week_start: Weekday::Sun,
            utc_offset: Local::now().offset().fix(),
            countdown_cadence: DEFAULT_CADENCE,
            default_limit: None,
            db_path: PathBuf::from("studydash.db"),
            log_level: default_log_level().to_string(),
            log_dir: PathBuf::from("logs"),
            owner_id: Uuid::nil(),
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `STUDYDASH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_WEEK_START) {
            match parse_weekday(&value) {
                Some(day) => config.week_start = day,
                None => ignored(ENV_WEEK_START, &value),
            }
        }
        if let Some(value) = lookup(ENV_UTC_OFFSET_MINUTES) {
            match value
                .trim()
                .parse::<i32>()
                .ok()
                .and_then(|minutes| minutes.checked_mul(60))
                .and_then(FixedOffset::east_opt)
            {
                Some(offset) => config.utc_offset = offset,
                None => ignored(ENV_UTC_OFFSET_MINUTES, &value),
            }
        }
        if let Some(value) = lookup(ENV_COUNTDOWN_SECS) {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.countdown_cadence = Duration::from_secs(secs),
                _ => ignored(ENV_COUNTDOWN_SECS, &value),
            }
        }
        if let Some(value) = lookup(ENV_DEFAULT_LIMIT) {
            match value.trim().parse::<usize>() {
                Ok(0) => config.default_limit = None,
                Ok(limit) => config.default_limit = Some(limit),
                Err(_) => ignored(ENV_DEFAULT_LIMIT, &value),
            }
        }
        if let Some(value) = non_blank(lookup(ENV_DB)) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_LEVEL)) {
            config.log_level = value;
        }
        if let Some(value) = non_blank(lookup(ENV_LOG_DIR)) {
            config.log_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_OWNER) {
            match Uuid::parse_str(value.trim()) {
                Ok(owner) => config.owner_id = owner,
                Err(_) => ignored(ENV_OWNER, &value),
            }
        }

        config
    }
}

/// Parses English weekday names and three-letter abbreviations.
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    value.trim().parse::<Weekday>().ok()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn ignored(key: &str, value: &str) {
    warn!("event=config_override module=config status=ignored key={key} value={value:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_start_week_on_sunday() {
        let config = DashboardConfig::default();
        assert_eq!(config.week_start, Weekday::Sun);
        assert_eq!(config.countdown_cadence, Duration::from_secs(60));
        assert_eq!(config.default_limit, None);
    }

    #[test]
    fn overrides_apply() {
        let owner = Uuid::new_v4();
        let owner_text = owner.to_string();
        let config = DashboardConfig::from_lookup(lookup_from(&[
            (ENV_WEEK_START, "monday"),
            (ENV_UTC_OFFSET_MINUTES, "-300"),
            (ENV_COUNTDOWN_SECS, "15"),
            (ENV_DEFAULT_LIMIT, "5"),
            (ENV_DB, " /tmp/dash.db "),
            (ENV_OWNER, owner_text.as_str()),
        ]));

        assert_eq!(config.week_start, Weekday::Mon);
        assert_eq!(config.utc_offset, FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(config.countdown_cadence, Duration::from_secs(15));
        assert_eq!(config.default_limit, Some(5));
        assert_eq!(config.db_path, PathBuf::from("/tmp/dash.db"));
        assert_eq!(config.owner_id, owner);
    }

    #[test]
    fn malformed_overrides_keep_defaults() {
        let config = DashboardConfig::from_lookup(lookup_from(&[
            (ENV_WEEK_START, "someday"),
            (ENV_UTC_OFFSET_MINUTES, "99999"),
            (ENV_COUNTDOWN_SECS, "0"),
            (ENV_DEFAULT_LIMIT, "ten"),
            (ENV_OWNER, "not-a-uuid"),
        ]));
        let defaults = DashboardConfig::default();

        assert_eq!(config.week_start, defaults.week_start);
        assert_eq!(config.countdown_cadence, defaults.countdown_cadence);
        assert_eq!(config.default_limit, None);
        assert_eq!(config.owner_id, Uuid::nil());
    }
}
