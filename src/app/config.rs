use std::time::Duration;

use crate::app::AppError;
use crate::domain::export::{DisplayClock, FormatSelection, LogFamily, RangePreset};
use crate::domain::notification::NotificationPermission;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub socket_url: String,
    pub state_db_path: String,
    pub status_bind: String,
    pub request_timeout_ms: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    pub display_clock: DisplayClock,
    pub notification_permission: NotificationPermission,
    pub organization_name: String,
    pub export_dir: String,
    pub export_family: LogFamily,
    pub export_range: RangePreset,
    pub export_format: FormatSelection,
    pub credentials: Option<Credentials>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reconnect_base_ms = parse_or_default(&lookup, "RECONNECT_BASE_MS", 1000_u64)?;
        let reconnect_max_ms = parse_or_default(&lookup, "RECONNECT_MAX_MS", 30_000_u64)?;
        if reconnect_max_ms < reconnect_base_ms {
            return Err(AppError::config(
                "RECONNECT_MAX_MS must not be smaller than RECONNECT_BASE_MS",
            ));
        }

        let offset_minutes = parse_or_default(&lookup, "DISPLAY_UTC_OFFSET_MINUTES", 480_i32)?;
        let display_clock = DisplayClock::from_offset_minutes(offset_minutes).ok_or_else(|| {
            AppError::config("DISPLAY_UTC_OFFSET_MINUTES must be within one day of UTC")
        })?;

        Ok(Self {
            api_base_url: string_or_default(&lookup, "API_BASE_URL", "http://localhost:5000/api"),
            socket_url: string_or_default(&lookup, "SOCKET_URL", "http://localhost:5000"),
            state_db_path: string_or_default(&lookup, "STATE_DB_PATH", "./data/quarry_console.db"),
            status_bind: string_or_default(&lookup, "STATUS_BIND", "127.0.0.1:8090"),
            request_timeout_ms: parse_or_default(&lookup, "REQUEST_TIMEOUT_MS", 10_000_u64)?,
            reconnect_base_ms,
            reconnect_max_ms,
            display_clock,
            notification_permission: choice_or_default(
                &lookup,
                "NOTIFICATION_PERMISSION",
                NotificationPermission::parse,
                NotificationPermission::Default,
                "granted, denied or default",
            )?,
            organization_name: string_or_default(
                &lookup,
                "ORGANIZATION_NAME",
                "Provincial Government of Bataan",
            ),
            export_dir: string_or_default(&lookup, "EXPORT_DIR", "./exports"),
            export_family: choice_or_default(
                &lookup,
                "EXPORT_FAMILY",
                LogFamily::parse,
                LogFamily::Field,
                "field or admin",
            )?,
            export_range: choice_or_default(
                &lookup,
                "EXPORT_RANGE",
                RangePreset::parse,
                RangePreset::Today,
                "today, week, month or year",
            )?,
            export_format: choice_or_default(
                &lookup,
                "EXPORT_FORMAT",
                FormatSelection::parse,
                FormatSelection::Both,
                "pdf, xlsx or both",
            )?,
            credentials: credentials(&lookup)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_base(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_ms)
    }

    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

fn choice_or_default<T, F>(
    lookup: &F,
    key: &str,
    parse: fn(&str) -> Option<T>,
    default: T,
    expected: &str,
) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => parse(&raw)
            .ok_or_else(|| AppError::config(format!("{key} must be one of {expected}"))),
        None => Ok(default),
    }
}

fn credentials<F>(lookup: &F) -> Result<Option<Credentials>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match (
        non_empty(lookup, "QUARRY_USERNAME"),
        lookup("QUARRY_PASSWORD").filter(|v| !v.is_empty()),
    ) {
        (Some(username), Some(password)) => Ok(Some(Credentials { username, password })),
        (None, None) => Ok(None),
        _ => Err(AppError::config(
            "QUARRY_USERNAME and QUARRY_PASSWORD must be set together",
        )),
    }
}
