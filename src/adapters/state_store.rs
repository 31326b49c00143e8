use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const LATEST_SCHEMA_VERSION: u32 = 1;

pub const SESSION_KEY: &str = "auth-storage";
pub const PREFERENCES_KEY: &str = "admin-storage";

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS last_viewed (
    list_key TEXT PRIMARY KEY,
    viewed_at TEXT NOT NULL
);
"#,
)];

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state store operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored timestamp is invalid: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, StateStoreError> {
    Connection::open(path).map_err(StateStoreError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), StateStoreError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(StateStoreError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, StateStoreError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn get_value(connection: &Connection, key: &str) -> Result<Option<String>, StateStoreError> {
    let value = connection
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

pub fn put_value(connection: &Connection, key: &str, value: &str) -> Result<(), StateStoreError> {
    connection.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, timestamp(Utc::now())],
    )?;
    Ok(())
}

/// Returns whether a value was present.
pub fn delete_value(connection: &Connection, key: &str) -> Result<bool, StateStoreError> {
    let removed = connection.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(removed > 0)
}

pub fn get_json<T: DeserializeOwned>(
    connection: &Connection,
    key: &str,
) -> Result<Option<T>, StateStoreError> {
    match get_value(connection, key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn put_json<T: Serialize>(
    connection: &Connection,
    key: &str,
    value: &T,
) -> Result<(), StateStoreError> {
    let raw = serde_json::to_string(value)?;
    put_value(connection, key, &raw)
}

pub fn get_last_viewed(
    connection: &Connection,
    list_key: &str,
) -> Result<Option<DateTime<Utc>>, StateStoreError> {
    let raw: Option<String> = connection
        .query_row(
            "SELECT viewed_at FROM last_viewed WHERE list_key = ?1",
            params![list_key],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(raw) => Ok(Some(
            DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc),
        )),
        None => Ok(None),
    }
}

pub fn set_last_viewed(
    connection: &Connection,
    list_key: &str,
    viewed_at: DateTime<Utc>,
) -> Result<(), StateStoreError> {
    connection.execute(
        "INSERT INTO last_viewed (list_key, viewed_at) VALUES (?1, ?2)
         ON CONFLICT(list_key) DO UPDATE SET viewed_at = excluded.viewed_at",
        params![list_key, timestamp(viewed_at)],
    )?;
    Ok(())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
