use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::state_store;
use crate::adapters::state_store::{PREFERENCES_KEY, SESSION_KEY, StateStoreError};
use crate::domain::models::Session;
use crate::domain::navigation::{LayoutPreferences, View};

/// Last-viewed key of the field truck-log list that drives the unread badge.
pub const FIELD_LOGS_LIST: &str = "truck-logs";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("state store lock poisoned")]
    StoreLockPoisoned,
    #[error("state store operation failed: {0}")]
    StateStore(#[from] StateStoreError),
}

/// Persisted values are wrapped the way the browser console stored them.
#[derive(Debug, Serialize, Deserialize)]
struct Persisted<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

pub trait SessionStore: Send + Sync {
    fn load_session(&self) -> Result<Option<Session>, ServiceError>;
    fn save_session(&self, session: &Session) -> Result<(), ServiceError>;
    fn clear_session(&self) -> Result<(), ServiceError>;
}

pub trait PreferenceStore: Send + Sync {
    /// Defaults apply when nothing was stored yet.
    fn layout_preferences(&self) -> Result<LayoutPreferences, ServiceError>;
    fn save_layout_preferences(&self, preferences: &LayoutPreferences) -> Result<(), ServiceError>;

    fn active_view(&self) -> Result<Option<View>, ServiceError> {
        Ok(self.layout_preferences()?.active_view())
    }

    fn set_active_view(&self, view: View) -> Result<(), ServiceError> {
        let mut preferences = self.layout_preferences()?;
        preferences.current_page = view.id().to_string();
        self.save_layout_preferences(&preferences)
    }
}

pub trait LastViewedStore: Send + Sync {
    fn last_viewed(&self, list_key: &str) -> Result<Option<DateTime<Utc>>, ServiceError>;
    fn mark_viewed(&self, list_key: &str, at: DateTime<Utc>) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SqliteStateService {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStateService {
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, StateStoreError>,
    ) -> Result<T, ServiceError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::StoreLockPoisoned)?;
        op(&connection).map_err(ServiceError::from)
    }
}

impl SessionStore for SqliteStateService {
    fn load_session(&self) -> Result<Option<Session>, ServiceError> {
        let stored: Option<Persisted<Session>> =
            self.with_connection(|connection| state_store::get_json(connection, SESSION_KEY))?;
        Ok(stored.map(|persisted| persisted.state))
    }

    fn save_session(&self, session: &Session) -> Result<(), ServiceError> {
        self.with_connection(|connection| {
            state_store::put_json(
                connection,
                SESSION_KEY,
                &Persisted {
                    state: session,
                    version: 0,
                },
            )
        })
    }

    fn clear_session(&self) -> Result<(), ServiceError> {
        self.with_connection(|connection| state_store::delete_value(connection, SESSION_KEY))
            .map(|_| ())
    }
}

impl PreferenceStore for SqliteStateService {
    fn layout_preferences(&self) -> Result<LayoutPreferences, ServiceError> {
        let stored: Option<Persisted<LayoutPreferences>> =
            self.with_connection(|connection| state_store::get_json(connection, PREFERENCES_KEY))?;
        Ok(stored.map(|persisted| persisted.state).unwrap_or_default())
    }

    fn save_layout_preferences(&self, preferences: &LayoutPreferences) -> Result<(), ServiceError> {
        self.with_connection(|connection| {
            state_store::put_json(
                connection,
                PREFERENCES_KEY,
                &Persisted {
                    state: preferences,
                    version: 0,
                },
            )
        })
    }
}

impl LastViewedStore for SqliteStateService {
    fn last_viewed(&self, list_key: &str) -> Result<Option<DateTime<Utc>>, ServiceError> {
        self.with_connection(|connection| state_store::get_last_viewed(connection, list_key))
    }

    fn mark_viewed(&self, list_key: &str, at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.with_connection(|connection| state_store::set_last_viewed(connection, list_key, at))
    }
}
