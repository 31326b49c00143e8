use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::adapters::wire::field_log_alert;
use crate::app::services::{FIELD_LOGS_LIST, LastViewedStore, PreferenceStore, ServiceError};
use crate::app::sync::{ChannelSubscriber, Fetch, StatusBoard};
use crate::domain::models::LogEntry;
use crate::domain::navigation::View;
use crate::domain::notification::{
    AlertOutcome, DesktopNotifier, FieldLogAlert, NotificationCenter, NotificationPermission,
    unread_since,
};

pub const FIELD_LOG_CREATED: &str = "truckLog:created";

/// Headless desktop notifier: alerts become log lines on the `desktop_notification` target.
///
/// There is nobody to answer a permission prompt, so a request leaves the
/// configured permission unchanged.
#[derive(Debug)]
pub struct TracingNotifier {
    permission: NotificationPermission,
    delivered: AtomicU64,
}

impl TracingNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission,
            delivered: AtomicU64::new(0),
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl DesktopNotifier for TracingNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&self) -> NotificationPermission {
        tracing::debug!(permission = ?self.permission, "notification permission requested");
        self.permission
    }

    fn notify(&self, title: &str, body: &str) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        tracing::info!(target: "desktop_notification", title, body, "desktop notification");
    }
}

/// Unread badge for the field truck-log list, persisted through last-viewed timestamps.
pub struct UnreadTracker {
    center: Mutex<NotificationCenter<TracingNotifier>>,
    last_viewed: Arc<dyn LastViewedStore>,
}

impl UnreadTracker {
    pub fn new(notifier: TracingNotifier, last_viewed: Arc<dyn LastViewedStore>) -> Self {
        Self {
            center: Mutex::new(NotificationCenter::new(notifier)),
            last_viewed,
        }
    }

    pub fn unread(&self) -> u64 {
        self.lock().unread()
    }

    pub fn delivered(&self) -> u64 {
        self.lock().notifier().delivered()
    }

    pub fn last_viewed_at(&self) -> Result<Option<DateTime<Utc>>, ServiceError> {
        self.last_viewed.last_viewed(FIELD_LOGS_LIST)
    }

    /// Recomputes the counter from a fresh snapshot.
    pub fn restore(&self, entries: &[LogEntry]) -> Result<u64, ServiceError> {
        let last_viewed = self.last_viewed.last_viewed(FIELD_LOGS_LIST)?;
        let unread = unread_since(entries, last_viewed) as u64;
        self.lock().restore_unread(unread);
        Ok(unread)
    }

    pub fn mark_viewed(&self, at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.last_viewed.mark_viewed(FIELD_LOGS_LIST, at)?;
        self.lock().mark_viewed();
        tracing::info!(list = FIELD_LOGS_LIST, viewed_at = %at, "notifications marked viewed");
        Ok(())
    }

    /// A log that arrives while the field-log list is open counts as seen at `at`.
    pub fn on_field_log_created(
        &self,
        alert: &FieldLogAlert,
        active_view: Option<View>,
        at: DateTime<Utc>,
    ) -> AlertOutcome {
        let outcome = self.lock().on_field_log_created(alert, active_view);
        if outcome == AlertOutcome::Suppressed
            && let Err(error) = self.mark_viewed(at)
        {
            tracing::warn!(error = %error, "failed to record last viewed time");
        }
        outcome
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NotificationCenter<TracingNotifier>> {
        self.center.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Notification owner: counts `truckLog:created` and restores the badge on connect.
pub struct NotificationSubscriber {
    tracker: Arc<UnreadTracker>,
    preferences: Arc<dyn PreferenceStore>,
    fetch: Fetch<LogEntry>,
}

impl NotificationSubscriber {
    pub fn new(
        tracker: Arc<UnreadTracker>,
        preferences: Arc<dyn PreferenceStore>,
        fetch: Fetch<LogEntry>,
    ) -> Self {
        Self {
            tracker,
            preferences,
            fetch,
        }
    }
}

impl ChannelSubscriber for NotificationSubscriber {
    fn handles(&self, event: &str) -> bool {
        event == FIELD_LOG_CREATED
    }

    fn on_connected(&mut self, _board: &StatusBoard, owner: &str) {
        let entries = match (self.fetch)() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(owner, error = %error, "failed to refetch field logs for unread count");
                return;
            }
        };

        match self.tracker.restore(&entries) {
            Ok(unread) => tracing::info!(owner, unread, "unread counter restored"),
            Err(error) => tracing::warn!(owner, error = %error, "failed to read last viewed time"),
        }
    }

    fn on_event(&mut self, name: &str, payload: &Value, _board: &StatusBoard, owner: &str) {
        let alert = field_log_alert(payload);
        let active_view = self.preferences.active_view().unwrap_or_else(|error| {
            tracing::warn!(owner, error = %error, "failed to read active view");
            None
        });

        let outcome = self
            .tracker
            .on_field_log_created(&alert, active_view, Utc::now());
        tracing::info!(
            owner,
            event = name,
            outcome = ?outcome,
            unread = self.tracker.unread(),
            "field log notification handled"
        );
    }
}
