use chrono::{DateTime, Utc};

use crate::domain::models::{Direction, LogEntry};
use crate::domain::navigation::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    Default,
}

impl NotificationPermission {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "granted" => Some(Self::Granted),
            "denied" => Some(Self::Denied),
            "default" => Some(Self::Default),
            _ => None,
        }
    }
}

/// Desktop notification capability: permission check, request, notify.
pub trait DesktopNotifier {
    fn permission(&self) -> NotificationPermission;
    fn request_permission(&self) -> NotificationPermission;
    fn notify(&self, title: &str, body: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLogAlert {
    pub direction: Option<Direction>,
    pub site_name: Option<String>,
}

impl FieldLogAlert {
    pub fn title(&self) -> String {
        match self.direction {
            Some(direction) => format!("Truck {}", direction.as_str()),
            None => "New truck log".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self.site_name.as_deref() {
            Some(site) if !site.trim().is_empty() => format!("Logged at {site}"),
            _ => "Logged at an unknown site".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// The active view already shows the event.
    Suppressed,
    Counted { notified: bool },
}

pub struct NotificationCenter<N> {
    notifier: N,
    unread: u64,
}

impl<N: DesktopNotifier> NotificationCenter<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier, unread: 0 }
    }

    pub fn unread(&self) -> u64 {
        self.unread
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn mark_viewed(&mut self) {
        self.unread = 0;
    }

    /// Replaces the counter with a value derived from persisted last-viewed state.
    pub fn restore_unread(&mut self, unread: u64) {
        self.unread = unread;
    }

    pub fn on_field_log_created(
        &mut self,
        alert: &FieldLogAlert,
        active_view: Option<View>,
    ) -> AlertOutcome {
        if active_view.is_some_and(View::shows_field_logs) {
            return AlertOutcome::Suppressed;
        }

        self.unread += 1;

        let permission = match self.notifier.permission() {
            NotificationPermission::Default => self.notifier.request_permission(),
            other => other,
        };

        if permission != NotificationPermission::Granted {
            return AlertOutcome::Counted { notified: false };
        }

        self.notifier.notify(&alert.title(), &alert.body());
        AlertOutcome::Counted { notified: true }
    }
}

/// Entries created after the list was last viewed; never viewed means all unread.
pub fn unread_since(entries: &[LogEntry], last_viewed: Option<DateTime<Utc>>) -> usize {
    match last_viewed {
        Some(viewed_at) => entries
            .iter()
            .filter(|entry| entry.created_at > viewed_at)
            .count(),
        None => entries.len(),
    }
}
