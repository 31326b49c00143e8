use serde::{Deserialize, Serialize};

use crate::domain::models::Role;

/// Top-level views of the console, identified the way layout preferences store them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    AdminDashboard,
    Quarries,
    AdminTruckLogs,
    Cctv,
    Reports,
    Users,
    UserDashboard,
    UserLogIn,
    UserLogOut,
    UserTruckLogs,
    UserTruckRecords,
    UserReports,
    UserProfile,
}

const VIEW_IDS: &[(View, &str)] = &[
    (View::Login, "login"),
    (View::AdminDashboard, "dashboard"),
    (View::Quarries, "quarry"),
    (View::AdminTruckLogs, "trucks"),
    (View::Cctv, "cctv"),
    (View::Reports, "reports"),
    (View::Users, "users"),
    (View::UserDashboard, "/user/dashboard"),
    (View::UserLogIn, "/user/log-in"),
    (View::UserLogOut, "/user/log-out"),
    (View::UserTruckLogs, "/user/logs"),
    (View::UserTruckRecords, "/user/truck-records"),
    (View::UserReports, "/user/reports"),
    (View::UserProfile, "/user/profile"),
];

impl View {
    pub fn id(self) -> &'static str {
        VIEW_IDS
            .iter()
            .find(|(view, _)| *view == self)
            .map_or("dashboard", |(_, id)| id)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        VIEW_IDS
            .iter()
            .find(|(_, candidate)| *candidate == id)
            .map(|(view, _)| *view)
    }

    /// The view a freshly authenticated session lands on.
    pub fn home_for(role: Role) -> Self {
        if role.is_administrator() {
            Self::AdminDashboard
        } else {
            Self::UserDashboard
        }
    }

    /// Views that already render field truck-log events.
    pub fn shows_field_logs(self) -> bool {
        matches!(self, Self::AdminTruckLogs | Self::UserTruckLogs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPreferences {
    pub sidebar_open: bool,
    pub current_page: String,
}

impl Default for LayoutPreferences {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            current_page: View::AdminDashboard.id().to_string(),
        }
    }
}

impl LayoutPreferences {
    pub fn active_view(&self) -> Option<View> {
        View::from_id(&self.current_page)
    }
}

#[cfg(test)]
mod tests {
    use super::{LayoutPreferences, View};
    use crate::domain::models::Role;

    #[test]
    fn view_ids_round_trip() {
        for view in [View::AdminTruckLogs, View::UserTruckLogs, View::Login] {
            assert_eq!(View::from_id(view.id()), Some(view));
        }
        assert_eq!(View::from_id("nowhere"), None);
    }

    #[test]
    fn role_picks_home_view() {
        assert_eq!(View::home_for(Role::Superadmin), View::AdminDashboard);
        assert_eq!(View::home_for(Role::User), View::UserDashboard);
    }

    #[test]
    fn default_preferences_open_sidebar_on_dashboard() {
        let prefs = LayoutPreferences::default();
        assert!(prefs.sidebar_open);
        assert_eq!(prefs.active_view(), Some(View::AdminDashboard));
    }
}
