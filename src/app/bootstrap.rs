use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::adapters::gateway::{AuthGuard, GatewayError, HttpGateway, PreferenceNavigator};
use crate::adapters::state_store::{open_connection, run_migrations};
use crate::app::AppError;
use crate::app::config::{AppConfig, Credentials};
use crate::app::services::{PreferenceStore, SessionStore, SqliteStateService};
use crate::domain::models::Session;
use crate::domain::navigation::View;

/// State store and gateway shared by both binaries.
pub struct Services {
    pub store: Arc<SqliteStateService>,
    pub gateway: Arc<HttpGateway>,
}

pub fn open_services(config: &AppConfig) -> Result<Services, AppError> {
    if let Some(parent) = Path::new(&config.state_db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(AppError::runtime)?;
    }

    let mut connection = open_connection(&config.state_db_path)?;
    run_migrations(&mut connection)?;
    let store = Arc::new(SqliteStateService::new(Arc::new(Mutex::new(connection))));

    let navigator = Arc::new(PreferenceNavigator::new(store.clone()));
    let guard = Arc::new(AuthGuard::new(store.clone(), store.clone(), navigator));
    let gateway = HttpGateway::new(
        &config.api_base_url,
        config.request_timeout(),
        store.clone(),
        guard,
    )?;

    Ok(Services {
        store,
        gateway: Arc::new(gateway),
    })
}

/// Resumes the persisted session when the backend still accepts it, otherwise
/// logs in with the configured credentials.
pub fn ensure_session(
    gateway: &HttpGateway,
    sessions: &dyn SessionStore,
    preferences: &dyn PreferenceStore,
    credentials: Option<&Credentials>,
) -> Result<Session, GatewayError> {
    let session = match resume(gateway, sessions)? {
        Some(session) => session,
        None => {
            let credentials = credentials.ok_or(GatewayError::NoSession)?;
            gateway.login(&credentials.username, &credentials.password)?
        }
    };

    // a view left on the login screen disarms 401 handling
    if matches!(preferences.active_view()?, None | Some(View::Login)) {
        preferences.set_active_view(View::home_for(session.user.role))?;
    }

    Ok(session)
}

fn resume(
    gateway: &HttpGateway,
    sessions: &dyn SessionStore,
) -> Result<Option<Session>, GatewayError> {
    let Some(stored) = sessions.load_session()? else {
        return Ok(None);
    };

    match gateway.current_user() {
        Ok(user) => {
            tracing::info!(user = %user.name, role = user.role.as_str(), "resumed persisted session");
            let session = Session {
                token: stored.token,
                user,
            };
            sessions.save_session(&session)?;
            Ok(Some(session))
        }
        Err(GatewayError::Unauthorized) => {
            tracing::warn!("persisted session was rejected");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
