use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::adapters::wire::{
    WireError, decode_admin_log, decode_field_log, decode_list, decode_record, unwrap_envelope,
};
use crate::app::services::{PreferenceStore, ServiceError, SessionStore};
use crate::domain::models::{Account, LogEntry, Session, SessionUser, Site, Vehicle};
use crate::domain::navigation::View;
use crate::domain::validation::{
    AccountDraft, AdminLogDraft, AdminLogEdit, DraftMode, FieldLogBatch, ProfileEdit, SiteDraft,
    ValidationError, VehicleDraft, validate_new_password,
};

pub const FIELD_LOGS_PATH: &str = "/truck-logs";
pub const ADMIN_LOGS_PATH: &str = "/admin-truck-logs";
pub const SITES_PATH: &str = "/quarries";
pub const ACCOUNTS_PATH: &str = "/users";
pub const VEHICLES_PATH: &str = "/trucks";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{path} answered {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },
    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: WireError,
    },
    #[error("session is no longer authorized")]
    Unauthorized,
    #[error("no session is stored; log in first")]
    NoSession,
    #[error("session store unavailable: {0}")]
    SessionStore(#[from] ServiceError),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
}

/// Moves the console to the login view.
pub trait Navigator: Send + Sync {
    fn navigate_to_login(&self);
}

/// Records the login view as the active page, where a front end picks it up.
pub struct PreferenceNavigator {
    preferences: Arc<dyn PreferenceStore>,
}

impl PreferenceNavigator {
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        Self { preferences }
    }
}

impl Navigator for PreferenceNavigator {
    fn navigate_to_login(&self) {
        if let Err(error) = self.preferences.set_active_view(View::Login) {
            tracing::warn!(error = %error, "failed to record login view");
        }
    }
}

/// Turns the first 401 into one session invalidation and one navigation.
pub struct AuthGuard {
    armed: AtomicBool,
    sessions: Arc<dyn SessionStore>,
    preferences: Arc<dyn PreferenceStore>,
    navigator: Arc<dyn Navigator>,
}

impl AuthGuard {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        preferences: Arc<dyn PreferenceStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            armed: AtomicBool::new(true),
            sessions,
            preferences,
            navigator,
        }
    }

    /// Returns true when this call cleared the session and navigated.
    pub fn on_unauthorized(&self) -> bool {
        if matches!(self.preferences.active_view(), Ok(Some(View::Login))) {
            return false;
        }
        if self
            .armed
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        if let Err(error) = self.sessions.clear_session() {
            tracing::warn!(error = %error, "failed to clear session after 401");
        }
        self.navigator.navigate_to_login();
        tracing::warn!("session rejected by backend; redirected to login");
        true
    }

    /// Called when a new session is stored.
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

/// Inclusive time window sent as `startDate`/`endDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    fn query(&self) -> [(&'static str, String); 2] {
        [
            (
                "startDate",
                self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                "endDate",
                self.end.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ]
    }
}

/// Read side of the backend used by sync owners and reports.
pub trait RemoteData: Send + Sync {
    fn field_logs(&self, window: Option<TimeWindow>) -> Result<Vec<LogEntry>, GatewayError>;
    fn admin_logs(&self, window: Option<TimeWindow>) -> Result<Vec<LogEntry>, GatewayError>;
    fn sites(&self) -> Result<Vec<Site>, GatewayError>;
    fn vehicles(&self) -> Result<Vec<Vehicle>, GatewayError>;
    fn accounts(&self) -> Result<Vec<Account>, GatewayError>;
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    sessions: Arc<dyn SessionStore>,
    guard: Arc<AuthGuard>,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        sessions: Arc<dyn SessionStore>,
        guard: Arc<AuthGuard>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
            guard,
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, GatewayError> {
        let path = "/auth/login";
        let request = self
            .request(Method::POST, path)
            .json(&Credentials { username, password });
        let body = self.execute(request, path, false)?;
        let response: LoginResponse = decode_record(&body).map_err(|source| decode(path, source))?;

        let session = Session {
            token: response.token,
            user: response.user,
        };
        self.sessions.save_session(&session)?;
        self.guard.rearm();
        tracing::info!(user = %session.user.name, role = session.user.role.as_str(), "logged in");

        Ok(session)
    }

    pub fn current_user(&self) -> Result<SessionUser, GatewayError> {
        // the profile endpoint nests the account under `user`
        self.get_one("/auth/me", Some("user"))
    }

    pub fn logout(&self) -> Result<(), GatewayError> {
        self.sessions.clear_session()?;
        Ok(())
    }

    pub fn create_account(&self, draft: AccountDraft) -> Result<Account, GatewayError> {
        draft.validate(DraftMode::Create)?;
        self.send_one(Method::POST, ACCOUNTS_PATH, &draft.normalized())
    }

    pub fn update_account(&self, id: &str, draft: AccountDraft) -> Result<Account, GatewayError> {
        draft.validate(DraftMode::Update)?;
        self.send_one(
            Method::PUT,
            &format!("{ACCOUNTS_PATH}/{id}"),
            &draft.normalized(),
        )
    }

    pub fn set_account_active(&self, id: &str, is_active: bool) -> Result<Account, GatewayError> {
        self.send_one(
            Method::PUT,
            &format!("{ACCOUNTS_PATH}/{id}"),
            &serde_json::json!({ "isActive": is_active }),
        )
    }

    pub fn change_password(&self, id: &str, password: &str) -> Result<Account, GatewayError> {
        validate_new_password(password)?;
        self.send_one(
            Method::PUT,
            &format!("{ACCOUNTS_PATH}/{id}"),
            &serde_json::json!({ "password": password }),
        )
    }

    pub fn create_site(&self, draft: &SiteDraft) -> Result<Site, GatewayError> {
        draft.validate()?;
        self.send_one(Method::POST, SITES_PATH, draft)
    }

    pub fn update_site(&self, id: &str, draft: &SiteDraft) -> Result<Site, GatewayError> {
        draft.validate()?;
        self.send_one(Method::PUT, &format!("{SITES_PATH}/{id}"), draft)
    }

    pub fn create_vehicle(&self, draft: VehicleDraft) -> Result<Vehicle, GatewayError> {
        draft.validate()?;
        self.send_one(Method::POST, VEHICLES_PATH, &draft.normalized())
    }

    pub fn update_vehicle(&self, id: &str, draft: VehicleDraft) -> Result<Vehicle, GatewayError> {
        draft.validate()?;
        self.send_one(
            Method::PUT,
            &format!("{VEHICLES_PATH}/{id}"),
            &draft.normalized(),
        )
    }

    /// Returns how many field logs the backend stored.
    pub fn create_field_logs(&self, batch: FieldLogBatch) -> Result<u64, GatewayError> {
        batch.validate()?;
        let batch = batch.normalized();
        let request = self
            .authorized(Method::POST, FIELD_LOGS_PATH)?
            .json(&batch);
        let body = self.execute(request, FIELD_LOGS_PATH, true)?;
        let count = body
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| u64::from(batch.total()));
        tracing::info!(count, direction = batch.log_type.as_str(), "field logs submitted");
        Ok(count)
    }

    pub fn create_admin_log(&self, draft: &AdminLogDraft) -> Result<LogEntry, GatewayError> {
        draft.validate()?;
        self.send_with(Method::POST, ADMIN_LOGS_PATH, draft, decode_admin_log)
    }

    pub fn update_admin_log(&self, id: &str, edit: &AdminLogEdit) -> Result<LogEntry, GatewayError> {
        self.send_with(
            Method::PUT,
            &format!("{ADMIN_LOGS_PATH}/{id}"),
            edit,
            decode_admin_log,
        )
    }

    /// Updates the signed-in account and the stored session's copy of it.
    pub fn update_profile(&self, edit: &ProfileEdit) -> Result<SessionUser, GatewayError> {
        edit.validate()?;
        let path = "/auth/profile";
        let request = self.authorized(Method::PUT, path)?.json(edit);
        let body = take_nested(unwrap_envelope(self.execute(request, path, true)?), "user");
        let user: SessionUser = decode_record(&body).map_err(|source| decode(path, source))?;

        if let Some(session) = self.sessions.load_session()? {
            self.sessions.save_session(&Session {
                token: session.token,
                user: user.clone(),
            })?;
        }
        Ok(user)
    }

    /// `resource` is one of the collection paths, e.g. [`VEHICLES_PATH`].
    pub fn delete(&self, resource: &str, id: &str) -> Result<(), GatewayError> {
        let path = format!("{resource}/{id}");
        let request = self.authorized(Method::DELETE, &path)?;
        self.execute(request, &path, true).map(|_| ())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("x-request-id", uuid::Uuid::new_v4().to_string())
    }

    /// The token is read from the store on every call, never cached.
    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let session = self.sessions.load_session()?.ok_or(GatewayError::NoSession)?;
        Ok(self.request(method, path).bearer_auth(session.token))
    }

    fn execute(
        &self,
        request: RequestBuilder,
        path: &str,
        guarded: bool,
    ) -> Result<Value, GatewayError> {
        let response = request.send().map_err(|source| GatewayError::Network {
            path: path.to_string(),
            source,
        })?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            if guarded {
                self.guard.on_unauthorized();
            }
            return Err(GatewayError::Unauthorized);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            tracing::warn!(path, status = status.as_u16(), message = %message, "request rejected");
            return Err(GatewayError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().map_err(|source| GatewayError::Network {
            path: path.to_string(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|error| decode(path, WireError::Json(error)))
    }

    fn get_list<T>(
        &self,
        path: &str,
        window: Option<TimeWindow>,
        decode_item: impl Fn(&Value) -> Result<T, WireError>,
    ) -> Result<Vec<T>, GatewayError> {
        let mut request = self.authorized(Method::GET, path)?;
        if let Some(window) = window {
            request = request.query(&window.query());
        }
        let body = unwrap_envelope(self.execute(request, path, true)?);
        let items = decode_list(&body, decode_item).map_err(|source| decode(path, source))?;
        tracing::debug!(path, count = items.len(), "list fetched");
        Ok(items)
    }

    fn get_one<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        nested: Option<&str>,
    ) -> Result<T, GatewayError> {
        let request = self.authorized(Method::GET, path)?;
        let mut body = unwrap_envelope(self.execute(request, path, true)?);
        if let Some(key) = nested {
            body = take_nested(body, key);
        }
        decode_record(&body).map_err(|source| decode(path, source))
    }

    fn send_one<T, B>(&self, method: Method, path: &str, payload: &B) -> Result<T, GatewayError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with(method, path, payload, decode_record)
    }

    fn send_with<T, B>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
        decode_item: impl Fn(&Value) -> Result<T, WireError>,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.authorized(method, path)?.json(payload);
        let body = unwrap_envelope(self.execute(request, path, true)?);
        decode_item(&body).map_err(|source| decode(path, source))
    }
}

impl RemoteData for HttpGateway {
    fn field_logs(&self, window: Option<TimeWindow>) -> Result<Vec<LogEntry>, GatewayError> {
        self.get_list(FIELD_LOGS_PATH, window, decode_field_log)
    }

    fn admin_logs(&self, window: Option<TimeWindow>) -> Result<Vec<LogEntry>, GatewayError> {
        self.get_list(ADMIN_LOGS_PATH, window, decode_admin_log)
    }

    fn sites(&self) -> Result<Vec<Site>, GatewayError> {
        self.get_list(SITES_PATH, None, decode_record)
    }

    fn vehicles(&self) -> Result<Vec<Vehicle>, GatewayError> {
        self.get_list(VEHICLES_PATH, None, decode_record)
    }

    fn accounts(&self) -> Result<Vec<Account>, GatewayError> {
        self.get_list(ACCOUNTS_PATH, None, decode_record)
    }
}

fn take_nested(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

fn decode(path: &str, source: WireError) -> GatewayError {
    GatewayError::Decode {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::{
        AuthGuard, GatewayError, HttpGateway, Navigator, RemoteData, TimeWindow, VEHICLES_PATH,
    };
    use crate::app::services::{PreferenceStore, SessionStore, SqliteStateService};
    use crate::adapters::wire::decode_admin_log;
    use crate::domain::models::{Direction, LoadState, Role, VehicleStatus};
    use crate::domain::navigation::View;
    use crate::domain::validation::{
        AccountDraft, AdminLogDraft, AdminLogEdit, FieldLogBatch, FieldLogCount, ProfileEdit,
        ValidationError, VehicleDraft,
    };
    use crate::test_support::{
        admin_log_json, field_log_json, spawn_http_responder, test_session, test_state_service,
        vehicle_json,
    };

    #[derive(Default)]
    struct CountingNavigator {
        calls: AtomicUsize,
    }

    impl Navigator for CountingNavigator {
        fn navigate_to_login(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gateway(
        base_url: &str,
        store: &SqliteStateService,
    ) -> (HttpGateway, Arc<CountingNavigator>) {
        let store = Arc::new(store.clone());
        let navigator = Arc::new(CountingNavigator::default());
        let guard = Arc::new(AuthGuard::new(
            store.clone(),
            store.clone(),
            navigator.clone(),
        ));
        let gateway = HttpGateway::new(&format!("{base_url}/api"), Duration::from_secs(5), store, guard)
            .expect("gateway should build");
        (gateway, navigator)
    }

    #[test]
    fn injects_bearer_token_and_date_window() {
        let body = serde_json::json!({
            "success": true,
            "data": [field_log_json("log-1", "IN", "2026-03-02T00:30:00Z")]
        });
        let (base_url, responder) = spawn_http_responder(vec![(200, body.to_string())]);
        let store = test_state_service("gateway-bearer");
        store.save_session(&test_session("tok-123")).expect("save");
        let (gateway, _) = gateway(&base_url, &store);

        let window = TimeWindow {
            start: Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 2, 15, 59, 59).unwrap(),
        };
        let logs = gateway.field_logs(Some(window)).expect("fetch should succeed");
        assert_eq!(logs.len(), 1);

        let captured = responder.join().expect("responder should finish");
        let request = &captured[0];
        assert!(request.request_line.starts_with("GET /api/truck-logs?startDate=2026-03-01T16%3A00%3A00.000Z&endDate="));
        assert_eq!(request.header("authorization"), Some("Bearer tok-123"));
        assert!(request.header("x-request-id").is_some());
    }

    #[test]
    fn reads_token_from_store_at_call_time() {
        let list = serde_json::json!({ "data": [vehicle_json("t-1", "ABC 1234")] }).to_string();
        let (base_url, responder) =
            spawn_http_responder(vec![(200, list.clone()), (200, list)]);
        let store = test_state_service("gateway-token-refresh");
        let (gateway, _) = gateway(&base_url, &store);

        store.save_session(&test_session("first")).expect("save");
        gateway.vehicles().expect("first fetch");
        store.save_session(&test_session("second")).expect("save");
        gateway.vehicles().expect("second fetch");

        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[0].header("authorization"), Some("Bearer first"));
        assert_eq!(captured[1].header("authorization"), Some("Bearer second"));
    }

    #[test]
    fn missing_session_is_reported_without_a_request() {
        let store = test_state_service("gateway-no-session");
        let (gateway, _) = gateway("http://127.0.0.1:9", &store);

        assert!(matches!(gateway.sites(), Err(GatewayError::NoSession)));
    }

    #[test]
    fn surfaces_backend_error_message() {
        let (base_url, responder) = spawn_http_responder(vec![(
            500,
            r#"{"success":false,"message":"database offline"}"#.to_string(),
        )]);
        let store = test_state_service("gateway-500");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, navigator) = gateway(&base_url, &store);

        match gateway.vehicles() {
            Err(GatewayError::Status {
                status, message, ..
            }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "database offline");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(navigator.calls.load(Ordering::SeqCst), 0);
        assert!(store.load_session().expect("load").is_some());
        responder.join().expect("responder should finish");
    }

    #[test]
    fn concurrent_unauthorized_responses_navigate_once() {
        let responses = (0..4)
            .map(|_| (401, r#"{"message":"token expired"}"#.to_string()))
            .collect();
        let (base_url, _responder) = spawn_http_responder(responses);
        let store = test_state_service("gateway-401");
        store.save_session(&test_session("stale")).expect("save");
        let (gateway, navigator) = gateway(&base_url, &store);
        let gateway = Arc::new(gateway);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let gateway = Arc::clone(&gateway);
                thread::spawn(move || gateway.vehicles())
            })
            .collect();

        for worker in workers {
            let result = worker.join().expect("worker should not panic");
            assert!(matches!(
                result,
                Err(GatewayError::Unauthorized) | Err(GatewayError::NoSession)
            ));
        }

        assert_eq!(navigator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.load_session().expect("load"), None);
    }

    #[test]
    fn unauthorized_on_login_view_is_left_alone() {
        let (base_url, responder) =
            spawn_http_responder(vec![(401, r#"{"message":"nope"}"#.to_string())]);
        let store = test_state_service("gateway-401-login");
        store.save_session(&test_session("tok")).expect("save");
        store.set_active_view(View::Login).expect("prefs");
        let (gateway, navigator) = gateway(&base_url, &store);

        assert!(matches!(gateway.vehicles(), Err(GatewayError::Unauthorized)));
        assert_eq!(navigator.calls.load(Ordering::SeqCst), 0);
        assert!(store.load_session().expect("load").is_some());
        responder.join().expect("responder should finish");
    }

    #[test]
    fn login_stores_session_and_rearms_guard() {
        let login = serde_json::json!({
            "success": true,
            "token": "fresh",
            "user": { "id": "u-9", "name": "Maria", "email": "maria@example.com", "role": "admin" }
        });
        let (base_url, responder) = spawn_http_responder(vec![
            (401, "{}".to_string()),
            (200, login.to_string()),
            (401, "{}".to_string()),
        ]);
        let store = test_state_service("gateway-login");
        store.save_session(&test_session("old")).expect("save");
        let (gateway, navigator) = gateway(&base_url, &store);

        assert!(gateway.vehicles().is_err());
        let session = gateway.login("maria", "secret").expect("login should succeed");
        assert_eq!(session.user.role, Role::Admin);
        assert_eq!(store.load_session().expect("load"), Some(session));

        assert!(gateway.vehicles().is_err());
        assert_eq!(navigator.calls.load(Ordering::SeqCst), 2);

        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[1].request_line, "POST /api/auth/login HTTP/1.1");
        assert_eq!(captured[1].header("authorization"), None);
        let body: serde_json::Value = serde_json::from_str(&captured[1].body).expect("json body");
        assert_eq!(body["username"], "maria");
    }

    #[test]
    fn invalid_account_is_never_sent() {
        let store = test_state_service("gateway-validation");
        store.save_session(&test_session("tok")).expect("save");
        // nothing listens here; a request would fail with a network error
        let (gateway, _) = gateway("http://127.0.0.1:9", &store);

        let draft = AccountDraft {
            username: "pedro".to_string(),
            name: "Pedro".to_string(),
            password: Some("secret1".to_string()),
            email: None,
            contact_number: Some("12345".to_string()),
            location: "Orion".to_string(),
            company: None,
            role: Role::User,
        };

        assert!(matches!(
            gateway.create_account(draft),
            Err(GatewayError::Validation(ValidationError::ContactNumber))
        ));
        assert!(matches!(
            gateway.change_password("u-1", "abc"),
            Err(GatewayError::Validation(ValidationError::PasswordTooShort))
        ));
    }

    #[test]
    fn delete_accepts_any_body() {
        let (base_url, responder) = spawn_http_responder(vec![(200, String::new())]);
        let store = test_state_service("gateway-delete");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, _) = gateway(&base_url, &store);

        gateway.delete(VEHICLES_PATH, "t-1").expect("delete should succeed");

        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[0].request_line, "DELETE /api/trucks/t-1 HTTP/1.1");
    }

    #[test]
    fn preference_navigator_records_login_view() {
        let store = test_state_service("gateway-navigator");
        let navigator = super::PreferenceNavigator::new(Arc::new(store.clone()));

        navigator.navigate_to_login();
        assert_eq!(store.active_view().expect("read"), Some(View::Login));
    }

    #[test]
    fn creates_and_updates_vehicles() {
        let created = serde_json::json!({ "success": true, "data": vehicle_json("t-7", "NEW 7") });
        let updated = serde_json::json!({ "success": true, "data": vehicle_json("t-7", "NEW 7B") });
        let (base_url, responder) = spawn_http_responder(vec![
            (201, created.to_string()),
            (200, updated.to_string()),
        ]);
        let store = test_state_service("gateway-vehicle-writes");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, _) = gateway(&base_url, &store);
        let draft = VehicleDraft {
            plate_number: "NEW 7".to_string(),
            brand: "Hino".to_string(),
            model: "500".to_string(),
            capacity: "12".to_string(),
            company: "ABC Mining Corp".to_string(),
            status: VehicleStatus::Active,
        };

        let vehicle = gateway.create_vehicle(draft.clone()).expect("create");
        assert_eq!(vehicle.id, "t-7");
        let vehicle = gateway.update_vehicle("t-7", draft).expect("update");
        assert_eq!(vehicle.plate_number, "NEW 7B");

        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[0].request_line, "POST /api/trucks HTTP/1.1");
        assert_eq!(captured[1].request_line, "PUT /api/trucks/t-7 HTTP/1.1");
        let body: serde_json::Value = serde_json::from_str(&captured[0].body).expect("json body");
        assert_eq!(body["capacity"], "12 tons");
    }

    #[test]
    fn submits_field_log_batch_and_reports_stored_count() {
        let (base_url, responder) =
            spawn_http_responder(vec![(201, r#"{"success":true,"count":2}"#.to_string())]);
        let store = test_state_service("gateway-field-batch");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, _) = gateway(&base_url, &store);
        let ticked = |id: &str, count| FieldLogCount {
            truck_id: id.to_string(),
            plate_number: format!("PLT {id}"),
            brand: "Isuzu".to_string(),
            count,
        };

        let count = gateway
            .create_field_logs(FieldLogBatch {
                logs: vec![ticked("t-1", 1), ticked("t-2", 5), ticked("t-3", 0)],
                log_type: Direction::In,
                log_date: Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(),
                log_time: "08:00:00 AM".to_string(),
            })
            .expect("submit");

        assert_eq!(count, 2);
        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[0].request_line, "POST /api/truck-logs HTTP/1.1");
        let body: serde_json::Value = serde_json::from_str(&captured[0].body).expect("json body");
        assert_eq!(body["logType"], "IN");
        assert_eq!(body["logs"][1]["count"], 1);
        assert_eq!(body["logTime"], "08:00:00 AM");
    }

    #[test]
    fn empty_field_log_batch_is_never_sent() {
        let store = test_state_service("gateway-field-batch-empty");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, _) = gateway("http://127.0.0.1:9", &store);

        let result = gateway.create_field_logs(FieldLogBatch {
            logs: Vec::new(),
            log_type: Direction::In,
            log_date: Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(),
            log_time: "08:00:00 AM".to_string(),
        });

        assert!(matches!(
            result,
            Err(GatewayError::Validation(ValidationError::NoEntries))
        ));
    }

    #[test]
    fn admin_log_edit_sends_date_and_status_but_not_direction() {
        let created = admin_log_json("adm-1", "out", 1, "2026-03-02T01:00:00.000Z");
        let mut edited = created.clone();
        edited["logDate"] = serde_json::json!("2026-03-02T03:30:00.000Z");
        edited["truckStatus"] = serde_json::json!("empty");
        let (base_url, responder) = spawn_http_responder(vec![
            (201, serde_json::json!({ "data": created }).to_string()),
            (200, serde_json::json!({ "data": edited }).to_string()),
        ]);
        let store = test_state_service("gateway-admin-log");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, _) = gateway(&base_url, &store);

        let entry = gateway
            .create_admin_log(&AdminLogDraft {
                quarry_id: "q-1".to_string(),
                log_type: Direction::Out.into(),
                truck_count: 1,
                truck_status: None,
                notes: None,
                log_date: Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap(),
            })
            .expect("create");
        assert_eq!(entry.direction, Direction::Out);

        let moved_to = Utc.with_ymd_and_hms(2026, 3, 2, 3, 30, 0).unwrap();
        let edit = AdminLogEdit::for_entry(&entry, moved_to, LoadState::Empty);
        let updated = gateway.update_admin_log(&entry.id, &edit).expect("update");
        assert_eq!(updated.occurred_at, moved_to);
        assert_eq!(updated.direction, Direction::Out);
        assert_eq!(updated.load_state, Some(LoadState::Empty));

        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[0].request_line, "POST /api/admin-truck-logs HTTP/1.1");
        let body: serde_json::Value = serde_json::from_str(&captured[0].body).expect("json body");
        assert_eq!(body["logType"], "out");
        assert_eq!(captured[1].request_line, "PUT /api/admin-truck-logs/adm-1 HTTP/1.1");
        let body: serde_json::Value = serde_json::from_str(&captured[1].body).expect("json body");
        assert!(body.get("logType").is_none());
        assert_eq!(body["truckStatus"], "empty");
        assert_eq!(body["truckCount"], 1);
        assert_eq!(body["notes"], "gate 2");
        assert!(decode_admin_log(&edited).is_ok());
    }

    #[test]
    fn profile_update_refreshes_stored_session_user() {
        let response = serde_json::json!({
            "success": true,
            "user": { "_id": "u-admin", "username": "admin", "name": "Admin Renamed", "role": "admin" }
        });
        let (base_url, responder) = spawn_http_responder(vec![(200, response.to_string())]);
        let store = test_state_service("gateway-profile");
        store.save_session(&test_session("tok")).expect("save");
        let (gateway, _) = gateway(&base_url, &store);

        let user = gateway
            .update_profile(&ProfileEdit {
                name: Some("Admin Renamed".to_string()),
                ..ProfileEdit::default()
            })
            .expect("update");

        assert_eq!(user.name, "Admin Renamed");
        let session = store.load_session().expect("load").expect("session kept");
        assert_eq!(session.token, "tok");
        assert_eq!(session.user.name, "Admin Renamed");
        let captured = responder.join().expect("responder should finish");
        assert_eq!(captured[0].request_line, "PUT /api/auth/profile HTTP/1.1");
    }
}
