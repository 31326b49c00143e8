use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::adapters::state_store::{open_connection, run_migrations};
use crate::app::services::SqliteStateService;

static TEST_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn open_test_connection(test_name: &str) -> Connection {
    let template = ensure_template_db();
    let test_db_path = unique_test_db_path(test_name);

    if let Some(parent) = test_db_path.parent() {
        std::fs::create_dir_all(parent).expect("test db dir should be creatable");
    }

    std::fs::copy(&template, &test_db_path).expect("template db should be copied");
    open_connection(test_db_path.to_string_lossy().as_ref()).expect("test db should open")
}

pub fn test_state_service(test_name: &str) -> SqliteStateService {
    SqliteStateService::new(Arc::new(Mutex::new(open_test_connection(test_name))))
}

/// Path inside a temp dir that outlives the test.
pub fn temp_db_path(name: &str) -> PathBuf {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join(name);
    std::mem::forget(dir);
    path
}

fn ensure_template_db() -> PathBuf {
    static TEMPLATE_PATH: OnceLock<PathBuf> = OnceLock::new();

    TEMPLATE_PATH
        .get_or_init(|| {
            let template_path = std::env::var("TEST_DB_TEMPLATE_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| temp_db_path("quarry_console_template.db"));

            if let Some(parent) = template_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).expect("template parent dir should be creatable");
            }

            let mut connection = open_connection(template_path.to_string_lossy().as_ref())
                .expect("template db opens");
            run_migrations(&mut connection).expect("template migrations should succeed");

            template_path
        })
        .clone()
}

fn unique_test_db_path(test_name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    Path::new("./target/testdb")
        .join(format!("{test_name}-{now}-{counter}.sqlite"))
        .to_path_buf()
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Serves the canned `(status, body)` responses, one connection each, in order.
pub fn spawn_http_responder(
    responses: Vec<(u16, String)>,
) -> (String, std::thread::JoinHandle<Vec<CapturedRequest>>) {
    use std::io::Write;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("responder should bind");
    let addr = listener.local_addr().expect("addr should be available");

    let handle = std::thread::spawn(move || {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                break;
            };
            captured.push(read_request(&stream));
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason_phrase(status),
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("response should be written");
        }
        captured
    });

    (format!("http://{addr}"), handle)
}

fn read_request(stream: &std::net::TcpStream) -> CapturedRequest {
    use std::io::{BufRead, BufReader, Read};

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .expect("request line should be readable");

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("header should be readable");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body).expect("body should be readable");

    CapturedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

pub fn field_log_json(id: &str, log_type: &str, log_date: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": id,
        "plateNumber": format!("PLT {id}"),
        "brand": "Isuzu",
        "company": "Highland Quarry",
        "logType": log_type,
        "logDate": log_date,
        "logTime": "08:30 AM",
        "user": { "_id": "u-1", "name": "Checker", "username": "checker" },
        "createdAt": log_date
    })
}

pub fn admin_log_json(id: &str, log_type: &str, truck_count: u32, log_date: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": id,
        "quarryId": { "_id": "q-1", "name": "Highland Quarry", "location": "Hermosa" },
        "logType": log_type,
        "truckCount": truck_count,
        "truckStatus": "full",
        "notes": "gate 2",
        "loggedBy": { "_id": "u-admin", "name": "Admin", "username": "admin" },
        "logDate": log_date,
        "createdAt": log_date
    })
}

pub fn vehicle_json(id: &str, plate: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": id,
        "plateNumber": plate,
        "brand": "Hino",
        "model": "500",
        "capacity": "12 tons",
        "company": "ABC Mining Corp",
        "status": "Active",
        "currentStatus": "AVAILABLE",
        "lastLogTime": null
    })
}

pub fn test_session(token: &str) -> crate::domain::models::Session {
    crate::domain::models::Session {
        token: token.to_string(),
        user: crate::domain::models::SessionUser {
            id: "u-admin".to_string(),
            username: Some("admin".to_string()),
            name: "Admin".to_string(),
            email: None,
            role: crate::domain::models::Role::Admin,
        },
    }
}
