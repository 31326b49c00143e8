//! Backend JSON shapes shared by the REST gateway and push-channel payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::domain::models::{ActorRef, Direction, LoadState, LogEntry, SiteRef, VehicleRef};
use crate::domain::notification::FieldLogAlert;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("payload does not match the expected shape: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown log direction '{0}'")]
    Direction(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldLogWire {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    plate_number: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    company: Option<String>,
    log_type: String,
    log_date: DateTime<Utc>,
    #[serde(default)]
    user: Option<ActorRef>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminLogWire {
    #[serde(rename = "_id")]
    id: String,
    /// Null once the quarry has been deleted.
    #[serde(default)]
    quarry_id: Option<SiteRef>,
    log_type: String,
    truck_count: u32,
    #[serde(default)]
    truck_status: Option<LoadState>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    logged_by: Option<ActorRef>,
    log_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn direction(raw: &str) -> Result<Direction, WireError> {
    Direction::parse(raw).ok_or_else(|| WireError::Direction(raw.to_string()))
}

pub fn decode_field_log(value: &Value) -> Result<LogEntry, WireError> {
    let wire = FieldLogWire::deserialize(value)?;
    Ok(LogEntry {
        direction: direction(&wire.log_type)?,
        id: wire.id,
        vehicle: Some(VehicleRef {
            plate_number: wire.plate_number.unwrap_or_default(),
            brand: wire.brand.unwrap_or_default(),
        }),
        site: SiteRef {
            id: None,
            name: wire.company.unwrap_or_default(),
            location: None,
            proponent: None,
        },
        actor: wire.user,
        occurred_at: wire.log_date,
        created_at: wire.created_at,
        load_state: None,
        note: None,
        truck_count: 1,
    })
}

pub fn decode_admin_log(value: &Value) -> Result<LogEntry, WireError> {
    let wire = AdminLogWire::deserialize(value)?;
    Ok(LogEntry {
        direction: direction(&wire.log_type)?,
        id: wire.id,
        vehicle: None,
        site: wire.quarry_id.unwrap_or_else(SiteRef::unknown),
        actor: wire.logged_by,
        occurred_at: wire.log_date,
        created_at: wire.created_at,
        load_state: wire.truck_status,
        note: wire.notes,
        truck_count: wire.truck_count,
    })
}

pub fn decode_record<T: DeserializeOwned>(value: &Value) -> Result<T, WireError> {
    T::deserialize(value).map_err(WireError::from)
}

/// Items that fail to decode are skipped so one bad record cannot hide the rest.
pub fn decode_list<T>(
    value: &Value,
    decode: impl Fn(&Value) -> Result<T, WireError>,
) -> Result<Vec<T>, WireError> {
    match value {
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match decode(item) {
                Ok(decoded) => Some(decoded),
                Err(error) => {
                    tracing::warn!(
                        index,
                        id = item.get("_id").and_then(serde_json::Value::as_str).unwrap_or(""),
                        error = %error,
                        "skipping undecodable list item"
                    );
                    None
                }
            })
            .collect()),
        other => Err(WireError::Json(serde::de::Error::custom(format!(
            "expected a list, found {}",
            kind(other)
        )))),
    }
}

/// Lists arrive as `{ "data": ... }`; older endpoints answer with the bare value.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Deleted events carry either the bare id or an object holding it.
pub fn deleted_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Best-effort summary of a `truckLog:created` payload.
pub fn field_log_alert(value: &Value) -> FieldLogAlert {
    let direction = value
        .get("logType")
        .and_then(Value::as_str)
        .and_then(Direction::parse);
    let site_name = value
        .get("company")
        .and_then(Value::as_str)
        .or_else(|| {
            value
                .get("quarry")
                .or_else(|| value.get("quarryId"))
                .and_then(|site| site.get("name"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);

    FieldLogAlert {
        direction,
        site_name,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        WireError, decode_admin_log, decode_field_log, decode_list, deleted_id, field_log_alert,
        unwrap_envelope,
    };
    use crate::domain::models::{Direction, LoadState};

    fn field_log_json(id: &str, log_type: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "truck": { "_id": "t-1", "plateNumber": "ABC 1234", "brand": "Isuzu", "model": "Giga" },
            "plateNumber": "ABC 1234",
            "brand": "Isuzu",
            "company": "Highland Quarry",
            "logType": log_type,
            "logDate": "2026-03-02T00:30:00.000Z",
            "logTime": "08:30 AM",
            "user": { "_id": "u-1", "name": "Checker", "username": "checker" },
            "createdAt": "2026-03-02T00:30:05.000Z"
        })
    }

    #[test]
    fn decodes_field_log() {
        let entry = decode_field_log(&field_log_json("log-1", "IN")).expect("should decode");

        assert_eq!(entry.direction, Direction::In);
        assert_eq!(entry.plate_number(), "ABC 1234");
        assert_eq!(entry.site.name, "Highland Quarry");
        assert_eq!(entry.actor_name(), "Checker");
        assert_eq!(entry.truck_count, 1);
    }

    #[test]
    fn decodes_admin_log_with_lowercase_direction() {
        let entry = decode_admin_log(&json!({
            "_id": "adm-1",
            "quarryId": { "_id": "q-1", "name": "Highland Quarry", "location": "Hermosa", "proponent": "Highland Resources" },
            "logType": "out",
            "truckCount": 4,
            "truckStatus": "full",
            "loggedBy": { "_id": "a-1", "name": "Admin", "username": "admin" },
            "logDate": "2026-03-02T02:00:00Z",
            "createdAt": "2026-03-02T02:00:01Z",
            "updatedAt": "2026-03-02T02:00:01Z"
        }))
        .expect("should decode");

        assert_eq!(entry.direction, Direction::Out);
        assert_eq!(entry.truck_count, 4);
        assert_eq!(entry.load_state, Some(LoadState::Full));
        assert_eq!(entry.site.proponent.as_deref(), Some("Highland Resources"));
    }

    #[test]
    fn admin_log_of_deleted_quarry_keeps_an_unknown_site() {
        let mut payload = json!({
            "_id": "adm-2",
            "logType": "in",
            "truckCount": 2,
            "logDate": "2026-03-02T02:00:00Z",
            "createdAt": "2026-03-02T02:00:01Z"
        });
        let absent = decode_admin_log(&payload).expect("missing quarry should decode");
        payload["quarryId"] = json!(null);
        let nulled = decode_admin_log(&payload).expect("null quarry should decode");

        for entry in [absent, nulled] {
            assert_eq!(entry.site.name, "Unknown");
            assert_eq!(entry.site.id, None);
        }
    }

    #[test]
    fn field_log_tolerates_null_vehicle_fields() {
        let mut payload = field_log_json("log-1", "IN");
        payload["plateNumber"] = json!(null);
        payload["company"] = json!(null);

        let entry = decode_field_log(&payload).expect("should decode");
        assert_eq!(entry.plate_number(), "");
        assert_eq!(entry.site.name, "");
    }

    #[test]
    fn list_keeps_valid_rows_around_a_broken_one() {
        let valid = json!({
            "_id": "adm-1",
            "quarryId": { "_id": "q-1", "name": "Highland Quarry" },
            "logType": "out",
            "truckCount": 1,
            "logDate": "2026-03-02T02:00:00Z",
            "createdAt": "2026-03-02T02:00:01Z"
        });
        let orphaned = json!({
            "_id": "adm-2",
            "quarryId": null,
            "logType": "in",
            "truckCount": 3,
            "logDate": "2026-03-02T03:00:00Z",
            "createdAt": "2026-03-02T03:00:01Z"
        });
        let broken = json!({ "_id": "adm-3", "logType": "sideways" });

        let entries = decode_list(&json!([valid, orphaned, broken]), decode_admin_log)
            .expect("list should decode");

        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["adm-1", "adm-2"]);
    }

    #[test]
    fn rejects_unknown_direction() {
        let result = decode_field_log(&field_log_json("log-1", "SIDEWAYS"));
        assert!(matches!(result, Err(WireError::Direction(_))));
    }

    #[test]
    fn metadata_only_payload_does_not_decode() {
        assert!(decode_field_log(&json!({ "_id": "log-1", "logType": "IN" })).is_err());
    }

    #[test]
    fn unwraps_data_envelope_and_lists() {
        let body = json!({ "success": true, "data": [field_log_json("a", "IN"), field_log_json("b", "OUT")] });
        let entries =
            decode_list(&unwrap_envelope(body), decode_field_log).expect("list should decode");
        assert_eq!(entries.len(), 2);

        assert!(decode_list(&json!({ "oops": 1 }), decode_field_log).is_err());
    }

    #[test]
    fn reads_deleted_ids_in_both_shapes() {
        assert_eq!(deleted_id(&json!("t-1")), Some("t-1".to_string()));
        assert_eq!(deleted_id(&json!({ "_id": "t-2" })), Some("t-2".to_string()));
        assert_eq!(deleted_id(&json!({ "id": "t-3" })), Some("t-3".to_string()));
        assert_eq!(deleted_id(&json!(42)), None);
    }

    #[test]
    fn summarizes_field_log_payload_for_alerts() {
        let alert = field_log_alert(&field_log_json("log-1", "OUT"));
        assert_eq!(alert.direction, Some(Direction::Out));
        assert_eq!(alert.site_name.as_deref(), Some("Highland Quarry"));

        let sparse = field_log_alert(&json!({ "quarry": { "name": "Coastal Quarry" } }));
        assert_eq!(sparse.direction, None);
        assert_eq!(sparse.site_name.as_deref(), Some("Coastal Quarry"));
    }
}
