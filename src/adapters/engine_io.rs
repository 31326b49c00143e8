//! Engine.IO v4 / Socket.IO v5 text framing over a WebSocket, default namespace only.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine packet type '{0}'")]
    UnknownPacket(char),
    #[error("unknown socket packet type '{0}'")]
    UnknownSocketPacket(char),
    #[error("malformed payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, payload: Value },
    ConnectError(Value),
    /// Acks and binary packets are not used by the backend.
    Other,
}

pub fn decode(frame: &str) -> Result<EnginePacket, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(EnginePacket::Open)
            .map_err(|error| ProtocolError::Payload(error.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' | '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn decode_socket(frame: &str) -> Result<SocketPacket, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let body = skip_namespace(chars.as_str());

    match kind {
        '0' => Ok(SocketPacket::Connect),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => decode_event(body),
        '4' => {
            let payload = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(body)
                    .map_err(|error| ProtocolError::Payload(error.to_string()))?
            };
            Ok(SocketPacket::ConnectError(payload))
        }
        '3' | '5' | '6' => Ok(SocketPacket::Other),
        other => Err(ProtocolError::UnknownSocketPacket(other)),
    }
}

/// Drops a `/nsp,` prefix and an ack id.
fn skip_namespace(body: &str) -> &str {
    let body = match body.strip_prefix('/') {
        Some(rest) => rest.split_once(',').map_or("", |(_, tail)| tail),
        None => body,
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn decode_event(body: &str) -> Result<SocketPacket, ProtocolError> {
    let value: Value =
        serde_json::from_str(body).map_err(|error| ProtocolError::Payload(error.to_string()))?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::Payload("event is not an array".to_string()));
    };
    if items.is_empty() {
        return Err(ProtocolError::Payload("event has no name".to_string()));
    }

    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return Err(ProtocolError::Payload("event name is not a string".to_string())),
    };
    let payload = if items.is_empty() {
        Value::Null
    } else {
        items.remove(0)
    };

    Ok(SocketPacket::Event { name, payload })
}

pub const PONG: &str = "3";
pub const CONNECT: &str = "40";
pub const DISCONNECT: &str = "41";

pub fn encode_event(name: &str, payload: &Value) -> String {
    format!("42{}", Value::Array(vec![Value::String(name.to_string()), payload.clone()]))
}

/// `http(s)` origins map onto `ws(s)`; the socket path is appended.
pub fn socket_url(origin: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let origin = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        origin.to_string()
    };
    format!("{origin}/socket.io/?EIO=4&transport=websocket")
}
