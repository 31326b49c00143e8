use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tungstenite::client::{IntoClientRequest, uri_mode};
use tungstenite::handshake::HandshakeError;
use tungstenite::stream::{MaybeTlsStream, Mode};
use tungstenite::{Message, WebSocket};

use crate::adapters::engine_io::{
    CONNECT, DISCONNECT, EnginePacket, PONG, SocketPacket, decode, socket_url,
};

const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum PushChannelError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),
    #[error("websocket transport failed: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no websocket handshake within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("server refused the namespace connection: {0}")]
    Rejected(String),
    #[error("server closed the connection")]
    Closed,
    #[error("no heartbeat from server within {0:?}")]
    HeartbeatTimeout(Duration),
}

/// What the transport thread reports to the dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    Connecting,
    Connected,
    Event { name: String, payload: Value },
    Error(String),
    /// Final signal; nothing follows it.
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct PushChannelConfig {
    pub origin: String,
    /// Bounds the TCP connect and the websocket handshake.
    pub connect_timeout: Duration,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
}

/// Handle to one transport thread.
pub struct PushTransport {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PushTransport {
    pub fn start(config: PushChannelConfig, signals: Sender<ChannelSignal>) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_flag);
        let handle = std::thread::spawn(move || run_transport(&config, &signals, &thread_stop));

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    /// Closes the connection and waits for the thread to emit `Disconnected`.
    pub fn shutdown(mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("push transport thread panicked");
        }
    }
}

impl Drop for PushTransport {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt)).min(max)
}

fn run_transport(config: &PushChannelConfig, signals: &Sender<ChannelSignal>, stop: &AtomicBool) {
    let url = socket_url(&config.origin);
    let mut attempt = 0_u32;

    while !stop.load(Ordering::SeqCst) {
        if signals.send(ChannelSignal::Connecting).is_err() {
            break;
        }

        let mut connected = false;
        let result = run_session(&url, config.connect_timeout, signals, stop, &mut connected);
        if connected {
            attempt = 0;
        }
        if stop.load(Ordering::SeqCst) {
            break;
        }

        let reason = match result {
            Ok(()) => break,
            Err(error) => error.to_string(),
        };
        tracing::warn!(url = %url, error = %reason, attempt, "push channel connection lost");
        if signals.send(ChannelSignal::Error(reason)).is_err() {
            break;
        }

        sleep_unless_stopped(
            backoff_delay(config.reconnect_base, config.reconnect_max, attempt),
            stop,
        );
        attempt = attempt.saturating_add(1);
    }

    // the receiver may already be gone during shutdown
    let _ = signals.send(ChannelSignal::Disconnected);
}

/// Returns `Ok` only when the session ended because of a stop request
/// or because the dispatch loop went away.
fn run_session(
    url: &str,
    connect_timeout: Duration,
    signals: &Sender<ChannelSignal>,
    stop: &AtomicBool,
    connected: &mut bool,
) -> Result<(), PushChannelError> {
    let mut socket = open_socket(url, connect_timeout)?;
    set_read_timeout(&mut socket, READ_POLL_INTERVAL)?;

    let mut heartbeat_window = Duration::from_secs(45);
    let mut last_heard = Instant::now();

    loop {
        if stop.load(Ordering::SeqCst) {
            close(&mut socket);
            return Ok(());
        }
        if last_heard.elapsed() > heartbeat_window {
            return Err(PushChannelError::HeartbeatTimeout(heartbeat_window));
        }

        let frame = match socket.read() {
            Ok(Message::Text(frame)) => frame,
            Ok(Message::Close(_)) => return Err(PushChannelError::Closed),
            Ok(_) => continue,
            Err(tungstenite::Error::Io(error))
                if matches!(
                    error.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(error) => return Err(PushChannelError::Transport(error)),
        };
        last_heard = Instant::now();

        let packet = match decode(&frame) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(error = %error, frame = %frame, "ignoring malformed push frame");
                continue;
            }
        };

        let signal = match packet {
            EnginePacket::Open(info) => {
                heartbeat_window = Duration::from_millis(info.ping_interval + info.ping_timeout);
                socket.send(Message::Text(CONNECT.to_string()))?;
                None
            }
            EnginePacket::Ping => {
                socket.send(Message::Text(PONG.to_string()))?;
                None
            }
            EnginePacket::Message(SocketPacket::Connect) => {
                *connected = true;
                Some(ChannelSignal::Connected)
            }
            EnginePacket::Message(SocketPacket::Event { name, payload }) => {
                Some(ChannelSignal::Event { name, payload })
            }
            EnginePacket::Message(SocketPacket::ConnectError(payload)) => {
                return Err(PushChannelError::Rejected(payload.to_string()));
            }
            EnginePacket::Message(SocketPacket::Disconnect) | EnginePacket::Close => {
                return Err(PushChannelError::Closed);
            }
            EnginePacket::Pong | EnginePacket::Noop | EnginePacket::Message(SocketPacket::Other) => {
                None
            }
        };

        if let Some(signal) = signal
            && signals.send(signal).is_err()
        {
            close(&mut socket);
            return Ok(());
        }
    }
}

fn open_socket(
    url: &str,
    timeout: Duration,
) -> Result<WebSocket<MaybeTlsStream<TcpStream>>, PushChannelError> {
    let request = url
        .into_client_request()
        .map_err(PushChannelError::Handshake)?;
    let mode = uri_mode(request.uri()).map_err(PushChannelError::Handshake)?;
    let host = request
        .uri()
        .host()
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = request.uri().port_u16().unwrap_or(match mode {
        Mode::Plain => 80,
        Mode::Tls => 443,
    });

    let stream = connect_tcp(&host, port, timeout)?;
    // a silent peer must not stall the handshake
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let (socket, _response) = tungstenite::client_tls(request, stream).map_err(|error| match error {
        HandshakeError::Failure(error) => PushChannelError::Handshake(error),
        HandshakeError::Interrupted(_) => PushChannelError::HandshakeTimeout(timeout),
    })?;
    Ok(socket)
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, PushChannelError> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                tracing::debug!(addr = %addr, error = %error, "push channel connect attempt failed");
                last_error = Some(error);
            }
        }
    }
    Err(PushChannelError::Io(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no address found for {host}:{port}"),
        )
    })))
}

fn set_read_timeout(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> Result<(), PushChannelError> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout))?,
        MaybeTlsStream::Rustls(stream) => stream.sock.set_read_timeout(Some(timeout))?,
        _ => tracing::debug!("read timeout not supported for this stream type"),
    }
    Ok(())
}

fn close(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    if let Err(error) = socket.send(Message::Text(DISCONNECT.to_string())) {
        tracing::debug!(error = %error, "failed to send namespace disconnect");
    }
    if let Err(error) = socket.close(None) {
        tracing::debug!(error = %error, "failed to close websocket");
    }
    // drain until the close handshake completes or the read times out
    for _ in 0..5 {
        match socket.read() {
            Ok(_) => continue,
            Err(_) => break,
        }
    }
}

fn sleep_unless_stopped(delay: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(STOP_POLL_INTERVAL.min(deadline - now));
    }
}
