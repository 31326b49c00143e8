use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionInput {
    Connect,
    Established,
    Failed(String),
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Per-connection lifecycle. `Teardown` is terminal for the mount lifetime.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    torn_down: bool,
    last_error: Option<String>,
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            torn_down: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Non-fatal channel-level error flag; cleared by the next successful connect.
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn observe(&mut self, input: ConnectionInput) -> Option<ConnectionTransition> {
        if self.torn_down {
            return None;
        }

        use ConnectionState::{Connected, Connecting, Disconnected, Error};

        let next = match (self.state, &input) {
            (_, ConnectionInput::Teardown) => {
                self.torn_down = true;
                Disconnected
            }
            (Disconnected | Error, ConnectionInput::Connect) => Connecting,
            (Connecting, ConnectionInput::Established) => Connected,
            (Connecting | Connected, ConnectionInput::Failed(reason)) => {
                self.last_error = Some(reason.clone());
                Error
            }
            (state, input) => {
                tracing::debug!(?state, ?input, "ignoring invalid connection transition");
                return None;
            }
        };

        if next == Connected {
            self.last_error = None;
        }

        let from = self.state;
        self.state = next;
        Some(ConnectionTransition { from, to: next })
    }
}
