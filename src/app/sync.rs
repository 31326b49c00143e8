use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;

use serde::Serialize;
use serde_json::Value;

use crate::adapters::gateway::GatewayError;
use crate::adapters::push_channel::{ChannelSignal, PushChannelConfig, PushTransport};
use crate::adapters::wire::{WireError, deleted_id};
use crate::domain::connection_state::{ConnectionInput, ConnectionState, ConnectionStateMachine};
use crate::domain::live_collection::{Change, LiveCollection, Reconciliation};
use crate::domain::models::Identified;
use crate::domain::sequence::SequenceGuard;

/// Collection shared between its sync owner and readers such as the status endpoint.
pub type SharedCollection<T> = Arc<RwLock<LiveCollection<T>>>;

pub fn shared_collection<T: Identified>() -> SharedCollection<T> {
    Arc::new(RwLock::new(LiveCollection::new()))
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub state: ConnectionState,
    pub has_error: bool,
    pub last_error: Option<String>,
    pub collections: BTreeMap<String, usize>,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            has_error: false,
            last_error: None,
            collections: BTreeMap::new(),
        }
    }
}

/// Latest status of every mounted owner, keyed by owner name.
#[derive(Debug, Default)]
pub struct StatusBoard {
    channels: RwLock<BTreeMap<String, ChannelStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, ChannelStatus> {
        read_lock(&self.channels).clone()
    }

    pub fn channel(&self, owner: &str) -> Option<ChannelStatus> {
        read_lock(&self.channels).get(owner).cloned()
    }

    fn record_connection(&self, owner: &str, machine: &ConnectionStateMachine) {
        let mut channels = write_lock(&self.channels);
        let status = channels.entry(owner.to_string()).or_default();
        status.state = machine.state();
        status.has_error = machine.has_error();
        status.last_error = machine.last_error().map(str::to_string);
    }

    fn record_collection(&self, owner: &str, collection: &str, len: usize) {
        write_lock(&self.channels)
            .entry(owner.to_string())
            .or_default()
            .collections
            .insert(collection.to_string(), len);
    }
}

/// One consumer of push-channel events on a dispatcher.
pub trait ChannelSubscriber: Send {
    fn handles(&self, event: &str) -> bool;
    /// Called on every (re)connect; implementations refetch their full snapshot.
    fn on_connected(&mut self, board: &StatusBoard, owner: &str);
    fn on_event(&mut self, name: &str, payload: &Value, board: &StatusBoard, owner: &str);
}

pub type Fetch<T> = Box<dyn Fn() -> Result<Vec<T>, GatewayError> + Send>;

/// Applies the record a successful write returned without waiting for its echo.
///
/// Each write bumps the collection's sequence, so a refetch that was already in
/// flight cannot overwrite it with an older snapshot.
pub struct ConfirmedWrites<T> {
    collection: SharedCollection<T>,
    sequence: Arc<SequenceGuard>,
}

impl<T> Clone for ConfirmedWrites<T> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            sequence: Arc::clone(&self.sequence),
        }
    }
}

impl<T: Identified> ConfirmedWrites<T> {
    pub fn created(&self, record: T) -> Reconciliation {
        self.apply(Change::Created(Some(record)))
    }

    pub fn updated(&self, record: T) -> Reconciliation {
        self.apply(Change::Updated(Some(record)))
    }

    pub fn deleted(&self, id: &str) -> Reconciliation {
        self.apply(Change::Deleted(id.to_string()))
    }

    fn apply(&self, change: Change<T>) -> Reconciliation {
        let mut collection = write_lock(&self.collection);
        let ticket = self.sequence.issue();
        self.sequence.accept(ticket);
        collection.apply(change)
    }
}

/// Binds `<prefix>:created|updated|deleted` events to a live collection.
pub struct CollectionSubscriber<T> {
    name: &'static str,
    prefix: &'static str,
    collection: SharedCollection<T>,
    fetch: Fetch<T>,
    decode: fn(&Value) -> Result<T, WireError>,
    refetch_on: Vec<&'static str>,
    sequence: Arc<SequenceGuard>,
}

impl<T: Identified + Send + Sync> CollectionSubscriber<T> {
    pub fn new(
        name: &'static str,
        prefix: &'static str,
        collection: SharedCollection<T>,
        fetch: Fetch<T>,
        decode: fn(&Value) -> Result<T, WireError>,
    ) -> Self {
        Self {
            name,
            prefix,
            collection,
            fetch,
            decode,
            refetch_on: Vec::new(),
            sequence: Arc::new(SequenceGuard::new()),
        }
    }

    /// Another family's event that invalidates this collection.
    pub fn refetch_on(mut self, event: &'static str) -> Self {
        self.refetch_on.push(event);
        self
    }

    pub fn confirmed_writes(&self) -> ConfirmedWrites<T> {
        ConfirmedWrites {
            collection: Arc::clone(&self.collection),
            sequence: Arc::clone(&self.sequence),
        }
    }

    fn refetch(&self, board: &StatusBoard, owner: &str) {
        let ticket = self.sequence.issue();
        match (self.fetch)() {
            Ok(items) => {
                let count = items.len();
                {
                    let mut collection = write_lock(&self.collection);
                    if !self.sequence.accept(ticket) {
                        tracing::debug!(
                            owner,
                            collection = self.name,
                            "dropping refetch older than a confirmed write"
                        );
                        return;
                    }
                    collection.replace_all(items);
                }
                board.record_collection(owner, self.name, count);
                tracing::info!(owner, collection = self.name, count, "collection refetched");
            }
            Err(error) => {
                tracing::warn!(
                    owner,
                    collection = self.name,
                    error = %error,
                    "refetch failed; keeping last snapshot"
                );
            }
        }
    }

    fn listens_for(&self, event: &str) -> bool {
        self.refetch_on.iter().any(|candidate| *candidate == event)
    }

    fn change(&self, action: &str, payload: &Value) -> Option<Change<T>> {
        match action {
            "created" => Some(Change::Created((self.decode)(payload).ok())),
            "updated" => Some(Change::Updated((self.decode)(payload).ok())),
            "deleted" => deleted_id(payload).map(Change::Deleted),
            _ => None,
        }
    }
}

impl<T: Identified + Send + Sync> ChannelSubscriber for CollectionSubscriber<T> {
    fn handles(&self, event: &str) -> bool {
        self.listens_for(event)
            || event
                .split_once(':')
                .is_some_and(|(prefix, _)| prefix == self.prefix)
    }

    fn on_connected(&mut self, board: &StatusBoard, owner: &str) {
        self.refetch(board, owner);
    }

    fn on_event(&mut self, name: &str, payload: &Value, board: &StatusBoard, owner: &str) {
        if self.listens_for(name) {
            self.refetch(board, owner);
            return;
        }

        let action = name.split_once(':').map_or("", |(_, action)| action);
        let Some(change) = self.change(action, payload) else {
            tracing::warn!(owner, event = name, "unrecognised event payload; refetching");
            self.refetch(board, owner);
            return;
        };

        let (outcome, count) = {
            let mut collection = write_lock(&self.collection);
            let outcome = collection.apply(change);
            (outcome, collection.len())
        };
        tracing::info!(owner, event = name, outcome = ?outcome, "event reconciled");

        if outcome == Reconciliation::RefetchRequired {
            self.refetch(board, owner);
        } else {
            board.record_collection(owner, self.name, count);
        }
    }
}

/// Single dispatch loop for one push connection.
pub struct SyncDispatcher {
    owner: String,
    machine: ConnectionStateMachine,
    subscribers: Vec<Box<dyn ChannelSubscriber>>,
    board: Arc<StatusBoard>,
}

impl SyncDispatcher {
    pub fn new(owner: impl Into<String>, board: Arc<StatusBoard>) -> Self {
        let owner = owner.into();
        let machine = ConnectionStateMachine::new();
        board.record_connection(&owner, &machine);
        Self {
            owner,
            machine,
            subscribers: Vec::new(),
            board,
        }
    }

    pub fn subscribe(mut self, subscriber: impl ChannelSubscriber + 'static) -> Self {
        self.subscribers.push(Box::new(subscriber));
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Returns false once the channel is torn down.
    pub fn handle(&mut self, signal: ChannelSignal) -> bool {
        match signal {
            ChannelSignal::Connecting => {
                self.transition(ConnectionInput::Connect);
            }
            ChannelSignal::Connected => {
                if self.transition(ConnectionInput::Established) {
                    for subscriber in &mut self.subscribers {
                        subscriber.on_connected(&self.board, &self.owner);
                    }
                }
            }
            ChannelSignal::Event { name, payload } => {
                if self.machine.state() != ConnectionState::Connected {
                    tracing::debug!(owner = %self.owner, event = %name, "event outside connected state");
                }
                for subscriber in &mut self.subscribers {
                    if subscriber.handles(&name) {
                        subscriber.on_event(&name, &payload, &self.board, &self.owner);
                    }
                }
            }
            ChannelSignal::Error(reason) => {
                self.transition(ConnectionInput::Failed(reason));
            }
            ChannelSignal::Disconnected => {
                self.transition(ConnectionInput::Teardown);
                return false;
            }
        }
        true
    }

    pub fn run(mut self, signals: Receiver<ChannelSignal>) {
        while let Ok(signal) = signals.recv() {
            if !self.handle(signal) {
                break;
            }
        }
        if !self.machine.is_torn_down() {
            self.handle(ChannelSignal::Disconnected);
        }
    }

    fn transition(&mut self, input: ConnectionInput) -> bool {
        let applied = match self.machine.observe(input) {
            Some(transition) => {
                tracing::info!(
                    owner = %self.owner,
                    from = ?transition.from,
                    to = ?transition.to,
                    error = self.machine.last_error().unwrap_or(""),
                    "push channel state changed"
                );
                true
            }
            None => false,
        };
        self.board.record_connection(&self.owner, &self.machine);
        applied
    }
}

/// Mounts dispatchers on their own push connections.
pub struct LiveSyncChannel;

impl LiveSyncChannel {
    pub fn mount(config: PushChannelConfig, dispatcher: SyncDispatcher) -> ChannelHandle {
        let (sender, receiver) = mpsc::channel();
        let owner = dispatcher.owner.clone();
        let dispatch = std::thread::spawn(move || dispatcher.run(receiver));
        let transport = PushTransport::start(config, sender);

        tracing::info!(owner = %owner, "live sync channel mounted");
        ChannelHandle {
            owner,
            transport,
            dispatch,
        }
    }
}

pub struct ChannelHandle {
    owner: String,
    transport: PushTransport,
    dispatch: JoinHandle<()>,
}

impl ChannelHandle {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Closes the connection; the dispatcher ends in `Disconnected`.
    pub fn teardown(self) {
        self.transport.shutdown();
        if self.dispatch.join().is_err() {
            tracing::error!(owner = %self.owner, "sync dispatcher panicked");
        }
        tracing::info!(owner = %self.owner, "live sync channel torn down");
    }
}
