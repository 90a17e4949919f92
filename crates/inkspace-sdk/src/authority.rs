//! In-memory ordering authority.
//!
//! The authority owns the canonical text of each room and serializes the
//! operations replicas submit. An operation made against an older revision
//! is transformed against every operation accepted since, then applied,
//! recorded, acknowledged to its sender and broadcast to everyone else.
//!
//! This is the reference counterpart of [`crate::client::Client`]; it backs
//! the stress-test binary and the end-to-end tests. It keeps history in
//! memory only.

use crate::error::{Result, SdkError};
use crate::message::{ClientMessage, ServerMessage};
use inkspace_ot::{transform, ClientId, Operation, OperationData, Selection};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Outbound channel to one connected replica.
pub type ServerSink = mpsc::UnboundedSender<ServerMessage>;

/// A shared document and the replicas editing it.
pub struct Room {
    id: String,
    state: String,
    revision: u64,
    history: Vec<Operation>,
    clients: HashMap<ClientId, ServerSink>,
}

impl Room {
    /// Create an empty room.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_state(id, String::new())
    }

    /// Create a room seeded with `state` at revision 0.
    pub fn with_state(id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: state.into(),
            revision: 0,
            history: Vec::new(),
            clients: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The canonical text.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Every accepted operation, in acceptance order.
    pub fn history(&self) -> &[Operation] {
        &self.history
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn add_client(&mut self, client_id: ClientId, sink: ServerSink) {
        self.clients.insert(client_id, sink);
        self.send_to(
            client_id,
            ServerMessage::JoinedRoom {
                client_id,
                room_id: self.id.clone(),
                state: self.state.clone(),
                revision: self.revision,
            },
        );
    }

    /// Returns `true` when the room is left empty.
    fn remove_client(&mut self, client_id: ClientId) -> bool {
        self.clients.remove(&client_id);
        if self.clients.is_empty() {
            return true;
        }
        self.broadcast(ServerMessage::ClientDisconnected { client_id }, client_id);
        false
    }

    /// Accept an operation made against `revision`.
    ///
    /// Returns the revision the sender is acknowledged with.
    pub fn submit_operation(
        &mut self,
        from: ClientId,
        operation: Operation,
        revision: u64,
    ) -> Result<u64> {
        let start = self.history_index(revision)?;

        let mut operation = operation;
        for accepted in &self.history[start..] {
            let (_, rebased) = transform(accepted, &operation)?;
            operation = rebased;
        }

        if operation.is_noop() {
            debug!(room_id = %self.id, from, "no-op operation acknowledged without recording");
            self.send_to(from, ServerMessage::AckOperation { revision: self.revision });
            return Ok(self.revision);
        }

        self.state = operation.apply(&self.state)?;
        self.revision += 1;
        let data = OperationData::from(&operation);
        self.history.push(operation);

        debug!(room_id = %self.id, from, revision = self.revision, "operation accepted");
        self.send_to(from, ServerMessage::AckOperation { revision: self.revision });
        self.broadcast(
            ServerMessage::RemoteOperation {
                operation: data,
                revision: self.revision,
            },
            from,
        );
        Ok(self.revision)
    }

    /// Relay a selection made against `revision` to the other replicas.
    pub fn submit_selection(
        &self,
        from: ClientId,
        selection: Selection,
        revision: u64,
    ) -> Result<()> {
        let start = self.history_index(revision)?;
        let selection = self.history[start..]
            .iter()
            .fold(selection, |sel, operation| sel.transform(operation));

        self.broadcast(
            ServerMessage::RemoteSelection {
                client_id: from,
                selection,
                revision: self.revision,
            },
            from,
        );
        Ok(())
    }

    fn history_index(&self, revision: u64) -> Result<usize> {
        usize::try_from(revision)
            .ok()
            .filter(|index| *index <= self.history.len())
            .ok_or(SdkError::RevisionAhead {
                revision,
                history: self.history.len() as u64,
            })
    }

    fn send_to(&self, client_id: ClientId, message: ServerMessage) {
        if let Some(sink) = self.clients.get(&client_id) {
            if sink.send(message).is_err() {
                warn!(room_id = %self.id, client_id, "send to closed connection");
            }
        }
    }

    fn broadcast(&self, message: ServerMessage, exclude: ClientId) {
        for (client_id, sink) in &self.clients {
            if *client_id == exclude {
                continue;
            }
            if sink.send(message.clone()).is_err() {
                warn!(room_id = %self.id, client_id, "broadcast to closed connection");
            }
        }
    }
}

struct Connection {
    sink: ServerSink,
    room_id: Option<String>,
}

/// All rooms and connections of one authority.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<RwLock<Room>>>>,
    connections: RwLock<HashMap<ClientId, Connection>>,
    next_client_id: AtomicU64,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Register a connection and assign it a unique client id.
    pub fn connect(&self, sink: ServerSink) -> ClientId {
        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.connections.write().insert(
            client_id,
            Connection {
                sink,
                room_id: None,
            },
        );
        debug!(client_id, "connection registered");
        client_id
    }

    /// Drop a connection, leaving its room.
    pub fn disconnect(&self, client_id: ClientId) {
        self.leave(client_id);
        self.connections.write().remove(&client_id);
    }

    /// Create a room with initial content, or return the existing one.
    pub fn open_room(&self, room_id: &str, state: &str) -> Arc<RwLock<Room>> {
        self.rooms
            .write()
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Room::with_state(room_id, state))))
            .clone()
    }

    pub fn room(&self, room_id: &str) -> Option<Arc<RwLock<Room>>> {
        self.rooms.read().get(room_id).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Process one message from a connected replica.
    pub fn handle(&self, from: ClientId, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::Join { room_id } => self.join(from, room_id).map(|_| ()),
            ClientMessage::Operation {
                operation,
                revision,
            } => {
                let room = self.room_of(from)?;
                let result = operation
                    .decode()
                    .map_err(SdkError::from)
                    .and_then(|operation| room.write().submit_operation(from, operation, revision));
                if let Err(err) = &result {
                    warn!(from, error = %err, "rejected operation");
                    self.notify(from, ServerMessage::Error(format!("operation rejected: {}", err)));
                }
                result.map(|_| ())
            }
            ClientMessage::Selection {
                selection,
                revision,
                ..
            } => {
                let room = self.room_of(from)?;
                let result = {
                    let room = room.read();
                    room.submit_selection(from, selection, revision)
                };
                if let Err(err) = &result {
                    warn!(from, error = %err, "rejected selection");
                    self.notify(from, ServerMessage::Error(format!("selection rejected: {}", err)));
                }
                result
            }
        }
    }

    /// Put a connection into a room, creating the room if needed.
    ///
    /// An empty or missing id creates a fresh room.
    pub fn join(&self, client_id: ClientId, room_id: Option<String>) -> Result<String> {
        let room_id = room_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Ulid::new().to_string());

        let (sink, current) = self
            .connections
            .read()
            .get(&client_id)
            .map(|connection| (connection.sink.clone(), connection.room_id.clone()))
            .ok_or(SdkError::ClientNotFound(client_id))?;

        if current.as_deref() != Some(room_id.as_str()) {
            self.leave(client_id);
        }
        let room = self.open_room(&room_id, "");
        room.write().add_client(client_id, sink);

        if let Some(connection) = self.connections.write().get_mut(&client_id) {
            connection.room_id = Some(room_id.clone());
        }
        info!(client_id, room_id = %room_id, "client joined room");
        Ok(room_id)
    }

    fn leave(&self, client_id: ClientId) {
        let room_id = self
            .connections
            .write()
            .get_mut(&client_id)
            .and_then(|connection| connection.room_id.take());
        let Some(room_id) = room_id else {
            return;
        };
        let Some(room) = self.room(&room_id) else {
            return;
        };

        let empty = room.write().remove_client(client_id);
        if empty {
            self.rooms.write().remove(&room_id);
            info!(room_id = %room_id, "room closed (empty)");
        }
    }

    fn room_of(&self, client_id: ClientId) -> Result<Arc<RwLock<Room>>> {
        let room_id = self
            .connections
            .read()
            .get(&client_id)
            .ok_or(SdkError::ClientNotFound(client_id))?
            .room_id
            .clone();

        match room_id.and_then(|id| self.room(&id)) {
            Some(room) => Ok(room),
            None => {
                self.notify(client_id, ServerMessage::Error("not in a room".into()));
                Err(SdkError::NotJoined)
            }
        }
    }

    fn notify(&self, client_id: ClientId, message: ServerMessage) {
        if let Some(connection) = self.connections.read().get(&client_id) {
            let _ = connection.sink.send(message);
        }
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
