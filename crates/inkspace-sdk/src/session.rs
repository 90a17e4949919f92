//! Session management for one replica of one shared document.
//!
//! A [`Session`] sits between the editor surface and the connection. It
//! turns content changes into operations, feeds inbound messages to the
//! [`Client`] synchronizer and keeps other replicas' selections aligned
//! with the local text.

use crate::client::Client;
use crate::config::SessionConfig;
use crate::error::{Result, SdkError};
use crate::message::{ClientMessage, ServerMessage};
use crate::network::Transport;
use crate::presence::RemoteSelections;
use futures::{Stream, StreamExt};
use inkspace_ot::{diff, ClientId, Selection};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events emitted by a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The authority accepted the join.
    Joined { client_id: ClientId, room_id: String },
    /// The local text changed because of a join or a remote operation.
    ContentChanged { content: String },
    /// Another replica's selection, in local coordinates.
    RemoteSelection {
        client_id: ClientId,
        selection: Selection,
    },
    /// Another replica left the room.
    PeerLeft { client_id: ClientId },
    /// The authority reported an error.
    ServerError(String),
    /// The replica diverged and the session must be discarded.
    ProtocolViolation(String),
}

/// A collaborative editing session.
pub struct Session<T: Transport> {
    config: SessionConfig,
    transport: Arc<T>,
    client: Option<Client<T>>,
    room_id: Option<String>,
    remote: RemoteSelections,
    event_tx: broadcast::Sender<SessionEvent>,
    /// Set by the first protocol violation; every later call fails with it.
    poisoned: Option<SdkError>,
}

impl<T: Transport> Session<T> {
    /// Create a session. Nothing is sent until [`Session::join`].
    pub fn new(transport: Arc<T>, config: SessionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            transport,
            client: None,
            room_id: None,
            remote: RemoteSelections::new(),
            event_tx,
            poisoned: None,
        }
    }

    /// Ask the authority to join the configured room.
    pub fn join(&self) -> Result<()> {
        self.check_poisoned()?;
        self.transport.send(ClientMessage::Join {
            room_id: self.config.room_id.clone(),
        })
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_joined(&self) -> bool {
        self.client.is_some()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// The synchronizer, once joined.
    pub fn client(&self) -> Option<&Client<T>> {
        self.client.as_ref()
    }

    /// Current local text, once joined.
    pub fn content(&self) -> Option<&str> {
        self.client.as_ref().map(Client::text)
    }

    pub fn remote_selections(&self) -> &RemoteSelections {
        &self.remote
    }

    /// Whether a protocol violation has retired this session.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// The editor's content changed to `content`.
    pub fn on_content_change(&mut self, content: &str) -> Result<()> {
        self.check_poisoned()?;
        let client = self.client.as_mut().ok_or(SdkError::NotJoined)?;
        let operation = diff(client.text(), content).with_client_id(client.client_id());
        if operation.is_noop() {
            return Ok(());
        }

        client.apply_local_operation(operation.clone())?;
        self.remote.transform_all(&operation);
        Ok(())
    }

    /// The editor's selection changed.
    pub fn on_selection_change(&self, selection: Selection) -> Result<()> {
        self.check_poisoned()?;
        self.client
            .as_ref()
            .ok_or(SdkError::NotJoined)?
            .send_selection(selection)
    }

    /// Process one inbound message.
    ///
    /// Protocol violations are reported as [`SessionEvent::ProtocolViolation`]
    /// and returned. After one, every call on the session returns that same
    /// error; a fresh session has to join instead.
    pub fn handle_message(&mut self, message: ServerMessage) -> Result<()> {
        self.check_poisoned()?;
        let result = self.dispatch(message);
        if let Err(err) = &result {
            if err.is_protocol_violation() {
                warn!(room_id = ?self.room_id, error = %err, "protocol violation, session abandoned");
                self.emit(SessionEvent::ProtocolViolation(err.to_string()));
                self.poisoned = Some(err.clone());
            }
        }
        result
    }

    /// Drive the session from an inbound stream until it ends or a
    /// message fails.
    pub async fn run<S>(&mut self, mut inbound: S) -> Result<()>
    where
        S: Stream<Item = ServerMessage> + Unpin,
    {
        while let Some(message) = inbound.next().await {
            self.handle_message(message)?;
        }
        debug!(room_id = ?self.room_id, "inbound stream closed");
        Ok(())
    }

    fn dispatch(&mut self, message: ServerMessage) -> Result<()> {
        match message {
            ServerMessage::JoinedRoom {
                client_id,
                room_id,
                state,
                revision,
            } => {
                info!(client_id, room_id = %room_id, revision, "joined room");
                self.client = Some(Client::new(
                    client_id,
                    state.clone(),
                    revision,
                    self.transport.clone(),
                ));
                self.room_id = Some(room_id.clone());
                self.remote.clear();
                self.emit(SessionEvent::Joined { client_id, room_id });
                self.emit(SessionEvent::ContentChanged { content: state });
            }
            ServerMessage::AckOperation { revision } => {
                let Some(client) = self.client.as_mut() else {
                    debug!("ack before join ignored");
                    return Ok(());
                };
                client.handle_ack(revision)?;
            }
            ServerMessage::RemoteOperation {
                operation,
                revision,
            } => {
                let Some(client) = self.client.as_mut() else {
                    debug!("remote operation before join ignored");
                    return Ok(());
                };
                let applied = client.apply_remote_operation(operation.decode()?, revision)?;
                let content = client.text().to_string();
                self.remote.transform_all(&applied);
                self.emit(SessionEvent::ContentChanged { content });
            }
            ServerMessage::RemoteSelection {
                client_id,
                selection,
                ..
            } => {
                if !self.config.track_remote_selections {
                    return Ok(());
                }
                let Some(client) = self.client.as_ref() else {
                    return Ok(());
                };
                let selection = client.transform_remote_selection(selection);
                self.remote.set(client_id, selection);
                self.emit(SessionEvent::RemoteSelection {
                    client_id,
                    selection,
                });
            }
            ServerMessage::ClientDisconnected { client_id } => {
                info!(client_id, "peer left");
                self.remote.remove(client_id);
                self.emit(SessionEvent::PeerLeft { client_id });
            }
            ServerMessage::Error(reason) => {
                warn!(reason = %reason, "server error");
                self.emit(SessionEvent::ServerError(reason));
            }
        }
        Ok(())
    }

    fn check_poisoned(&self) -> Result<()> {
        match &self.poisoned {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
