//! Client synchronizer - per-replica OT state machine.
//!
//! A replica keeps at most one operation in flight. Local edits made while
//! waiting for the acknowledgment are queued and sent one at a time, in
//! order, as acknowledgments arrive. Remote operations are transformed
//! against the in-flight operation and then against every queued one
//! before they touch the local text.
//!
//! ```text
//!            apply_local_operation
//!   Idle  ---------------------------->  AwaitingAck
//!    ^                                     |    ^
//!    |  handle_ack (queue empty)           |    | apply_local_operation
//!    +-------------------------------------+    | (queued, not sent)
//!                                          +----+
//! ```

use crate::error::{Result, SdkError};
use crate::message::ClientMessage;
use crate::network::Transport;
use inkspace_ot::{transform, ClientId, Operation, OperationData, Selection};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where the synchronizer is in its send/ack cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing in flight.
    Idle,
    /// One operation sent and not yet acknowledged.
    AwaitingAck,
}

/// Synchronization state for one replica of one document.
pub struct Client<T: Transport> {
    client_id: ClientId,
    text: String,
    revision: u64,
    sent: Option<Operation>,
    pending: VecDeque<Operation>,
    transport: Arc<T>,
}

impl<T: Transport> Client<T> {
    /// Create a synchronizer for a freshly joined document.
    pub fn new(
        client_id: ClientId,
        text: impl Into<String>,
        revision: u64,
        transport: Arc<T>,
    ) -> Self {
        Self {
            client_id,
            text: text.into(),
            revision,
            sent: None,
            pending: VecDeque::new(),
            transport,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// The local text, including unacknowledged local edits.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last revision reported by the authority.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn state(&self) -> SyncState {
        if self.sent.is_some() {
            SyncState::AwaitingAck
        } else {
            SyncState::Idle
        }
    }

    /// The operation waiting for an acknowledgment.
    pub fn sent_operation(&self) -> Option<&Operation> {
        self.sent.as_ref()
    }

    /// Local operations queued behind the in-flight one, oldest first.
    pub fn pending_operations(&self) -> impl ExactSizeIterator<Item = &Operation> {
        self.pending.iter()
    }

    /// Apply a local edit and send or queue it.
    ///
    /// The edit is applied immediately and never rolled back.
    pub fn apply_local_operation(&mut self, operation: Operation) -> Result<()> {
        let operation = operation.with_client_id(self.client_id);
        let text = operation.apply(&self.text)?;

        if self.sent.is_none() {
            self.send_operation(&operation)?;
            self.sent = Some(operation);
        } else {
            debug!(
                client_id = self.client_id,
                queued = self.pending.len() + 1,
                "queued local operation"
            );
            self.pending.push_back(operation);
        }
        self.text = text;
        Ok(())
    }

    /// Integrate an operation the authority accepted from another replica.
    ///
    /// Returns the operation as it was applied to the local text, which is
    /// what remembered positions must be mapped through. On error nothing
    /// is changed.
    pub fn apply_remote_operation(
        &mut self,
        remote: Operation,
        revision: u64,
    ) -> Result<Operation> {
        let mut remote = remote;

        let sent = match &self.sent {
            Some(sent) => {
                let (sent, rebased) = transform(sent, &remote)?;
                remote = rebased;
                Some(sent)
            }
            None => None,
        };

        let mut pending = VecDeque::with_capacity(self.pending.len());
        for queued in &self.pending {
            let (queued, rebased) = transform(queued, &remote)?;
            remote = rebased;
            pending.push_back(queued);
        }

        let text = remote.apply(&self.text)?;

        self.set_revision(revision);
        self.sent = sent;
        self.pending = pending;
        self.text = text;
        Ok(remote)
    }

    /// The authority accepted our in-flight operation.
    ///
    /// The next queued operation is sent before any state changes. If that
    /// send fails the acknowledgment is not consumed, so the queue never
    /// reorders; a retried `handle_ack` resends the same head.
    pub fn handle_ack(&mut self, revision: u64) -> Result<()> {
        if self.sent.is_none() {
            return Err(SdkError::UnexpectedAck);
        }
        if let Some(next) = self.pending.front() {
            self.send_operation_at(next, revision.max(self.revision))?;
        }

        self.set_revision(revision);
        self.sent = self.pending.pop_front();
        debug!(client_id = self.client_id, revision, "operation acknowledged");
        Ok(())
    }

    /// Map a selection reported by the authority into local coordinates.
    ///
    /// The authority has not seen our in-flight or queued operations yet,
    /// so the selection is moved through each of them in order.
    pub fn transform_remote_selection(&self, selection: Selection) -> Selection {
        self.sent
            .iter()
            .chain(&self.pending)
            .fold(selection, |sel, operation| sel.transform(operation))
    }

    /// Share the local selection with other replicas.
    ///
    /// Offsets are taken against the last acknowledged revision, so they
    /// only line up with the authority's text while nothing is in flight.
    pub fn send_selection(&self, selection: Selection) -> Result<()> {
        self.transport.send(ClientMessage::Selection {
            client_id: self.client_id,
            selection,
            revision: self.revision,
        })
    }

    fn send_operation(&self, operation: &Operation) -> Result<()> {
        self.send_operation_at(operation, self.revision)
    }

    fn send_operation_at(&self, operation: &Operation, revision: u64) -> Result<()> {
        debug!(
            client_id = self.client_id,
            revision,
            base = operation.base_len(),
            target = operation.target_len(),
            "sending operation"
        );
        self.transport.send(ClientMessage::Operation {
            operation: OperationData::from(operation),
            revision,
        })
    }

    fn set_revision(&mut self, revision: u64) {
        if revision < self.revision {
            warn!(
                client_id = self.client_id,
                current = self.revision,
                received = revision,
                "authority reported an older revision"
            );
            return;
        }
        self.revision = revision;
    }
}
