//! Messages exchanged between a replica and the ordering authority.
//!
//! Every frame is a JSON object `{"type": ..., "payload": ...}`.

use crate::error::Result;
use inkspace_ot::{ClientId, OperationData, Selection};
use serde::{Deserialize, Serialize};

/// Messages a replica sends to the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join a room. A missing id asks the authority to create one.
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
    },
    /// A local operation made against `revision`.
    Operation {
        operation: OperationData,
        revision: u64,
    },
    /// The local selection as of `revision`.
    Selection {
        #[serde(rename = "clientID")]
        client_id: ClientId,
        selection: Selection,
        revision: u64,
    },
}

impl ClientMessage {
    /// Event name used on the wire.
    pub fn event(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Operation { .. } => "operation",
            ClientMessage::Selection { .. } => "selection",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Messages the authority sends to a replica.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    JoinedRoom {
        client_id: ClientId,
        room_id: String,
        state: String,
        revision: u64,
    },
    RemoteOperation {
        operation: OperationData,
        revision: u64,
    },
    AckOperation {
        revision: u64,
    },
    #[serde(rename_all = "camelCase")]
    RemoteSelection {
        client_id: ClientId,
        selection: Selection,
        revision: u64,
    },
    #[serde(rename_all = "camelCase")]
    ClientDisconnected {
        client_id: ClientId,
    },
    Error(String),
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}
