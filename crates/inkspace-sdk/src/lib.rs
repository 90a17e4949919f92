//! Inkspace SDK - collaborative plain-text editing over operational transformation
//!
//! This SDK wires the operation algebra from [`inkspace_ot`] into the
//! pieces a collaborative editor needs: a per-replica synchronizer, a
//! session that turns editor snapshots into operations, and an in-memory
//! ordering authority that serializes edits from every replica in a room.
//!
//! # Quick Start
//!
//! ```rust
//! use inkspace_sdk::{MemoryTransport, ServerMessage, Session, SessionConfig};
//! use std::sync::Arc;
//!
//! let (transport, mut outbound) = MemoryTransport::new();
//! let mut session = Session::new(Arc::new(transport), SessionConfig::default());
//! session.join().unwrap();
//!
//! // The authority answers with the current document.
//! session
//!     .handle_message(ServerMessage::JoinedRoom {
//!         client_id: 1,
//!         room_id: "notes".into(),
//!         state: "hello".into(),
//!         revision: 0,
//!     })
//!     .unwrap();
//!
//! session.on_content_change("hello world").unwrap();
//! assert_eq!(session.content(), Some("hello world"));
//! assert!(outbound.try_recv().is_ok());
//! ```
//!
//! # Architecture
//!
//! - [`client`] - One replica's send/ack state machine
//! - [`session`] - Editor-facing session and its events
//! - [`presence`] - Other replicas' selections
//! - [`authority`] - Rooms, revisions and history on the authority side
//! - [`message`] - Wire messages in both directions
//! - [`network`] - Outbound transport abstraction
//! - [`config`] - Session configuration
//! - [`error`] - Error types

pub mod authority;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod network;
pub mod presence;
pub mod session;

// Re-exports for convenience
pub use authority::{Room, RoomManager, ServerSink};
pub use client::{Client, SyncState};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::{Result, SdkError};
pub use message::{ClientMessage, ServerMessage};
pub use network::{MemoryTransport, Transport};
pub use presence::RemoteSelections;
pub use session::{Session, SessionEvent};

pub use inkspace_ot::{diff, ClientId, Operation, OperationData, Selection};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::authority::RoomManager;
    pub use crate::client::Client;
    pub use crate::config::{SessionConfig, SessionConfigBuilder};
    pub use crate::error::SdkError;
    pub use crate::message::{ClientMessage, ServerMessage};
    pub use crate::network::{MemoryTransport, Transport};
    pub use crate::session::{Session, SessionEvent};
    pub use inkspace_ot::{ClientId, Operation, Selection};
}
