//! # hearth-shared
//!
//! Types shared by the Hearth store and realtime server: identities, the
//! durable records that cross the wire, the closed set of client/server
//! events and the signed access token presented on connect.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod token;
pub mod types;

pub use error::{ProtocolError, TokenError};
pub use models::{Message, Notification, NotificationKind};
pub use protocol::{ClientEvent, ServerEvent};
pub use types::{ConnectionId, MessageId, NotificationId, PresenceStatus, UserId};
