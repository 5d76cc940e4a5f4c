use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::Message;
use crate::types::{MessageId, PresenceStatus, UserId};

/// Events a client may send over its realtime connection.
///
/// JSON shape: `{"event": "message-send", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Send a direct message.
    #[serde(rename_all = "camelCase")]
    MessageSend { receiver_id: UserId, content: String },

    /// Mark a received message as read.
    #[serde(rename_all = "camelCase")]
    MessageMarkRead { message_id: MessageId },

    /// Start or stop the typing indicator towards one peer.
    #[serde(rename_all = "camelCase")]
    TypingSet { receiver_id: UserId, is_typing: bool },
}

/// Events pushed from the server to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Someone came online or went offline. Sent to every connection.
    #[serde(rename_all = "camelCase")]
    PresenceChanged {
        identity: UserId,
        status: PresenceStatus,
    },

    /// A new direct message, with the full persisted record.
    MessageDelivered(Message),

    /// The recipient read a message this connection sent.
    #[serde(rename_all = "camelCase")]
    MessageRead { message_id: MessageId },

    /// The peer started or stopped typing.
    #[serde(rename_all = "camelCase")]
    TypingChanged {
        sender_identity: UserId,
        is_typing: bool,
    },

    /// The unread notification counter changed; refetch it.
    NotificationAvailable,

    /// A client event from this connection could not be handled.
    Error { message: String },
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageSend { .. } => "message-send",
            Self::MessageMarkRead { .. } => "message-mark-read",
            Self::TypingSet { .. } => "typing-set",
        }
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PresenceChanged { .. } => "presence-changed",
            Self::MessageDelivered(_) => "message-delivered",
            Self::MessageRead { .. } => "message-read",
            Self::TypingChanged { .. } => "typing-changed",
            Self::NotificationAvailable => "notification-available",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_message_send() {
        let event =
            ClientEvent::from_json(r#"{"event":"message-send","data":{"receiverId":"b","content":"hi"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::MessageSend {
                receiver_id: UserId::from("b"),
                content: "hi".into(),
            }
        );
        assert_eq!(event.name(), "message-send");
    }

    #[test]
    fn test_parse_typing_set() {
        let event =
            ClientEvent::from_json(r#"{"event":"typing-set","data":{"receiverId":"b","isTyping":true}}"#)
                .unwrap();
        assert!(matches!(event, ClientEvent::TypingSet { is_typing: true, .. }));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let err = ClientEvent::from_json(r#"{"event":"message-delete","data":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_presence_changed_shape() {
        let event = ServerEvent::PresenceChanged {
            identity: UserId::from("b"),
            status: PresenceStatus::Offline,
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"event": "presence-changed", "data": {"identity": "b", "status": "offline"}})
        );
    }

    #[test]
    fn test_signal_only_event_has_no_payload() {
        let value: serde_json::Value =
            serde_json::from_str(&ServerEvent::NotificationAvailable.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"event": "notification-available"}));
    }

    #[test]
    fn test_typing_changed_shape() {
        let event = ServerEvent::TypingChanged {
            sender_identity: UserId::from("a"),
            is_typing: false,
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["data"]["senderIdentity"], "a");
        assert_eq!(value["data"]["isTyping"], false);
    }
}
