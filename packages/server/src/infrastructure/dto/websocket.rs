//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object carrying a string `type` discriminator.
//! Inbound frames are decoded in two stages: the discriminator is peeked
//! first, then the matching variant is parsed. Unrecognized types decode to
//! [`ClientEvent::Unknown`] and are ignored by the handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat message as it appears on the wire and in the snapshot file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub time: DateTime<Utc>,
}

/// Server → client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Opened,
    Ping,
    AuthResponse { secret: String, user_id: String },
    /// Room history, sent once after authentication
    NewMessages { data: Vec<MessageDto> },
    /// Live message broadcast
    NewMessage { data: MessageDto },
    /// Protocol violation reported to the offending connection only
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEvent {
    #[serde(default)]
    pub secret: Option<String>,
    pub room_id: String,
}

/// `send` frame. `id`, `sender` and `time` are never read from the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendEvent {
    #[serde(alias = "message")]
    pub text: String,
    /// Accepted for compatibility; messages always go to the bound room.
    #[serde(default)]
    pub room: Option<String>,
}

/// Client → server events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Auth(AuthEvent),
    Send(SendEvent),
    Unknown(String),
}

#[derive(Deserialize)]
struct EventEnvelope {
    r#type: String,
}

impl ClientEvent {
    /// Decode a text frame.
    ///
    /// Fails when the frame is not a JSON object with a string `type`, or
    /// when a recognized type carries a malformed payload.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_str(raw)?;
        match envelope.r#type.as_str() {
            "auth" => serde_json::from_str(raw).map(Self::Auth),
            "send" => serde_json::from_str(raw).map(Self::Send),
            _ => Ok(Self::Unknown(envelope.r#type)),
        }
    }
}
