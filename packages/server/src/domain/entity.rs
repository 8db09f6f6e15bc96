//! Domain entities.

use chrono::{DateTime, Utc};

use super::value_object::{MessageId, SecretToken, UserId};

/// Identity issued to a client: a secret token bound 1:1 to a user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub secret: SecretToken,
    pub user_id: UserId,
}

impl Identity {
    pub fn new(secret: SecretToken, user_id: UserId) -> Self {
        Self { secret, user_id }
    }

    /// Mint a fresh identity with a random secret and user id
    pub fn generate() -> Self {
        Self {
            secret: SecretToken::generate(),
            user_id: UserId::generate(),
        }
    }
}

/// Chat message as stored in a room's history
///
/// Every field is assigned by the server when the message is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: UserId,
    pub text: String,
    pub time: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: UserId, text: String, time: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            sender,
            text,
            time,
        }
    }
}
