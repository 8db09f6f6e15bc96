//! Domain layer: entities, value objects, session state machine and the
//! interfaces the use cases depend on.

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod session;
pub mod value_object;

pub use entity::{ChatMessage, Identity};
pub use error::{RepositoryError, SessionError, ValueObjectError};
pub use message_pusher::{MessagePusher, OutboundEvent, PusherChannel};
pub use repository::{IdentityRepository, RoomHistoryRepository};
pub use session::{Binding, ConnectionSession, SessionState};
pub use value_object::{ConnectionHandle, MessageId, RoomId, SecretToken, UserId};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::{MockIdentityRepository, MockRoomHistoryRepository};
