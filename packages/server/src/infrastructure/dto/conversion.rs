//! Conversion logic between DTOs and domain entities.

use crate::domain::{ChatMessage, MessageId, OutboundEvent, UserId, ValueObjectError};
use crate::infrastructure::dto::websocket::{MessageDto, ServerEvent};

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<MessageDto> for ChatMessage {
    type Error = ValueObjectError;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId::try_from(dto.id.as_str())?,
            sender: UserId::try_from(dto.sender.as_str())?,
            text: dto.text,
            time: dto.time,
        })
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<ChatMessage> for MessageDto {
    fn from(model: ChatMessage) -> Self {
        Self {
            id: model.id.to_string(),
            sender: model.sender.to_string(),
            text: model.text,
            time: model.time,
        }
    }
}

impl From<OutboundEvent> for ServerEvent {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::Opened => Self::Opened,
            OutboundEvent::Ping => Self::Ping,
            OutboundEvent::Authenticated(identity) => Self::AuthResponse {
                secret: identity.secret.into_string(),
                user_id: identity.user_id.to_string(),
            },
            OutboundEvent::History(messages) => Self::NewMessages {
                data: messages.into_iter().map(MessageDto::from).collect(),
            },
            OutboundEvent::NewMessage(message) => Self::NewMessage {
                data: message.into(),
            },
            OutboundEvent::Rejected(message) => Self::Error { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{Identity, SecretToken};

    #[test]
    fn test_domain_message_to_dto() {
        // テスト項目: ドメインの ChatMessage が DTO に変換される
        // given (前提条件):
        let message = ChatMessage::new(UserId::generate(), "hi".to_string(), Utc::now());

        // when (操作):
        let dto = MessageDto::from(message.clone());

        // then (期待する結果):
        assert_eq!(dto.id, message.id.to_string());
        assert_eq!(dto.sender, message.sender.to_string());
        assert_eq!(dto.text, "hi");
        assert_eq!(dto.time, message.time);
    }

    #[test]
    fn test_dto_with_invalid_sender_is_rejected() {
        // テスト項目: sender が UUID でない DTO はドメインに変換できない
        // given (前提条件):
        let dto = MessageDto {
            id: MessageId::generate().to_string(),
            sender: "alice".to_string(),
            text: "hi".to_string(),
            time: Utc::now(),
        };

        // when (操作):
        let result = ChatMessage::try_from(dto);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::InvalidUuid("alice".to_string())));
    }

    #[test]
    fn test_authenticated_event_to_auth_response() {
        // テスト項目: 認証イベントが authResponse に変換される
        // given (前提条件):
        let identity = Identity::new(SecretToken::new("s".to_string()), UserId::generate());

        // when (操作):
        let event = ServerEvent::from(OutboundEvent::Authenticated(identity.clone()));

        // then (期待する結果):
        assert_eq!(
            event,
            ServerEvent::AuthResponse {
                secret: "s".to_string(),
                user_id: identity.user_id.to_string(),
            }
        );
    }

    #[test]
    fn test_rejected_event_to_error() {
        // テスト項目: 拒否イベントが error に変換される
        // given (前提条件):
        let event = OutboundEvent::Rejected("connection is not authenticated".to_string());

        // when (操作):
        let dto = ServerEvent::from(event);

        // then (期待する結果):
        assert_eq!(
            dto,
            ServerEvent::Error {
                message: "connection is not authenticated".to_string()
            }
        );
    }
}
