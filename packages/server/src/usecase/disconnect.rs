//! UseCase: 切断処理
//!
//! 認証済みの接続だけがルームに登録されているので、
//! 束縛されていないセッションの切断では何もしない。

use std::sync::Arc;

use crate::domain::{Binding, ConnectionSession, MessagePusher};

/// 切断のユースケース
pub struct DisconnectUseCase {
    /// MessagePusher（接続レジストリの抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 切断を実行し、束縛されていた場合はその Binding を返す
    pub async fn execute(&self, session: &ConnectionSession) -> Option<Binding> {
        let binding = session.binding().await?;
        let removed = self
            .message_pusher
            .unregister(&binding.room_id, &session.handle())
            .await;
        if !removed {
            tracing::debug!(
                "Connection '{}' was not registered in room '{}'",
                session.handle(),
                binding.room_id
            );
        }
        Some(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockMessagePusher, RoomId, UserId};

    #[tokio::test]
    async fn test_disconnect_unbound_session_does_nothing() {
        // テスト項目: 未認証の接続の切断ではレジストリに触れない
        // given (前提条件):
        let mut pusher = MockMessagePusher::new();
        pusher.expect_unregister().times(0);
        let usecase = DisconnectUseCase::new(Arc::new(pusher));
        let session = ConnectionSession::new();

        // when (操作):
        let result = usecase.execute(&session).await;

        // then (期待する結果):
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_disconnect_bound_session_unregisters_itself() {
        // テスト項目: 認証済みの接続は自分のハンドルでルームから削除される
        // given (前提条件):
        let session = ConnectionSession::new();
        let handle = session.handle();
        let binding = session
            .bind(UserId::generate(), RoomId::from("r1"))
            .await
            .unwrap();
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_unregister()
            .withf(move |room_id, h| room_id == &RoomId::from("r1") && *h == handle)
            .times(1)
            .returning(|_, _| true);
        let usecase = DisconnectUseCase::new(Arc::new(pusher));

        // when (操作):
        let result = usecase.execute(&session).await;

        // then (期待する結果):
        assert_eq!(result, Some(binding));
    }
}
