//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージの生成（id / sender / time はサーバーが決める）、履歴への追加、ブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 履歴に追加されていないメッセージがブロードキャストされてはならない
//! - 未認証の接続からの送信は何も起こさずに拒否される
//!
//! ### どのような状況を想定しているか
//! - 正常系：認証済み接続からの送信
//! - 異常系：未認証の接続からの送信、履歴への追加失敗
//! - エッジケース：同じルームへの並行送信

use std::sync::Arc;

use hiroba_shared::time::{Clock, timestamp_to_rfc3339};

use crate::domain::{
    ChatMessage, ConnectionSession, MessagePusher, OutboundEvent, RoomHistoryRepository, RoomId,
};

use super::{error::SendMessageError, room_lock::RoomLocks};

/// Outcome of an accepted send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub room_id: RoomId,
    pub message: ChatMessage,
    /// Number of connections the broadcast reached
    pub delivered: usize,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// RoomHistoryRepository（ルーム履歴）
    history_repository: Arc<dyn RoomHistoryRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    room_locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        history_repository: Arc<dyn RoomHistoryRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        room_locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            history_repository,
            message_pusher,
            room_locks,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `session` - 送信元の接続のセッション（認証済みであること）
    /// * `text` - メッセージ本文
    ///
    /// # Returns
    ///
    /// * `Ok(SentMessage)` - 履歴に追加され、束縛されたルームにブロードキャストされた
    /// * `Err(SendMessageError)` - 未認証、または履歴への追加に失敗
    pub async fn execute(
        &self,
        session: &ConnectionSession,
        text: String,
    ) -> Result<SentMessage, SendMessageError> {
        // 1. 束縛されたユーザーとルームを取得
        let binding = session.require_binding().await?;

        // 2. id / sender / time はサーバー側で決める
        let message = ChatMessage::new(binding.user_id, text, self.clock.now());

        // 3. 追記とブロードキャストは同じルームロックの中で行い、配信順を追記順に揃える
        let _room_guard = self.room_locks.acquire(&binding.room_id).await;
        self.history_repository
            .append(&binding.room_id, message.clone())
            .await?;
        let delivered = self
            .message_pusher
            .broadcast(&binding.room_id, OutboundEvent::NewMessage(message.clone()))
            .await;

        tracing::debug!(
            "Message '{}' from '{}' at {} delivered to {} connections in room '{}'",
            message.id,
            binding.user_id,
            timestamp_to_rfc3339(&message.time),
            delivered,
            binding.room_id
        );

        Ok(SentMessage {
            room_id: binding.room_id,
            message,
            delivered,
        })
    }
}
