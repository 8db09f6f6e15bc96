//! UseCase: 認証とルーム参加
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AuthenticateUseCase::execute() メソッド
//! - Identity の解決、セッションの束縛、履歴の送信、レジストリへの登録
//!
//! ### なぜこのテストが必要か
//! - 接続に送られるイベントの順序（authResponse → newMessages → ライブ配信）を保証する
//! - 二重認証が最初の束縛を壊さないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ユーザーの認証、既知シークレットでの再開
//! - 異常系：認証済みセッションの再認証
//! - エッジケース：認証と並行して送信が続いているルームへの参加

use std::sync::Arc;

use crate::domain::{
    Binding, ConnectionSession, IdentityRepository, MessagePusher, OutboundEvent, PusherChannel,
    RoomHistoryRepository, RoomId, SecretToken, SessionError,
};

use super::{error::AuthError, room_lock::RoomLocks};

/// 認証とルーム参加のユースケース
pub struct AuthenticateUseCase {
    /// IdentityRepository（シークレット ↔ UserId）
    identity_repository: Arc<dyn IdentityRepository>,
    /// RoomHistoryRepository（ルーム履歴）
    history_repository: Arc<dyn RoomHistoryRepository>,
    /// MessagePusher（接続レジストリ）
    message_pusher: Arc<dyn MessagePusher>,
    room_locks: Arc<RoomLocks>,
}

impl AuthenticateUseCase {
    pub fn new(
        identity_repository: Arc<dyn IdentityRepository>,
        history_repository: Arc<dyn RoomHistoryRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        room_locks: Arc<RoomLocks>,
    ) -> Self {
        Self {
            identity_repository,
            history_repository,
            message_pusher,
            room_locks,
        }
    }

    /// 認証を実行
    ///
    /// # Arguments
    ///
    /// * `session` - 認証する接続のセッション
    /// * `secret` - クライアントが提示したシークレット（未指定可）
    /// * `room_id` - 参加するルーム
    /// * `channel` - この接続への送信チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Binding)` - 束縛された UserId とルーム
    /// * `Err(AuthError)` - 認証済み、または接続が既に閉じている
    pub async fn execute(
        &self,
        session: &ConnectionSession,
        secret: Option<SecretToken>,
        room_id: RoomId,
        channel: PusherChannel,
    ) -> Result<Binding, AuthError> {
        // 0. 認証済みの接続には Identity を払い出さない
        if session.binding().await.is_some() {
            return Err(SessionError::AlreadyBound.into());
        }

        // 1. Identity を解決（未知・未指定なら払い出し）
        let identity = self.identity_repository.resolve_or_create(secret).await;

        // 2. セッションを一度だけ束縛（並行した認証はここで一つに絞られる）
        let binding = session.bind(identity.user_id, room_id).await?;

        // 3. Identity を返信
        channel
            .send(OutboundEvent::Authenticated(identity))
            .map_err(|_| AuthError::ConnectionClosed)?;

        // 4. 履歴の送信とレジストリ登録は送信処理と同じルームロックの中で行う
        let _room_guard = self.room_locks.acquire(&binding.room_id).await;
        let history = self.history_repository.snapshot(&binding.room_id).await;
        let history_len = history.len();
        channel
            .send(OutboundEvent::History(history))
            .map_err(|_| AuthError::ConnectionClosed)?;
        self.message_pusher
            .register(binding.room_id.clone(), session.handle(), channel)
            .await;

        tracing::info!(
            "User '{}' joined room '{}' on connection '{}' ({} messages in history)",
            binding.user_id,
            binding.room_id,
            session.handle(),
            history_len
        );
        Ok(binding)
    }
}
