//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::collections::HashMap;

use async_trait::async_trait;

use super::{ChatMessage, Identity, RepositoryError, RoomId, SecretToken};

/// Identity Repository trait
///
/// シークレットトークンと UserId の 1:1 対応を管理する。
/// 一度払い出した UserId が別のトークンに割り当て直されることはない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// 既知のトークンなら既存の Identity を返し、未知または未指定なら新しい Identity を払い出す
    async fn resolve_or_create(&self, secret: Option<SecretToken>) -> Identity;

    /// 全 Identity を取得（永続化用）
    async fn export(&self) -> Vec<Identity>;

    /// スナップショットから Identity を復元
    async fn restore(&self, identities: Vec<Identity>);
}

/// Room History Repository trait
///
/// ルームごとの追記専用メッセージ履歴。挿入順がそのまま表示順になる。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomHistoryRepository: Send + Sync {
    /// メッセージをルームの履歴末尾に追加
    async fn append(&self, room_id: &RoomId, message: ChatMessage) -> Result<(), RepositoryError>;

    /// ルームの履歴を挿入順で取得（未知のルームは空）
    async fn snapshot(&self, room_id: &RoomId) -> Vec<ChatMessage>;

    /// 全ルームの履歴を取得（永続化用）
    async fn export(&self) -> HashMap<RoomId, Vec<ChatMessage>>;

    /// スナップショットから履歴を復元
    async fn restore(&self, rooms: HashMap<RoomId, Vec<ChatMessage>>);
}
