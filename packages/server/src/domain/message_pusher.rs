//! MessagePusher trait 定義
//!
//! ルームごとの接続レジストリとブロードキャストのインターフェース。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ChatMessage, ConnectionHandle, Identity, RoomId};

/// Event queued for delivery to a single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Opened,
    Ping,
    Authenticated(Identity),
    History(Vec<ChatMessage>),
    NewMessage(ChatMessage),
    Rejected(String),
}

/// Outbound channel of one connection
pub type PusherChannel = mpsc::UnboundedSender<OutboundEvent>;

/// MessagePusher trait
///
/// ルームごとに接続中のチャンネルを保持し、ベストエフォートでブロードキャストする。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続をルームに登録
    async fn register(&self, room_id: RoomId, handle: ConnectionHandle, channel: PusherChannel);

    /// 接続をルームから削除。削除できた場合 true
    async fn unregister(&self, room_id: &RoomId, handle: &ConnectionHandle) -> bool;

    /// ルームの全接続に送信し、届けられた接続数を返す
    ///
    /// 一部の送信失敗は他の接続への配送を妨げず、呼び出し元にも返さない。
    async fn broadcast(&self, room_id: &RoomId, event: OutboundEvent) -> usize;

    /// ルームに登録されている接続数
    async fn connection_count(&self, room_id: &RoomId) -> usize;
}
