//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - ルームごとに接続中クライアントの `UnboundedSender` を管理
//! - ルーム単位のブロードキャスト
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui::handler::websocket`）で行われます。
//! この実装は生成された sender を受け取り、メッセージ送信に使用します。
//! 実際のソケット書き込みは接続ごとの送信タスクが行うため、
//! ここでの送信はブロックしません。

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{ConnectionHandle, MessagePusher, OutboundEvent, PusherChannel, RoomId};

/// WebSocket を使った MessagePusher 実装
///
/// ## フィールド
///
/// - `rooms`: ルームごとの「接続ハンドル → sender」マップ
pub struct WebSocketMessagePusher {
    rooms: DashMap<RoomId, HashMap<ConnectionHandle, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register(&self, room_id: RoomId, handle: ConnectionHandle, channel: PusherChannel) {
        tracing::debug!("Connection '{}' registered to room '{}'", handle, room_id);
        self.rooms.entry(room_id).or_default().insert(handle, channel);
    }

    async fn unregister(&self, room_id: &RoomId, handle: &ConnectionHandle) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut connections) => connections.remove(handle).is_some(),
            None => false,
        };
        // get_mut guard is released above; remove_if locks the same shard.
        self.rooms
            .remove_if(room_id, |_, connections| connections.is_empty());

        if removed {
            tracing::debug!("Connection '{}' unregistered from room '{}'", handle, room_id);
        }
        removed
    }

    async fn broadcast(&self, room_id: &RoomId, event: OutboundEvent) -> usize {
        let Some(connections) = self.rooms.get(room_id) else {
            tracing::debug!("No connections in room '{}', nothing to broadcast", room_id);
            return 0;
        };

        let mut delivered = 0;
        for (handle, sender) in connections.iter() {
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = sender.send(event.clone()) {
                tracing::warn!("Failed to push event to connection '{}': {}", handle, e);
            } else {
                delivered += 1;
            }
        }
        tracing::debug!(
            "Broadcasted to {}/{} connections in room '{}'",
            delivered,
            connections.len(),
            room_id
        );
        delivered
    }

    async fn connection_count(&self, room_id: &RoomId) -> usize {
        self.rooms
            .get(room_id)
            .map(|connections| connections.len())
            .unwrap_or(0)
    }
}
