//! InMemory Room History Repository 実装
//!
//! ルームごとに `Mutex<Vec<ChatMessage>>` を持ち、追記はルーム単位の
//! ロックの中で行います。別ルームへの追記同士は互いを待ちません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::{ChatMessage, RepositoryError, RoomHistoryRepository, RoomId};

type RoomLog = Arc<Mutex<Vec<ChatMessage>>>;

/// インメモリ Room History Repository 実装
#[derive(Debug, Default)]
pub struct InMemoryRoomHistoryRepository {
    rooms: DashMap<RoomId, RoomLog>,
}

impl InMemoryRoomHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // Clone the Arc out so no DashMap guard is held across an await.
    fn log_of(&self, room_id: &RoomId) -> Option<RoomLog> {
        self.rooms.get(room_id).map(|log| log.value().clone())
    }

    fn log_or_create(&self, room_id: &RoomId) -> RoomLog {
        self.rooms.entry(room_id.clone()).or_default().value().clone()
    }
}

#[async_trait]
impl RoomHistoryRepository for InMemoryRoomHistoryRepository {
    async fn append(&self, room_id: &RoomId, message: ChatMessage) -> Result<(), RepositoryError> {
        let log = self.log_or_create(room_id);
        let mut messages = log.lock().await;
        messages.push(message);
        tracing::debug!(
            "Appended message to room '{}' ({} messages)",
            room_id,
            messages.len()
        );
        Ok(())
    }

    async fn snapshot(&self, room_id: &RoomId) -> Vec<ChatMessage> {
        match self.log_of(room_id) {
            Some(log) => log.lock().await.clone(),
            None => Vec::new(),
        }
    }

    async fn export(&self) -> HashMap<RoomId, Vec<ChatMessage>> {
        let logs: Vec<(RoomId, RoomLog)> = self
            .rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut rooms = HashMap::with_capacity(logs.len());
        for (room_id, log) in logs {
            rooms.insert(room_id, log.lock().await.clone());
        }
        rooms
    }

    async fn restore(&self, rooms: HashMap<RoomId, Vec<ChatMessage>>) {
        for (room_id, messages) in rooms {
            self.rooms.insert(room_id, Arc::new(Mutex::new(messages)));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::*;
    use crate::domain::UserId;

    fn message(text: &str) -> ChatMessage {
        ChatMessage::new(UserId::generate(), text.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_snapshot_of_unknown_room_is_empty() {
        // テスト項目: 未知のルームの履歴は空
        // given (前提条件):
        let repo = InMemoryRoomHistoryRepository::new();

        // when (操作):
        let snapshot = repo.snapshot(&RoomId::from("nowhere")).await;

        // then (期待する結果):
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_append_keeps_insertion_order() {
        // テスト項目: 履歴は挿入順で返される
        // given (前提条件):
        let repo = InMemoryRoomHistoryRepository::new();
        let room = RoomId::from("r1");
        let first = message("first");
        let second = message("second");

        // when (操作):
        repo.append(&room, first.clone()).await.unwrap();
        repo.append(&room, second.clone()).await.unwrap();

        // then (期待する結果):
        assert_eq!(repo.snapshot(&room).await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        // テスト項目: 別ルームの履歴は混ざらない
        // given (前提条件):
        let repo = InMemoryRoomHistoryRepository::new();
        let in_r1 = message("r1 only");

        // when (操作):
        repo.append(&RoomId::from("r1"), in_r1.clone()).await.unwrap();

        // then (期待する結果):
        assert_eq!(repo.snapshot(&RoomId::from("r1")).await, vec![in_r1]);
        assert!(repo.snapshot(&RoomId::from("r2")).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_retained() {
        // テスト項目: 同じルームへの並行追記が一件も失われず重複もしない
        // given (前提条件):
        let repo = Arc::new(InMemoryRoomHistoryRepository::new());
        let room = RoomId::from("busy");

        // when (操作):
        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let repo = repo.clone();
                let room = room.clone();
                tokio::spawn(async move {
                    repo.append(&room, message(&format!("msg-{}", i)))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // then (期待する結果):
        let snapshot = repo.snapshot(&room).await;
        assert_eq!(snapshot.len(), 100);
        let ids: HashSet<_> = snapshot.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn test_export_then_restore_reproduces_history() {
        // テスト項目: export した内容を restore すると同じ履歴が順序通り再現される
        // given (前提条件):
        let source = InMemoryRoomHistoryRepository::new();
        let room = RoomId::from("r1");
        for text in ["a", "b", "c"] {
            source.append(&room, message(text)).await.unwrap();
        }

        // when (操作):
        let restored = InMemoryRoomHistoryRepository::new();
        restored.restore(source.export().await).await;

        // then (期待する結果):
        assert_eq!(restored.snapshot(&room).await, source.snapshot(&room).await);
    }
}
