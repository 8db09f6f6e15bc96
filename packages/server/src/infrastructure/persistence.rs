//! Snapshot persistence of identities and room history.
//!
//! ## Format
//!
//! One JSON document with two string fields, each holding an embedded JSON
//! document:
//!
//! ```text
//! {
//!   "RoomsStr": "{\"<roomId>\": [<Message>, ...], ...}",
//!   "UsersStr": "{\"<secret>\": \"<userId>\", ...}"
//! }
//! ```
//!
//! Restore never fails: a missing file is a first run, and each malformed
//! layer is skipped on its own so a bad room map does not cost the
//! identities. Writes go through a sibling temporary file that is renamed
//! over the target, so a crash mid-write leaves the previous snapshot intact.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{
        ChatMessage, Identity, IdentityRepository, RoomHistoryRepository, RoomId, SecretToken,
        UserId, ValueObjectError,
    },
    infrastructure::dto::websocket::MessageDto,
};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot contains an invalid value: {0}")]
    InvalidValue(#[from] ValueObjectError),
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedData {
    #[serde(rename = "RoomsStr")]
    rooms: String,
    #[serde(rename = "UsersStr")]
    users: String,
}

/// Counts of what a restore loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub identities: usize,
    pub rooms: usize,
    pub messages: usize,
}

/// Writes and restores snapshots of the identity and room history stores
pub struct SnapshotManager {
    path: PathBuf,
    identity_repository: Arc<dyn IdentityRepository>,
    history_repository: Arc<dyn RoomHistoryRepository>,
}

impl SnapshotManager {
    pub fn new(
        path: impl Into<PathBuf>,
        identity_repository: Arc<dyn IdentityRepository>,
        history_repository: Arc<dyn RoomHistoryRepository>,
    ) -> Self {
        Self {
            path: path.into(),
            identity_repository,
            history_repository,
        }
    }

    /// Load the snapshot into the stores. Missing or malformed data means a cold start.
    pub async fn restore(&self) -> RestoreSummary {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    "No snapshot at '{}', starting with empty state",
                    self.path.display()
                );
                return RestoreSummary::default();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read snapshot '{}': {}. Starting with empty state",
                    self.path.display(),
                    e
                );
                return RestoreSummary::default();
            }
        };

        let data: PersistedData = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    "Malformed snapshot '{}': {}. Starting with empty state",
                    self.path.display(),
                    e
                );
                return RestoreSummary::default();
            }
        };

        let mut summary = RestoreSummary::default();

        match decode_identities(&data.users) {
            Ok(identities) => {
                summary.identities = identities.len();
                self.identity_repository.restore(identities).await;
            }
            Err(e) => tracing::warn!("Skipping malformed identities in snapshot: {}", e),
        }

        match decode_rooms(&data.rooms) {
            Ok(rooms) => {
                summary.rooms = rooms.len();
                summary.messages = rooms.values().map(Vec::len).sum();
                self.history_repository.restore(rooms).await;
            }
            Err(e) => tracing::warn!("Skipping malformed room history in snapshot: {}", e),
        }

        tracing::info!(
            "Restored {} identities and {} messages in {} rooms from '{}'",
            summary.identities,
            summary.messages,
            summary.rooms,
            self.path.display()
        );
        summary
    }

    /// Serialize both stores and write the snapshot.
    pub async fn persist(&self) -> Result<(), PersistenceError> {
        let identities = self.identity_repository.export().await;
        let rooms = self.history_repository.export().await;
        let document = encode(identities, rooms)?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, document).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::info!("Snapshot written to '{}'", self.path.display());
        Ok(())
    }

    /// Persist, logging instead of returning the failure.
    pub async fn persist_or_log(&self) {
        if let Err(e) = self.persist().await {
            tracing::error!("Failed to write snapshot '{}': {}", self.path.display(), e);
        }
    }

    /// Persist every `interval` until `shutdown` is cancelled.
    pub async fn run_periodic(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.persist_or_log().await,
            }
        }
        tracing::debug!("Periodic snapshot task stopped");
    }

    fn tmp_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

fn encode(
    identities: Vec<Identity>,
    rooms: HashMap<RoomId, Vec<ChatMessage>>,
) -> Result<String, serde_json::Error> {
    let users: HashMap<String, String> = identities
        .into_iter()
        .map(|identity| (identity.secret.into_string(), identity.user_id.to_string()))
        .collect();
    let rooms: HashMap<String, Vec<MessageDto>> = rooms
        .into_iter()
        .map(|(room_id, messages)| {
            (
                room_id.into_string(),
                messages.into_iter().map(MessageDto::from).collect(),
            )
        })
        .collect();

    serde_json::to_string(&PersistedData {
        rooms: serde_json::to_string(&rooms)?,
        users: serde_json::to_string(&users)?,
    })
}

fn decode_identities(raw: &str) -> Result<Vec<Identity>, PersistenceError> {
    let users: HashMap<String, String> = serde_json::from_str(raw)?;
    users
        .into_iter()
        .map(|(secret, user_id)| {
            Ok(Identity::new(
                SecretToken::new(secret),
                UserId::try_from(user_id.as_str())?,
            ))
        })
        .collect()
}

fn decode_rooms(raw: &str) -> Result<HashMap<RoomId, Vec<ChatMessage>>, PersistenceError> {
    let rooms: HashMap<String, Vec<MessageDto>> = serde_json::from_str(raw)?;
    rooms
        .into_iter()
        .map(|(room_id, messages)| {
            let messages = messages
                .into_iter()
                .map(ChatMessage::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((RoomId::new(room_id), messages))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::infrastructure::repository::{
        InMemoryIdentityRepository, InMemoryRoomHistoryRepository,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - persist → restore で Identity と履歴が順序ごと再現されること
    // - ファイルが無い・壊れている場合はコールドスタートになること
    // - 片方の層だけ壊れている場合、もう片方は復元されること
    // ========================================

    fn temp_snapshot_path() -> PathBuf {
        std::env::temp_dir().join(format!("hiroba-snapshot-{}.json", Uuid::new_v4()))
    }

    fn create_manager(
        path: &Path,
    ) -> (
        SnapshotManager,
        Arc<InMemoryIdentityRepository>,
        Arc<InMemoryRoomHistoryRepository>,
    ) {
        let identities = Arc::new(InMemoryIdentityRepository::new());
        let history = Arc::new(InMemoryRoomHistoryRepository::new());
        let manager = SnapshotManager::new(path, identities.clone(), history.clone());
        (manager, identities, history)
    }

    #[tokio::test]
    async fn test_persist_then_restore_reproduces_state() {
        // テスト項目: 書き出したスナップショットから同じ内容が順序通り復元される
        // given (前提条件):
        let path = temp_snapshot_path();
        let (source, identities, history) = create_manager(&path);
        let alice = identities.resolve_or_create(None).await;
        let room = RoomId::from("r1");
        for text in ["one", "two", "three"] {
            history
                .append(&room, ChatMessage::new(alice.user_id, text.to_string(), Utc::now()))
                .await
                .unwrap();
        }
        source.persist().await.unwrap();

        // when (操作):
        let (target, restored_identities, restored_history) = create_manager(&path);
        let summary = target.restore().await;

        // then (期待する結果):
        assert_eq!(
            summary,
            RestoreSummary {
                identities: 1,
                rooms: 1,
                messages: 3
            }
        );
        assert_eq!(
            restored_identities
                .resolve_or_create(Some(alice.secret.clone()))
                .await,
            alice
        );
        assert_eq!(
            restored_history.snapshot(&room).await,
            history.snapshot(&room).await
        );
        assert!(!target.tmp_path().exists());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_restore_missing_file_is_cold_start() {
        // テスト項目: スナップショットが無い場合は空の状態で起動する
        // given (前提条件):
        let path = temp_snapshot_path();
        let (manager, identities, _history) = create_manager(&path);

        // when (操作):
        let summary = manager.restore().await;

        // then (期待する結果):
        assert_eq!(summary, RestoreSummary::default());
        assert!(identities.export().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_malformed_file_is_cold_start() {
        // テスト項目: 壊れたスナップショットは無視され空の状態で起動する
        // given (前提条件):
        let path = temp_snapshot_path();
        std::fs::write(&path, "{ this is not json").unwrap();
        let (manager, identities, history) = create_manager(&path);

        // when (操作):
        let summary = manager.restore().await;

        // then (期待する結果):
        assert_eq!(summary, RestoreSummary::default());
        assert!(identities.export().await.is_empty());
        assert!(history.export().await.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_restore_keeps_identities_when_rooms_are_malformed() {
        // テスト項目: 履歴部分だけ壊れていても Identity は復元される
        // given (前提条件):
        let path = temp_snapshot_path();
        let user_id = UserId::generate();
        let document = serde_json::json!({
            "RoomsStr": "[broken",
            "UsersStr": format!("{{\"s1\":\"{}\"}}", user_id),
        });
        std::fs::write(&path, document.to_string()).unwrap();
        let (manager, identities, history) = create_manager(&path);

        // when (操作):
        let summary = manager.restore().await;

        // then (期待する結果):
        assert_eq!(summary.identities, 1);
        assert_eq!(summary.rooms, 0);
        assert_eq!(
            identities
                .resolve_or_create(Some(SecretToken::new("s1".to_string())))
                .await
                .user_id,
            user_id
        );
        assert!(history.export().await.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_encode_wraps_documents_as_strings() {
        // テスト項目: 外側のドキュメントが RoomsStr / UsersStr の文字列フィールドを持つ
        // given (前提条件):
        let identity = Identity::generate();

        // when (操作):
        let encoded = encode(vec![identity.clone()], HashMap::new()).unwrap();
        let outer: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        // then (期待する結果):
        assert_eq!(outer["RoomsStr"], serde_json::json!("{}"));
        let users: HashMap<String, String> =
            serde_json::from_str(outer["UsersStr"].as_str().unwrap()).unwrap();
        assert_eq!(
            users.get(identity.secret.as_str()),
            Some(&identity.user_id.to_string())
        );
    }

    #[tokio::test]
    async fn test_periodic_task_stops_on_cancel() {
        // テスト項目: 定期保存タスクはキャンセルで停止する
        // given (前提条件):
        let path = temp_snapshot_path();
        let (manager, _identities, _history) = create_manager(&path);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(
            Arc::new(manager).run_periodic(Duration::from_millis(10), shutdown.clone()),
        );

        // when (操作):
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        // then (期待する結果):
        assert!(tokio::time::timeout(Duration::from_secs(1), task).await.is_ok());
        assert!(path.exists());

        let _ = std::fs::remove_file(&path);
    }
}
