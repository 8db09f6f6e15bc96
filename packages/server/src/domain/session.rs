//! Per-connection session state.
//!
//! A session starts `Unbound` and moves to `Bound` exactly once, when the
//! client authenticates. The transition happens under the session's lock, so
//! a concurrent observer sees either no binding or the complete one.

use tokio::sync::Mutex;

use super::{
    error::SessionError,
    value_object::{ConnectionHandle, RoomId, UserId},
};

/// The user and room a connection is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub user_id: UserId,
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Bound(Binding),
}

/// Session of a single WebSocket connection
#[derive(Debug)]
pub struct ConnectionSession {
    handle: ConnectionHandle,
    state: Mutex<SessionState>,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self {
            handle: ConnectionHandle::generate(),
            state: Mutex::new(SessionState::Unbound),
        }
    }

    /// Registry key of this connection
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Bind the session to `user_id` in `room_id`.
    ///
    /// Succeeds only from `Unbound`. A bound session rejects every further
    /// attempt with [`SessionError::AlreadyBound`] and keeps its first binding.
    pub async fn bind(&self, user_id: UserId, room_id: RoomId) -> Result<Binding, SessionError> {
        let mut state = self.state.lock().await;
        if let SessionState::Bound(_) = *state {
            return Err(SessionError::AlreadyBound);
        }
        let binding = Binding { user_id, room_id };
        *state = SessionState::Bound(binding.clone());
        Ok(binding)
    }

    /// Current binding, if the session is bound
    pub async fn binding(&self) -> Option<Binding> {
        match &*self.state.lock().await {
            SessionState::Bound(binding) => Some(binding.clone()),
            SessionState::Unbound => None,
        }
    }

    /// Current binding, or [`SessionError::Unauthenticated`]
    pub async fn require_binding(&self) -> Result<Binding, SessionError> {
        self.binding().await.ok_or(SessionError::Unauthenticated)
    }
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_new_session_is_unbound() {
        // テスト項目: 新しいセッションは未認証状態で始まる
        // given (前提条件):
        let session = ConnectionSession::new();

        // when (操作):
        let result = session.require_binding().await;

        // then (期待する結果):
        assert_eq!(result, Err(SessionError::Unauthenticated));
        assert_eq!(session.binding().await, None);
    }

    #[tokio::test]
    async fn test_bind_succeeds_once() {
        // テスト項目: bind は一度だけ成功し、以降は最初の束縛が保持される
        // given (前提条件):
        let session = ConnectionSession::new();
        let first_user = UserId::generate();
        let second_user = UserId::generate();

        // when (操作):
        let first = session.bind(first_user, RoomId::from("r1")).await;
        let second = session.bind(second_user, RoomId::from("r2")).await;

        // then (期待する結果):
        assert!(first.is_ok());
        assert_eq!(second, Err(SessionError::AlreadyBound));
        let binding = session.require_binding().await.unwrap();
        assert_eq!(binding.user_id, first_user);
        assert_eq!(binding.room_id, RoomId::from("r1"));
    }

    #[tokio::test]
    async fn test_concurrent_bind_has_single_winner() {
        // テスト項目: 並行して bind しても成功するのはちょうど一つ
        // given (前提条件):
        let session = Arc::new(ConnectionSession::new());

        // when (操作):
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move {
                    session
                        .bind(UserId::generate(), RoomId::new(format!("room-{}", i)))
                        .await
                })
            })
            .collect();
        let mut winners = Vec::new();
        for task in tasks {
            if let Ok(binding) = task.await.unwrap() {
                winners.push(binding);
            }
        }

        // then (期待する結果):
        assert_eq!(winners.len(), 1);
        assert_eq!(session.binding().await, Some(winners[0].clone()));
    }

    #[test]
    fn test_each_session_gets_its_own_handle() {
        // テスト項目: セッションごとに異なるハンドルが払い出される
        // given (前提条件):
        let a = ConnectionSession::new();
        let b = ConnectionSession::new();

        // when (操作):

        // then (期待する結果):
        assert_ne!(a.handle(), b.handle());
    }
}
