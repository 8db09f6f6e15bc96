//! Shared application state.

use std::{sync::Arc, time::Duration};

use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::usecase::{AuthenticateUseCase, DisconnectUseCase, SendMessageUseCase};

/// Shared application state
pub struct AppState {
    /// AuthenticateUseCase（認証とルーム参加のユースケース）
    pub authenticate_usecase: Arc<AuthenticateUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// DisconnectUseCase（切断のユースケース）
    pub disconnect_usecase: Arc<DisconnectUseCase>,
    /// Interval between keepalive pings
    pub ping_interval: Duration,
    /// Cancelled on shutdown; every connection's token is a child of it
    pub shutdown: CancellationToken,
    /// Tracks open connections for the shutdown grace period
    pub connections: TaskTracker,
}
