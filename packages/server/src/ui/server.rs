//! Server execution logic.

use std::{
    future::{Future, IntoFuture},
    sync::Arc,
    time::Duration,
};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, time::Instant};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::trace::TraceLayer;

use crate::{
    infrastructure::persistence::SnapshotManager,
    usecase::{AuthenticateUseCase, DisconnectUseCase, SendMessageUseCase},
};

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Runtime settings of the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Interval between keepalive pings on each connection
    pub ping_interval: Duration,
    /// How long shutdown waits for open connections before persisting
    pub shutdown_grace: Duration,
    /// Periodic snapshot interval; `None` persists only at shutdown
    pub snapshot_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            ping_interval: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(3),
            snapshot_interval: None,
        }
    }
}

/// WebSocket chat server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     authenticate_usecase,
///     send_message_usecase,
///     disconnect_usecase,
///     snapshot_manager,
///     ServerConfig::default(),
/// );
/// server.run().await?;
/// ```
pub struct Server {
    /// AuthenticateUseCase（認証とルーム参加のユースケース）
    authenticate_usecase: Arc<AuthenticateUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    send_message_usecase: Arc<SendMessageUseCase>,
    /// DisconnectUseCase（切断のユースケース）
    disconnect_usecase: Arc<DisconnectUseCase>,
    /// SnapshotManager（スナップショットの永続化）
    snapshot_manager: Arc<SnapshotManager>,
    config: ServerConfig,
}

impl Server {
    pub fn new(
        authenticate_usecase: Arc<AuthenticateUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        disconnect_usecase: Arc<DisconnectUseCase>,
        snapshot_manager: Arc<SnapshotManager>,
        config: ServerConfig,
    ) -> Self {
        Self {
            authenticate_usecase,
            send_message_usecase,
            disconnect_usecase,
            snapshot_manager,
            config,
        }
    }

    /// Bind to the configured host and port and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Hiroba chat server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on `listener` until `signal` resolves.
    ///
    /// Shutdown stops accepting connections and closes the open ones. HTTP
    /// requests and WebSocket connections together get one grace period to
    /// finish; the snapshot is written regardless of stragglers.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let connections = TaskTracker::new();

        let app_state = Arc::new(AppState {
            authenticate_usecase: self.authenticate_usecase,
            send_message_usecase: self.send_message_usecase,
            disconnect_usecase: self.disconnect_usecase,
            ping_interval: self.config.ping_interval,
            shutdown: shutdown.clone(),
            connections: connections.clone(),
        });

        // Define handlers
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        let periodic_snapshots = self.config.snapshot_interval.map(|interval| {
            tracing::info!("Writing snapshots every {:?}", interval);
            tokio::spawn(
                self.snapshot_manager
                    .clone()
                    .run_periodic(interval, shutdown.clone()),
            )
        });

        let on_signal = {
            let shutdown = shutdown.clone();
            async move {
                signal.await;
                shutdown.cancel();
            }
        };
        let serving = axum::serve(listener, app)
            .with_graceful_shutdown(on_signal)
            .into_future();
        tokio::pin!(serving);

        // The grace period starts when shutdown is requested and bounds both
        // the HTTP drain and the wait for WebSocket connections.
        let mut grace_deadline: Option<Instant> = None;
        let served = loop {
            tokio::select! {
                result = &mut serving => break result,
                _ = shutdown.cancelled(), if grace_deadline.is_none() => {
                    grace_deadline = Some(Instant::now() + self.config.shutdown_grace);
                }
                _ = tokio::time::sleep_until(grace_deadline.unwrap_or_else(Instant::now)),
                    if grace_deadline.is_some() =>
                {
                    tracing::warn!(
                        "HTTP connections still open after {:?}, stopping anyway",
                        self.config.shutdown_grace
                    );
                    break Ok(());
                }
            }
        };

        // Also reached when serve fails; close connections either way.
        shutdown.cancel();
        connections.close();
        let deadline =
            grace_deadline.unwrap_or_else(|| Instant::now() + self.config.shutdown_grace);
        if tokio::time::timeout_at(deadline, connections.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "{} connections still open after {:?}, persisting anyway",
                connections.len(),
                self.config.shutdown_grace
            );
        }
        if let Some(task) = periodic_snapshots {
            let _ = task.await;
        }

        self.snapshot_manager.persist_or_log().await;
        served
    }
}
