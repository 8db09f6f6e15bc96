//! Hiroba multi-room chat server.
//!
//! Restores identities and room history from the snapshot file, serves
//! WebSocket clients on `/ws` and writes the snapshot back on shutdown.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --data-file /var/lib/hiroba/data.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use hiroba_server::{
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        persistence::SnapshotManager,
        repository::{InMemoryIdentityRepository, InMemoryRoomHistoryRepository},
    },
    ui::{Server, ServerConfig},
    usecase::{AuthenticateUseCase, DisconnectUseCase, RoomLocks, SendMessageUseCase},
};
use hiroba_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Multi-room WebSocket chat server with persistent history", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8081")]
    port: u16,

    /// Snapshot file restored at startup and written at shutdown
    #[arg(short = 'd', long, default_value = "data.json")]
    data_file: PathBuf,

    /// Seconds between keepalive pings on each connection
    #[arg(long, default_value = "60")]
    ping_interval_secs: u64,

    /// Seconds to wait for open connections on shutdown before persisting
    #[arg(long, default_value = "3")]
    shutdown_grace_secs: u64,

    /// Seconds between periodic snapshots (0 disables them)
    #[arg(long, default_value = "0")]
    snapshot_interval_secs: u64,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            snapshot_interval: (self.snapshot_interval_secs > 0)
                .then(|| Duration::from_secs(self.snapshot_interval_secs)),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. Snapshot restore
    // 3. MessagePusher
    // 4. UseCases
    // 5. Server

    // 1. Create Repositories (in-memory database)
    let identity_repository = Arc::new(InMemoryIdentityRepository::new());
    let history_repository = Arc::new(InMemoryRoomHistoryRepository::new());

    // 2. Restore the last snapshot, if any
    let snapshot_manager = Arc::new(SnapshotManager::new(
        args.data_file.clone(),
        identity_repository.clone(),
        history_repository.clone(),
    ));
    snapshot_manager.restore().await;

    // 3. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 4. Create UseCases
    let room_locks = Arc::new(RoomLocks::new());
    let authenticate_usecase = Arc::new(AuthenticateUseCase::new(
        identity_repository.clone(),
        history_repository.clone(),
        message_pusher.clone(),
        room_locks.clone(),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        history_repository.clone(),
        message_pusher.clone(),
        room_locks,
        Arc::new(SystemClock),
    ));
    let disconnect_usecase = Arc::new(DisconnectUseCase::new(message_pusher));

    // 5. Create and run the server
    let server = Server::new(
        authenticate_usecase,
        send_message_usecase,
        disconnect_usecase,
        snapshot_manager,
        args.server_config(),
    );
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
