//! WebSocket connection handlers.
//!
//! Each connection runs three tasks sharing one cancellation token:
//!
//! - reader: decodes inbound frames and dispatches them to the use cases
//! - writer: drains the connection's outbound channel into the socket
//! - keepalive: queues a `ping` every `ping_interval`
//!
//! When the reader or the writer ends, the token is cancelled and the sibling
//! tasks stop. The connection is then removed from its room.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ConnectionSession, OutboundEvent, PusherChannel, RoomId, SecretToken},
    infrastructure::dto::websocket::{ClientEvent, ServerEvent},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Keeps the shutdown grace period waiting on this connection.
    let _tracked = state.connections.token();

    let session = Arc::new(ConnectionSession::new());
    let cancel = state.shutdown.child_token();
    let (tx, rx) = mpsc::unbounded_channel();
    let (sender, receiver) = socket.split();

    tracing::info!("Connection '{}' opened", session.handle());
    let _ = tx.send(OutboundEvent::Opened);

    let writer = tokio::spawn(writer_loop(rx, sender, cancel.clone()));
    let keepalive = tokio::spawn(keepalive_loop(
        tx.clone(),
        state.ping_interval,
        cancel.clone(),
    ));
    let reader = tokio::spawn(reader_loop(
        receiver,
        state.clone(),
        session.clone(),
        tx,
        cancel.clone(),
    ));

    let (reader, writer, keepalive) = tokio::join!(reader, writer, keepalive);
    for (name, result) in [("reader", reader), ("writer", writer), ("keepalive", keepalive)] {
        if let Err(e) = result {
            tracing::error!(
                "Connection '{}' {} task failed: {}",
                session.handle(),
                name,
                e
            );
        }
    }

    match state.disconnect_usecase.execute(&session).await {
        Some(binding) => tracing::info!(
            "Connection '{}' of user '{}' closed and removed from room '{}'",
            session.handle(),
            binding.user_id,
            binding.room_id
        ),
        None => tracing::info!("Connection '{}' closed before authenticating", session.handle()),
    }
}

/// Drains the outbound channel into the socket.
///
/// A write failure ends the connection. On cancellation a close frame is sent
/// on a best-effort basis.
async fn writer_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundEvent>,
    mut sender: SplitSink<WebSocket, Message>,
    cancel: CancellationToken,
) {
    let _cancel_on_exit = cancel.clone().drop_guard();
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let json = match serde_json::to_string(&ServerEvent::from(event)) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode outbound event: {}", e);
                continue;
            }
        };
        if let Err(e) = sender.send(Message::Text(json.into())).await {
            tracing::warn!("Failed to write to WebSocket: {}", e);
            break;
        }
    }
}

/// Queues a ping every `interval`. The first failed send stops only this task.
async fn keepalive_loop(tx: PusherChannel, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; skip it.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if tx.send(OutboundEvent::Ping).is_err() {
                    tracing::debug!("Keepalive stopped: connection writer is gone");
                    break;
                }
                tracing::trace!("Ping queued");
            }
        }
    }
}

async fn reader_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    session: Arc<ConnectionSession>,
    tx: PusherChannel,
    cancel: CancellationToken,
) {
    let _cancel_on_exit = cancel.clone().drop_guard();
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = receiver.next() => frame,
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::warn!("WebSocket error on '{}': {}", session.handle(), e);
                break;
            }
            None => break,
        };

        match msg {
            Message::Text(text) => dispatch(&state, &session, &tx, text.as_str()).await,
            Message::Close(_) => {
                tracing::debug!("Connection '{}' requested close", session.handle());
                break;
            }
            // Ping/pong is handled automatically by the WebSocket protocol
            _ => {}
        }
    }
}

/// Decode one text frame and run the matching use case.
///
/// Malformed and unknown frames are ignored. Protocol violations are reported
/// to this connection only.
async fn dispatch(state: &AppState, session: &ConnectionSession, tx: &PusherChannel, raw: &str) {
    let event = match ClientEvent::decode(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Ignoring malformed frame on '{}': {}", session.handle(), e);
            return;
        }
    };

    match event {
        ClientEvent::Auth(auth) => {
            let secret = SecretToken::from_client(auth.secret);
            let room_id = RoomId::new(auth.room_id);
            if let Err(e) = state
                .authenticate_usecase
                .execute(session, secret, room_id, tx.clone())
                .await
            {
                tracing::warn!("Auth rejected on '{}': {}", session.handle(), e);
                let _ = tx.send(OutboundEvent::Rejected(e.to_string()));
            }
        }
        ClientEvent::Send(send) => {
            if let Err(e) = state.send_message_usecase.execute(session, send.text).await {
                tracing::warn!("Send rejected on '{}': {}", session.handle(), e);
                let _ = tx.send(OutboundEvent::Rejected(e.to_string()));
            }
        }
        ClientEvent::Unknown(kind) => {
            tracing::debug!("Ignoring unknown event '{}' on '{}'", kind, session.handle());
        }
    }
}
