//! UI layer: HTTP router, WebSocket connection handling and server lifecycle.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, ServerConfig};
pub use signal::shutdown_signal;
