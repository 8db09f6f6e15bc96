//! Data Transfer Objects (DTOs) for the chat server.
//!
//! - `websocket`: WebSocket frame DTOs, also used for the snapshot's message layout
//! - `conversion`: DTO ↔ domain conversions

pub mod conversion;
pub mod websocket;
