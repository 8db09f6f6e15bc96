//! Infrastructure layer: in-memory stores, the WebSocket connection registry,
//! wire DTOs and snapshot persistence.

pub mod dto;
pub mod message_pusher;
pub mod persistence;
pub mod repository;
