//! Hiroba multi-room chat server library.
//!
//! Clients connect over WebSocket, authenticate with a bearer secret (or receive
//! a fresh pseudonymous identity), join a room, replay its history and exchange
//! live messages with the other participants of that room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
