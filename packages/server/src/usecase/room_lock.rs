//! Per-room sequencing lock.
//!
//! `send` appends and broadcasts under this lock, and `auth` captures the
//! history snapshot and registers the connection under it. A joining client
//! therefore sees every message exactly once: either in its history snapshot
//! or as a live broadcast, in the room's append order.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::RoomId;

#[derive(Debug, Default)]
pub struct RoomLocks {
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `room_id`. Other rooms are unaffected.
    pub async fn acquire(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(room_id.clone()).or_default().value().clone();
        lock.lock_owned().await
    }
}
