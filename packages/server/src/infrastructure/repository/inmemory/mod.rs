//! InMemory Repository 実装

pub mod history;
pub mod identity;

pub use history::InMemoryRoomHistoryRepository;
pub use identity::InMemoryIdentityRepository;
