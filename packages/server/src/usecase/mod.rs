//! UseCase 層
//!
//! 接続ハンドラから呼ばれるアプリケーションロジック。
//! ドメイン層の trait にのみ依存し、具体的な実装は注入される。

pub mod authenticate;
pub mod disconnect;
pub mod error;
pub mod room_lock;
pub mod send_message;

pub use authenticate::AuthenticateUseCase;
pub use disconnect::DisconnectUseCase;
pub use error::{AuthError, SendMessageError};
pub use room_lock::RoomLocks;
pub use send_message::{SendMessageUseCase, SentMessage};
