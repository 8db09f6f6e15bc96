//! InMemory Identity Repository 実装
//!
//! DashMap をインメモリ DB として使用します。シャード単位のロックなので、
//! 異なるトークンの解決同士はほとんど競合しません。

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::domain::{Identity, IdentityRepository, SecretToken, UserId};

/// インメモリ Identity Repository 実装
#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    /// Key: secret token, Value: user id
    identities: DashMap<SecretToken, UserId>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh identity and store it without ever overwriting an existing token.
    fn mint(&self) -> Identity {
        loop {
            let identity = Identity::generate();
            match self.identities.entry(identity.secret.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(identity.user_id);
                    return identity;
                }
                Entry::Occupied(_) => {
                    tracing::warn!("Minted secret collided with an existing one, retrying");
                }
            }
        }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn resolve_or_create(&self, secret: Option<SecretToken>) -> Identity {
        if let Some(secret) = secret {
            let known = self.identities.get(&secret).map(|user_id| *user_id);
            if let Some(user_id) = known {
                return Identity::new(secret, user_id);
            }
            tracing::debug!("Unknown secret presented, issuing a new identity");
        }

        let identity = self.mint();
        tracing::info!("Issued new identity for user '{}'", identity.user_id);
        identity
    }

    async fn export(&self) -> Vec<Identity> {
        self.identities
            .iter()
            .map(|entry| Identity::new(entry.key().clone(), *entry.value()))
            .collect()
    }

    async fn restore(&self, identities: Vec<Identity>) {
        for identity in identities {
            self.identities.insert(identity.secret, identity.user_id);
        }
    }
}
