//! Client identity token.
//!
//! A random hex token generated once and kept in the local store.
//! It tags the WebSocket connection so the server can count distinct
//! clients; it is not a credential.

use crate::error::Result;
use crate::storage::{LocalStore, CLIENT_ID_KEY};
use rand::RngCore;
use std::fmt;
use tracing::info;

/// Random bytes per token.
const TOKEN_BYTES: usize = 16;

/// Stable opaque token identifying this client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Load the persisted token, generating and storing one on first use.
    pub fn load_or_create(store: &LocalStore) -> Result<Self> {
        if let Some(existing) = store.get(CLIENT_ID_KEY)? {
            if !existing.trim().is_empty() {
                return Ok(Self(existing));
            }
        }

        let identity = Self::generate();
        store.put(CLIENT_ID_KEY, identity.as_str())?;
        info!(client_id = %identity, "Generated new client identity");
        Ok(identity)
    }

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
