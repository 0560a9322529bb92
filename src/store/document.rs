//! The persisted document and the entities it holds.
//!
//! The whole file is one `Document`. Maps are keyed by ID; on disk
//! serde_json writes the integer keys as strings.

use crate::error::{ChirpyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root aggregate: all chirps, users and revoked tokens.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Document {
    #[serde(default)]
    pub chirps: HashMap<u32, Chirp>,
    #[serde(default)]
    pub users: HashMap<u32, User>,
    #[serde(default)]
    pub revoked_tokens: HashMap<String, String>,
    /// Highest chirp ID ever handed out, including deleted chirps.
    #[serde(default)]
    pub last_chirp_id: u32,
    /// Highest user ID ever handed out.
    #[serde(default)]
    pub last_user_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Chirp {
    pub id: u32,
    pub body: String,
    pub author_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: u32,
    pub email: String,
    /// bcrypt hash, never the plaintext.
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default, rename = "is_chirpy_red")]
    pub is_privileged: bool,
}

/// A user as handed back to callers: everything but the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: u32,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_chirpy_red: user.is_privileged,
        }
    }
}

impl Document {
    /// Reserve the next chirp ID. Accounts for documents written before the
    /// counter was persisted by also looking at the existing keys.
    pub fn next_chirp_id(&mut self) -> Result<u32> {
        let highest = self.chirps.keys().copied().max().unwrap_or(0);
        self.last_chirp_id = successor(self.last_chirp_id.max(highest), "chirp")?;
        Ok(self.last_chirp_id)
    }

    pub fn next_user_id(&mut self) -> Result<u32> {
        let highest = self.users.keys().copied().max().unwrap_or(0);
        self.last_user_id = successor(self.last_user_id.max(highest), "user")?;
        Ok(self.last_user_id)
    }

    /// Keep the user counter ahead of an explicitly chosen ID.
    pub fn observe_user_id(&mut self, id: u32) {
        self.last_user_id = self.last_user_id.max(id);
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|user| user.email == email)
    }

    pub fn is_revoked(&self, raw_token: &str) -> bool {
        self.revoked_tokens.contains_key(raw_token)
    }

    /// Returns false if the token was already revoked.
    pub fn revoke(&mut self, raw_token: &str) -> bool {
        if self.is_revoked(raw_token) {
            return false;
        }
        self.revoked_tokens
            .insert(raw_token.to_string(), raw_token.to_string());
        true
    }
}

fn successor(id: u32, entity: &str) -> Result<u32> {
    id.checked_add(1)
        .ok_or_else(|| ChirpyError::Internal(format!("{entity} ID space exhausted")))
}
