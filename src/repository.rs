//! Chirp and user operations on top of the document store.
//!
//! Mutations run as one `load -> validate -> mutate -> persist` critical
//! section under the store's exclusive lock. Lookups take the shared lock.

use crate::error::{ChirpyError, Result};
use crate::identity;
use crate::store::{Chirp, DocumentStore, User, UserView};
use std::sync::Arc;
use tracing::info;

pub const MAX_CHIRP_LENGTH: usize = 140;

pub fn default_banned_words() -> Vec<String> {
    vec![
        "kerfuffle".to_string(),
        "sharbert".to_string(),
        "fornax".to_string(),
    ]
}

/// Rules applied to a chirp body at creation time.
#[derive(Debug, Clone)]
pub struct ChirpPolicy {
    pub max_length: usize,
    /// Stored lowercased.
    banned_words: Vec<String>,
}

impl ChirpPolicy {
    pub fn new(max_length: usize, banned_words: Vec<String>) -> Self {
        Self {
            max_length,
            banned_words: banned_words
                .iter()
                .filter(|w| !w.is_empty())
                .map(|w| w.to_lowercase())
                .collect(),
        }
    }

    /// Length is counted in characters, not bytes.
    pub fn validate(&self, body: &str) -> Result<()> {
        if body.chars().count() > self.max_length {
            return Err(ChirpyError::Validation("Chirp is too long".to_string()));
        }
        let lowered = body.to_lowercase();
        if self.banned_words.iter().any(|word| lowered.contains(word.as_str())) {
            return Err(ChirpyError::Validation(
                "Chirp contains a banned word".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChirpPolicy {
    fn default() -> Self {
        Self::new(MAX_CHIRP_LENGTH, default_banned_words())
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    store: Arc<DocumentStore>,
    policy: ChirpPolicy,
}

impl Repository {
    pub fn new(store: Arc<DocumentStore>, policy: ChirpPolicy) -> Self {
        Self { store, policy }
    }

    pub fn create_chirp(&self, body: &str, author_id: u32) -> Result<Chirp> {
        self.policy.validate(body)?;
        let chirp = self.store.write(|doc| {
            let id = doc.next_chirp_id()?;
            let chirp = Chirp {
                id,
                body: body.to_string(),
                author_id,
            };
            doc.chirps.insert(id, chirp.clone());
            Ok(chirp)
        })?;
        info!("Created chirp {} by user {}", chirp.id, author_id);
        Ok(chirp)
    }

    pub fn delete_chirp(&self, chirp_id: u32, author_id: u32) -> Result<()> {
        self.store.write(|doc| {
            let chirp = doc
                .chirps
                .get(&chirp_id)
                .ok_or_else(|| ChirpyError::not_found("chirp not found"))?;
            if chirp.author_id != author_id {
                return Err(ChirpyError::Forbidden(
                    "you are not the owner of this chirp".to_string(),
                ));
            }
            doc.chirps.remove(&chirp_id);
            Ok(())
        })?;
        info!("Deleted chirp {}", chirp_id);
        Ok(())
    }

    /// All chirps, or only those by `author_id`, ascending by ID.
    pub fn list_chirps(&self, author_id: Option<u32>) -> Result<Vec<Chirp>> {
        self.store.read(|doc| {
            let mut chirps: Vec<Chirp> = doc
                .chirps
                .values()
                .filter(|chirp| author_id.is_none_or(|author| chirp.author_id == author))
                .cloned()
                .collect();
            if author_id.is_some() && chirps.is_empty() {
                return Err(ChirpyError::not_found("no chirps for this author"));
            }
            chirps.sort_by_key(|chirp| chirp.id);
            Ok(chirps)
        })
    }

    pub fn get_chirp(&self, chirp_id: u32) -> Result<Chirp> {
        self.store.read(|doc| {
            doc.chirps
                .get(&chirp_id)
                .cloned()
                .ok_or_else(|| ChirpyError::not_found("chirp not found"))
        })
    }

    pub fn create_user(&self, password: &str, email: &str) -> Result<UserView> {
        let password_hash = identity::hash_password(password)?;
        let user = self.store.write(|doc| {
            ensure_unique_email(doc, email)?;
            let id = doc.next_user_id()?;
            let user = User {
                id,
                email: email.to_string(),
                password_hash,
                is_privileged: false,
            };
            let view = UserView::from(&user);
            doc.users.insert(id, user);
            Ok(view)
        })?;
        info!("Created user {}", user.id);
        Ok(user)
    }

    /// Store `email`/`password` under `user_id`, overwriting any user with that
    /// ID. The duplicate-email check is unconditional, so resubmitting the
    /// caller's own current email fails with `Conflict`. The stored user starts
    /// unprivileged, like a freshly created one.
    pub fn update_user(&self, email: &str, password: &str, user_id: u32) -> Result<UserView> {
        let password_hash = identity::hash_password(password)?;
        let user = self.store.write(|doc| {
            ensure_unique_email(doc, email)?;
            let user = User {
                id: user_id,
                email: email.to_string(),
                password_hash,
                is_privileged: false,
            };
            let view = UserView::from(&user);
            doc.users.insert(user_id, user);
            doc.observe_user_id(user_id);
            Ok(view)
        })?;
        info!("Updated user {}", user_id);
        Ok(user)
    }

    /// Full user record, hash included, for credential checks.
    pub fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.store.read(|doc| {
            doc.user_by_email(email)
                .cloned()
                .ok_or_else(|| ChirpyError::not_found("user not found"))
        })
    }

    /// Set the privileged flag, as reported by the payment provider.
    pub fn upgrade_user(&self, user_id: u32) -> Result<UserView> {
        let user = self.store.write(|doc| {
            let user = doc
                .users
                .get_mut(&user_id)
                .ok_or_else(|| ChirpyError::not_found("user not found"))?;
            user.is_privileged = true;
            Ok(UserView::from(&*user))
        })?;
        info!("Upgraded user {}", user_id);
        Ok(user)
    }
}

fn ensure_unique_email(doc: &crate::store::Document, email: &str) -> Result<()> {
    if doc.user_by_email(email).is_some() {
        return Err(ChirpyError::Conflict("user already exists".to_string()));
    }
    Ok(())
}
