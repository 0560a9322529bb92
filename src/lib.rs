//! Chirpy: a small posting service backed by a single JSON document.
//!
//! The core is the document store, the chirp/user repository, password
//! hashing and the token service. `web` is the HTTP collaborator that
//! calls into it.

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod repository;
pub mod store;
pub mod tokens;
pub mod web;

pub use error::{ChirpyError, Result};
