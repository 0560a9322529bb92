//! Signed, time-bounded session tokens.
//!
//! Tokens are HS256 JWTs carrying `iss`, `sub`, `iat` and `exp`. The issuer
//! tag tells access tokens apart from refresh tokens. Verification is local;
//! revocation lives in the document store and is checked separately.

use crate::error::{ChirpyError, Result};
use crate::store::DocumentStore;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const ACCESS_ISSUER: &str = "chirpy-access";
pub const REFRESH_ISSUER: &str = "chirpy-refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn issuer(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_ISSUER,
            TokenKind::Refresh => REFRESH_ISSUER,
        }
    }

    pub fn from_issuer(issuer: &str) -> Option<Self> {
        match issuer {
            ACCESS_ISSUER => Some(TokenKind::Access),
            REFRESH_ISSUER => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_issuer(&self.iss)
    }

    /// The subject parsed back into a user ID.
    pub fn user_id(&self) -> Result<u32> {
        self.sub
            .parse()
            .map_err(|_| ChirpyError::unauthorized("token subject is not a user id"))
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    store: Arc<DocumentStore>,
}

impl TokenService {
    pub fn new(secret: &[u8], store: Arc<DocumentStore>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            store,
        }
    }

    /// Sign a token for `user_id` valid for `ttl` from now.
    pub fn issue(&self, kind: TokenKind, user_id: u32, ttl: Duration) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: kind.issuer().to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ChirpyError::Token(e.to_string()))
    }

    /// Check signature, structure and expiry. Does not consult revocation.
    pub fn verify(&self, raw_token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        decode::<Claims>(raw_token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ChirpyError::unauthorized(format!("invalid token: {e}")))
    }

    /// Record `raw_token` as revoked. Returns false if it already was.
    pub fn revoke(&self, raw_token: &str) -> Result<bool> {
        let newly = self.store.write(|doc| Ok(doc.revoke(raw_token)))?;
        if newly {
            info!("Revoked token");
        }
        Ok(newly)
    }

    pub fn is_revoked(&self, raw_token: &str) -> Result<bool> {
        self.store.read(|doc| Ok(doc.is_revoked(raw_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn service(dir: &tempfile::TempDir, secret: &[u8]) -> TokenService {
        let store = Arc::new(DocumentStore::open(dir.path().join("db.json")).unwrap());
        TokenService::new(secret, store)
    }

    #[test]
    fn test_issue_and_verify() {
        let dir = tempdir().unwrap();
        let tokens = service(&dir, b"secret");
        let raw = tokens
            .issue(TokenKind::Refresh, 42, Duration::from_secs(60))
            .unwrap();
        let claims = tokens.verify(&raw).unwrap();
        assert_eq!(claims.kind(), Some(TokenKind::Refresh));
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let dir = tempdir().unwrap();
        let raw = service(&dir, b"one")
            .issue(TokenKind::Access, 1, Duration::from_secs(60))
            .unwrap();
        let other = service(&dir, b"two");
        assert!(matches!(other.verify(&raw), Err(ChirpyError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let dir = tempdir().unwrap();
        let tokens = service(&dir, b"secret");
        let now = chrono::Utc::now().timestamp();
        let raw = tokens
            .sign(&Claims {
                iss: ACCESS_ISSUER.to_string(),
                sub: "1".to_string(),
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();
        assert!(matches!(tokens.verify(&raw), Err(ChirpyError::Unauthorized(_))));
    }

    #[test]
    fn test_malformed_token_is_unauthorized() {
        let dir = tempdir().unwrap();
        let tokens = service(&dir, b"secret");
        assert!(matches!(tokens.verify("not.a.jwt"), Err(ChirpyError::Unauthorized(_))));
    }

    #[test]
    fn test_revocation_is_persisted() {
        let dir = tempdir().unwrap();
        let tokens = service(&dir, b"secret");
        let raw = tokens
            .issue(TokenKind::Refresh, 7, Duration::from_secs(60))
            .unwrap();
        assert!(!tokens.is_revoked(&raw).unwrap());
        assert!(tokens.revoke(&raw).unwrap());
        assert!(!tokens.revoke(&raw).unwrap());
        assert!(tokens.is_revoked(&raw).unwrap());

        let reopened = service(&dir, b"secret");
        assert!(reopened.is_revoked(&raw).unwrap());
        // Revocation does not affect signature verification.
        assert!(reopened.verify(&raw).is_ok());
    }
}
