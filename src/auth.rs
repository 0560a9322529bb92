//! Login, refresh-token exchange, revocation and bearer authentication.
//!
//! Refresh and revoke always consult the revocation set. Access tokens are
//! only checked against it when `TokenPolicy::revoke_access_tokens` is set;
//! by default a revoked access token stays usable until it expires.

use crate::error::{ChirpyError, Result};
use crate::identity;
use crate::repository::Repository;
use crate::store::UserView;
use crate::tokens::{Claims, TokenKind, TokenService};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(5_184_000);

#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub revoke_access_tokens: bool,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            revoke_access_tokens: false,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    repo: Repository,
    tokens: TokenService,
    policy: TokenPolicy,
}

impl SessionManager {
    pub fn new(repo: Repository, tokens: TokenService, policy: TokenPolicy) -> Self {
        Self { repo, tokens, policy }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let user = self.repo.find_user_by_email(email)?;
        if let Err(e) = identity::verify_password(&user.password_hash, password) {
            warn!("Failed login attempt for user {}", user.id);
            return Err(e);
        }
        let access_token = self
            .tokens
            .issue(TokenKind::Access, user.id, self.policy.access_ttl)?;
        let refresh_token = self
            .tokens
            .issue(TokenKind::Refresh, user.id, self.policy.refresh_ttl)?;
        info!("User {} logged in", user.id);
        Ok(Session {
            user: UserView::from(&user),
            access_token,
            refresh_token,
        })
    }

    /// Exchange an unrevoked refresh token for a new access token.
    pub fn refresh(&self, raw_token: &str) -> Result<String> {
        let claims = self.verify_kind(raw_token, TokenKind::Refresh)?;
        if self.tokens.is_revoked(raw_token)? {
            return Err(ChirpyError::unauthorized("Revoked token"));
        }
        self.tokens
            .issue(TokenKind::Access, claims.user_id()?, self.policy.access_ttl)
    }

    /// Revoke a refresh token. Revoking it a second time is `Unauthorized`.
    pub fn revoke(&self, raw_token: &str) -> Result<()> {
        self.verify_kind(raw_token, TokenKind::Refresh)?;
        if !self.tokens.revoke(raw_token)? {
            return Err(ChirpyError::unauthorized("Revoked token"));
        }
        Ok(())
    }

    /// Resolve an access token to the user ID it was issued for.
    pub fn authenticate(&self, raw_token: &str) -> Result<u32> {
        let claims = self.verify_kind(raw_token, TokenKind::Access)?;
        if self.policy.revoke_access_tokens && self.tokens.is_revoked(raw_token)? {
            return Err(ChirpyError::unauthorized("Revoked token"));
        }
        claims.user_id()
    }

    fn verify_kind(&self, raw_token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = self.tokens.verify(raw_token)?;
        match claims.kind() {
            Some(kind) if kind == expected => Ok(claims),
            Some(TokenKind::Refresh) => Err(ChirpyError::unauthorized("token is a refresh token")),
            Some(TokenKind::Access) => Err(ChirpyError::unauthorized("token is not a refresh token")),
            None => Err(ChirpyError::unauthorized("unknown token issuer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ChirpPolicy;
    use crate::store::DocumentStore;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn sessions(policy: TokenPolicy) -> (TempDir, SessionManager) {
        let dir = tempdir().unwrap();
        let store = Arc::new(DocumentStore::open(dir.path().join("db.json")).unwrap());
        let repo = Repository::new(store.clone(), ChirpPolicy::default());
        let tokens = TokenService::new(b"test-secret", store);
        (dir, SessionManager::new(repo, tokens, policy))
    }

    fn register(manager: &SessionManager, email: &str, password: &str) -> UserView {
        manager.repo.create_user(password, email).unwrap()
    }

    #[test]
    fn test_login_issues_both_tokens() {
        let (_dir, manager) = sessions(TokenPolicy::default());
        let user = register(&manager, "a@b.com", "pw");
        let session = manager.login("a@b.com", "pw").unwrap();
        assert_eq!(session.user, user);
        assert_eq!(manager.authenticate(&session.access_token).unwrap(), user.id);
        let refresh = manager.tokens.verify(&session.refresh_token).unwrap();
        assert_eq!(refresh.kind(), Some(TokenKind::Refresh));
        assert_eq!(refresh.exp - refresh.iat, 5_184_000);
    }

    #[test]
    fn test_login_failures() {
        let (_dir, manager) = sessions(TokenPolicy::default());
        register(&manager, "a@b.com", "pw");
        assert!(matches!(
            manager.login("nobody@b.com", "pw"),
            Err(ChirpyError::NotFound(_))
        ));
        assert!(matches!(
            manager.login("a@b.com", "wrong"),
            Err(ChirpyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_refresh_then_revoke() {
        let (_dir, manager) = sessions(TokenPolicy::default());
        let user = register(&manager, "a@b.com", "pw");
        let session = manager.login("a@b.com", "pw").unwrap();

        let access = manager.refresh(&session.refresh_token).unwrap();
        let claims = manager.tokens.verify(&access).unwrap();
        assert_eq!(claims.kind(), Some(TokenKind::Access));
        assert_eq!(claims.user_id().unwrap(), user.id);

        manager.revoke(&session.refresh_token).unwrap();
        assert!(matches!(
            manager.refresh(&session.refresh_token),
            Err(ChirpyError::Unauthorized(_))
        ));
        assert!(matches!(
            manager.revoke(&session.refresh_token),
            Err(ChirpyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let (_dir, manager) = sessions(TokenPolicy::default());
        register(&manager, "a@b.com", "pw");
        let session = manager.login("a@b.com", "pw").unwrap();
        assert!(matches!(
            manager.refresh(&session.access_token),
            Err(ChirpyError::Unauthorized(_))
        ));
        assert!(matches!(
            manager.revoke(&session.access_token),
            Err(ChirpyError::Unauthorized(_))
        ));
        assert!(matches!(
            manager.authenticate(&session.refresh_token),
            Err(ChirpyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_revoked_access_token_still_authenticates_by_default() {
        let (_dir, manager) = sessions(TokenPolicy::default());
        let user = register(&manager, "a@b.com", "pw");
        let session = manager.login("a@b.com", "pw").unwrap();
        manager.tokens.revoke(&session.access_token).unwrap();
        assert_eq!(manager.authenticate(&session.access_token).unwrap(), user.id);
    }

    #[test]
    fn test_revoked_access_token_rejected_when_enforced() {
        let policy = TokenPolicy {
            revoke_access_tokens: true,
            ..TokenPolicy::default()
        };
        let (_dir, manager) = sessions(policy);
        register(&manager, "a@b.com", "pw");
        let session = manager.login("a@b.com", "pw").unwrap();
        manager.tokens.revoke(&session.access_token).unwrap();
        assert!(matches!(
            manager.authenticate(&session.access_token),
            Err(ChirpyError::Unauthorized(_))
        ));
    }
}
