//! Local stand-in for an auth backend

use async_trait::async_trait;
use expiry_core::{
    AuthSession, Clock, MemoryTokenStore, SessionError, Token, TokenClaims, TokenError, TokenStore,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Issues unsigned tokens on refresh and clears the store on logout
pub struct LocalSession {
    store: Arc<MemoryTokenStore>,
    clock: Arc<dyn Clock>,
    lifetime_secs: i64,
    refresh_fails: bool,
}

impl LocalSession {
    pub fn new(
        store: Arc<MemoryTokenStore>,
        clock: Arc<dyn Clock>,
        lifetime_secs: i64,
        refresh_fails: bool,
    ) -> Self {
        Self {
            store,
            clock,
            lifetime_secs,
            refresh_fails,
        }
    }

    /// Mint an unsigned token for the local user, valid for `lifetime_secs`
    pub fn issue_token(clock: &dyn Clock, lifetime_secs: i64) -> Result<Token, TokenError> {
        let now = clock.now_secs();
        let claims = TokenClaims {
            exp: Some(now.saturating_add(lifetime_secs)),
            iat: Some(now),
            sub: Some("local".to_string()),
        };
        claims.to_unsigned_token()
    }
}

#[async_trait]
impl AuthSession for LocalSession {
    async fn refresh_auth(&self) -> Result<(), SessionError> {
        if self.refresh_fails {
            return Err(SessionError::rejected("refresh disabled by --refresh-fails"));
        }

        let token = Self::issue_token(self.clock.as_ref(), self.lifetime_secs)
            .map_err(|e| SessionError::Other(e.to_string()))?;

        // Keep the slot the user originally logged in with
        let persist = self.store.is_persistent();
        self.store.set_token(token, persist);
        info!("Issued token valid for {}s", self.lifetime_secs);
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        debug!("Clearing local credentials");
        self.store.clear_token();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expiry_core::decode_claims;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_secs(&self) -> i64 {
            self.0
        }
    }

    fn session(refresh_fails: bool) -> (Arc<MemoryTokenStore>, LocalSession) {
        let store = Arc::new(MemoryTokenStore::new());
        let session = LocalSession::new(
            store.clone(),
            Arc::new(FixedClock(1_000)),
            600,
            refresh_fails,
        );
        (store, session)
    }

    fn stored_claims(store: &MemoryTokenStore) -> TokenClaims {
        let token = store.get_token().unwrap();
        store.decode_token(&token).unwrap()
    }

    #[test]
    fn test_issued_token_expires_after_lifetime() {
        let token = LocalSession::issue_token(&FixedClock(5_000), 320).unwrap();
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.exp, Some(5_320));
        assert_eq!(claims.seconds_until_expiry(5_000), Some(320));
        assert_eq!(claims.sub.as_deref(), Some("local"));
    }

    #[tokio::test]
    async fn test_refresh_issues_token() {
        let (store, session) = session(false);
        session.refresh_auth().await.unwrap();

        let claims = stored_claims(&store);
        assert_eq!(claims.exp, Some(1_600));
        assert_eq!(claims.iat, Some(1_000));
    }

    #[tokio::test]
    async fn test_refresh_keeps_persistent_slot() {
        let (store, session) = session(false);
        store.set_token(TokenClaims::expiring_at(1_010).to_unsigned_token().unwrap(), true);

        session.refresh_auth().await.unwrap();
        assert!(store.is_persistent());
        assert_eq!(stored_claims(&store).exp, Some(1_600));
    }

    #[tokio::test]
    async fn test_refresh_can_be_made_to_fail() {
        let (store, session) = session(true);
        assert!(matches!(
            session.refresh_auth().await,
            Err(SessionError::RefreshRejected(_))
        ));
        assert!(store.get_token().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let (store, session) = session(false);
        session.refresh_auth().await.unwrap();

        session.logout().await.unwrap();
        session.logout().await.unwrap();
        assert!(store.get_token().is_none());
    }
}
