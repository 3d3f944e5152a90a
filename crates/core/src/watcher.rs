//! Expiration check performed on every poll

use crate::clock::Clock;
use crate::error::{MonitorError, Result};
use crate::token::TokenStore;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a single expiration check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No token, or nothing usable in it; never forces logout
    NoToken,
    /// Token is valid for longer than the warning threshold
    NotExpiring,
    /// Token expires within the threshold; warn with this many seconds left
    Armed(u64),
    /// Token is already expired; end the session without warning
    ExpiredForceLogout,
}

impl Decision {
    /// Classify a remaining lifetime against the warning threshold.
    ///
    /// The threshold is inclusive.
    #[must_use]
    pub fn classify(time_until_expiry: i64, warning_threshold_secs: u64) -> Self {
        if time_until_expiry <= 0 {
            return Self::ExpiredForceLogout;
        }
        let remaining = time_until_expiry.unsigned_abs();
        if remaining <= warning_threshold_secs {
            Self::Armed(remaining)
        } else {
            Self::NotExpiring
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoToken => write!(f, "no token"),
            Self::NotExpiring => write!(f, "not expiring"),
            Self::Armed(secs) => write!(f, "armed ({secs}s left)"),
            Self::ExpiredForceLogout => write!(f, "expired"),
        }
    }
}

/// Reads the token store and decides what the monitor should do
#[derive(Clone)]
pub struct ExpirationWatcher {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    warning_threshold_secs: u64,
}

impl ExpirationWatcher {
    pub fn new(
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        warning_threshold_secs: u64,
    ) -> Self {
        Self {
            store,
            clock,
            warning_threshold_secs,
        }
    }

    /// Seconds until the current token expires
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::TokenUnavailable`] if there is no token or it
    /// carries no usable expiry
    pub fn time_until_expiry(&self) -> Result<i64> {
        let token = self
            .store
            .get_token()
            .ok_or_else(|| MonitorError::TokenUnavailable("no token stored".to_string()))?;

        let claims = self
            .store
            .decode_token(&token)
            .ok_or_else(|| MonitorError::TokenUnavailable("token is undecodable".to_string()))?;

        claims
            .seconds_until_expiry(self.clock.now_secs())
            .ok_or_else(|| MonitorError::TokenUnavailable("token has no expiry".to_string()))
    }

    /// Inspect the current token snapshot. Never mutates anything.
    pub fn check_expiration(&self) -> Decision {
        match self.time_until_expiry() {
            Ok(time_until_expiry) => {
                Decision::classify(time_until_expiry, self.warning_threshold_secs)
            }
            Err(e) => {
                debug!("Expiration check skipped: {}", e);
                Decision::NoToken
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::mock::MockTokenStore;
    use crate::token::{Token, TokenClaims};

    const NOW: i64 = 1_700_000_000;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_secs(&self) -> i64 {
            self.0
        }
    }

    fn watcher_for(store: MockTokenStore) -> ExpirationWatcher {
        ExpirationWatcher::new(Arc::new(store), Arc::new(FixedClock(NOW)), 300)
    }

    fn store_expiring_in(secs: i64) -> MockTokenStore {
        let mut store = MockTokenStore::new();
        store
            .expect_get_token()
            .returning(|| Some(Token::from("a.b.c")));
        store
            .expect_decode_token()
            .returning(move |_| Some(TokenClaims::expiring_at(NOW + secs)));
        store
    }

    #[test]
    fn test_classify_threshold_is_inclusive() {
        assert_eq!(Decision::classify(300, 300), Decision::Armed(300));
        assert_eq!(Decision::classify(301, 300), Decision::NotExpiring);
        assert_eq!(Decision::classify(1, 300), Decision::Armed(1));
        assert_eq!(Decision::classify(0, 300), Decision::ExpiredForceLogout);
        assert_eq!(Decision::classify(-1, 300), Decision::ExpiredForceLogout);
    }

    #[test]
    fn test_classify_ranges() {
        for t in [301, 302, 600, 3600, 86_400, i64::MAX] {
            assert_eq!(Decision::classify(t, 300), Decision::NotExpiring, "t={t}");
        }
        for t in 1..=300 {
            assert_eq!(
                Decision::classify(t, 300),
                Decision::Armed(t.unsigned_abs()),
                "t={t}"
            );
        }
        for t in [0, -1, -299, -86_400, i64::MIN] {
            assert_eq!(
                Decision::classify(t, 300),
                Decision::ExpiredForceLogout,
                "t={t}"
            );
        }
    }

    #[test]
    fn test_check_without_token() {
        let mut store = MockTokenStore::new();
        store.expect_get_token().times(1).returning(|| None);
        store.expect_decode_token().never();
        store.expect_clear_token().never();

        assert_eq!(watcher_for(store).check_expiration(), Decision::NoToken);
    }

    #[test]
    fn test_check_with_undecodable_token() {
        let mut store = MockTokenStore::new();
        store
            .expect_get_token()
            .returning(|| Some(Token::from("garbage")));
        store.expect_decode_token().times(1).returning(|_| None);

        let watcher = watcher_for(store);
        assert_eq!(watcher.check_expiration(), Decision::NoToken);
        assert!(matches!(
            watcher.time_until_expiry(),
            Err(MonitorError::TokenUnavailable(_))
        ));
    }

    #[test]
    fn test_check_with_missing_exp() {
        let mut store = MockTokenStore::new();
        store
            .expect_get_token()
            .returning(|| Some(Token::from("a.b.c")));
        store
            .expect_decode_token()
            .returning(|_| Some(TokenClaims::default()));

        assert_eq!(watcher_for(store).check_expiration(), Decision::NoToken);
    }

    #[test]
    fn test_check_decisions() {
        assert_eq!(
            watcher_for(store_expiring_in(250)).check_expiration(),
            Decision::Armed(250)
        );
        assert_eq!(
            watcher_for(store_expiring_in(3600)).check_expiration(),
            Decision::NotExpiring
        );
        assert_eq!(
            watcher_for(store_expiring_in(-10)).check_expiration(),
            Decision::ExpiredForceLogout
        );
        assert_eq!(
            watcher_for(store_expiring_in(250)).time_until_expiry().unwrap(),
            250
        );
    }
}
