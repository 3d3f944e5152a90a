//! Authentication session seam consumed by the monitor

use crate::error::SessionError;
use async_trait::async_trait;

/// Remote side of the user's session
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// Exchange the current credential for a fresh one.
    ///
    /// On success the implementation is expected to have written the new
    /// token to the token store.
    async fn refresh_auth(&self) -> Result<(), SessionError>;

    /// End the session. Must be safe to call when already logged out, and
    /// must clear the local credential even when the remote call fails.
    async fn logout(&self) -> Result<(), SessionError>;
}
