//! Outcome and status types reported by the monitor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session instance was ended by the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEndReason {
    /// The poll found a token whose `exp` was already in the past
    AlreadyExpired,
    /// The countdown reached zero without a user response
    CountdownElapsed,
    /// The user asked to extend but the refresh failed
    RefreshFailed(String),
    /// The user chose to log out
    UserLogout,
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExpired => write!(f, "token already expired"),
            Self::CountdownElapsed => write!(f, "countdown elapsed"),
            Self::RefreshFailed(reason) => write!(f, "refresh failed: {reason}"),
            Self::UserLogout => write!(f, "user logged out"),
        }
    }
}

/// Result of an `extend()` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendOutcome {
    /// Refresh succeeded, the warning is closed
    Extended,
    /// The session ended, either because the refresh failed or because it
    /// had already ended
    LoggedOut(SessionEndReason),
}

/// Coarse monitor phase, for status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Unarmed,
    Armed { seconds_remaining: u64 },
    LoggedOut(SessionEndReason),
}

/// Point-in-time view of a running monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub phase: PhaseKind,
    /// Whether the expiration poll is scheduled
    pub polling: bool,
    /// Whether a refresh call is in flight
    pub refresh_in_flight: bool,
    /// Number of checks performed since spawn
    pub checks: u64,
    /// Number of logout calls issued since spawn
    pub logouts: u64,
}

impl MonitorStatus {
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self.phase, PhaseKind::Armed { .. })
    }

    #[must_use]
    pub const fn is_logged_out(&self) -> bool {
        matches!(self.phase, PhaseKind::LoggedOut(_))
    }
}
