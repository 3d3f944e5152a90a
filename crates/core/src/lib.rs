//! Session expiration monitor: warns before an auth token expires and
//! resolves the user's extend-or-logout choice

pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod monitor;
pub mod session;
pub mod token;
pub mod types;
pub mod warning;
pub mod watcher;


pub use clock::{Clock, SystemClock};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result, SessionError, TokenError};
pub use monitor::{MonitorHandle, SessionMonitor, SessionMonitorBuilder};
pub use session::AuthSession;
pub use token::{MemoryTokenStore, Token, TokenClaims, TokenStore, decode_claims};
pub use types::{ExtendOutcome, MonitorStatus, PhaseKind, SessionEndReason};
pub use warning::{WarningState, format_countdown};
pub use watcher::{Decision, ExpirationWatcher};
