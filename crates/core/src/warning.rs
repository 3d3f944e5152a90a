//! Observable warning state and its text rendering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dialog title shown while the warning is open
pub const WARNING_TITLE: &str = "Your session is about to expire";

/// What the rendering layer needs to draw the expiry dialog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningState {
    pub open: bool,
    pub seconds_left: u64,
}

impl WarningState {
    #[must_use]
    pub const fn open(seconds_left: u64) -> Self {
        Self {
            open: true,
            seconds_left,
        }
    }

    #[must_use]
    pub const fn closed(seconds_left: u64) -> Self {
        Self {
            open: false,
            seconds_left,
        }
    }

    /// Remaining time as `m:ss`
    #[must_use]
    pub fn countdown(&self) -> String {
        format_countdown(self.seconds_left)
    }

    /// Dialog body text
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "For security reasons, your session will expire in {}. Do you want to extend your session?",
            self.countdown()
        )
    }
}

impl fmt::Display for WarningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.open {
            write!(f, "{WARNING_TITLE} ({})", self.countdown())
        } else {
            write!(f, "no warning")
        }
    }
}

/// Format seconds as `m:ss`; minutes are not capped at 59
#[must_use]
pub fn format_countdown(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(250), "4:10");
        assert_eq!(format_countdown(300), "5:00");
        assert_eq!(format_countdown(59), "0:59");
        assert_eq!(format_countdown(0), "0:00");
        assert_eq!(format_countdown(3725), "62:05");
    }

    #[test]
    fn test_warning_text() {
        let warning = WarningState::open(250);
        assert_eq!(
            warning.message(),
            "For security reasons, your session will expire in 4:10. Do you want to extend your session?"
        );
        assert_eq!(
            warning.to_string(),
            "Your session is about to expire (4:10)"
        );
        assert_eq!(WarningState::closed(0).to_string(), "no warning");
        assert_eq!(WarningState::default(), WarningState::closed(0));
    }
}
