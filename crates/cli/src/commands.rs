//! CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use expiry_core::warning::WARNING_TITLE;
use expiry_core::{
    Clock, ExtendOutcome, MemoryTokenStore, MonitorHandle, PhaseKind, SessionMonitor, SystemClock,
    Token, TokenStore, WarningState, decode_claims, format_countdown,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config;
use crate::logging::state_dir;
use crate::session::LocalSession;

#[derive(Subcommand)]
pub enum Commands {
    /// Watch a session token and show the expiry warning
    Watch {
        /// Lifetime in seconds of the initial locally issued token
        #[arg(long, default_value = "320", conflicts_with = "token")]
        expires_in: i64,

        /// Watch this JWT instead of a locally issued token
        #[arg(long)]
        token: Option<String>,

        /// Lifetime in seconds of tokens issued when extending
        #[arg(long, default_value = "3600")]
        refresh_lifetime: i64,

        /// Make every refresh fail, to exercise the forced logout
        #[arg(long)]
        refresh_fails: bool,

        /// Keep the token in the persistent slot
        #[arg(long)]
        remember_me: bool,

        /// Monitor configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Decode a JWT payload and show its expiry
    Decode {
        /// Token to decode
        token: String,
    },

    /// Generate a default configuration file
    Config {
        /// Output file path (defaults to EXPIRY_STATE_DIR/expiry.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub async fn execute(self, data_dir: Option<PathBuf>) -> Result<()> {
        let data_dir = state_dir(data_dir);

        match self {
            Self::Watch {
                expires_in,
                token,
                refresh_lifetime,
                refresh_fails,
                remember_me,
                config,
            } => {
                let options = WatchOptions {
                    expires_in,
                    token,
                    refresh_lifetime,
                    refresh_fails,
                    remember_me,
                    config,
                };
                watch(options, data_dir).await
            }
            Self::Decode { token } => decode(&token),
            Self::Config { output } => {
                let config_path = output.unwrap_or_else(|| data_dir.join(config::CONFIG_FILE_NAME));

                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
        }
    }
}

struct WatchOptions {
    expires_in: i64,
    token: Option<String>,
    refresh_lifetime: i64,
    refresh_fails: bool,
    remember_me: bool,
    config: Option<PathBuf>,
}

/// Commands typed while watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Extend,
    Logout,
    Check,
    Status,
    Login,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extend" | "e" | "stay" => Ok(Self::Extend),
            "logout" | "l" => Ok(Self::Logout),
            "check" | "c" => Ok(Self::Check),
            "status" | "s" => Ok(Self::Status),
            "login" => Ok(Self::Login),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

async fn watch(options: WatchOptions, state_dir: PathBuf) -> Result<()> {
    let monitor_config = config::load_monitor_config(options.config.as_deref(), &state_dir)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = Arc::new(MemoryTokenStore::new());
    let initial = match options.token {
        Some(raw) => {
            let token = Token::new(raw);
            if let Err(e) = decode_claims(&token) {
                warn!("Watched token cannot be decoded, it will never expire: {}", e);
            }
            token
        }
        None => LocalSession::issue_token(clock.as_ref(), options.expires_in)?,
    };
    store.set_token(initial, options.remember_me);

    let session = Arc::new(LocalSession::new(
        store.clone(),
        clock.clone(),
        options.refresh_lifetime,
        options.refresh_fails,
    ));

    let monitor = SessionMonitor::builder()
        .with_config(monitor_config)
        .with_token_store(store.clone())
        .with_session(session)
        .with_clock(clock.clone())
        .spawn()
        .context("starting session monitor")?;
    info!(
        "Watching session (warn at {}s, poll every {}s)",
        monitor_config.warning_threshold_secs, monitor_config.poll_interval_secs
    );

    print_help();
    let mut warnings = monitor.subscribe();
    let current = *warnings.borrow_and_update();
    render(current);
    report_if_logged_out(&monitor).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = warnings.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *warnings.borrow_and_update();
                render(current);
                if !current.open {
                    report_if_logged_out(&monitor).await?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(ConsoleCommand::Extend) => spawn_extend(monitor.handle()),
                    Ok(ConsoleCommand::Logout) => {
                        let was_open = monitor.warning().open;
                        monitor.logout_now().await?;
                        // A closing dialog reports through the warning branch
                        if !was_open {
                            report_if_logged_out(&monitor).await?;
                        }
                    }
                    Ok(ConsoleCommand::Check) => {
                        let decision = monitor.check_now().await?;
                        println!("Check: {decision}");
                    }
                    Ok(ConsoleCommand::Status) => {
                        let status = monitor.status().await?;
                        println!("{}", serde_json::to_string_pretty(&status)?);
                    }
                    Ok(ConsoleCommand::Login) => {
                        monitor.restart().await?;
                        let token = LocalSession::issue_token(clock.as_ref(), options.expires_in)?;
                        store.set_token(token, options.remember_me);
                        monitor.check_now().await?;
                        println!("Logged in, token valid for {}s", options.expires_in);
                    }
                    Ok(ConsoleCommand::Help) => print_help(),
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    monitor.shutdown().await?;
    Ok(())
}

/// Run the refresh off the input loop so the countdown keeps rendering
fn spawn_extend(handle: MonitorHandle) {
    tokio::spawn(async move {
        match handle.extend().await {
            Ok(ExtendOutcome::Extended) => println!("Session extended"),
            Ok(ExtendOutcome::LoggedOut(reason)) => println!("Logged out: {reason}"),
            Err(e) => warn!("Extend request failed: {}", e),
        }
    });
}

async fn report_if_logged_out(monitor: &SessionMonitor) -> Result<()> {
    let status = monitor.status().await?;
    if let PhaseKind::LoggedOut(reason) = status.phase {
        println!("Logged out: {reason}. Type 'login' to start a new session.");
    }
    Ok(())
}

fn render(warning: WarningState) {
    if warning.open {
        println!("{WARNING_TITLE}");
        println!("  {}", warning.message());
        println!("  [logout] Logout   [extend] Stay logged in");
    }
}

fn print_help() {
    println!("Commands: extend, logout, check, status, login, help, quit");
}

fn decode(raw: &str) -> Result<()> {
    let claims = decode_claims(&Token::new(raw)).context("decoding token")?;
    println!("{}", serde_json::to_string_pretty(&claims)?);

    match claims.seconds_until_expiry(SystemClock.now_secs()) {
        Some(secs) if secs > 0 => {
            println!("Expires in {} ({secs}s)", format_countdown(secs.unsigned_abs()));
        }
        Some(secs) => println!("Expired {}s ago", secs.unsigned_abs()),
        None => println!("No expiry claim, the monitor will ignore this token"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_secs(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_parse_console_commands() {
        assert_eq!("extend".parse(), Ok(ConsoleCommand::Extend));
        assert_eq!(" Stay \n".parse(), Ok(ConsoleCommand::Extend));
        assert_eq!("l".parse(), Ok(ConsoleCommand::Logout));
        assert_eq!("check".parse(), Ok(ConsoleCommand::Check));
        assert_eq!("status".parse(), Ok(ConsoleCommand::Status));
        assert_eq!("login".parse(), Ok(ConsoleCommand::Login));
        assert_eq!("?".parse(), Ok(ConsoleCommand::Help));
        assert_eq!("exit".parse(), Ok(ConsoleCommand::Quit));
        assert!("reboot".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not-a-jwt").is_err());
        let token = LocalSession::issue_token(&FixedClock(0), 60).unwrap();
        assert!(decode(token.as_str()).is_ok());
    }
}
