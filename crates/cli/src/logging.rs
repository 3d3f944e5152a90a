use anyhow::Result;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the CLI. Logs go to stderr so the warning dialog
/// on stdout stays readable.
pub fn init_logging(
    log_level: Level,
    data_dir: Option<PathBuf>,
    component: &str,
    no_file_log: bool,
) -> Result<()> {
    if no_file_log {
        init_stderr_logging(log_level);
        Ok(())
    } else {
        init_file_logging(log_level, data_dir, component)
    }
}

fn env_filter(level: Level) -> EnvFilter {
    let level_str = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("expiry={level_str},expiry_core={level_str}").into())
}

fn init_file_logging(level: Level, data_dir: Option<PathBuf>, component: &str) -> Result<()> {
    let log_file_path = log_file_path(&state_dir(data_dir), component);
    if let Some(parent) = log_file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_file_path)?;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    Ok(())
}

fn init_stderr_logging(level: Level) {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve the state directory: explicit flag or `EXPIRY_STATE_DIR`, then the
/// system data dir
pub fn state_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("expiry")
    })
}

fn log_file_path(base_dir: &Path, component: &str) -> PathBuf {
    base_dir.join(format!("{component}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_state_dir_wins() {
        let dir = PathBuf::from("/tmp/expiry-state");
        assert_eq!(state_dir(Some(dir.clone())), dir);
    }

    #[test]
    fn test_log_file_named_after_component() {
        let path = log_file_path(Path::new("/var/lib/expiry"), "watch");
        assert_eq!(path, PathBuf::from("/var/lib/expiry/watch.log"));
    }
}
