//! CLI configuration utilities

use anyhow::{Context, Result};
use expiry_core::MonitorConfig;
use std::path::Path;
use tracing::info;

/// Default configuration file name inside the state directory
pub const CONFIG_FILE_NAME: &str = "expiry.json";

/// Load the monitor policy. An explicit file wins, then `expiry.json` in the
/// state directory, then defaults; `EXPIRY_*` variables override all three.
pub fn load_monitor_config(explicit: Option<&Path>, state_dir: &Path) -> Result<MonitorConfig> {
    if let Some(path) = explicit {
        info!("Loading configuration from: {}", path.display());
        return MonitorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()));
    }

    let default_path = state_dir.join(CONFIG_FILE_NAME);
    if default_path.exists() {
        info!("Loading configuration from: {}", default_path.display());
        MonitorConfig::from_file(&default_path)
            .with_context(|| format!("loading {}", default_path.display()))
    } else {
        info!("Using default configuration with environment overrides");
        Ok(MonitorConfig::from_env()?)
    }
}

/// Save monitor configuration to JSON file
pub fn save_monitor_config<P: AsRef<Path>>(config: &MonitorConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_monitor_config(&MonitorConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        generate_default_config(&path).unwrap();
        let loaded = load_monitor_config(Some(&path), dir.path()).unwrap();
        assert_eq!(loaded, MonitorConfig::default());
    }

    #[test]
    fn test_state_dir_config_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            warning_threshold_secs: 120,
            ..MonitorConfig::default()
        };
        save_monitor_config(&config, dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let loaded = load_monitor_config(None, dir.path()).unwrap();
        assert_eq!(loaded.warning_threshold_secs, 120);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_monitor_config(Some(&missing), dir.path()).is_err());
    }
}
