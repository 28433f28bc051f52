use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::file::{Config, FileIoWithBackup};

const CONFIG_FILE: &str = "config.json";

/// Daemon-wide settings, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage root holding `artifacts/` and `instances/`.
    pub root: String,
    pub launch: LaunchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: "warden".to_string(),
            launch: LaunchConfig::default(),
        }
    }
}

/// How managed server binaries are launched and shut down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub java_path: String,
    /// Fixed heap argument passed to every instance JVM.
    pub java_heap: String,
    /// Seconds a stopping server gets before it is forcibly killed.
    pub stop_grace_secs: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            java_path: "java".to_string(),
            java_heap: "-Xmx512M".to_string(),
            stop_grace_secs: 30,
        }
    }
}

impl LaunchConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}

impl FileIoWithBackup for AppConfig {}

impl Config for AppConfig {
    type ConfigType = AppConfig;
}

impl AppConfig {
    pub fn load() -> anyhow::Result<AppConfig> {
        Self::load_config_or_default(CONFIG_FILE, Self::default)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{ "root": "/srv/warden" }"#).unwrap();
        assert_eq!(config.root, "/srv/warden");
        assert_eq!(config.launch.java_path, "java");
        assert_eq!(config.launch.java_heap, "-Xmx512M");
        assert_eq!(config.launch.stop_grace(), Duration::from_secs(30));
    }
}
