use crate::error::{DaemonError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Daemon controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Where the daemon's PID is recorded
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    /// Append target for the daemon's standard output
    #[serde(default = "default_stdout")]
    pub stdout: PathBuf,

    /// Append target for the daemon's standard error
    #[serde(default = "default_stderr")]
    pub stderr: PathBuf,

    /// Pause between termination signals while stopping (in milliseconds)
    #[serde(default = "default_stop_interval")]
    pub stop_interval_ms: u64,

    /// Give up stopping after this many seconds; unset waits forever
    #[serde(default)]
    pub stop_timeout_secs: Option<u64>,

    /// Let `start` remove a PID file whose process is gone
    #[serde(default)]
    pub reclaim_stale: bool,
}

// Default value functions for serde
fn default_pid_file() -> PathBuf {
    PathBuf::from(crate::daemon::pid::DEFAULT_PID_FILE)
}

fn default_stdout() -> PathBuf {
    PathBuf::from("./daemon_out.log")
}

fn default_stderr() -> PathBuf {
    PathBuf::from("./daemon_err.log")
}

fn default_stop_interval() -> u64 {
    1000
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            stdout: default_stdout(),
            stderr: default_stderr(),
            stop_interval_ms: default_stop_interval(),
            stop_timeout_secs: None,
            reclaim_stale: false,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<DaemonConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(DaemonError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<DaemonConfig> {
        toml::from_str(contents)
            .map_err(|e| DaemonError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<DaemonConfig> {
        serde_json::from_str(contents)
            .map_err(|e| DaemonError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("pid_file", &self.pid_file),
            ("stdout", &self.stdout),
            ("stderr", &self.stderr),
        ] {
            if path.as_os_str().is_empty() {
                return Err(DaemonError::ConfigValidationError(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        if self.pid_file == self.stdout || self.pid_file == self.stderr {
            return Err(DaemonError::ConfigValidationError(
                "pid_file must differ from the log files".to_string(),
            ));
        }

        if self.stop_interval_ms == 0 {
            return Err(DaemonError::ConfigValidationError(
                "stop_interval_ms must be at least 1".to_string(),
            ));
        }

        if self.stop_timeout_secs == Some(0) {
            return Err(DaemonError::ConfigValidationError(
                "stop_timeout_secs must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }

    pub fn stop_interval(&self) -> Duration {
        Duration::from_millis(self.stop_interval_ms)
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_secs.map(Duration::from_secs)
    }

    /// Expand environment variables in the configured paths
    fn expand_env_vars(&mut self) {
        self.pid_file = Self::expand_env_in_path(&self.pid_file);
        self.stdout = Self::expand_env_in_path(&self.stdout);
        self.stderr = Self::expand_env_in_path(&self.stderr);
    }

    /// Expand `$VAR` and `${VAR}` in a string; unknown variables become empty
    fn expand_env_in_string(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }

            let mut name = String::new();
            if chars.peek() == Some(&'{') {
                chars.next();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }

            if name.is_empty() {
                result.push('$');
            } else {
                result.push_str(&std::env::var(&name).unwrap_or_default());
            }
        }

        result
    }

    fn expand_env_in_path(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(Self::expand_env_in_string(s)),
            None => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.pid_file, PathBuf::from("./daemon.pid"));
        assert_eq!(config.stdout, PathBuf::from("./daemon_out.log"));
        assert_eq!(config.stderr, PathBuf::from("./daemon_err.log"));
        assert_eq!(config.stop_interval(), Duration::from_secs(1));
        assert_eq!(config.stop_timeout(), None);
        assert!(!config.reclaim_stale);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = DaemonConfig {
            stop_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DaemonError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = DaemonConfig {
            stop_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DaemonError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_pid_file_clashes_with_log() {
        let config = DaemonConfig {
            stdout: PathBuf::from("./daemon.pid"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_path() {
        let config = DaemonConfig {
            stderr: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_in_string() {
        std::env::set_var("DAEMONCTL_TEST_DIR", "/var/run");

        assert_eq!(
            DaemonConfig::expand_env_in_string("$DAEMONCTL_TEST_DIR/mole.pid"),
            "/var/run/mole.pid"
        );
        assert_eq!(
            DaemonConfig::expand_env_in_string("${DAEMONCTL_TEST_DIR}x"),
            "/var/runx"
        );
        assert_eq!(DaemonConfig::expand_env_in_string("cost$"), "cost$");
        assert_eq!(
            DaemonConfig::expand_env_in_string("$DAEMONCTL_TEST_UNSET_VAR/a"),
            "/a"
        );
    }

    #[test]
    fn test_parse_toml_partial() {
        let config = DaemonConfig::parse_toml(
            r#"
            pid_file = "/tmp/mole.pid"
            stop_timeout_secs = 30
        "#,
        )
        .unwrap();

        assert_eq!(config.pid_file, PathBuf::from("/tmp/mole.pid"));
        assert_eq!(config.stdout, PathBuf::from("./daemon_out.log"));
        assert_eq!(config.stop_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_json() {
        let config = DaemonConfig::parse_json(
            r#"{ "stderr": "/tmp/err.log", "reclaim_stale": true, "stop_interval_ms": 250 }"#,
        )
        .unwrap();

        assert_eq!(config.stderr, PathBuf::from("/tmp/err.log"));
        assert!(config.reclaim_stale);
        assert_eq!(config.stop_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_toml_invalid() {
        assert!(matches!(
            DaemonConfig::parse_toml("pid_file = 3"),
            Err(DaemonError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "pid_file: x").unwrap();

        assert!(matches!(
            DaemonConfig::from_file(&config_path),
            Err(DaemonError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            DaemonConfig::from_file(&temp_dir.path().join("nope.toml")),
            Err(DaemonError::ConfigError(_))
        ));
    }
}
