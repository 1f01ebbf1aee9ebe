pub mod types;

pub use types::Config;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let config: Config = serde_yaml::from_str(&yaml)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.aggregation.interval.is_zero() {
        return Err(ConfigError::Validation(
            "aggregation.interval must be greater than zero".to_string(),
        ));
    }

    if let Some(url) = &config.sink.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "sink.url must be an http(s) endpoint, got '{}'",
                url
            )));
        }
    }

    Ok(())
}

/// Expands tilde (~) in paths to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Resolves the config file path based on explicit argument or default
/// locations. Returns the first existing path from:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/telhub/config.yml
/// 3. /etc/telhub/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/telhub/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/telhub/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logs:").unwrap();
        writeln!(file, "  dir: /tmp/telhub-logs").unwrap();
        writeln!(file, "sink:").unwrap();
        writeln!(file, "  url: http://collector:9000/telemetry").unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.logs.dir, PathBuf::from("/tmp/telhub-logs"));
        assert_eq!(
            config.sink.url.as_deref(),
            Some("http://collector:9000/telemetry")
        );
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.yml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_validation_rejects_bad_sink_url() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sink:").unwrap();
        writeln!(file, "  url: ftp://collector").unwrap();
        file.flush().unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "aggregation:").unwrap();
        writeln!(file, "  interval: 0s").unwrap();
        file.flush().unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/x")), home.join("x"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(expand_tilde(Path::new("/abs/x")), PathBuf::from("/abs/x"));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let resolved = resolve_config_path(Some(Path::new("/explicit/config.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/explicit/config.yml")));
    }
}
