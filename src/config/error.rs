//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Site configuration not found: `{0}`")]
    NotFound(PathBuf),

    #[error("Unsupported site configuration format: `{0}`")]
    Unsupported(PathBuf),

    #[error("Config JSON parsing error")]
    Json(#[from] serde_json::Error),

    #[error("Config YAML parsing error")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config TOML parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("_config.yml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        let display = format!("{io_err}");
        assert!(display.contains("IO error"));
        assert!(display.contains("_config.yml"));

        let display = format!("{}", ConfigError::Unsupported(PathBuf::from("site.ini")));
        assert!(display.contains("site.ini"));

        let validation_err = ConfigError::Validation("exclude must be a list".to_string());
        assert!(format!("{validation_err}").contains("exclude must be a list"));
    }
}
