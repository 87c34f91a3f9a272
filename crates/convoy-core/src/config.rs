//! convoy.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvoyConfig {
    /// Optional for commands that only touch state; descriptors need it.
    #[serde(default)]
    pub diego: DiegoConfig,
    pub state: Option<StateConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Settings shared by every desired-state descriptor handed to the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiegoConfig {
    /// Base URL of the file server that hosts relative lifecycle bundles.
    #[serde(default)]
    pub file_server_url: String,
    /// Deployment-wide privileged flag for running containers.
    #[serde(default)]
    pub use_privileged_containers_for_running: bool,
    /// `"{lifecycle}/{stack}"` → bundle location (absolute URI or file-server path).
    #[serde(default)]
    pub lifecycle_bundles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no lifecycle bundle configured for {kind}/{stack}")]
    MissingLifecycleBundle { kind: String, stack: String },
    #[error("invalid lifecycle bundle uri: {0:?}")]
    InvalidLifecycleBundle(String),
    #[error("diego.file_server_url must be an http(s) URL to serve relative lifecycle bundles, got {0:?}")]
    InvalidFileServerUrl(String),
}

impl ConfigError {
    /// Configuration faults never heal on their own; only I/O may.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConfigError::Io { .. })
    }
}

impl ConvoyConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Raw bundle entry for a lifecycle kind and stack, if configured.
    pub fn lifecycle_bundle(&self, kind: &str, stack: &str) -> Option<&str> {
        self.diego
            .lifecycle_bundles
            .get(&format!("{kind}/{stack}"))
            .map(String::as_str)
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.path.as_path())
    }

    pub fn logging_filter(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.filter.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[diego]
file_server_url = "http://file-server.service.internal:8080"
use_privileged_containers_for_running = true

[diego.lifecycle_bundles]
"buildpack/cflinuxfs4" = "buildpack_app_lifecycle/buildpack_app_lifecycle.tgz"
"buildpack/stack-b" = "https://cdn.example.com/lifecycle.tgz"

[state]
path = "/var/lib/convoy/convoy.redb"

[logging]
filter = "warn"
"#;

    #[test]
    fn parses_full_config() {
        let config = ConvoyConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.diego.use_privileged_containers_for_running);
        assert_eq!(
            config.lifecycle_bundle("buildpack", "stack-b"),
            Some("https://cdn.example.com/lifecycle.tgz")
        );
        assert_eq!(config.state_path(), Some(Path::new("/var/lib/convoy/convoy.redb")));
        assert_eq!(config.logging_filter(), Some("warn"));
    }

    #[test]
    fn parses_minimal_config() {
        let config = ConvoyConfig::from_toml_str(
            r#"
[diego]
file_server_url = "http://fs"
"#,
        )
        .unwrap();
        assert!(!config.diego.use_privileged_containers_for_running);
        assert!(config.diego.lifecycle_bundles.is_empty());
        assert!(config.state_path().is_none());
        assert!(config.lifecycle_bundle("buildpack", "cflinuxfs4").is_none());
    }

    #[test]
    fn diego_section_is_optional() {
        let config = ConvoyConfig::from_toml_str(
            r#"
[state]
path = "/var/lib/convoy/convoy.redb"

[logging]
filter = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.state_path(), Some(Path::new("/var/lib/convoy/convoy.redb")));
        assert!(config.diego.file_server_url.is_empty());
        assert!(config.diego.lifecycle_bundles.is_empty());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convoy.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = ConvoyConfig::from_file(&path).unwrap();
        assert_eq!(config.diego.file_server_url, "http://file-server.service.internal:8080");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ConvoyConfig::from_file(Path::new("/nonexistent/convoy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn bundle_faults_are_not_retryable() {
        let err = ConfigError::MissingLifecycleBundle {
            kind: "buildpack".into(),
            stack: "nope".into(),
        };
        assert!(!err.is_retryable());
        assert!(!ConfigError::InvalidLifecycleBundle("ftp://x".into()).is_retryable());
        assert!(!ConfigError::InvalidFileServerUrl(String::new()).is_retryable());
    }
}
