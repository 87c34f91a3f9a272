//! Lifecycle bundle URI resolution.
//!
//! Bundle entries in `[diego.lifecycle_bundles]` are either absolute
//! `http(s)://` URIs, served as-is, or paths relative to the file server's
//! static directory.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigError, ConvoyConfig};

const STATIC_PREFIX: &str = "/v1/static/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LifecycleBundleUri {
    /// http://bundles.example.com/buildpack_app_lifecycle.tgz
    Absolute { url: String },
    /// buildpack_app_lifecycle/buildpack_app_lifecycle.tgz
    FileServer { path: String },
}

impl LifecycleBundleUri {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::InvalidLifecycleBundle(value.to_string()));
        }
        if is_http(value) {
            return Ok(LifecycleBundleUri::Absolute { url: value.to_string() });
        }
        if value.contains("://") {
            return Err(ConfigError::InvalidLifecycleBundle(value.to_string()));
        }
        Ok(LifecycleBundleUri::FileServer {
            path: value.trim_start_matches('/').to_string(),
        })
    }

    /// Look up the bundle for `kind`/`stack` and render the URI the scheduler fetches.
    pub fn resolve(config: &ConvoyConfig, kind: &str, stack: &str) -> Result<String, ConfigError> {
        let value = config.lifecycle_bundle(kind, stack).ok_or_else(|| {
            ConfigError::MissingLifecycleBundle {
                kind: kind.to_string(),
                stack: stack.to_string(),
            }
        })?;
        let uri = Self::parse(value)?.to_uri(&config.diego.file_server_url)?;
        debug!(kind, stack, %uri, "resolved lifecycle bundle");
        Ok(uri)
    }

    /// File-server paths need an `http(s)://` file server to hang off.
    pub fn to_uri(&self, file_server_url: &str) -> Result<String, ConfigError> {
        match self {
            LifecycleBundleUri::Absolute { url } => Ok(url.clone()),
            LifecycleBundleUri::FileServer { path } => {
                let base = file_server_url.trim_end_matches('/');
                if !is_http(base) || base.ends_with("://") {
                    return Err(ConfigError::InvalidFileServerUrl(file_server_url.to_string()));
                }
                Ok(format!("{base}{STATIC_PREFIX}{path}"))
            }
        }
    }
}

fn is_http(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
