//! Desired-state builder for buildpack-staged droplets.
//!
//! Pure translation: the only lookup is the lifecycle bundle for the stack,
//! read from the controller config. A missing or malformed bundle entry is
//! a configuration fault and is returned immediately.

use convoy_core::{ConfigError, ConvoyConfig, LifecycleBundleUri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{
    Action, CachedDependency, DesiredStateDescriptor, DownloadAction, EnvironmentVariable,
};

pub const LIFECYCLE_KIND: &str = "buildpack";
/// Where the lifecycle bundle is unpacked inside the container.
pub const LIFECYCLE_PATH: &str = "/tmp/lifecycle";
/// The droplet is extracted at the container root.
pub const DROPLET_DESTINATION: &str = ".";
pub const ACTION_USER: &str = "vcap";
pub const DEFAULT_LANG: &str = "en_US.UTF-8";
pub const DEFAULT_APP_PORT: u16 = 8080;

/// Droplet metadata for one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredLrpOptions {
    pub stack: String,
    pub droplet_uri: String,
    pub process_guid: String,
    pub droplet_hash: String,
    pub checksum_algorithm: String,
    pub checksum_value: String,
    pub ports: Option<Vec<u16>>,
}

pub struct BuildpackDesiredLrpBuilder<'a> {
    config: &'a ConvoyConfig,
    opts: DesiredLrpOptions,
}

impl<'a> BuildpackDesiredLrpBuilder<'a> {
    pub fn new(config: &'a ConvoyConfig, opts: DesiredLrpOptions) -> Self {
        Self { config, opts }
    }

    pub fn cached_dependencies(&self) -> Result<Vec<CachedDependency>, ConfigError> {
        let stack = &self.opts.stack;
        let from = LifecycleBundleUri::resolve(self.config, LIFECYCLE_KIND, stack)?;
        Ok(vec![CachedDependency {
            from,
            to: LIFECYCLE_PATH.to_string(),
            cache_key: format!("{LIFECYCLE_KIND}-{stack}-lifecycle"),
        }])
    }

    pub fn root_fs(&self) -> String {
        format!("preloaded:{}", self.opts.stack)
    }

    pub fn setup(&self) -> Action {
        Action::serial(vec![Action::DownloadAction(DownloadAction {
            from: self.opts.droplet_uri.clone(),
            to: DROPLET_DESTINATION.to_string(),
            cache_key: format!("droplets-{}", self.opts.process_guid),
            user: self.action_user().to_string(),
            checksum_algorithm: self.opts.checksum_algorithm.clone(),
            checksum_value: self.opts.checksum_value.clone(),
        })])
    }

    pub fn global_environment_variables(&self) -> Vec<EnvironmentVariable> {
        vec![EnvironmentVariable {
            name: "LANG".to_string(),
            value: DEFAULT_LANG.to_string(),
        }]
    }

    pub fn ports(&self) -> Vec<u16> {
        match &self.opts.ports {
            Some(ports) if !ports.is_empty() => ports.clone(),
            _ => vec![DEFAULT_APP_PORT],
        }
    }

    pub fn privileged(&self) -> bool {
        self.config.diego.use_privileged_containers_for_running
    }

    pub fn action_user(&self) -> &'static str {
        ACTION_USER
    }

    pub fn build(&self) -> Result<DesiredStateDescriptor, ConfigError> {
        let descriptor = DesiredStateDescriptor {
            stack: self.opts.stack.clone(),
            root_fs: self.root_fs(),
            cached_dependencies: self.cached_dependencies()?,
            setup: self.setup(),
            ports: self.ports(),
            privileged: self.privileged(),
            user: self.action_user().to_string(),
            env: self.global_environment_variables(),
        };
        debug!(
            process = %self.opts.process_guid,
            stack = %self.opts.stack,
            ports = ?descriptor.ports,
            "built desired state"
        );
        Ok(descriptor)
    }
}
