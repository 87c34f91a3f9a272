pub mod deployments;
pub mod descriptor;
pub mod lifecycle;
pub mod routes;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use convoy_core::ConvoyConfig;
use convoy_state::StateStore;

const STATE_FILE: &str = "convoy.redb";

/// Config and state location shared by every command.
pub struct Context {
    pub config: ConvoyConfig,
    data_dir: Option<PathBuf>,
}

impl Context {
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => ConvoyConfig::from_file(path)?,
            None => ConvoyConfig::default(),
        };
        Ok(Self { config, data_dir })
    }

    /// `--data-dir` wins over `[state].path`.
    pub fn state_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.join(STATE_FILE));
        }
        self.config
            .state_path()
            .map(Path::to_path_buf)
            .context("no state location: pass --data-dir or set [state].path in convoy.toml")
    }

    pub fn open_store(&self) -> anyhow::Result<StateStore> {
        let path = self.state_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        StateStore::open(&path).with_context(|| format!("opening state at {}", path.display()))
    }
}
