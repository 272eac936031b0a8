use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::runtime::TermGeometry;

const CONFIG_PATH: &str = ".cinder/config.toml";

/// Project-level cinder configuration from `.cinder/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shell binary to spawn. Defaults to `/bin/bash`.
    #[serde(default)]
    pub shell: Option<String>,

    /// Fallback terminal columns when no real terminal size is available.
    #[serde(default = "default_cols")]
    pub cols: u16,

    /// Fallback terminal rows when no real terminal size is available.
    #[serde(default = "default_rows")]
    pub rows: u16,
}

fn default_cols() -> u16 {
    TermGeometry::default().cols
}

fn default_rows() -> u16 {
    TermGeometry::default().rows
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            cols: default_cols(),
            rows: default_rows(),
        }
    }
}

impl Config {
    pub fn geometry(&self) -> TermGeometry {
        TermGeometry {
            cols: self.cols,
            rows: self.rows,
        }
    }
}

/// Load configuration from `.cinder/config.toml` under `project_path`.
///
/// Falls back to defaults if the file is missing.
pub fn load(project_path: &Path) -> Result<Config> {
    let path = project_path.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}
