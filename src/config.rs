//! User configuration (`config.toml` in the platform config directory).

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched for `*.rhai` scripts.
    pub script_dirs: Vec<PathBuf>,
    /// Whether configured and environment script directories are loaded.
    pub load_scripts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            script_dirs: Vec::new(),
            load_scripts: true,
        }
    }
}

impl Config {
    /// Load from the user's config directory.
    ///
    /// A missing file gives the defaults. A file that cannot be read or
    /// parsed also gives the defaults, plus a warning.
    pub fn load() -> (Config, Vec<String>) {
        match config_path() {
            Some(path) => Config::load_from(&path),
            None => (Config::default(), Vec::new()),
        }
    }

    pub fn load_from(path: &Path) -> (Config, Vec<String>) {
        let mut warnings = Vec::new();
        if !path.exists() {
            return (Config::default(), warnings);
        }
        let config = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                    Config::default()
                }
            },
            Err(err) => {
                warnings.push(format!("Failed to read {}: {}", path.display(), err));
                Config::default()
            }
        };
        (config, warnings)
    }
}

pub fn config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "decel")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
