//! CLI configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG: &str = "bondworks.toml";
const DEFAULT_STATE: &str = "bondworks-state.json";

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    state_path: Option<PathBuf>,
    from: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    /// Path of the JSON chain-state file
    pub state_path: PathBuf,
    /// Address commands act as when --from is not given
    pub from: String,
}

impl Config {
    /// Merge the optional TOML config file with command-line overrides.
    /// Flags win over the file; the file wins over defaults.
    pub fn resolve(
        config_path: Option<&Path>,
        state_override: Option<PathBuf>,
        from_override: Option<String>,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => read_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG);
                if default.exists() {
                    read_file(default)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Ok(Config {
            state_path: state_override
                .or(file.state_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE)),
            from: from_override
                .or(file.from)
                .unwrap_or_else(|| "default".to_string()),
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&data).with_context(|| format!("invalid config file {}", path.display()))
}
