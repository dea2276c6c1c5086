use super::Config;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

const CONFIG_DIR: &str = ".context-engine";
const CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Load `~/.context-engine/config.toml`, writing defaults on first use.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let mut config = Self::load_or_init_in(&home.join(CONFIG_DIR))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from `dir`, creating the directory and a default file if missing.
    pub fn load_or_init_in(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);

        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(ConfigError::Io)
                .context("Failed to create config directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| ConfigError::Load(e.to_string()))
                .context("Failed to parse config file")?;
            config.config_path.clone_from(&config_path);
            config.validate()?;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            tracing::info!(path = %config.config_path.display(), "Wrote default config");
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
