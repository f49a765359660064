use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{BindingConfig, ConfigError};

const CONFIG_FILE: &str = "binding.json";
const TMP_SUFFIX: &str = "tmp";

/// Reads and writes [`BindingConfig`] as JSON.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE)))
    }

    /// `<config dir>/gnucash-bind/binding.json`, falling back to the
    /// current directory when the platform reports no config dir.
    pub fn default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("gnucash-bind").join(CONFIG_FILE))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Missing files yield the defaults; present files must parse and validate.
    pub fn load(&self) -> Result<BindingConfig, ConfigError> {
        if !self.config_path.exists() {
            return Ok(BindingConfig::default());
        }
        let data = fs::read_to_string(&self.config_path)?;
        let config: BindingConfig =
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde {
                path: self.config_path.clone(),
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &BindingConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde {
            path: self.config_path.clone(),
            message: err.to_string(),
        })?;
        let tmp = tmp_path(&self.config_path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.config_path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
