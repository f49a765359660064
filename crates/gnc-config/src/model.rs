use std::path::{Path, PathBuf};

use gnc_domain::SessionOpenMode;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_LOG_FILTER: &str = "gnucash_bind=info";
const DATA_DIR_NAME: &str = "GnuCash";

/// Settings the binding layer reads when opening sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Root for bare store names. Defaults to `~/Documents/GnuCash`.
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub default_open_mode: SessionOpenMode,
    #[serde(default = "BindingConfig::default_log_filter")]
    pub log_filter: String,
    /// Save dirty books when a session is ended or dropped.
    #[serde(default)]
    pub save_on_end: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_open_mode: SessionOpenMode::default(),
            log_filter: Self::default_log_filter(),
            save_on_end: false,
        }
    }
}

impl BindingConfig {
    pub fn default_log_filter() -> String {
        DEFAULT_LOG_FILTER.into()
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(DATA_DIR_NAME)
    }

    /// Turns a store name into a session URI. Names that already carry a
    /// scheme or are absolute paths pass through untouched.
    pub fn resolve_store_uri(&self, name: &str) -> String {
        if name.contains("://") || Path::new(name).is_absolute() {
            return name.to_string();
        }
        format!("xml://{}", self.resolve_data_dir().join(name).display())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                message: "filter directive must not be empty".into(),
            });
        }
        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "data_dir",
                    message: "path must not be empty".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_resolve_under_data_dir() {
        let cfg = BindingConfig {
            data_dir: Some(PathBuf::from("/srv/books")),
            ..BindingConfig::default()
        };
        assert_eq!(
            cfg.resolve_store_uri("family.gnucash"),
            "xml:///srv/books/family.gnucash"
        );
        assert_eq!(
            cfg.resolve_store_uri("sqlite3:///tmp/x.gnucash"),
            "sqlite3:///tmp/x.gnucash"
        );
        assert_eq!(cfg.resolve_store_uri("/tmp/x.gnucash"), "/tmp/x.gnucash");
    }

    #[test]
    fn empty_filter_is_rejected() {
        let cfg = BindingConfig {
            log_filter: "  ".into(),
            ..BindingConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "log_filter", .. })
        ));
        assert!(BindingConfig::default().validate().is_ok());
    }
}
