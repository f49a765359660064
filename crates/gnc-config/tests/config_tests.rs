use std::path::PathBuf;

use gnc_config::{BindingConfig, ConfigError, ConfigManager};
use gnc_domain::SessionOpenMode;
use tempfile::tempdir;

#[test]
fn defaults_open_normally_with_info_filter() {
    let cfg = BindingConfig::default();

    assert_eq!(cfg.default_open_mode, SessionOpenMode::Normal);
    assert_eq!(cfg.log_filter, "gnucash_bind=info");
    assert!(!cfg.save_on_end);
    assert!(cfg.resolve_data_dir().ends_with("GnuCash"));
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("absent.json"));

    assert_eq!(manager.load().expect("load"), BindingConfig::default());
}

#[test]
fn manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let cfg = BindingConfig {
        data_dir: Some(PathBuf::from("/srv/books")),
        default_open_mode: SessionOpenMode::ReadOnly,
        log_filter: "gnucash_bind=debug".into(),
        save_on_end: true,
    };
    manager.save(&cfg).expect("save config");

    assert!(manager.config_path().exists());
    assert!(!manager.config_path().with_extension("json.tmp").exists());
    assert_eq!(manager.load().expect("load config"), cfg);
}

#[test]
fn partial_files_fill_in_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("binding.json");
    std::fs::write(&path, r#"{ "default_open_mode": "break-lock" }"#).expect("write");

    let loaded = ConfigManager::new(path).load().expect("load");

    assert_eq!(loaded.default_open_mode, SessionOpenMode::BreakLock);
    assert_eq!(loaded.log_filter, "gnucash_bind=info");
    assert_eq!(loaded.data_dir, None);
}

#[test]
fn garbled_files_report_their_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("binding.json");
    std::fs::write(&path, "{ not json").expect("write");

    let err = ConfigManager::new(path.clone()).load().unwrap_err();

    match err {
        ConfigError::Serde { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}
