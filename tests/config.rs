use std::fs;

use taskchat::config::{Config, CONFIG_FILE};
use taskchat::error::Error;

#[test]
fn load_from_dir_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = Config::load_from_dir(dir.path()).expect("defaults");
    assert_eq!(cfg, Config::default());
}

#[test]
fn load_from_dir_rejects_invalid_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let content = r#"
[store]
busy_timeout_ms = 0
"#;
    fs::write(dir.path().join(CONFIG_FILE), content.trim()).expect("write config");

    let err = Config::load_from_dir(dir.path()).expect_err("invalid");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn load_from_dir_rejects_malformed_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(CONFIG_FILE), "chat = 123").expect("write config");

    let err = Config::load_from_dir(dir.path()).expect_err("malformed");
    assert!(matches!(err, Error::TomlParse(_)));
}

#[test]
fn save_then_load_keeps_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    let mut cfg = Config::default();
    cfg.chat.history_limit = 50;
    cfg.chat.bot_name = "Assistant".to_string();
    cfg.classifier.url = Some("http://127.0.0.1:5000/classify".to_string());

    cfg.save(&path).expect("save");
    assert_eq!(Config::load(&path).expect("load"), cfg);
}
