use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use super::{
    resolve_credentials, resolve_overrides, Config, ConfigError, ConfigStore, ConnectionFlags,
};
use crate::api::Mode;

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("roam-config-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("workspace should be creatable");
    root
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    move |key| vars.get(key).cloned()
}

#[test]
fn missing_file_loads_defaults_and_save_round_trips() {
    let root = unique_workspace();
    let store = ConfigStore::new(root.join("nested/config.toml"));
    assert_eq!(store.load().expect("missing config"), Config::default());

    let mut config = Config::default();
    config.set("graph_name", "notes").expect("graph");
    config.set("timeout_secs", "45").expect("timeout");
    config.set("mode", "encrypted").expect("mode");
    store.save(&config).expect("save should create parents");

    let raw = std::fs::read_to_string(store.path()).expect("config readable");
    assert!(raw.contains("graph_name = \"notes\""));
    assert!(!raw.contains("token"));
    assert_eq!(store.load().expect("reload"), config);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn invalid_toml_and_unknown_fields_are_parse_errors() {
    let root = unique_workspace();
    let path = root.join("config.toml");
    let store = ConfigStore::new(&path);

    std::fs::write(&path, "not = [valid").expect("write");
    assert!(matches!(store.load(), Err(ConfigError::Parse(_))));
    std::fs::write(&path, "colour = \"blue\"\n").expect("write");
    assert!(matches!(store.load(), Err(ConfigError::Parse(_))));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn set_validates_values_and_keys() {
    let mut config = Config::default();
    assert!(matches!(
        config.set("mode", "offline"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(config.set("timeout_secs", "0").is_err());
    assert!(config.set("output_format", "yaml").is_err());
    assert!(matches!(
        config.set("colour", "blue"),
        Err(ConfigError::UnknownKey(_))
    ));

    config.set("output_format", "json").expect("json format");
    assert!(config.prefers_json());
    assert_eq!(config.get("output_format").expect("known key"), Some("json".to_string()));
    config.unset("output_format").expect("unset");
    assert_eq!(config.get("output_format").expect("known key"), None);
    assert!(config.unset("nope").is_err());
}

#[test]
fn redaction_masks_token() {
    let config = Config {
        token: Some("roam-graph-token-abcd".to_string()),
        ..Config::default()
    };
    assert_eq!(config.redacted().token.as_deref(), Some("****abcd"));

    let short = Config {
        token: Some("abc".to_string()),
        ..Config::default()
    };
    assert_eq!(short.redacted().token.as_deref(), Some("****"));
}

#[test]
fn flags_beat_environment_beat_config() {
    let config = Config {
        token: Some("from-config".to_string()),
        graph_name: Some("config-graph".to_string()),
        mode: Some("cloud".to_string()),
        ..Config::default()
    };
    let env = env_from(&[("ROAM_API_TOKEN", "from-env"), ("ROAM_MODE", "encrypted")]);

    let flags = ConnectionFlags {
        graph: Some("flag-graph".to_string()),
        ..ConnectionFlags::default()
    };
    let creds = resolve_credentials(&flags, &env, &config).expect("credentials");
    assert_eq!(creds.graph_name, "flag-graph");
    assert_eq!(creds.token, "from-env");
    assert_eq!(creds.mode, Mode::Encrypted);

    let creds = resolve_credentials(&ConnectionFlags::default(), env_from(&[]), &config)
        .expect("config only");
    assert_eq!(creds.token, "from-config");
    assert_eq!(creds.graph_name, "config-graph");
    assert_eq!(creds.mode, Mode::Cloud);
}

#[test]
fn local_flag_forces_encrypted_and_blank_values_fall_through() {
    let config = Config {
        mode: Some("cloud".to_string()),
        graph_name: Some("stored".to_string()),
        ..Config::default()
    };
    let flags = ConnectionFlags {
        local: true,
        graph: Some("   ".to_string()),
        ..ConnectionFlags::default()
    };
    let creds = resolve_credentials(&flags, env_from(&[("ROAM_GRAPH_NAME", "")]), &config)
        .expect("credentials");
    assert_eq!(creds.mode, Mode::Encrypted);
    assert_eq!(creds.graph_name, "stored");

    let bad = resolve_credentials(
        &ConnectionFlags::default(),
        env_from(&[("ROAM_MODE", "sideways")]),
        &Config::default(),
    );
    assert!(matches!(bad, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn overrides_prefer_flags_and_ignore_zero_timeout() {
    let config = Config {
        base_url: Some("https://config.example".to_string()),
        timeout_secs: Some(12),
        ..Config::default()
    };
    let overrides = resolve_overrides(&ConnectionFlags::default(), &config);
    assert_eq!(overrides.base_url.as_deref(), Some("https://config.example"));
    assert_eq!(overrides.timeout, Some(Duration::from_secs(12)));

    let flags = ConnectionFlags {
        base_url: Some("http://127.0.0.1:9".to_string()),
        timeout_secs: Some(0),
        ..ConnectionFlags::default()
    };
    let overrides = resolve_overrides(&flags, &Config::default());
    assert_eq!(overrides.base_url.as_deref(), Some("http://127.0.0.1:9"));
    assert_eq!(overrides.timeout, None);
}
