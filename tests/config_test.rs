use jtple::config::{find_config, load_values, Config, CONFIG_FILES};
use jtple::error::Error;
use serde_json::json;
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_find_config_prefers_json() {
    let temp_dir = TempDir::new().unwrap();
    assert!(find_config(temp_dir.path()).is_none());

    File::create(temp_dir.path().join("jtple.yaml")).unwrap();
    assert_eq!(
        find_config(temp_dir.path()).unwrap(),
        temp_dir.path().join("jtple.yaml")
    );

    File::create(temp_dir.path().join(CONFIG_FILES[0])).unwrap();
    assert_eq!(
        find_config(temp_dir.path()).unwrap(),
        temp_dir.path().join("jtple.json")
    );
}

#[test]
fn test_load_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("jtple.yml");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "templateRootSelector: section.tpl\nvariableSelector: \"[data-var]\"").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.template_root_selector, "section.tpl");
    assert_eq!(config.variable_selector, "[data-var]");
    assert!(config.selectors().is_ok());
}

#[test]
fn test_unknown_keys_are_rejected() {
    let err = Config::from_content(r#"{"rootSelector": ".tpl"}"#).unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_invalid_selector_in_config() {
    let config = Config {
        template_root_selector: "div > .tpl".to_string(),
        ..Config::default()
    };
    assert!(matches!(config.selectors(), Err(Error::Selector { .. })));
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(temp_dir.path().join("jtple.json")).unwrap_err();
    assert!(matches!(err, Error::IoError(_)));
}

#[test]
fn test_load_values_json_and_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let json_path = temp_dir.path().join("values.json");
    std::fs::write(&json_path, r#"{"title": "Hi", "comment": [{"text": "a"}]}"#).unwrap();
    assert_eq!(
        load_values(&json_path).unwrap(),
        json!({"title": "Hi", "comment": [{"text": "a"}]})
    );

    let yaml_path = temp_dir.path().join("values.yaml");
    std::fs::write(&yaml_path, "title: Hi\ncomment:\n  - text: a\n").unwrap();
    assert_eq!(
        load_values(&yaml_path).unwrap(),
        json!({"title": "Hi", "comment": [{"text": "a"}]})
    );
}
