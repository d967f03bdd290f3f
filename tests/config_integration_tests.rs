//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Settings loading, saving and environment overrides
//! - Preset saving, loading and validation
//! - Reopening processor config documents as presets
//! - Integration with StateManager

use camino::Utf8PathBuf;
use rpdx_frontend::models::{ExportFormat, OptionValue, RunMode};
use rpdx_frontend::services::ConfigSerializer;
use rpdx_frontend::{ConfigManager, FrontendSettings, OptionModel, StateChange, StateManager};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
}

#[test]
fn test_missing_settings_file_gives_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.output_root_name, "dirlod");
    assert!(!settings.include_usdz);
    assert_eq!(settings.run_mode, RunMode::Direct);
}

#[test]
fn test_settings_file_values() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "processor_exe: /opt/rpdx/bin/rpdx\ninclude_usdz: true\nrun_mode: script\n",
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.processor_exe, "/opt/rpdx/bin/rpdx");
    assert!(settings.include_usdz);
    assert_eq!(settings.run_mode, RunMode::Script);
}

#[test]
fn test_environment_overrides_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.settings_path(), "timeout_secs: 30\n").unwrap();

    // Only this test touches the variable
    unsafe { std::env::set_var("RPDX_FRONTEND_TIMEOUT_SECS", "900") };
    let settings = manager.load_settings();
    unsafe { std::env::remove_var("RPDX_FRONTEND_TIMEOUT_SECS") };

    assert_eq!(settings.unwrap().timeout_secs, 900);
}

#[test]
fn test_malformed_settings_file_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.settings_path(), "run_mode: [not, a, mode]\n").unwrap();

    assert!(manager.load_settings().is_err());
}

#[test]
fn test_save_settings_round_trip() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = FrontendSettings {
        processor_exe: "rpdx-2".to_string(),
        run_mode: RunMode::JsonOnly,
        debug_mode: true,
        ..Default::default()
    };
    manager.save_settings(&settings).unwrap();

    let yaml = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(yaml.contains("run_mode: json-only"));

    let loaded = manager.load_settings().unwrap();
    assert_eq!(loaded.processor_exe, "rpdx-2");
    assert_eq!(loaded.run_mode, RunMode::JsonOnly);
    assert!(loaded.debug_mode);
}

#[test]
fn test_preset_yaml_is_nested_by_section() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut model = OptionModel::new();
    model.set_raw("sceneGraph.flatteningMethod", "auto").unwrap();
    model.set_raw("modifier.enabled", "true").unwrap();

    let path = config_path.join("presets").join("small.yaml");
    manager.save_preset(&path, &model).unwrap();

    let yaml = fs::read_to_string(&path).unwrap();
    assert!(yaml.contains("sceneGraph:"));
    assert!(yaml.contains("flatteningMethod: auto"));

    let loaded = manager.load_preset(&path).unwrap();
    assert_eq!(loaded.get("modifier.enabled"), Some(&OptionValue::Bool(true)));
}

#[test]
fn test_preset_with_unknown_option_is_rejected() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let path = config_path.join("typo.yaml");
    fs::write(&path, "sceneGraph:\n  flatenningMethod: auto\n").unwrap();

    let err = manager.load_preset(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("flatenningMethod"));
}

#[test]
fn test_config_document_reopens_as_preset() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut model = OptionModel::with_defaults();
    model.set_raw("sceneGraph.splitMode", "auto").unwrap();
    let text = ConfigSerializer::new().render(&model, ExportFormat::Fbx).unwrap();

    let path = config_path.join("UserCustomConfigRPDX_fbx.Json");
    fs::write(&path, text).unwrap();

    let loaded = manager.load_preset(&path).unwrap();
    assert_eq!(loaded.choice("sceneGraph.splitMode"), Some("auto".to_string()));
}

#[test]
fn test_preset_into_state_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let path = manager.default_preset_path();
    manager.save_preset(&path, &OptionModel::with_defaults()).unwrap();

    let state = StateManager::new();
    let changes = state.replace_options(manager.load_preset(&path).unwrap());
    assert_eq!(changes, vec![StateChange::OptionsChanged]);

    fs::write(manager.settings_path(), "include_usdz: true\n").unwrap();
    let changes = state.load_settings(manager.load_settings().unwrap());
    assert!(changes.contains(&StateChange::SettingsChanged));
    assert!(state.read(|s| s.settings.include_usdz));
}
