use std::fs;

use sensorlink_core::{
    ConfigError, FieldValue, LayoutRegistry, LayoutSelector, decode_batch, load_layouts,
};
use tempfile::TempDir;

const OUTDOOR_LAYOUTS: &str = r#"{
  "layouts": [
    {
      "name": "outdoor",
      "expected_len": 10,
      "fields": [
        { "name": "Uptime", "offset": 0, "width": 32, "transform": "epoch_seconds" },
        { "name": "Battery", "offset": 4, "width": 16, "signed": true },
        { "name": "Temperature", "offset": 6, "width": 16, "signed": true, "scale": 10.0 },
        { "name": "Counter", "offset": 8, "width": 16 }
      ]
    }
  ]
}"#;

#[test]
fn loaded_layout_joins_builtin_registry() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("layouts.json");
    fs::write(&path, OUTDOOR_LAYOUTS).expect("write layouts");

    let mut registry = LayoutRegistry::builtin().expect("builtin layouts");
    for layout in load_layouts(&path).expect("load layouts") {
        registry.insert(layout);
    }
    assert_eq!(registry.len(), 5);

    let payload = [0x00, 0x00, 0x0E, 0x10, 0x0F, 0xA0, 0xFF, 0x38, 0xFF, 0xFF];
    let report = decode_batch(&registry, &LayoutSelector::Auto, [payload]).expect("batch");
    let entry = &report.entries[0];
    assert_eq!(entry.layout.as_deref(), Some("outdoor"));

    let data = entry.result.data().expect("data");
    assert_eq!(data.get("Uptime"), Some(&FieldValue::Unsigned(3600)));
    assert_eq!(data.get("Battery"), Some(&FieldValue::Integer(4000)));
    assert_eq!(data.get("Temperature"), Some(&FieldValue::Float(-20.0)));
    assert_eq!(data.get("Counter"), Some(&FieldValue::Unsigned(65535)));
}

#[test]
fn missing_file_is_io_error() {
    let temp = TempDir::new().expect("tempdir");
    let err = load_layouts(&temp.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("missing.json"));
}

#[test]
fn unknown_top_level_key_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("layouts.json");
    fs::write(&path, r#"{"layout": []}"#).expect("write layouts");
    let err = load_layouts(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}
