use additives::{
    assess_label, sample_pack_json, stamp_checksum, verify_checksum, AdditiveRegistry,
    LookupOptions, PackError, RegionCode, UserPreferences,
};
use serde_json::Value;

#[test]
fn embedded_pack_checksum_verifies() {
    let value: Value = serde_json::from_str(sample_pack_json()).unwrap();
    let declared = value["checksum"].as_str().unwrap().to_string();
    assert_eq!(verify_checksum(&value).unwrap(), declared);
}

#[test]
fn restamped_pack_still_builds() {
    let mut value: Value = serde_json::from_str(sample_pack_json()).unwrap();
    value["version"] = Value::String("2025.10.01".into());
    assert!(verify_checksum(&value).is_err());
    stamp_checksum(&mut value).unwrap();
    verify_checksum(&value).unwrap();

    let reg = AdditiveRegistry::from_value(value).unwrap();
    assert_eq!(reg.version(), "2025.10.01");
}

#[test]
fn malformed_pack_is_fatal() {
    let no_additives = r#"{"version":"1","generated_at":"x"}"#;
    let err = AdditiveRegistry::from_json(no_additives).unwrap_err();
    assert!(matches!(err, PackError::Parse(_)));

    let mut value: Value = serde_json::from_str(sample_pack_json()).unwrap();
    value["alias_index"]["GHOST"] = Value::String("E000".into());
    let err = AdditiveRegistry::from_value(value).unwrap_err();
    assert!(err.to_string().contains("GHOST"));
}

#[test]
fn one_shot_assessment() {
    let mut prefs = UserPreferences::new(RegionCode::Eu);
    prefs.child_mode = true;
    let result = assess_label(
        sample_pack_json(),
        "Water, sugar, E951, colour (E129)",
        &prefs,
        LookupOptions::default(),
    )
    .unwrap();
    // E951: IARC annotation + child caution (yellow); E129: azo warning (red)
    assert_eq!(result.flagged_count, 1);
    assert_eq!(result.caution_count, 1);
}
