use std::sync::Arc;

use twin_catalog::dtdl::{
    DeviceData, Dtmi, InterfaceRegistry, InterfaceValidator, Severity,
};

fn validator() -> InterfaceValidator {
    let registry = Arc::new(InterfaceRegistry::from_embedded().expect("catalog loads"));
    InterfaceValidator::new(registry)
}

fn device(json: serde_json::Value) -> DeviceData {
    serde_json::from_value(json).expect("valid device data")
}

fn dtmi(value: &str) -> Dtmi {
    Dtmi::new(value).expect("valid dtmi")
}

#[test]
fn perfect_match_scores_one_hundred() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": 22.5},
            "properties": {"temperatureUnit": "celsius", "alertThreshold": 30.0}
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        false,
    );

    assert_eq!(result.compatibility_score, 100.0);
    assert!(result.is_compatible);
    assert_eq!(result.matched_telemetry, vec!["temperature"]);
    assert_eq!(result.matched_properties, vec!["temperatureUnit", "alertThreshold"]);
    assert!(result.issues.is_empty());
    assert!(result.extra_fields.is_empty());
}

#[test]
fn missing_writable_properties_are_errors() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": 22.5},
            "properties": {}
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        false,
    );

    assert_eq!(result.missing_properties.len(), 2);
    let errors = result
        .issues
        .iter()
        .filter(|issue| issue.severity == Severity::Error)
        .count();
    assert_eq!(errors, 2);
    // matched 1 of 3 required, then 10 points per error.
    let expected = (1.0 / 3.0) * 100.0 - 20.0;
    assert!((result.compatibility_score - expected).abs() < 1e-9);
    assert!(!result.is_compatible);
}

#[test]
fn missing_read_only_properties_stay_warnings() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"pm25": 12.5},
            "properties": {"alertThreshold": 35.0}
        })),
        &dtmi("dtmi:iodt2:PM25Sensor;1"),
        false,
    );

    // measurementMode is declared read-only, so its absence must not block.
    assert_eq!(result.missing_properties, vec!["measurementMode"]);
    assert!(result
        .issues
        .iter()
        .all(|issue| issue.severity != Severity::Error));
    assert!(result.is_compatible);
}

#[test]
fn extra_fields_cost_two_points_each() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": 22.5, "pressure": 1013.25},
            "properties": {
                "temperatureUnit": "celsius",
                "alertThreshold": 30.0,
                "location": "Room 101"
            }
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        false,
    );

    assert_eq!(result.extra_fields.len(), 2);
    assert_eq!(result.compatibility_score, 96.0);
    assert!(result.is_compatible);
    assert!(result
        .issues
        .iter()
        .all(|issue| issue.severity == Severity::Info));
}

#[test]
fn strict_mode_turns_extras_into_errors() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": 22.5, "pressure": 1013.25},
            "properties": {"temperatureUnit": "celsius", "alertThreshold": 30.0}
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        true,
    );

    assert!(!result.is_compatible);
    assert!(result
        .issues
        .iter()
        .any(|issue| issue.severity == Severity::Error));
    // 100 base, one extra field (-2), one error (-10).
    assert_eq!(result.compatibility_score, 88.0);
}

#[test]
fn type_mismatches_warn_without_blocking() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": "twenty-two"},
            "properties": {"temperatureUnit": "celsius", "alertThreshold": 30.0}
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        false,
    );

    assert!(result.matched_telemetry.is_empty());
    let warning = result
        .issues
        .iter()
        .find(|issue| issue.field == "telemetry.temperature")
        .expect("mismatch warning");
    assert_eq!(warning.severity, Severity::Warning);
    assert!(warning.message.contains("expected double, got string"));
}

#[test]
fn integers_are_accepted_for_float_schemas() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": 22},
            "properties": {"temperatureUnit": "celsius", "alertThreshold": 30}
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        false,
    );
    assert_eq!(result.compatibility_score, 100.0);
    assert!(result.is_compatible);
}

#[test]
fn placeholder_values_skip_the_type_check() {
    let result = validator().validate(
        &device(serde_json::json!({
            "telemetry": {"temperature": 0},
            "properties": {"temperatureUnit": "", "alertThreshold": 0.1}
        })),
        &dtmi("dtmi:iodt2:TemperatureSensor;1"),
        false,
    );

    assert_eq!(result.matched_telemetry, vec!["temperature"]);
    assert_eq!(result.matched_properties.len(), 2);
    assert!(result.issues.is_empty());
}

#[test]
fn enum_membership_is_checked() {
    let validator = validator();
    let ok = validator.validate(
        &device(serde_json::json!({
            "telemetry": {"pm25": 12.5},
            "properties": {"alertThreshold": 35.0, "measurementMode": "continuous"}
        })),
        &dtmi("dtmi:iodt2:PM25Sensor;1"),
        false,
    );
    assert_eq!(ok.compatibility_score, 100.0);

    let bad = validator.validate(
        &device(serde_json::json!({
            "telemetry": {"pm25": 12.5},
            "properties": {"alertThreshold": 35.0, "measurementMode": "sometimes"}
        })),
        &dtmi("dtmi:iodt2:PM25Sensor;1"),
        false,
    );
    let issue = bad
        .issues
        .iter()
        .find(|issue| issue.field == "property.measurementMode")
        .expect("enum issue");
    assert!(issue.message.contains("Invalid enum value"));
    assert!(issue
        .suggestion
        .as_deref()
        .is_some_and(|s| s.contains("continuous")));
}

#[test]
fn unknown_interface_yields_zero_score() {
    let result = validator().validate(
        &device(serde_json::json!({"telemetry": {}, "properties": {}})),
        &dtmi("dtmi:iodt2:DoesNotExist;1"),
        false,
    );

    assert!(!result.is_compatible);
    assert_eq!(result.compatibility_score, 0.0);
    assert_eq!(result.interface_name, "Unknown");
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, Severity::Error);
}

#[test]
fn malformed_dtmi_is_rejected_before_lookup() {
    assert!(Dtmi::new("dtmi:iodt2:TemperatureSensor;1").is_ok());
    assert!(Dtmi::new("dtmi:invalid").is_err());
    assert!(Dtmi::new("notadtmi:test;1").is_err());
    assert!(Dtmi::new("dtmi:test;0").is_err());
}

#[test]
fn best_match_ranks_the_closest_interface_first() {
    let matches = validator().find_best_match(
        &device(serde_json::json!({
            "telemetry": {"pm25": 12.5},
            "properties": {"alertThreshold": 35.0}
        })),
        Some("sensor"),
        None,
        5,
    );

    assert!(!matches.is_empty());
    assert_eq!(matches[0].0.dtmi, "dtmi:iodt2:PM25Sensor;1");
    for pair in matches.windows(2) {
        assert!(pair[0].1 >= pair[1].1, "combined scores must be non-increasing");
    }
}

#[test]
fn best_match_ordering_is_stable_across_calls() {
    let validator = validator();
    let data = device(serde_json::json!({
        "telemetry": {"temperature": 22.0, "humidity": 55.0},
        "properties": {}
    }));

    let first: Vec<String> = validator
        .find_best_match(&data, Some("sensor"), Some("environmental"), 3)
        .into_iter()
        .map(|(validation, _)| validation.dtmi)
        .collect();
    let second: Vec<String> = validator
        .find_best_match(&data, Some("sensor"), Some("environmental"), 3)
        .into_iter()
        .map(|(validation, _)| validation.dtmi)
        .collect();

    assert_eq!(first, second);
    // Equal combined scores fall back to library order.
    assert_eq!(first[0], "dtmi:iodt2:TemperatureSensor;1");
    assert_eq!(first[1], "dtmi:iodt2:HumiditySensor;1");
}

#[test]
fn best_match_respects_top_n() {
    let matches = validator().find_best_match(
        &device(serde_json::json!({"telemetry": {}, "properties": {}})),
        Some("sensor"),
        None,
        2,
    );
    assert_eq!(matches.len(), 2);
}

#[test]
fn no_candidates_means_no_matches() {
    let matches = validator().find_best_match(
        &device(serde_json::json!({"telemetry": {}, "properties": {}})),
        Some("starship"),
        None,
        5,
    );
    assert!(matches.is_empty());
}

#[test]
fn requirements_split_on_writability() {
    let requirements = validator()
        .interface_requirements(&dtmi("dtmi:iodt2:PM25Sensor;1"))
        .expect("known interface");

    assert_eq!(requirements.display_name, "PM2.5 Sensor");
    assert_eq!(requirements.required_telemetry.len(), 1);
    assert_eq!(requirements.required_properties.len(), 1);
    assert_eq!(requirements.optional_properties.len(), 1);
    assert_eq!(requirements.total_requirements, 2);
    assert_eq!(requirements.required_telemetry[0].name, "pm25");
    assert_eq!(
        requirements.required_telemetry[0].unit.as_deref(),
        Some("microgramPerCubicMetre")
    );
}
