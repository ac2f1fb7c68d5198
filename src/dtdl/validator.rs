//! Compatibility scoring of device data against catalog interfaces.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::model::{ComplexSchema, Content, Dtmi, Schema};
use super::registry::{InterfaceRegistry, SearchFilter};

/// Severity of a validation issue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocking: the device cannot use this interface as-is.
    Error,
    /// Non-blocking, but recommended to fix.
    Warning,
    /// Informational suggestion.
    Info,
}

/// One compatibility problem, always returned as data, never raised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Outcome of validating device data against one interface. Constructed
/// fresh per call and never mutated after return.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    #[serde(rename = "isCompatible")]
    pub is_compatible: bool,
    #[serde(rename = "compatibilityScore")]
    pub compatibility_score: f64,
    pub dtmi: String,
    #[serde(rename = "interfaceName")]
    pub interface_name: String,
    pub issues: Vec<ValidationIssue>,
    #[serde(rename = "matchedTelemetry")]
    pub matched_telemetry: Vec<String>,
    #[serde(rename = "matchedProperties")]
    pub matched_properties: Vec<String>,
    #[serde(rename = "missingTelemetry")]
    pub missing_telemetry: Vec<String>,
    #[serde(rename = "missingProperties")]
    pub missing_properties: Vec<String>,
    #[serde(rename = "extraFields")]
    pub extra_fields: Vec<String>,
}

/// Telemetry and property readings reported by a device.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeviceData {
    #[serde(default)]
    pub telemetry: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Required/optional field summary of one interface.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InterfaceRequirements {
    pub dtmi: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub description: Option<String>,
    #[serde(rename = "requiredTelemetry")]
    pub required_telemetry: Vec<RequirementField>,
    #[serde(rename = "requiredProperties")]
    pub required_properties: Vec<RequirementField>,
    #[serde(rename = "optionalProperties")]
    pub optional_properties: Vec<RequirementField>,
    #[serde(rename = "totalRequirements")]
    pub total_requirements: usize,
}

/// One field inside [`InterfaceRequirements`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RequirementField {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub schema: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
}

/// Scores device data against catalog interfaces.
pub struct InterfaceValidator {
    registry: Arc<InterfaceRegistry>,
}

impl InterfaceValidator {
    /// Creates a validator over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<InterfaceRegistry>) -> Self {
        Self { registry }
    }

    /// Validates device data against one interface.
    ///
    /// With `strict` set, fields the interface does not declare are errors
    /// instead of informational notes.
    #[must_use]
    pub fn validate(&self, device: &DeviceData, dtmi: &Dtmi, strict: bool) -> ValidationResult {
        let Some(entry) = self.registry.get(dtmi) else {
            return ValidationResult {
                is_compatible: false,
                compatibility_score: 0.0,
                dtmi: dtmi.to_string(),
                interface_name: "Unknown".to_string(),
                issues: vec![ValidationIssue {
                    severity: Severity::Error,
                    field: "dtmi".to_string(),
                    message: format!("Interface not found: {dtmi}"),
                    suggestion: None,
                }],
                matched_telemetry: Vec::new(),
                matched_properties: Vec::new(),
                missing_telemetry: Vec::new(),
                missing_properties: Vec::new(),
                extra_fields: Vec::new(),
            };
        };

        let mut issues = Vec::new();
        let mut matched_telemetry = Vec::new();
        let mut matched_properties = Vec::new();
        let mut missing_telemetry = Vec::new();
        let mut missing_properties = Vec::new();
        let mut extra_fields = Vec::new();

        let mut declared_telemetry: Vec<(&str, &Schema)> = Vec::new();
        let mut declared_properties: Vec<(&str, &Schema, bool)> = Vec::new();
        for content in &entry.definition.contents {
            match content {
                Content::Telemetry { name, schema, .. } => {
                    declared_telemetry.push((name, schema));
                }
                Content::Property {
                    name,
                    schema,
                    writable,
                    ..
                } => declared_properties.push((name, schema, *writable)),
                Content::Command { .. } | Content::Component { .. } => {}
            }
        }

        for (name, schema) in &declared_telemetry {
            if let Some(value) = device.telemetry.get(*name) {
                let schema_issues = check_schema(name, value, schema, "telemetry");
                if schema_issues.is_empty() {
                    matched_telemetry.push((*name).to_string());
                } else {
                    issues.extend(schema_issues);
                }
            } else {
                missing_telemetry.push((*name).to_string());
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    field: format!("telemetry.{name}"),
                    message: format!("Missing telemetry: {name}"),
                    suggestion: Some(format!("Add telemetry field '{name}' with schema {schema}")),
                });
            }
        }

        for (name, schema, writable) in &declared_properties {
            if let Some(value) = device.properties.get(*name) {
                let schema_issues = check_schema(name, value, schema, "property");
                if schema_issues.is_empty() {
                    matched_properties.push((*name).to_string());
                } else {
                    issues.extend(schema_issues);
                }
            } else {
                missing_properties.push((*name).to_string());
                issues.push(ValidationIssue {
                    // A writable property is a requirement the device must
                    // satisfy; read-only ones are reported but non-blocking.
                    severity: if *writable {
                        Severity::Error
                    } else {
                        Severity::Warning
                    },
                    field: format!("property.{name}"),
                    message: format!("Missing property: {name}"),
                    suggestion: Some(format!("Add property field '{name}' with schema {schema}")),
                });
            }
        }

        let extra_severity = if strict { Severity::Error } else { Severity::Info };
        for name in device.telemetry.keys() {
            if !declared_telemetry
                .iter()
                .any(|(declared, _)| *declared == name.as_str())
            {
                extra_fields.push(format!("telemetry.{name}"));
                issues.push(ValidationIssue {
                    severity: extra_severity,
                    field: format!("telemetry.{name}"),
                    message: format!("Extra telemetry not defined in interface: {name}"),
                    suggestion: Some(
                        "Remove this field or extend the interface to include it".to_string(),
                    ),
                });
            }
        }
        for name in device.properties.keys() {
            if !declared_properties
                .iter()
                .any(|(declared, _, _)| *declared == name.as_str())
            {
                extra_fields.push(format!("property.{name}"));
                issues.push(ValidationIssue {
                    severity: extra_severity,
                    field: format!("property.{name}"),
                    message: format!("Extra property not defined in interface: {name}"),
                    suggestion: Some(
                        "Remove this field or extend the interface to include it".to_string(),
                    ),
                });
            }
        }

        let error_count = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count();
        let compatibility_score = score(
            matched_telemetry.len() + matched_properties.len(),
            missing_telemetry.len() + missing_properties.len(),
            extra_fields.len(),
            error_count,
        );
        let is_compatible = compatibility_score >= 60.0 && error_count == 0;

        ValidationResult {
            is_compatible,
            compatibility_score,
            dtmi: dtmi.to_string(),
            interface_name: entry.display_name().to_string(),
            issues,
            matched_telemetry,
            matched_properties,
            missing_telemetry,
            missing_properties,
            extra_fields,
        }
    }

    /// Ranks catalog interfaces by fit for the supplied device data.
    ///
    /// Combined score is `0.8 × compatibility + 0.2 × metadata`, where the
    /// metadata score grants 10 for an exact thing-type match and 10 for
    /// domain membership. Ordering is stable: ties keep library order.
    #[must_use]
    pub fn find_best_match(
        &self,
        device: &DeviceData,
        thing_type: Option<&str>,
        domain: Option<&str>,
        top_n: usize,
    ) -> Vec<(ValidationResult, f64)> {
        let mut filter = SearchFilter::default();
        if let Some(thing_type) = thing_type {
            filter = filter.with_thing_type(thing_type);
        }
        if let Some(domain) = domain {
            filter = filter.with_domain(domain);
        }

        let candidates = self.registry.search(&filter);
        if candidates.is_empty() {
            warn!(?thing_type, ?domain, "no candidate interfaces for device");
            return Vec::new();
        }

        let mut results: Vec<(ValidationResult, f64)> = candidates
            .iter()
            .map(|candidate| {
                let validation = self.validate(device, candidate.dtmi(), false);

                let mut metadata_score = 0.0;
                if let Some(thing_type) = thing_type {
                    if candidate.thing_type.as_deref() == Some(thing_type) {
                        metadata_score += 10.0;
                    }
                }
                if let Some(domain) = domain {
                    if self.registry.is_in_domain(candidate.dtmi(), domain) {
                        metadata_score += 10.0;
                    }
                }

                let combined = validation.compatibility_score * 0.8 + metadata_score * 0.2;
                (validation, combined)
            })
            .collect();

        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        results.truncate(top_n);
        results
    }

    /// Summarizes what an interface requires from a device. Writable
    /// properties count as required, read-only ones as optional.
    #[must_use]
    pub fn interface_requirements(&self, dtmi: &Dtmi) -> Option<InterfaceRequirements> {
        let entry = self.registry.get(dtmi)?;

        let mut required_telemetry = Vec::new();
        let mut required_properties = Vec::new();
        let mut optional_properties = Vec::new();
        for content in &entry.definition.contents {
            match content {
                Content::Telemetry {
                    name,
                    schema,
                    display_name,
                    unit,
                } => required_telemetry.push(RequirementField {
                    name: name.clone(),
                    display_name: display_name.clone().unwrap_or_else(|| name.clone()),
                    schema: schema.to_string(),
                    unit: unit.clone(),
                    writable: None,
                }),
                Content::Property {
                    name,
                    schema,
                    writable,
                    display_name,
                    unit,
                } => {
                    let field = RequirementField {
                        name: name.clone(),
                        display_name: display_name.clone().unwrap_or_else(|| name.clone()),
                        schema: schema.to_string(),
                        unit: unit.clone(),
                        writable: Some(*writable),
                    };
                    if *writable {
                        required_properties.push(field);
                    } else {
                        optional_properties.push(field);
                    }
                }
                Content::Command { .. } | Content::Component { .. } => {}
            }
        }

        let total_requirements = required_telemetry.len() + required_properties.len();
        Some(InterfaceRequirements {
            dtmi: dtmi.to_string(),
            display_name: entry.display_name().to_string(),
            description: entry.description().map(str::to_string),
            required_telemetry,
            required_properties,
            optional_properties,
            total_requirements,
        })
    }
}

/// Whether a value looks like an unset form placeholder rather than a real
/// reading. Inherited convention: empty string, zero, `false` and the
/// literal `0.1` all mean "not yet provided". A genuine reading of exactly
/// `0` or `0.1` is indistinguishable from unset; the convention is kept for
/// compatibility, not extended.
fn is_placeholder(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(text) => text.is_empty(),
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::Number(number) => {
            number.as_f64() == Some(0.0) || number.as_f64() == Some(0.1)
        }
        _ => false,
    }
}

fn check_schema(
    name: &str,
    value: &serde_json::Value,
    schema: &Schema,
    field_kind: &str,
) -> Vec<ValidationIssue> {
    if is_placeholder(value) {
        return Vec::new();
    }

    let mut issues = Vec::new();
    match schema {
        Schema::Primitive(primitive) => {
            if !primitive.matches(value) {
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    field: format!("{field_kind}.{name}"),
                    message: format!(
                        "Type mismatch: expected {}, got {}",
                        primitive.as_str(),
                        json_kind(value)
                    ),
                    suggestion: Some(format!("Convert value to {}", primitive.as_str())),
                });
            }
        }
        Schema::Complex(ComplexSchema::Enum { enum_values, .. }) => {
            if !enum_values.iter().any(|ev| &ev.enum_value == value) {
                let admissible = enum_values
                    .iter()
                    .map(|ev| ev.enum_value.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    field: format!("{field_kind}.{name}"),
                    message: format!("Invalid enum value: {value}"),
                    suggestion: Some(format!("Use one of: {admissible}")),
                });
            }
        }
        Schema::Complex(ComplexSchema::Object { .. }) => {
            if !value.is_object() {
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    field: format!("{field_kind}.{name}"),
                    message: format!("Expected object, got {}", json_kind(value)),
                    suggestion: Some("Provide an object value".to_string()),
                });
            }
        }
        Schema::Complex(ComplexSchema::Array { .. }) => {
            if !value.is_array() {
                issues.push(ValidationIssue {
                    severity: Severity::Warning,
                    field: format!("{field_kind}.{name}"),
                    message: format!("Expected array, got {}", json_kind(value)),
                    suggestion: Some("Provide an array value".to_string()),
                });
            }
        }
    }
    issues
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(number) if number.is_i64() || number.is_u64() => "integer",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Score formula: the matched share of required fields on a 0..=100 scale,
/// minus 2 per extra field and 10 per error, clamped.
fn score(matched: usize, missing: usize, extras: usize, errors: usize) -> f64 {
    let required = matched + missing;
    let mut score = if required == 0 {
        100.0
    } else {
        (matched as f64 / required as f64) * 100.0
    };
    score -= extras as f64 * 2.0;
    score -= errors as f64 * 10.0;
    score.clamp(0.0, 100.0)
}
