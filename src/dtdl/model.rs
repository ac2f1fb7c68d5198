//! Catalog entry types.
//!
//! Interface definitions follow the DTDL v2 shape: an `@id` in DTMI form and
//! a content list whose entries are tagged Telemetry/Property/Command/
//! Component. Schemas are a closed union, so the scorer's type checks are
//! exhaustive matches rather than string comparisons.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Value object ensuring that supplied text is a well-formed DTMI
/// (`dtmi:<segment>(:<segment>)*;<positive integer>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct Dtmi {
    value: String,
}

fn dtmi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^dtmi(?::[A-Za-z0-9_]+)+;[1-9][0-9]*$").expect("valid pattern")
    })
}

impl Dtmi {
    /// Validates and constructs a new [`Dtmi`] value object. Rejecting
    /// malformed identifiers here means every lookup downstream works with a
    /// canonical identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, DtmiError> {
        let value = value.into();
        if !dtmi_pattern().is_match(&value) {
            return Err(DtmiError::Invalid { value });
        }
        Ok(Self { value })
    }

    /// Returns the underlying textual representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl Display for Dtmi {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Dtmi {
    type Err = DtmiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TryFrom<String> for Dtmi {
    type Error = DtmiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Dtmi> for String {
    fn from(dtmi: Dtmi) -> Self {
        dtmi.value
    }
}

/// Errors produced when validating a [`Dtmi`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DtmiError {
    /// The provided text is not a well-formed DTMI.
    #[error("invalid DTMI: {value}")]
    Invalid { value: String },
}

/// Primitive DTDL schema types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveSchema {
    Boolean,
    Date,
    DateTime,
    Double,
    Duration,
    Float,
    Integer,
    Long,
    String,
    Time,
}

impl PrimitiveSchema {
    /// Whether a runtime JSON value is acceptable for this schema. Integer
    /// values are accepted where a floating-point schema is declared.
    #[must_use]
    pub fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Double | Self::Float => value.is_number(),
            Self::Integer | Self::Long => value.is_i64() || value.is_u64(),
            Self::Date | Self::DateTime | Self::Duration | Self::String | Self::Time => {
                value.is_string()
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::String => "string",
            Self::Time => "time",
        }
    }
}

/// One admissible value of an enum schema.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(rename = "enumValue")]
    pub enum_value: serde_json::Value,
}

/// One field of an object schema.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ObjectField {
    pub name: String,
    pub schema: Box<Schema>,
}

/// Structured DTDL schemas, tagged by `@type`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "@type")]
pub enum ComplexSchema {
    Enum {
        #[serde(rename = "valueSchema")]
        value_schema: Option<PrimitiveSchema>,
        #[serde(rename = "enumValues", default)]
        enum_values: Vec<EnumValue>,
    },
    Object {
        #[serde(default)]
        fields: Vec<ObjectField>,
    },
    Array {
        #[serde(rename = "elementSchema")]
        element_schema: Box<Schema>,
    },
}

/// A DTDL schema: either a primitive name or a structured definition.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    Primitive(PrimitiveSchema),
    Complex(ComplexSchema),
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => f.write_str(primitive.as_str()),
            Self::Complex(ComplexSchema::Enum { .. }) => f.write_str("Enum"),
            Self::Complex(ComplexSchema::Object { .. }) => f.write_str("Object"),
            Self::Complex(ComplexSchema::Array { .. }) => f.write_str("Array"),
        }
    }
}

/// One entry of an interface's content list, tagged by `@type`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "@type")]
pub enum Content {
    Telemetry {
        name: String,
        schema: Schema,
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
        #[serde(default)]
        unit: Option<String>,
    },
    Property {
        name: String,
        schema: Schema,
        #[serde(default)]
        writable: bool,
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
        #[serde(default)]
        unit: Option<String>,
    },
    Command {
        name: String,
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
    Component {
        name: String,
        schema: String,
        #[serde(rename = "displayName", default)]
        display_name: Option<String>,
    },
}

impl Content {
    /// Name of the content entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Telemetry { name, .. }
            | Self::Property { name, .. }
            | Self::Command { name, .. }
            | Self::Component { name, .. } => name,
        }
    }
}

/// Counts of the content kinds an interface declares.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ContentSummary {
    #[serde(rename = "telemetryCount")]
    pub telemetry: usize,
    #[serde(rename = "propertyCount")]
    pub properties: usize,
    #[serde(rename = "commandCount")]
    pub commands: usize,
    #[serde(rename = "componentCount")]
    pub components: usize,
    #[serde(rename = "totalContents")]
    pub total: usize,
}

/// A DTDL interface definition as parsed from the catalog.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InterfaceDefinition {
    #[serde(rename = "@id")]
    pub id: Dtmi,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub contents: Vec<Content>,
}

impl InterfaceDefinition {
    /// Counts the declared content kinds.
    #[must_use]
    pub fn summary(&self) -> ContentSummary {
        let mut summary = ContentSummary::default();
        for content in &self.contents {
            match content {
                Content::Telemetry { .. } => summary.telemetry += 1,
                Content::Property { .. } => summary.properties += 1,
                Content::Command { .. } => summary.commands += 1,
                Content::Component { .. } => summary.components += 1,
            }
        }
        summary.total = self.contents.len();
        summary
    }
}

/// A catalog entry: the parsed definition plus its library classification.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    pub definition: InterfaceDefinition,
    pub category: String,
    pub tags: Vec<String>,
    pub thing_type: Option<String>,
}

impl CatalogEntry {
    /// The entry's DTMI.
    #[must_use]
    pub fn dtmi(&self) -> &Dtmi {
        &self.definition.id
    }

    /// Display name, falling back to the DTMI.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.definition
            .display_name
            .as_deref()
            .unwrap_or_else(|| self.definition.id.as_str())
    }

    /// Optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{ComplexSchema, Content, Dtmi, InterfaceDefinition, PrimitiveSchema, Schema};

    #[rstest]
    #[case::plain("dtmi:iodt2:TemperatureSensor;1", true)]
    #[case::multi_segment("dtmi:com:example:Thermostat_2;12", true)]
    #[case::missing_version("dtmi:invalid", false)]
    #[case::wrong_scheme("notadtmi:test;1", false)]
    #[case::zero_version("dtmi:test;0", false)]
    #[case::negative_version("dtmi:test;-1", false)]
    #[case::no_segments("dtmi:;1", false)]
    #[case::dotted_segment("dtmi:io.dt:Sensor;1", false)]
    fn validates_dtmi_format(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(Dtmi::new(input).is_ok(), valid, "{input}");
    }

    #[test]
    fn parses_interface_definition() {
        let definition: InterfaceDefinition = serde_json::from_str(
            r#"{
                "@id": "dtmi:iodt2:TemperatureSensor;1",
                "@type": "Interface",
                "displayName": "Temperature Sensor",
                "contents": [
                    {"@type": "Telemetry", "name": "temperature", "schema": "double", "unit": "degreeCelsius"},
                    {"@type": "Property", "name": "temperatureUnit", "schema": "string", "writable": true},
                    {"@type": "Command", "name": "recalibrate"},
                    {"@type": "Component", "name": "display", "schema": "dtmi:iodt2:Display;1"}
                ]
            }"#,
        )
        .expect("parses");
        let summary = definition.summary();
        assert_eq!(summary.telemetry, 1);
        assert_eq!(summary.properties, 1);
        assert_eq!(summary.commands, 1);
        assert_eq!(summary.components, 1);
        assert_eq!(summary.total, 4);
        assert!(matches!(
            &definition.contents[0],
            Content::Telemetry { schema: Schema::Primitive(PrimitiveSchema::Double), .. }
        ));
    }

    #[test]
    fn parses_enum_schema() {
        let schema: Schema = serde_json::from_str(
            r#"{
                "@type": "Enum",
                "valueSchema": "string",
                "enumValues": [
                    {"name": "continuous", "enumValue": "continuous"},
                    {"name": "interval", "enumValue": "interval"}
                ]
            }"#,
        )
        .expect("parses");
        match schema {
            Schema::Complex(ComplexSchema::Enum { enum_values, .. }) => {
                assert_eq!(enum_values.len(), 2);
            }
            other => panic!("expected enum schema, got {other:?}"),
        }
    }

    #[test]
    fn integer_accepted_where_float_expected() {
        assert!(PrimitiveSchema::Double.matches(&serde_json::json!(22)));
        assert!(PrimitiveSchema::Double.matches(&serde_json::json!(22.5)));
        assert!(!PrimitiveSchema::Integer.matches(&serde_json::json!(22.5)));
        assert!(!PrimitiveSchema::Double.matches(&serde_json::json!("22")));
        assert!(!PrimitiveSchema::Boolean.matches(&serde_json::json!(1)));
    }
}
