use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Kubernetes-style metadata block shared by interfaces and instances.
///
/// Provenance and device annotations travel inside the `labels` and
/// `annotations` maps under well-known keys; absent keys are simply absent,
/// never errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TwinMetadata {
    name: String,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
}

/// Label keys carrying provenance.
pub mod labels {
    pub const GENERATED_BY: &str = "generated-by";
    pub const GENERATED_AT: &str = "generated-at";
    pub const THING_TYPE: &str = "thing-type";
}

/// Annotation keys carrying source and device metadata.
pub mod annotations {
    pub const SOURCE: &str = "source";
    pub const ORIGINAL_ID: &str = "original-id";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const MODEL: &str = "model";
    pub const SERIAL_NUMBER: &str = "serialNumber";
    pub const FIRMWARE_VERSION: &str = "firmwareVersion";
    pub const DTDL_INTERFACE: &str = "dtdl-interface";
    pub const DTDL_INTERFACE_NAME: &str = "dtdl-interface-name";
    pub const DTDL_CATEGORY: &str = "dtdl-category";
}

impl TwinMetadata {
    /// Creates metadata with the supplied name. The name must be non-empty;
    /// it seeds every URI derived for the twin.
    pub fn new(name: impl Into<String>) -> Result<Self, TwinDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TwinDefinitionError::MissingName);
        }
        Ok(Self {
            name,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        })
    }

    /// Attaches a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Attaches an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a label value by key.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Returns an annotation value by key.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Parses the `generated-at` label as an RFC 3339 timestamp, if present
    /// and well formed.
    #[must_use]
    pub fn generated_at(&self) -> Option<DateTime<FixedOffset>> {
        self.label(labels::GENERATED_AT)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }

    pub(crate) fn from_parts(
        name: String,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
    ) -> Result<Self, TwinDefinitionError> {
        let mut metadata = Self::new(name)?;
        metadata.labels = labels;
        metadata.annotations = annotations;
        Ok(metadata)
    }
}

/// Primitive or structured type tag of a twin property.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropertyType {
    Float,
    Integer,
    String,
    Boolean,
    Object,
    Array,
}

impl PropertyType {
    /// Canonical lowercase spelling used in definitions and triples.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = TwinDefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float" => Ok(Self::Float),
            "integer" => Ok(Self::Integer),
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            other => Err(TwinDefinitionError::UnknownPropertyType {
                value: other.to_string(),
            }),
        }
    }
}

/// Data property declared by an interface.
#[derive(Clone, Debug, PartialEq)]
pub struct TwinProperty {
    name: String,
    kind: PropertyType,
    description: Option<String>,
    writable: Option<bool>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    unit: Option<String>,
}

impl TwinProperty {
    /// Creates a property with the supplied name and type tag.
    pub fn new(
        name: impl Into<String>,
        kind: PropertyType,
    ) -> Result<Self, TwinDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TwinDefinitionError::MissingName);
        }
        Ok(Self {
            name,
            kind,
            description: None,
            writable: None,
            minimum: None,
            maximum: None,
            unit: None,
        })
    }

    /// Sets a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the property writable or read-only.
    #[must_use]
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    /// Sets the inclusive numeric range.
    #[must_use]
    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Sets the measurement unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn writable(&self) -> Option<bool> {
        self.writable
    }

    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// Link declared between two interfaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TwinRelationship {
    name: String,
    target_interface: String,
    description: Option<String>,
}

impl TwinRelationship {
    /// Creates a relationship pointing at the named target interface.
    pub fn new(
        name: impl Into<String>,
        target_interface: impl Into<String>,
    ) -> Result<Self, TwinDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TwinDefinitionError::MissingName);
        }
        Ok(Self {
            name,
            target_interface: target_interface.into(),
            description: None,
        })
    }

    /// Sets a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target_interface(&self) -> &str {
        &self.target_interface
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Actionable command declared by an interface.
#[derive(Clone, Debug, PartialEq)]
pub struct TwinCommand {
    name: String,
    description: Option<String>,
    schema: Option<serde_json::Value>,
}

impl TwinCommand {
    /// Creates a command with the supplied name.
    pub fn new(name: impl Into<String>) -> Result<Self, TwinDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TwinDefinitionError::MissingName);
        }
        Ok(Self {
            name,
            description: None,
            schema: None,
        })
    }

    /// Sets a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the command input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn schema(&self) -> Option<&serde_json::Value> {
        self.schema.as_ref()
    }
}

/// Blueprint for digital twins: declares properties, relationships and
/// commands that instances of this interface expose.
#[derive(Clone, Debug, PartialEq)]
pub struct TwinInterface {
    metadata: TwinMetadata,
    description: Option<String>,
    properties: Vec<TwinProperty>,
    relationships: Vec<TwinRelationship>,
    commands: Vec<TwinCommand>,
}

impl TwinInterface {
    /// Creates an empty interface around the supplied metadata.
    #[must_use]
    pub fn new(metadata: TwinMetadata) -> Self {
        Self {
            metadata,
            description: None,
            properties: Vec::new(),
            relationships: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Sets a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a property declaration, rejecting duplicate names.
    pub fn add_property(&mut self, property: TwinProperty) -> Result<(), TwinDefinitionError> {
        if self.properties.iter().any(|p| p.name() == property.name()) {
            return Err(TwinDefinitionError::Duplicate {
                kind: "property",
                name: property.name().to_string(),
            });
        }
        self.properties.push(property);
        Ok(())
    }

    /// Appends a relationship declaration, rejecting duplicate names.
    pub fn add_relationship(
        &mut self,
        relationship: TwinRelationship,
    ) -> Result<(), TwinDefinitionError> {
        if self
            .relationships
            .iter()
            .any(|r| r.name() == relationship.name())
        {
            return Err(TwinDefinitionError::Duplicate {
                kind: "relationship",
                name: relationship.name().to_string(),
            });
        }
        self.relationships.push(relationship);
        Ok(())
    }

    /// Appends a command declaration, rejecting duplicate names.
    pub fn add_command(&mut self, command: TwinCommand) -> Result<(), TwinDefinitionError> {
        if self.commands.iter().any(|c| c.name() == command.name()) {
            return Err(TwinDefinitionError::Duplicate {
                kind: "command",
                name: command.name().to_string(),
            });
        }
        self.commands.push(command);
        Ok(())
    }

    #[must_use]
    pub fn metadata(&self) -> &TwinMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn properties(&self) -> &[TwinProperty] {
        &self.properties
    }

    #[must_use]
    pub fn relationships(&self) -> &[TwinRelationship] {
        &self.relationships
    }

    #[must_use]
    pub fn commands(&self) -> &[TwinCommand] {
        &self.commands
    }
}

/// Concrete relationship between two instances. Modeled as an anonymous node
/// in RDF, so it carries no identity of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceRelationship {
    name: String,
    target_instance: String,
}

impl InstanceRelationship {
    /// Creates a relationship pointing at the named target instance.
    pub fn new(
        name: impl Into<String>,
        target_instance: impl Into<String>,
    ) -> Result<Self, TwinDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TwinDefinitionError::MissingName);
        }
        Ok(Self {
            name,
            target_instance: target_instance.into(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target_instance(&self) -> &str {
        &self.target_instance
    }
}

/// Concrete device bound to exactly one interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TwinInstance {
    metadata: TwinMetadata,
    interface: String,
    relationships: Vec<InstanceRelationship>,
}

impl TwinInstance {
    /// Creates an instance of the named interface.
    pub fn new(
        metadata: TwinMetadata,
        interface: impl Into<String>,
    ) -> Result<Self, TwinDefinitionError> {
        let interface = interface.into();
        if interface.trim().is_empty() {
            return Err(TwinDefinitionError::MissingInterface {
                instance: metadata.name().to_string(),
            });
        }
        Ok(Self {
            metadata,
            interface,
            relationships: Vec::new(),
        })
    }

    /// Appends a relationship to another instance.
    pub fn add_relationship(&mut self, relationship: InstanceRelationship) {
        self.relationships.push(relationship);
    }

    #[must_use]
    pub fn metadata(&self) -> &TwinMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Name of the interface this instance realizes.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    #[must_use]
    pub fn relationships(&self) -> &[InstanceRelationship] {
        &self.relationships
    }
}

/// Errors raised while building or parsing twin definitions.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TwinDefinitionError {
    /// A definition or nested declaration lacks its required name.
    #[error("definition is missing the required `name` field")]
    MissingName,
    /// An instance does not reference an interface.
    #[error("instance `{instance}` does not reference an interface")]
    MissingInterface { instance: String },
    /// A nested declaration reuses a name already taken by a sibling.
    #[error("duplicate {kind} `{name}`")]
    Duplicate { kind: &'static str, name: String },
    /// A property carries a type tag outside the closed set.
    #[error("unknown property type `{value}`")]
    UnknownPropertyType { value: String },
    /// The YAML document could not be parsed or has the wrong `kind`.
    #[error("malformed definition document: {0}")]
    Document(String),
}

#[cfg(test)]
mod tests {
    use super::{
        InstanceRelationship, PropertyType, TwinDefinitionError, TwinInstance, TwinInterface,
        TwinMetadata, TwinProperty,
    };

    fn metadata(name: &str) -> TwinMetadata {
        TwinMetadata::new(name).expect("valid metadata")
    }

    #[test]
    fn metadata_rejects_empty_name() {
        let err = TwinMetadata::new("  ").expect_err("empty name");
        assert_eq!(err, TwinDefinitionError::MissingName);
    }

    #[test]
    fn interface_rejects_duplicate_properties() {
        let mut interface = TwinInterface::new(metadata("iodt2-sensor"));
        interface
            .add_property(TwinProperty::new("temperature", PropertyType::Float).unwrap())
            .expect("first insert");
        let err = interface
            .add_property(TwinProperty::new("temperature", PropertyType::Float).unwrap())
            .expect_err("duplicate rejected");
        assert!(matches!(err, TwinDefinitionError::Duplicate { kind: "property", .. }));
    }

    #[test]
    fn instance_requires_interface_reference() {
        let err = TwinInstance::new(metadata("iodt2-dev1"), " ").expect_err("missing interface");
        assert!(matches!(err, TwinDefinitionError::MissingInterface { .. }));
    }

    #[test]
    fn generated_at_parses_rfc3339_labels() {
        let meta = metadata("iodt2-sensor")
            .with_label(super::labels::GENERATED_AT, "2024-03-01T12:00:00+00:00");
        let parsed = meta.generated_at().expect("timestamp parses");
        assert_eq!(parsed.timestamp(), 1_709_294_400);
    }

    #[test]
    fn instance_relationships_are_ordered() {
        let mut instance =
            TwinInstance::new(metadata("iodt2-room"), "iodt2-building").expect("instance");
        instance.add_relationship(InstanceRelationship::new("contains", "iodt2-desk").unwrap());
        instance.add_relationship(InstanceRelationship::new("contains", "iodt2-lamp").unwrap());
        let targets: Vec<_> = instance
            .relationships()
            .iter()
            .map(InstanceRelationship::target_instance)
            .collect();
        assert_eq!(targets, vec!["iodt2-desk", "iodt2-lamp"]);
    }
}
