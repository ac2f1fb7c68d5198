//! Parsing of twin definition documents.
//!
//! Definitions arrive as Kubernetes-style custom resources
//! (`apiVersion: dtd.twin/v0`, `kind: TwinInterface` or `TwinInstance`).
//! The serde layer mirrors the wire shape; conversion into the domain
//! entities performs the structural validation.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::entities::{
    InstanceRelationship, PropertyType, TwinCommand, TwinDefinitionError, TwinInstance,
    TwinInterface, TwinMetadata, TwinProperty, TwinRelationship,
};

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    name: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

impl MetadataDocument {
    fn into_metadata(self) -> Result<TwinMetadata, TwinDefinitionError> {
        TwinMetadata::from_parts(self.name, self.labels, self.annotations)
    }
}

#[derive(Debug, Deserialize)]
struct PropertyDocument {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "x-writable")]
    writable: Option<bool>,
    #[serde(default, rename = "x-minimum")]
    minimum: Option<f64>,
    #[serde(default, rename = "x-maximum")]
    maximum: Option<f64>,
    #[serde(default, rename = "x-unit")]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelationshipDocument {
    name: String,
    interface: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommandDocument {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct InterfaceSpecDocument {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyDocument>,
    #[serde(default)]
    relationships: Vec<RelationshipDocument>,
    #[serde(default)]
    commands: Vec<CommandDocument>,
}

#[derive(Debug, Deserialize)]
struct InterfaceDocument {
    kind: String,
    metadata: MetadataDocument,
    #[serde(default)]
    spec: Option<InterfaceSpecDocument>,
}

#[derive(Debug, Deserialize)]
struct InstanceRelationshipDocument {
    name: String,
    instance: String,
}

#[derive(Debug, Deserialize)]
struct InstanceSpecDocument {
    interface: String,
    #[serde(default, rename = "twinInstanceRelationships")]
    relationships: Vec<InstanceRelationshipDocument>,
}

#[derive(Debug, Deserialize)]
struct InstanceDocument {
    kind: String,
    metadata: MetadataDocument,
    spec: InstanceSpecDocument,
}

/// Parses a `TwinInterface` YAML document.
pub fn interface_from_yaml(yaml: &str) -> Result<TwinInterface, TwinDefinitionError> {
    let document: InterfaceDocument =
        serde_yaml::from_str(yaml).map_err(|err| TwinDefinitionError::Document(err.to_string()))?;
    if document.kind != "TwinInterface" {
        return Err(TwinDefinitionError::Document(format!(
            "expected kind TwinInterface, got `{}`",
            document.kind
        )));
    }

    let mut interface = TwinInterface::new(document.metadata.into_metadata()?);
    let Some(spec) = document.spec else {
        return Ok(interface);
    };
    if let Some(description) = spec.description {
        interface = interface.with_description(description);
    }

    for doc in spec.properties {
        let kind: PropertyType = doc.kind.parse()?;
        let mut property = TwinProperty::new(doc.name, kind)?;
        if let Some(description) = doc.description {
            property = property.with_description(description);
        }
        if let Some(writable) = doc.writable {
            property = property.with_writable(writable);
        }
        property = property.with_range(doc.minimum, doc.maximum);
        if let Some(unit) = doc.unit {
            property = property.with_unit(unit);
        }
        interface.add_property(property)?;
    }

    for doc in spec.relationships {
        let mut relationship = TwinRelationship::new(doc.name, doc.interface)?;
        if let Some(description) = doc.description {
            relationship = relationship.with_description(description);
        }
        interface.add_relationship(relationship)?;
    }

    for doc in spec.commands {
        let mut command = TwinCommand::new(doc.name)?;
        if let Some(description) = doc.description {
            command = command.with_description(description);
        }
        if let Some(schema) = doc.schema {
            command = command.with_schema(schema);
        }
        interface.add_command(command)?;
    }

    Ok(interface)
}

/// Parses a `TwinInstance` YAML document.
pub fn instance_from_yaml(yaml: &str) -> Result<TwinInstance, TwinDefinitionError> {
    let document: InstanceDocument =
        serde_yaml::from_str(yaml).map_err(|err| TwinDefinitionError::Document(err.to_string()))?;
    if document.kind != "TwinInstance" {
        return Err(TwinDefinitionError::Document(format!(
            "expected kind TwinInstance, got `{}`",
            document.kind
        )));
    }

    let mut instance =
        TwinInstance::new(document.metadata.into_metadata()?, document.spec.interface)?;
    for doc in document.spec.relationships {
        instance.add_relationship(InstanceRelationship::new(doc.name, doc.instance)?);
    }
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::{instance_from_yaml, interface_from_yaml};
    use crate::twin::entities::TwinDefinitionError;

    const INTERFACE_YAML: &str = r#"
apiVersion: dtd.twin/v0
kind: TwinInterface
metadata:
  name: iodt2-temperature
  labels:
    generated-by: twin-catalog
    generated-at: "2024-03-01T12:00:00+00:00"
  annotations:
    source: dtdl
    original-id: "dtmi:iodt2:TemperatureSensor;1"
spec:
  properties:
    - name: temperature
      type: float
      x-writable: false
      x-minimum: -40.0
      x-maximum: 85.0
      x-unit: celsius
  relationships:
    - name: feeds
      interface: iodt2-gateway
  commands:
    - name: recalibrate
      description: Reset the sensor baseline
"#;

    const INSTANCE_YAML: &str = r#"
apiVersion: dtd.twin/v0
kind: TwinInstance
metadata:
  name: iodt2-temp-01
spec:
  interface: iodt2-temperature
  twinInstanceRelationships:
    - name: locatedIn
      interface: iodt2-room
      instance: iodt2-room-101
"#;

    #[test]
    fn parses_interface_document() {
        let interface = interface_from_yaml(INTERFACE_YAML).expect("parses");
        assert_eq!(interface.name(), "iodt2-temperature");
        assert_eq!(interface.properties().len(), 1);
        assert_eq!(interface.properties()[0].unit(), Some("celsius"));
        assert_eq!(interface.relationships()[0].target_interface(), "iodt2-gateway");
        assert_eq!(interface.commands()[0].name(), "recalibrate");
    }

    #[test]
    fn parses_instance_document() {
        let instance = instance_from_yaml(INSTANCE_YAML).expect("parses");
        assert_eq!(instance.interface(), "iodt2-temperature");
        assert_eq!(instance.relationships()[0].target_instance(), "iodt2-room-101");
    }

    #[test]
    fn rejects_wrong_kind() {
        let err = interface_from_yaml(INSTANCE_YAML).expect_err("wrong kind");
        assert!(matches!(err, TwinDefinitionError::Document(_)));
    }

    #[test]
    fn rejects_missing_name() {
        let err = interface_from_yaml("kind: TwinInterface\nmetadata: {}\n")
            .expect_err("missing name");
        assert!(matches!(err, TwinDefinitionError::Document(_)));
    }
}
