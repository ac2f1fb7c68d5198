//! Mapping of twin entities to RDF triple sets.
//!
//! The mapping is deterministic: identical input yields the identical triple
//! set, including blank node labels, so re-storing a definition replaces its
//! named graph with exactly the same content and tests can assert on triple
//! counts and shapes. Optional attributes produce no triples when absent.

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Graph, Literal, NamedNode, NamedNodeRef, Subject, Term, Triple};

use super::entities::{annotations, labels, TwinDefinitionError, TwinInstance, TwinInterface};
use super::vocab::{self, class, prop};

/// Maps an interface definition to its triple set.
pub fn map_interface(interface: &TwinInterface) -> Result<Graph, TwinDefinitionError> {
    let mut graph = Graph::new();
    add_interface(&mut graph, interface)?;
    Ok(graph)
}

/// Maps an instance definition to its triple set.
pub fn map_instance(instance: &TwinInstance) -> Result<Graph, TwinDefinitionError> {
    let mut graph = Graph::new();
    add_instance(&mut graph, instance)?;
    Ok(graph)
}

/// Maps an interface and its instance into one combined triple set, the unit
/// a named graph stores.
pub fn map_twin(
    interface: &TwinInterface,
    instance: &TwinInstance,
) -> Result<Graph, TwinDefinitionError> {
    let mut graph = Graph::new();
    add_interface(&mut graph, interface)?;
    add_instance(&mut graph, instance)?;
    Ok(graph)
}

fn add_interface(graph: &mut Graph, interface: &TwinInterface) -> Result<(), TwinDefinitionError> {
    let name = interface.name();
    if name.trim().is_empty() {
        return Err(TwinDefinitionError::MissingName);
    }
    let subject = vocab::interface_uri(name);

    push(graph, subject.clone(), rdf::TYPE.into(), class_term(class::INTERFACE));
    push(graph, subject.clone(), prop::NAME.into(), plain(name));
    if let Some(description) = interface.description() {
        push(graph, subject.clone(), prop::DESCRIPTION.into(), plain(description));
    }

    add_provenance(graph, &subject, interface);

    for property in interface.properties() {
        let node = vocab::property_uri(name, property.name());
        push(graph, node.clone(), rdf::TYPE.into(), class_term(class::PROPERTY));
        push(graph, node.clone(), prop::PROPERTY_NAME.into(), plain(property.name()));
        push(
            graph,
            node.clone(),
            prop::PROPERTY_TYPE.into(),
            plain(property.kind().as_str()),
        );
        if let Some(description) = property.description() {
            push(graph, node.clone(), prop::DESCRIPTION.into(), plain(description));
        }
        if let Some(writable) = property.writable() {
            push(graph, node.clone(), prop::WRITABLE.into(), Literal::from(writable));
        }
        if let Some(minimum) = property.minimum() {
            push(graph, node.clone(), prop::MINIMUM.into(), Literal::from(minimum));
        }
        if let Some(maximum) = property.maximum() {
            push(graph, node.clone(), prop::MAXIMUM.into(), Literal::from(maximum));
        }
        if let Some(unit) = property.unit() {
            push(graph, node.clone(), prop::UNIT.into(), plain(unit));
        }
        push(graph, subject.clone(), prop::HAS_PROPERTY.into(), node);
    }

    for relationship in interface.relationships() {
        let node = vocab::relationship_uri(name, relationship.name());
        push(graph, node.clone(), rdf::TYPE.into(), class_term(class::RELATIONSHIP));
        push(
            graph,
            node.clone(),
            prop::RELATIONSHIP_NAME.into(),
            plain(relationship.name()),
        );
        push(
            graph,
            node.clone(),
            prop::TARGET_INTERFACE.into(),
            plain(relationship.target_interface()),
        );
        if let Some(description) = relationship.description() {
            push(graph, node.clone(), prop::DESCRIPTION.into(), plain(description));
        }
        push(graph, subject.clone(), prop::HAS_RELATIONSHIP.into(), node);
    }

    for command in interface.commands() {
        let node = vocab::command_uri(name, command.name());
        push(graph, node.clone(), rdf::TYPE.into(), class_term(class::COMMAND));
        push(graph, node.clone(), prop::COMMAND_NAME.into(), plain(command.name()));
        if let Some(description) = command.description() {
            push(graph, node.clone(), prop::DESCRIPTION.into(), plain(description));
        }
        if let Some(schema) = command.schema() {
            let encoded = serde_json::to_string(schema)
                .map_err(|err| TwinDefinitionError::Document(err.to_string()))?;
            push(graph, node.clone(), prop::SCHEMA.into(), plain(&encoded));
        }
        push(graph, subject.clone(), prop::HAS_COMMAND.into(), node);
    }

    Ok(())
}

fn add_instance(graph: &mut Graph, instance: &TwinInstance) -> Result<(), TwinDefinitionError> {
    let name = instance.name();
    if name.trim().is_empty() {
        return Err(TwinDefinitionError::MissingName);
    }
    let subject = vocab::instance_uri(name);

    push(graph, subject.clone(), rdf::TYPE.into(), class_term(class::INSTANCE));
    push(graph, subject.clone(), prop::NAME.into(), plain(name));
    push(
        graph,
        subject.clone(),
        prop::INSTANCE_OF.into(),
        vocab::interface_uri(instance.interface()),
    );

    let metadata = instance.metadata();
    if let Some(value) = metadata.label(labels::GENERATED_BY) {
        push(graph, subject.clone(), prop::GENERATED_BY.into(), plain(value));
    }
    if let Some(value) = metadata.label(labels::GENERATED_AT) {
        push(graph, subject.clone(), prop::GENERATED_AT.into(), date_time(value));
    }

    // Blank node labels are derived from the owning instance and position so
    // the mapping stays reproducible.
    for (index, relationship) in instance.relationships().iter().enumerate() {
        let node = BlankNode::new_unchecked(format!("{}_rel{index}", sanitize_label(name)));
        push_subject(
            graph,
            node.clone().into(),
            rdf::TYPE.into(),
            class_term(class::INSTANCE_RELATIONSHIP),
        );
        push_subject(
            graph,
            node.clone().into(),
            prop::RELATIONSHIP_NAME.into(),
            plain(relationship.name()),
        );
        push_subject(
            graph,
            node.clone().into(),
            prop::TARGET_INSTANCE.into(),
            vocab::instance_uri(relationship.target_instance()),
        );
        push(
            graph,
            subject.clone(),
            prop::HAS_INSTANCE_RELATIONSHIP.into(),
            Term::from(node),
        );
    }

    Ok(())
}

fn add_provenance(graph: &mut Graph, subject: &NamedNode, interface: &TwinInterface) {
    let metadata = interface.metadata();

    if let Some(value) = metadata.label(labels::GENERATED_BY) {
        push(graph, subject.clone(), prop::GENERATED_BY.into(), plain(value));
    }
    if let Some(value) = metadata.label(labels::GENERATED_AT) {
        push(graph, subject.clone(), prop::GENERATED_AT.into(), date_time(value));
    }
    if let Some(value) = metadata.label(labels::THING_TYPE) {
        push(graph, subject.clone(), prop::THING_TYPE.into(), plain(value));
    }

    let pairs = [
        (annotations::SOURCE, prop::SOURCE_FORMAT),
        (annotations::ORIGINAL_ID, prop::ORIGINAL_ID),
        (annotations::MANUFACTURER, prop::MANUFACTURER),
        (annotations::MODEL, prop::MODEL),
        (annotations::SERIAL_NUMBER, prop::SERIAL_NUMBER),
        (annotations::FIRMWARE_VERSION, prop::FIRMWARE_VERSION),
        (annotations::DTDL_INTERFACE, prop::DTDL_INTERFACE),
        (annotations::DTDL_INTERFACE_NAME, prop::DTDL_INTERFACE_NAME),
        (annotations::DTDL_CATEGORY, prop::DTDL_CATEGORY),
    ];
    for (key, predicate) in pairs {
        if let Some(value) = metadata.annotation(key) {
            push(graph, subject.clone(), predicate.into(), plain(value));
        }
    }
}

fn push(graph: &mut Graph, subject: NamedNode, predicate: NamedNode, object: impl Into<Term>) {
    push_subject(graph, subject.into(), predicate, object);
}

fn push_subject(graph: &mut Graph, subject: Subject, predicate: NamedNode, object: impl Into<Term>) {
    graph.insert(&Triple::new(subject, predicate, object));
}

fn plain(value: &str) -> Term {
    Term::from(Literal::new_simple_literal(value))
}

fn class_term(value: NamedNodeRef<'_>) -> Term {
    Term::from(NamedNode::from(value))
}

fn date_time(value: &str) -> Term {
    Term::from(Literal::new_typed_literal(value, xsd::DATE_TIME))
}

/// Restricts a name to characters valid in a blank node label.
fn sanitize_label(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use oxrdf::NamedNode;

    use super::{map_instance, map_interface, map_twin};
    use crate::twin::entities::{
        labels, InstanceRelationship, PropertyType, TwinCommand, TwinInstance,
        TwinInterface, TwinMetadata, TwinProperty, TwinRelationship,
    };
    use crate::twin::vocab::{self, prop};

    fn sample_interface() -> TwinInterface {
        let metadata = TwinMetadata::new("iodt2-weather")
            .unwrap()
            .with_label(labels::GENERATED_BY, "twin-catalog")
            .with_label(labels::GENERATED_AT, "2024-03-01T12:00:00+00:00");
        let mut interface = TwinInterface::new(metadata);
        interface
            .add_property(
                TwinProperty::new("temperature", PropertyType::Float)
                    .unwrap()
                    .with_writable(false)
                    .with_range(Some(-40.0), Some(85.0))
                    .with_unit("celsius"),
            )
            .unwrap();
        interface
            .add_relationship(TwinRelationship::new("feeds", "iodt2-gateway").unwrap())
            .unwrap();
        interface
            .add_command(
                TwinCommand::new("recalibrate")
                    .unwrap()
                    .with_schema(serde_json::json!({"type": "object"})),
            )
            .unwrap();
        interface
    }

    fn sample_instance() -> TwinInstance {
        let mut instance =
            TwinInstance::new(TwinMetadata::new("iodt2-ws-01").unwrap(), "iodt2-weather")
                .unwrap();
        instance.add_relationship(InstanceRelationship::new("locatedIn", "iodt2-room-1").unwrap());
        instance
    }

    fn triple_lines(graph: &oxrdf::Graph) -> Vec<String> {
        let mut lines: Vec<String> = graph.iter().map(|t| t.to_string()).collect();
        lines.sort();
        lines
    }

    #[test]
    fn mapping_is_deterministic() {
        let interface = sample_interface();
        let instance = sample_instance();
        let first = map_twin(&interface, &instance).expect("maps");
        let second = map_twin(&interface, &instance).expect("maps again");
        assert_eq!(triple_lines(&first), triple_lines(&second));
    }

    #[test]
    fn optional_attributes_produce_no_triples() {
        let mut bare = TwinInterface::new(TwinMetadata::new("iodt2-bare").unwrap());
        bare.add_property(TwinProperty::new("level", PropertyType::Integer).unwrap())
            .unwrap();
        let graph = map_interface(&bare).expect("maps");
        // type + name for the interface, type + propertyName + propertyType
        // for the property, plus the hasProperty link.
        assert_eq!(graph.len(), 6);
        assert!(!graph
            .iter()
            .any(|t| t.predicate == prop::WRITABLE || t.predicate == prop::UNIT));
    }

    #[test]
    fn interface_links_every_declaration() {
        let graph = map_interface(&sample_interface()).expect("maps");
        let subject = vocab::interface_uri("iodt2-weather");
        for predicate in [prop::HAS_PROPERTY, prop::HAS_RELATIONSHIP, prop::HAS_COMMAND] {
            assert_eq!(
                graph
                    .triples_for_subject(&subject)
                    .filter(|t| t.predicate == predicate)
                    .count(),
                1,
                "expected one {predicate} link"
            );
        }
    }

    #[test]
    fn instance_relationships_use_blank_nodes() {
        let graph = map_instance(&sample_instance()).expect("maps");
        let links: Vec<_> = graph
            .iter()
            .filter(|t| t.predicate == prop::HAS_INSTANCE_RELATIONSHIP)
            .collect();
        assert_eq!(links.len(), 1);
        assert!(matches!(links[0].object, oxrdf::TermRef::BlankNode(_)));

        let target = NamedNode::new_unchecked("http://iodt2.com/instance/iodt2-room-1");
        assert!(graph
            .iter()
            .any(|t| t.predicate == prop::TARGET_INSTANCE
                && t.object == oxrdf::TermRef::from(target.as_ref())));
    }

    #[test]
    fn provenance_labels_become_typed_literals() {
        let graph = map_interface(&sample_interface()).expect("maps");
        let generated_at = graph
            .iter()
            .find(|t| t.predicate == prop::GENERATED_AT)
            .expect("generatedAt present");
        match generated_at.object {
            oxrdf::TermRef::Literal(literal) => {
                assert_eq!(literal.datatype(), oxrdf::vocab::xsd::DATE_TIME);
            }
            other => panic!("expected literal, got {other}"),
        }
    }

    #[test]
    fn command_schema_is_json_encoded() {
        let graph = map_interface(&sample_interface()).expect("maps");
        let schema = graph
            .iter()
            .find(|t| t.predicate == prop::SCHEMA)
            .expect("schema present");
        match schema.object {
            oxrdf::TermRef::Literal(literal) => {
                let decoded: serde_json::Value =
                    serde_json::from_str(literal.value()).expect("valid JSON");
                assert_eq!(decoded["type"], "object");
            }
            other => panic!("expected literal, got {other}"),
        }
    }
}
