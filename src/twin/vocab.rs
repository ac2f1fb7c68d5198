//! The twin ontology vocabulary.
//!
//! Two fixed namespaces: the schema namespace (`ts`) declaring the classes
//! and predicates twins are described with, and the data namespace (`tsd`)
//! under which every interface, instance, property, relationship and command
//! URI lives. URI constructors are pure and deterministic: identical input
//! always yields the identical identifier, which is what makes re-storing a
//! definition an idempotent overwrite.

use oxrdf::vocab::{rdf, rdfs, xsd};
use oxrdf::{Graph, Literal, NamedNode, NamedNodeRef, Term, TripleRef};

/// Schema namespace, bound to the `ts` prefix.
pub const SCHEMA_NS: &str = "http://twin.dtd/ontology#";
/// Data namespace for twin URIs, bound to the `tsd` prefix.
pub const DATA_NS: &str = "http://iodt2.com/";
/// Root under which tenant-scoped named graphs are addressed.
pub const GRAPH_NS: &str = "http://twin.io/graphs/";

/// Ontology classes.
pub mod class {
    use oxrdf::NamedNodeRef;

    pub const INTERFACE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://twin.dtd/ontology#TwinInterface");
    pub const INSTANCE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://twin.dtd/ontology#TwinInstance");
    pub const PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://twin.dtd/ontology#Property");
    pub const RELATIONSHIP: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://twin.dtd/ontology#Relationship");
    pub const COMMAND: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://twin.dtd/ontology#Command");
    pub const INSTANCE_RELATIONSHIP: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://twin.dtd/ontology#InstanceRelationship");
}

/// Ontology predicates.
pub mod prop {
    use oxrdf::NamedNodeRef;

    macro_rules! ts {
        ($name:ident, $local:literal) => {
            pub const $name: NamedNodeRef<'static> =
                NamedNodeRef::new_unchecked(concat!("http://twin.dtd/ontology#", $local));
        };
    }

    ts!(HAS_PROPERTY, "hasProperty");
    ts!(HAS_RELATIONSHIP, "hasRelationship");
    ts!(HAS_COMMAND, "hasCommand");
    ts!(INSTANCE_OF, "instanceOf");
    ts!(HAS_INSTANCE_RELATIONSHIP, "hasInstanceRelationship");
    ts!(NAME, "name");
    ts!(DESCRIPTION, "description");
    ts!(PROPERTY_NAME, "propertyName");
    ts!(PROPERTY_TYPE, "propertyType");
    ts!(WRITABLE, "writable");
    ts!(MINIMUM, "minimum");
    ts!(MAXIMUM, "maximum");
    ts!(UNIT, "unit");
    ts!(RELATIONSHIP_NAME, "relationshipName");
    ts!(TARGET_INTERFACE, "targetInterface");
    ts!(COMMAND_NAME, "commandName");
    ts!(SCHEMA, "schema");
    ts!(TARGET_INSTANCE, "targetInstance");
    ts!(GENERATED_BY, "generatedBy");
    ts!(GENERATED_AT, "generatedAt");
    ts!(SOURCE_FORMAT, "sourceFormat");
    ts!(ORIGINAL_ID, "originalId");
    ts!(THING_TYPE, "thingType");
    ts!(MANUFACTURER, "manufacturer");
    ts!(MODEL, "model");
    ts!(SERIAL_NUMBER, "serialNumber");
    ts!(FIRMWARE_VERSION, "firmwareVersion");
    ts!(DTDL_INTERFACE, "dtdlInterface");
    ts!(DTDL_INTERFACE_NAME, "dtdlInterfaceName");
    ts!(DTDL_CATEGORY, "dtdlCategory");
}

/// URI of a twin interface.
#[must_use]
pub fn interface_uri(interface_name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{DATA_NS}{interface_name}"))
}

/// URI of a twin instance.
#[must_use]
pub fn instance_uri(instance_name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{DATA_NS}instance/{instance_name}"))
}

/// URI of a property owned by an interface.
#[must_use]
pub fn property_uri(interface_name: &str, property_name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{DATA_NS}{interface_name}/property/{property_name}"))
}

/// URI of a relationship owned by an interface.
#[must_use]
pub fn relationship_uri(interface_name: &str, relationship_name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!(
        "{DATA_NS}{interface_name}/relationship/{relationship_name}"
    ))
}

/// URI of a command owned by an interface.
#[must_use]
pub fn command_uri(interface_name: &str, command_name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{DATA_NS}{interface_name}/command/{command_name}"))
}

/// Returns the static vocabulary graph: class and predicate declarations with
/// their labels, domains and ranges. Used to seed a fresh dataset.
#[must_use]
pub fn ontology() -> Graph {
    let mut graph = Graph::new();

    let classes: [(NamedNodeRef<'static>, &str, &str); 6] = [
        (
            class::INTERFACE,
            "Twin Interface",
            "A blueprint or template for digital twins",
        ),
        (
            class::INSTANCE,
            "Twin Instance",
            "A concrete instance of a digital twin",
        ),
        (
            class::PROPERTY,
            "Property",
            "A data property of a twin interface",
        ),
        (
            class::RELATIONSHIP,
            "Relationship",
            "A relationship between twin interfaces",
        ),
        (
            class::COMMAND,
            "Command",
            "An actionable command on a twin interface",
        ),
        (
            class::INSTANCE_RELATIONSHIP,
            "Instance Relationship",
            "A relationship between twin instances",
        ),
    ];
    for (node, label, comment) in classes {
        insert(&mut graph, node, rdf::TYPE, Term::from(NamedNode::from(rdfs::CLASS)));
        insert(&mut graph, node, rdfs::LABEL, literal_en(label));
        insert(&mut graph, node, rdfs::COMMENT, literal_en(comment));
    }

    type Decl = (
        NamedNodeRef<'static>,
        Option<NamedNodeRef<'static>>,
        Option<NamedNodeRef<'static>>,
    );
    let predicates: [Decl; 24] = [
        (prop::HAS_PROPERTY, Some(class::INTERFACE), Some(class::PROPERTY)),
        (
            prop::HAS_RELATIONSHIP,
            Some(class::INTERFACE),
            Some(class::RELATIONSHIP),
        ),
        (prop::HAS_COMMAND, Some(class::INTERFACE), Some(class::COMMAND)),
        (prop::INSTANCE_OF, Some(class::INSTANCE), Some(class::INTERFACE)),
        (
            prop::HAS_INSTANCE_RELATIONSHIP,
            Some(class::INSTANCE),
            Some(class::INSTANCE_RELATIONSHIP),
        ),
        (prop::NAME, None, Some(xsd::STRING)),
        (prop::DESCRIPTION, None, Some(xsd::STRING)),
        (prop::PROPERTY_NAME, Some(class::PROPERTY), Some(xsd::STRING)),
        (prop::PROPERTY_TYPE, Some(class::PROPERTY), Some(xsd::STRING)),
        (prop::WRITABLE, Some(class::PROPERTY), Some(xsd::BOOLEAN)),
        (prop::MINIMUM, Some(class::PROPERTY), None),
        (prop::MAXIMUM, Some(class::PROPERTY), None),
        (prop::UNIT, Some(class::PROPERTY), Some(xsd::STRING)),
        (
            prop::RELATIONSHIP_NAME,
            Some(class::RELATIONSHIP),
            Some(xsd::STRING),
        ),
        (
            prop::TARGET_INTERFACE,
            Some(class::RELATIONSHIP),
            Some(xsd::STRING),
        ),
        (prop::COMMAND_NAME, Some(class::COMMAND), Some(xsd::STRING)),
        (prop::SCHEMA, Some(class::COMMAND), Some(xsd::STRING)),
        (
            prop::TARGET_INSTANCE,
            Some(class::INSTANCE_RELATIONSHIP),
            Some(class::INSTANCE),
        ),
        (prop::GENERATED_BY, None, Some(xsd::STRING)),
        (prop::GENERATED_AT, None, Some(xsd::DATE_TIME)),
        (prop::SOURCE_FORMAT, None, Some(xsd::STRING)),
        (prop::ORIGINAL_ID, None, Some(xsd::STRING)),
        (prop::THING_TYPE, None, Some(xsd::STRING)),
        (prop::DTDL_INTERFACE, None, Some(xsd::STRING)),
    ];
    for (node, domain, range) in predicates {
        insert(
            &mut graph,
            node,
            rdf::TYPE,
            Term::from(NamedNode::from(rdf::PROPERTY)),
        );
        if let Some(domain) = domain {
            insert(&mut graph, node, rdfs::DOMAIN, Term::from(NamedNode::from(domain)));
        }
        if let Some(range) = range {
            insert(&mut graph, node, rdfs::RANGE, Term::from(NamedNode::from(range)));
        }
    }

    graph
}

fn insert(
    graph: &mut Graph,
    subject: NamedNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
    object: impl Into<Term>,
) {
    let object = object.into();
    graph.insert(TripleRef::new(subject, predicate, object.as_ref()));
}

fn literal_en(value: &str) -> Term {
    Term::from(Literal::new_language_tagged_literal_unchecked(value, "en"))
}
