use oxrdf::NamedNode;
use twin_catalog::store::results::{fold_interface_details, parse_bindings};
use twin_catalog::twin::crd::{instance_from_yaml, interface_from_yaml};
use twin_catalog::twin::entities::TwinDefinitionError;
use twin_catalog::twin::vocab::{self, prop};
use twin_catalog::twin::{map_twin, mapper};

const INTERFACE_YAML: &str = r#"
apiVersion: dtd.twin/v0
kind: TwinInterface
metadata:
  name: iodt2-weather
  labels:
    generated-by: twin-catalog
    generated-at: "2024-03-01T12:00:00+00:00"
    thing-type: device
  annotations:
    source: dtdl
    original-id: "dtmi:iodt2:WeatherStation;1"
    manufacturer: Initech
spec:
  properties:
    - name: pressure
      type: float
      x-writable: false
      x-unit: hectopascal
    - name: stationName
      type: string
      x-writable: true
  relationships:
    - name: feeds
      interface: iodt2-gateway
      description: Pushes readings upstream
  commands:
    - name: recalibrate
      schema:
        type: object
"#;

const INSTANCE_YAML: &str = r#"
apiVersion: dtd.twin/v0
kind: TwinInstance
metadata:
  name: iodt2-ws-01
spec:
  interface: iodt2-weather
  twinInstanceRelationships:
    - name: locatedIn
      interface: iodt2-site
      instance: iodt2-site-north
"#;

fn triple_lines(graph: &oxrdf::Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph.iter().map(|t| t.to_string()).collect();
    lines.sort();
    lines
}

#[test]
fn yaml_definitions_map_to_the_same_triples_every_time() {
    let interface = interface_from_yaml(INTERFACE_YAML).expect("interface parses");
    let instance = instance_from_yaml(INSTANCE_YAML).expect("instance parses");

    let first = map_twin(&interface, &instance).expect("maps");
    let second = map_twin(&interface, &instance).expect("maps");
    assert_eq!(triple_lines(&first), triple_lines(&second));
    assert!(first.len() > 15);
}

#[test]
fn every_declared_name_is_reachable_from_its_owner() {
    let interface = interface_from_yaml(INTERFACE_YAML).expect("interface parses");
    let graph = mapper::map_interface(&interface).expect("maps");
    let owner = vocab::interface_uri("iodt2-weather");

    let linked_properties: Vec<String> = graph
        .triples_for_subject(&owner)
        .filter(|t| t.predicate == prop::HAS_PROPERTY)
        .map(|t| t.object.to_string())
        .collect();
    assert_eq!(linked_properties.len(), 2);
    assert!(linked_properties
        .iter()
        .any(|uri| uri.contains("/property/pressure")));
    assert!(linked_properties
        .iter()
        .any(|uri| uri.contains("/property/stationName")));
}

#[test]
fn provenance_annotations_survive_the_mapping() {
    let interface = interface_from_yaml(INTERFACE_YAML).expect("interface parses");
    let graph = mapper::map_interface(&interface).expect("maps");

    let original_id = NamedNode::new_unchecked("http://iodt2.com/iodt2-weather");
    let mut found = false;
    for triple in graph.triples_for_subject(&original_id) {
        if triple.predicate == prop::ORIGINAL_ID {
            assert_eq!(triple.object.to_string(), "\"dtmi:iodt2:WeatherStation;1\"");
            found = true;
        }
    }
    assert!(found, "originalId triple missing");
}

#[test]
fn malformed_documents_fail_before_mapping() {
    let err = interface_from_yaml("kind: TwinInterface\nmetadata:\n  name: \"\"\n")
        .expect_err("blank name rejected");
    assert!(matches!(err, TwinDefinitionError::MissingName));
}

// A stored definition queried back arrives as repeated rows, one per
// property/relationship/command. Folding them must recover exactly the
// declared names, deduplicated.
#[test]
fn queried_rows_fold_back_to_the_declared_names() {
    let document = serde_json::json!({
        "results": {"bindings": [
            {"name": {"value": "iodt2-weather"},
             "propName": {"value": "pressure"}, "propType": {"value": "float"},
             "writable": {"value": "false"}},
            {"name": {"value": "iodt2-weather"},
             "propName": {"value": "stationName"}, "propType": {"value": "string"},
             "writable": {"value": "true"}},
            {"name": {"value": "iodt2-weather"},
             "propName": {"value": "pressure"}, "propType": {"value": "float"},
             "relName": {"value": "feeds"}, "relTarget": {"value": "iodt2-gateway"}},
            {"name": {"value": "iodt2-weather"},
             "cmdName": {"value": "recalibrate"}}
        ]}
    });

    let rows = parse_bindings(&document);
    let details = fold_interface_details(&rows).expect("details");

    let property_names: Vec<&str> = details.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(property_names, vec!["pressure", "stationName"]);
    let relationship_names: Vec<&str> =
        details.relationships.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(relationship_names, vec!["feeds"]);
    let command_names: Vec<&str> = details.commands.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(command_names, vec!["recalibrate"]);
}
