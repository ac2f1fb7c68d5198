//! Parsing of SPARQL JSON results into domain records.

use std::collections::BTreeMap;

use serde::Serialize;

/// One result row: variable name to string value.
pub type BindingRow = BTreeMap<String, String>;

/// Flattens a `application/sparql-results+json` document into rows. Unbound
/// variables are simply absent from their row.
#[must_use]
pub fn parse_bindings(document: &serde_json::Value) -> Vec<BindingRow> {
    let Some(bindings) = document
        .get("results")
        .and_then(|results| results.get("bindings"))
        .and_then(serde_json::Value::as_array)
    else {
        return Vec::new();
    };

    bindings
        .iter()
        .filter_map(serde_json::Value::as_object)
        .map(|binding| {
            binding
                .iter()
                .filter_map(|(var, value)| {
                    value
                        .get("value")
                        .and_then(serde_json::Value::as_str)
                        .map(|text| (var.clone(), text.to_string()))
                })
                .collect()
        })
        .collect()
}

/// Property row inside aggregated interface details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PropertyDetail {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub writable: bool,
}

/// Relationship row inside aggregated interface details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationshipDetail {
    pub name: String,
    #[serde(rename = "targetInterface")]
    pub target_interface: Option<String>,
    pub description: Option<String>,
}

/// Command row inside aggregated interface details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandDetail {
    pub name: String,
    pub description: Option<String>,
}

/// Interface details folded from a multi-row result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InterfaceDetails {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "generatedAt")]
    pub generated_at: Option<String>,
    #[serde(rename = "generatedBy")]
    pub generated_by: Option<String>,
    pub properties: Vec<PropertyDetail>,
    pub relationships: Vec<RelationshipDetail>,
    pub commands: Vec<CommandDetail>,
}

/// Folds rows where every row repeats the interface's scalar fields and
/// contributes at most one property/relationship/command. The first
/// occurrence of each name wins; later rows repeating it are discarded.
#[must_use]
pub fn fold_interface_details(rows: &[BindingRow]) -> Option<InterfaceDetails> {
    let first = rows.first()?;
    let mut details = InterfaceDetails {
        name: first.get("name").cloned(),
        description: first.get("description").cloned(),
        generated_at: first.get("generatedAt").cloned(),
        generated_by: first.get("generatedBy").cloned(),
        properties: Vec::new(),
        relationships: Vec::new(),
        commands: Vec::new(),
    };

    for row in rows {
        if let Some(name) = row.get("propName") {
            if !details.properties.iter().any(|p| &p.name == name) {
                details.properties.push(PropertyDetail {
                    name: name.clone(),
                    kind: row.get("propType").cloned(),
                    description: row.get("propDesc").cloned(),
                    writable: row.get("writable").map(String::as_str) == Some("true"),
                });
            }
        }
        if let Some(name) = row.get("relName") {
            if !details.relationships.iter().any(|r| &r.name == name) {
                details.relationships.push(RelationshipDetail {
                    name: name.clone(),
                    target_interface: row.get("relTarget").cloned(),
                    description: row.get("relDesc").cloned(),
                });
            }
        }
        if let Some(name) = row.get("cmdName") {
            if !details.commands.iter().any(|c| &c.name == name) {
                details.commands.push(CommandDetail {
                    name: name.clone(),
                    description: row.get("cmdDesc").cloned(),
                });
            }
        }
    }

    Some(details)
}

/// Whether a catalog row describes an interface or an instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ThingKind {
    #[serde(rename = "TwinInterface")]
    Interface,
    #[serde(rename = "TwinInstance")]
    Instance,
}

/// Uniform projection of an interface or instance row for listing and search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThingSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ThingKind,
    pub description: Option<String>,
    pub graph: String,
    #[serde(rename = "originalId")]
    pub original_id: Option<String>,
    #[serde(rename = "thingType")]
    pub thing_type: Option<String>,
}

/// Normalizes one result row into the uniform thing shape.
#[must_use]
pub fn project_thing_summary(row: &BindingRow) -> ThingSummary {
    let kind = row
        .get("type")
        .filter(|value| value.contains("TwinInterface"))
        .map_or(ThingKind::Instance, |_| ThingKind::Interface);
    ThingSummary {
        id: row.get("uri").cloned().unwrap_or_default(),
        name: row.get("name").cloned().unwrap_or_default(),
        kind,
        description: row.get("description").cloned(),
        graph: row.get("graph").cloned().unwrap_or_default(),
        original_id: row.get("originalId").cloned(),
        thing_type: row.get("thingType").cloned(),
    }
}

/// Single thing with its property declarations, as returned by id lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThingRecord {
    #[serde(flatten)]
    pub summary: ThingSummary,
    pub properties: BTreeMap<String, ThingPropertyRecord>,
}

/// Property entry on a [`ThingRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThingPropertyRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
}

/// Folds id-lookup rows into one record; property rows dedup first-wins.
#[must_use]
pub fn fold_thing_record(rows: &[BindingRow]) -> Option<ThingRecord> {
    let first = rows.first()?;
    let mut record = ThingRecord {
        summary: project_thing_summary(first),
        properties: BTreeMap::new(),
    };
    for row in rows {
        if let Some(name) = row.get("propName") {
            record
                .properties
                .entry(name.clone())
                .or_insert_with(|| ThingPropertyRecord {
                    kind: row
                        .get("propType")
                        .cloned()
                        .unwrap_or_else(|| "string".to_string()),
                    description: row.get("propDesc").cloned(),
                });
        }
    }
    Some(record)
}

/// Paginated listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    #[serde(rename = "pageSize")]
    pub page_size: usize,
    pub total: usize,
}
