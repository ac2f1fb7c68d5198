//! In-memory interface catalog.
//!
//! The catalog is embedded at build time and loaded into an immutable
//! snapshot: the entry list in library order, a DTMI lookup table, and the
//! thing-type and domain indices. Readers clone an `Arc` to the current
//! snapshot; `reload` builds a complete replacement before swapping it in,
//! so a search in flight never observes a half-built index.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use include_dir::{include_dir, Dir};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

use super::model::{CatalogEntry, Dtmi, InterfaceDefinition};

static LIBRARY: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets/dtdl");

const MANIFEST_FILE: &str = "registry.json";

#[derive(Debug, Deserialize)]
struct Manifest {
    interfaces: Vec<ManifestEntry>,
    #[serde(rename = "thingTypeMapping", default)]
    thing_type_mapping: BTreeMap<String, Vec<String>>,
    #[serde(rename = "domainMapping", default)]
    domain_mapping: BTreeMap<String, Vec<String>>,
    #[serde(rename = "baseInterfaces", default)]
    base_interfaces: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    dtmi: String,
    file: String,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "thingType", default)]
    thing_type: Option<String>,
}

struct Snapshot {
    entries: Vec<Arc<CatalogEntry>>,
    by_dtmi: BTreeMap<String, usize>,
    thing_type_index: BTreeMap<String, Vec<String>>,
    domain_index: BTreeMap<String, Vec<String>>,
    base_interfaces: BTreeMap<String, String>,
}

/// Conjunctive search criteria: an entry must satisfy every supplied filter.
#[derive(Clone, Debug, Default)]
pub struct SearchFilter {
    thing_type: Option<String>,
    domain: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
    keywords: Option<String>,
}

impl SearchFilter {
    /// Filter by thing-type classification.
    #[must_use]
    pub fn with_thing_type(mut self, thing_type: impl Into<String>) -> Self {
        self.thing_type = Some(thing_type.into());
        self
    }

    /// Filter by domain membership.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Filter by library category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Require every supplied tag to be present on the entry.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive match against display name or description.
    #[must_use]
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }
}

/// Indexed, reloadable interface catalog.
pub struct InterfaceRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl InterfaceRegistry {
    /// Loads the embedded catalog.
    pub fn from_embedded() -> Result<Self> {
        let snapshot = build_snapshot()?;
        info!(interfaces = snapshot.entries.len(), "interface catalog loaded");
        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().expect("catalog snapshot lock poisoned"))
    }

    /// Number of catalog entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current().entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current().entries.is_empty()
    }

    /// Looks an entry up by DTMI. Unknown identifiers yield `None`.
    #[must_use]
    pub fn get(&self, dtmi: &Dtmi) -> Option<Arc<CatalogEntry>> {
        let snapshot = self.current();
        snapshot
            .by_dtmi
            .get(dtmi.as_str())
            .map(|index| Arc::clone(&snapshot.entries[*index]))
    }

    /// Returns every entry in library order.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<CatalogEntry>> {
        self.current().entries.clone()
    }

    /// Conjunctive search over the catalog, preserving library order.
    #[must_use]
    pub fn search(&self, filter: &SearchFilter) -> Vec<Arc<CatalogEntry>> {
        let snapshot = self.current();
        snapshot
            .entries
            .iter()
            .filter(|entry| {
                if let Some(thing_type) = &filter.thing_type {
                    if !snapshot
                        .thing_type_index
                        .get(thing_type)
                        .is_some_and(|dtmis| dtmis.iter().any(|d| d == entry.dtmi().as_str()))
                    {
                        return false;
                    }
                }
                if let Some(domain) = &filter.domain {
                    if !snapshot
                        .domain_index
                        .get(domain)
                        .is_some_and(|dtmis| dtmis.iter().any(|d| d == entry.dtmi().as_str()))
                    {
                        return false;
                    }
                }
                if let Some(category) = &filter.category {
                    if &entry.category != category {
                        return false;
                    }
                }
                if !filter.tags.iter().all(|tag| entry.tags.contains(tag)) {
                    return false;
                }
                if let Some(keywords) = &filter.keywords {
                    let needle = keywords.to_lowercase();
                    let in_name = entry.display_name().to_lowercase().contains(&needle);
                    let in_description = entry
                        .description()
                        .is_some_and(|text| text.to_lowercase().contains(&needle));
                    if !in_name && !in_description {
                        return false;
                    }
                }
                true
            })
            .map(Arc::clone)
            .collect()
    }

    /// Recommended base interface for a thing type.
    #[must_use]
    pub fn base_for_thing_type(&self, thing_type: &str) -> Option<Dtmi> {
        self.current()
            .base_interfaces
            .get(thing_type)
            .and_then(|dtmi| Dtmi::new(dtmi.clone()).ok())
    }

    /// Whether the domain mapping lists the DTMI under the domain.
    #[must_use]
    pub fn is_in_domain(&self, dtmi: &Dtmi, domain: &str) -> bool {
        self.current()
            .domain_index
            .get(domain)
            .is_some_and(|dtmis| dtmis.iter().any(|d| d == dtmi.as_str()))
    }

    /// Domains known to the catalog.
    #[must_use]
    pub fn domains(&self) -> Vec<String> {
        self.current().domain_index.keys().cloned().collect()
    }

    /// Thing types known to the catalog.
    #[must_use]
    pub fn thing_types(&self) -> Vec<String> {
        self.current().thing_type_index.keys().cloned().collect()
    }

    /// Rebuilds the snapshot from the embedded library and swaps it in
    /// atomically. In-flight readers keep the snapshot they started with.
    pub fn reload(&self) -> Result<()> {
        let snapshot = Arc::new(build_snapshot()?);
        *self.snapshot.write().expect("catalog snapshot lock poisoned") = snapshot;
        info!("interface catalog reloaded");
        Ok(())
    }
}

fn build_snapshot() -> Result<Snapshot> {
    let manifest_text = LIBRARY
        .get_file(MANIFEST_FILE)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| Error::Catalog(format!("missing {MANIFEST_FILE}")))?;
    let manifest: Manifest = serde_json::from_str(manifest_text)
        .map_err(|err| Error::Catalog(format!("{MANIFEST_FILE}: {err}")))?;

    let mut entries = Vec::with_capacity(manifest.interfaces.len());
    let mut by_dtmi = BTreeMap::new();
    for listed in manifest.interfaces {
        let text = LIBRARY
            .get_file(&listed.file)
            .and_then(|file| file.contents_utf8())
            .ok_or_else(|| Error::Catalog(format!("missing interface file {}", listed.file)))?;
        let definition: InterfaceDefinition = serde_json::from_str(text)
            .map_err(|err| Error::Catalog(format!("{}: {err}", listed.file)))?;
        if definition.kind != "Interface" {
            return Err(Error::Catalog(format!(
                "{}: expected @type Interface, got `{}`",
                listed.file, definition.kind
            )));
        }
        if definition.id.as_str() != listed.dtmi {
            return Err(Error::Catalog(format!(
                "{}: @id `{}` does not match registry entry `{}`",
                listed.file,
                definition.id,
                listed.dtmi
            )));
        }

        let index = entries.len();
        if by_dtmi.insert(listed.dtmi.clone(), index).is_some() {
            return Err(Error::Catalog(format!("duplicate DTMI `{}`", listed.dtmi)));
        }
        entries.push(Arc::new(CatalogEntry {
            definition,
            category: listed.category,
            tags: listed.tags,
            thing_type: listed.thing_type,
        }));
    }

    Ok(Snapshot {
        entries,
        by_dtmi,
        thing_type_index: manifest.thing_type_mapping,
        domain_index: manifest.domain_mapping,
        base_interfaces: manifest.base_interfaces,
    })
}

#[cfg(test)]
mod tests {
    use super::{InterfaceRegistry, SearchFilter};
    use crate::dtdl::model::Dtmi;

    fn registry() -> InterfaceRegistry {
        InterfaceRegistry::from_embedded().expect("embedded catalog loads")
    }

    #[test]
    fn embedded_catalog_loads_with_indices() {
        let registry = registry();
        assert!(!registry.is_empty());
        assert!(registry.thing_types().contains(&"sensor".to_string()));
        assert!(registry.domains().contains(&"environmental".to_string()));
    }

    #[test]
    fn lookup_by_dtmi() {
        let registry = registry();
        let dtmi = Dtmi::new("dtmi:iodt2:TemperatureSensor;1").unwrap();
        let entry = registry.get(&dtmi).expect("known interface");
        assert_eq!(entry.display_name(), "Temperature Sensor");

        let unknown = Dtmi::new("dtmi:iodt2:DoesNotExist;1").unwrap();
        assert!(registry.get(&unknown).is_none());
    }

    #[test]
    fn search_is_conjunctive() {
        let registry = registry();
        let sensors = registry.search(&SearchFilter::default().with_thing_type("sensor"));
        assert!(sensors.len() >= 3);

        let environmental_sensors = registry.search(
            &SearchFilter::default()
                .with_thing_type("sensor")
                .with_domain("environmental"),
        );
        assert!(environmental_sensors.len() < sensors.len());
        assert!(environmental_sensors
            .iter()
            .all(|entry| registry.is_in_domain(entry.dtmi(), "environmental")));
    }

    #[test]
    fn tag_filter_requires_every_tag() {
        let registry = registry();
        let matches = registry.search(
            &SearchFilter::default().with_tags(["temperature", "environmental"]),
        );
        assert!(!matches.is_empty());
        assert!(matches
            .iter()
            .all(|entry| entry.tags.contains(&"temperature".to_string())));

        let none = registry.search(
            &SearchFilter::default().with_tags(["temperature", "no-such-tag"]),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn keyword_search_is_case_insensitive() {
        let registry = registry();
        let matches = registry.search(&SearchFilter::default().with_keywords("WEATHER"));
        assert!(matches
            .iter()
            .any(|entry| entry.dtmi().as_str() == "dtmi:iodt2:WeatherStation;1"));
    }

    #[test]
    fn reload_replaces_the_snapshot() {
        let registry = registry();
        let before = registry.entries();
        registry.reload().expect("reload");
        let after = registry.entries();
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn base_interfaces_cover_known_thing_types() {
        let registry = registry();
        for thing_type in ["sensor", "device", "component"] {
            assert!(
                registry.base_for_thing_type(thing_type).is_some(),
                "no base interface for {thing_type}"
            );
        }
        assert!(registry.base_for_thing_type("starship").is_none());
    }
}
