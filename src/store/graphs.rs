//! Tenant-scoped twin storage.
//!
//! Every stored twin lives in its own named graph addressed by
//! `{root}{tenant}/{thing_id}`. Put replaces the graph wholesale, so
//! re-submitting a definition yields exactly the new triples and never a
//! union with stale ones; drop is idempotent. Reads scoped to a tenant also
//! see default-tenant graphs, while writes only ever land in the graph
//! derived from their own tenant.

use std::fmt::Write as _;
use std::str::FromStr;

use oxrdf::Graph;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::twin::entities::{TwinInstance, TwinInterface};
use crate::twin::{crd, mapper, vocab};

use super::client::SparqlClient;
use super::query::{escape_iri, escape_literal, QueryBuilder};
use super::results::{
    fold_interface_details, fold_thing_record, BindingRow, InterfaceDetails, Page, ThingRecord,
    ThingSummary,
};

/// Named graph used for the static vocabulary.
const ONTOLOGY_GRAPH: &str = "http://twin.io/graphs/ontology";

/// Comparison operator for schema-range property search.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl CompareOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Ne => "ne",
        }
    }

    /// Value filter against the property's declared range; unbounded sides
    /// are admitted.
    fn range_filter(self, value: f64) -> String {
        match self {
            Self::Gt => format!("&& (?propMax > {value} || !BOUND(?propMax))"),
            Self::Gte => format!("&& (?propMax >= {value} || !BOUND(?propMax))"),
            Self::Lt => format!("&& (?propMin < {value} || !BOUND(?propMin))"),
            Self::Lte => format!("&& (?propMin <= {value} || !BOUND(?propMin))"),
            Self::Eq => format!(
                "&& (?propMin <= {value} || !BOUND(?propMin)) && (?propMax >= {value} || !BOUND(?propMax))"
            ),
            Self::Ne => String::new(),
        }
    }
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            other => Err(Error::Config(format!("unknown comparison operator `{other}`"))),
        }
    }
}

/// Interface row matched by a property search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PropertyMatch {
    #[serde(rename = "thingId")]
    pub thing_id: String,
    pub name: String,
    pub property: String,
    #[serde(rename = "propertyType")]
    pub property_type: String,
    pub min: Option<String>,
    pub max: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "thingType")]
    pub thing_type: Option<String>,
    pub graph: String,
}

/// Store connectivity report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreHealth {
    pub status: &'static str,
    pub endpoint: String,
    #[serde(rename = "tripleCount", skip_serializing_if = "Option::is_none")]
    pub triple_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Twin store over a tenant-partitioned triplestore.
#[derive(Clone)]
pub struct TwinStore {
    client: SparqlClient,
    default_tenant: String,
    endpoint: String,
}

impl TwinStore {
    /// Creates a store from settings, using the HTTP transport.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self::with_client(
            SparqlClient::new(&settings.store)?,
            settings,
        ))
    }

    /// Creates a store over an existing client. Tests inject stub transports
    /// through this.
    #[must_use]
    pub fn with_client(client: SparqlClient, settings: &Settings) -> Self {
        Self {
            client,
            default_tenant: settings.tenancy.default_tenant.clone(),
            endpoint: settings.store.endpoint(),
        }
    }

    /// Returns the underlying SPARQL client, for externally supplied SELECT
    /// queries that go through the safety transforms unchanged.
    #[must_use]
    pub fn client(&self) -> &SparqlClient {
        &self.client
    }

    // ------------------------------------------------------------------
    // Graph addressing and tenant scoping
    // ------------------------------------------------------------------

    /// Named graph URI for a `(tenant, thing id)` pair.
    #[must_use]
    pub fn graph_uri(&self, tenant: Option<&str>, thing_id: &str) -> String {
        let tenant = tenant.unwrap_or(&self.default_tenant);
        format!("{}{tenant}/{thing_id}", vocab::GRAPH_NS)
    }

    /// SPARQL filter fragment scoping `?graph` to a tenant.
    ///
    /// Unset or default tenant reads see everything. A specific tenant sees
    /// its own graphs plus default-tenant graphs; this asymmetry (reads widen
    /// to default, writes never do) is intentional.
    #[must_use]
    pub fn tenant_graph_filter(&self, tenant: Option<&str>) -> String {
        match tenant {
            None => String::new(),
            Some(t) if t.is_empty() || t == self.default_tenant => String::new(),
            Some(t) => format!(
                "FILTER(STRSTARTS(STR(?graph), \"{root}{tenant}/\") || STRSTARTS(STR(?graph), \"{root}{default}/\"))",
                root = vocab::GRAPH_NS,
                tenant = escape_literal(t),
                default = escape_literal(&self.default_tenant),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Store operations
    // ------------------------------------------------------------------

    /// Maps a twin definition and replaces its named graph. Returns the
    /// graph URI written to. Mapping failures abort before any network call.
    pub async fn store_twin(
        &self,
        interface: &TwinInterface,
        instance: &TwinInstance,
        thing_id: &str,
        tenant: Option<&str>,
    ) -> Result<String> {
        let graph = mapper::map_twin(interface, instance)?;
        let graph_uri = self.graph_uri(tenant, thing_id);
        self.client
            .replace_graph(&graph_uri, &to_turtle(&graph))
            .await?;
        info!(thing_id, graph = %graph_uri, triples = graph.len(), "stored twin");
        Ok(graph_uri)
    }

    /// Parses interface and instance YAML documents and stores them.
    pub async fn store_twin_yaml(
        &self,
        interface_yaml: &str,
        instance_yaml: &str,
        thing_id: &str,
        tenant: Option<&str>,
    ) -> Result<String> {
        let interface = crd::interface_from_yaml(interface_yaml)?;
        let instance = crd::instance_from_yaml(instance_yaml)?;
        self.store_twin(&interface, &instance, thing_id, tenant).await
    }

    /// Drops a named graph. Dropping a graph that does not exist is not an
    /// error.
    pub async fn drop_graph(&self, graph_uri: &str) -> Result<()> {
        let update = format!("DROP SILENT GRAPH <{}>", escape_iri(graph_uri));
        self.client.update(&update).await?;
        info!(graph = %graph_uri, "dropped graph");
        Ok(())
    }

    /// Deletes a twin by interface name, probing both thing-id spellings the
    /// generator may have used (`tenant:suffix` and bare `suffix`).
    pub async fn delete_twin(&self, interface_name: &str, tenant: Option<&str>) -> Result<()> {
        let tenant_id = tenant.unwrap_or(&self.default_tenant);
        let suffix = interface_name
            .strip_prefix("iodt2-")
            .unwrap_or(interface_name);
        for thing_id in [format!("{tenant_id}:{suffix}"), suffix.to_string()] {
            let graph_uri = self.graph_uri(Some(tenant_id), &thing_id);
            self.drop_graph(&graph_uri).await?;
        }
        Ok(())
    }

    /// Uploads the static vocabulary into its own named graph.
    pub async fn seed_ontology(&self) -> Result<()> {
        self.client
            .replace_graph(ONTOLOGY_GRAPH, &to_turtle(&vocab::ontology()))
            .await
    }

    // ------------------------------------------------------------------
    // Query operations
    // ------------------------------------------------------------------

    /// Lists interfaces, optionally filtered by a case-insensitive name
    /// substring.
    pub async fn query_interfaces(
        &self,
        name_filter: Option<&str>,
        limit: usize,
        tenant: Option<&str>,
    ) -> Result<Vec<BindingRow>> {
        let mut builder = QueryBuilder::with_prefixes().raw(
            "SELECT DISTINCT ?interface ?name ?description ?generatedAt ?graph\n\
             WHERE {\n  GRAPH ?graph {\n    ?interface a ts:TwinInterface .\n    \
             FILTER NOT EXISTS { ?interface a ts:TwinInstance }\n    \
             ?interface ts:name ?name .\n    \
             OPTIONAL { ?interface ts:description ?description }\n    \
             OPTIONAL { ?interface ts:generatedAt ?generatedAt }\n",
        );
        if let Some(filter) = name_filter {
            builder = builder
                .raw("    FILTER(CONTAINS(LCASE(?name), ")
                .lower_literal(filter)
                .raw("))\n");
        }
        let query = builder
            .raw("  }\n  ")
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n}\nORDER BY ?name\nLIMIT ")
            .count(limit)
            .build();
        self.client.select(&query).await
    }

    /// Lists instances, optionally restricted to one interface.
    pub async fn query_instances(
        &self,
        interface_name: Option<&str>,
        limit: usize,
        tenant: Option<&str>,
    ) -> Result<Vec<BindingRow>> {
        let mut builder = QueryBuilder::with_prefixes().raw(
            "SELECT ?instance ?name ?interfaceName ?graph\n\
             WHERE {\n  GRAPH ?graph {\n    ?instance a ts:TwinInstance .\n    \
             ?instance ts:name ?name .\n    ?instance ts:instanceOf ?interface .\n    \
             ?interface ts:name ?interfaceName .\n",
        );
        if let Some(name) = interface_name {
            builder = builder
                .raw("    ?instance ts:instanceOf ")
                .iri(vocab::interface_uri(name).as_str())
                .raw(" .\n");
        }
        let query = builder
            .raw("  }\n  ")
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n}\nORDER BY ?name\nLIMIT ")
            .count(limit)
            .build();
        self.client.select(&query).await
    }

    /// Fetches one interface with its deduplicated property, relationship
    /// and command declarations.
    pub async fn interface_details(
        &self,
        interface_name: &str,
        tenant: Option<&str>,
    ) -> Result<Option<InterfaceDetails>> {
        let uri = vocab::interface_uri(interface_name);
        let uri = uri.as_str();
        let query = QueryBuilder::with_prefixes()
            .raw(
                "SELECT ?name ?description ?generatedAt ?generatedBy\n       \
                 ?propName ?propType ?propDesc ?writable\n       \
                 ?relName ?relTarget ?relDesc\n       \
                 ?cmdName ?cmdDesc ?graph\nWHERE {\n  GRAPH ?graph {\n    ",
            )
            .iri(uri)
            .raw(" a ts:TwinInterface .\n    ")
            .iri(uri)
            .raw(" ts:name ?name .\n    OPTIONAL { ")
            .iri(uri)
            .raw(" ts:description ?description }\n    OPTIONAL { ")
            .iri(uri)
            .raw(" ts:generatedAt ?generatedAt }\n    OPTIONAL { ")
            .iri(uri)
            .raw(" ts:generatedBy ?generatedBy }\n    OPTIONAL {\n      ")
            .iri(uri)
            .raw(
                " ts:hasProperty ?prop .\n      ?prop ts:propertyName ?propName .\n      \
                 ?prop ts:propertyType ?propType .\n      \
                 OPTIONAL { ?prop ts:description ?propDesc }\n      \
                 OPTIONAL { ?prop ts:writable ?writable }\n    }\n    OPTIONAL {\n      ",
            )
            .iri(uri)
            .raw(
                " ts:hasRelationship ?rel .\n      ?rel ts:relationshipName ?relName .\n      \
                 ?rel ts:targetInterface ?relTarget .\n      \
                 OPTIONAL { ?rel ts:description ?relDesc }\n    }\n    OPTIONAL {\n      ",
            )
            .iri(uri)
            .raw(
                " ts:hasCommand ?cmd .\n      ?cmd ts:commandName ?cmdName .\n      \
                 OPTIONAL { ?cmd ts:description ?cmdDesc }\n    }\n  }\n  ",
            )
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n}")
            .build();
        let rows = self.client.select(&query).await?;
        Ok(fold_interface_details(&rows))
    }

    /// Full-text search over names, graph URIs, descriptions and original
    /// ids of interfaces and instances.
    pub async fn search(
        &self,
        text: &str,
        tenant: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ThingSummary>> {
        let contains = |builder: QueryBuilder, var: &str| -> QueryBuilder {
            let b = builder.raw("CONTAINS(LCASE(STR(").raw(var).raw(")), ");
            b.lower_literal(text).raw(")")
        };
        let builder = QueryBuilder::with_prefixes().raw(
            "SELECT DISTINCT ?uri ?name ?type ?description ?graph ?originalId ?thingType\n\
             WHERE {\n  GRAPH ?graph {\n    ?uri ts:name ?name .\n    ?uri a ?type .\n    \
             FILTER(?type IN (ts:TwinInterface, ts:TwinInstance))\n    \
             OPTIONAL { ?uri ts:description ?description }\n    \
             OPTIONAL { ?uri ts:originalId ?originalId }\n    \
             OPTIONAL { ?uri ts:thingType ?thingType }\n  }\n  ",
        );
        let builder = builder
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n  FILTER(\n    ");
        let builder = contains(builder, "?name").raw("\n    || ");
        let builder = contains(builder, "?graph").raw("\n    || (BOUND(?description) && ");
        let builder = contains(builder, "?description").raw(")\n    || (BOUND(?originalId) && ");
        let builder = contains(builder, "?originalId").raw(")\n  )\n}\nORDER BY ?name\nLIMIT ");
        let query = builder.count(limit).build();

        let rows = self.client.select(&query).await?;
        Ok(rows
            .iter()
            .map(super::results::project_thing_summary)
            .collect())
    }

    /// Paginated listing of all interfaces and instances. Degrades to an
    /// empty page when the store is unreachable, since catalog browsing must
    /// keep working through outages.
    pub async fn list_things(
        &self,
        page: usize,
        page_size: usize,
        tenant: Option<&str>,
    ) -> Result<Page<ThingSummary>> {
        let page = page.max(1);
        let offset = (page - 1) * page_size;
        let query = QueryBuilder::with_prefixes()
            .raw(
                "SELECT ?uri ?name ?type ?description ?graph ?originalId ?thingType\n\
                 WHERE {\n  GRAPH ?graph {\n    ?uri ts:name ?name .\n    ?uri a ?type .\n    \
                 FILTER(?type IN (ts:TwinInterface, ts:TwinInstance))\n    \
                 OPTIONAL { ?uri ts:description ?description }\n    \
                 OPTIONAL { ?uri ts:originalId ?originalId }\n    \
                 OPTIONAL { ?uri ts:thingType ?thingType }\n  }\n  ",
            )
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n}\nORDER BY ?name\nOFFSET ")
            .count(offset)
            .raw("\nLIMIT ")
            .count(page_size)
            .build();

        let rows = match self.client.select(&query).await {
            Ok(rows) => rows,
            Err(Error::StoreTransport { status, body }) => {
                warn!(?status, body = %body, "store unavailable, returning empty listing");
                Vec::new()
            }
            Err(other) => return Err(other),
        };
        let items: Vec<ThingSummary> = rows
            .iter()
            .map(super::results::project_thing_summary)
            .collect();
        let total = items.len();
        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    /// Looks a thing up by URI, name, or graph substring. Returns `None`
    /// when nothing matches.
    pub async fn thing_by_id(
        &self,
        thing_id: &str,
        tenant: Option<&str>,
    ) -> Result<Option<ThingRecord>> {
        let builder = QueryBuilder::with_prefixes().raw(
            "SELECT ?uri ?name ?type ?description ?graph ?originalId ?thingType\n       \
             ?propName ?propType ?propDesc\n\
             WHERE {\n  GRAPH ?graph {\n    ?uri a ?type .\n    ?uri ts:name ?name .\n    \
             FILTER(?type IN (ts:TwinInterface, ts:TwinInstance))\n    FILTER(\n      STR(?uri) = ",
        );
        let builder = builder
            .literal(thing_id)
            .raw("\n      || STR(?name) = ")
            .literal(thing_id)
            .raw("\n      || CONTAINS(STR(?graph), ")
            .literal(thing_id)
            .raw(
                ")\n    )\n    OPTIONAL { ?uri ts:description ?description }\n    \
                 OPTIONAL { ?uri ts:originalId ?originalId }\n    \
                 OPTIONAL { ?uri ts:thingType ?thingType }\n    OPTIONAL {\n      \
                 ?uri ts:hasProperty ?prop .\n      ?prop ts:propertyName ?propName .\n      \
                 ?prop ts:propertyType ?propType .\n      \
                 OPTIONAL { ?prop ts:description ?propDesc }\n    }\n  }\n  ",
            )
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n}");
        let rows = self.client.select(&builder.build()).await?;
        Ok(fold_thing_record(&rows))
    }

    /// Finds interfaces declaring a property whose schema range admits the
    /// supplied value.
    pub async fn search_by_property(
        &self,
        property_name: &str,
        operator: CompareOp,
        value: f64,
        tenant: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PropertyMatch>> {
        let builder = QueryBuilder::with_prefixes().raw(
            "SELECT DISTINCT ?interface ?name ?propName ?propType ?propMin ?propMax ?unit \
             ?description ?graph ?thingType\n\
             WHERE {\n  GRAPH ?graph {\n    ?interface a ts:TwinInterface .\n    \
             ?interface ts:name ?name .\n    ?interface ts:hasProperty ?prop .\n    \
             ?prop ts:propertyName ?propName .\n    ?prop ts:propertyType ?propType .\n    \
             FILTER(CONTAINS(LCASE(STR(?propName)), ",
        );
        let mut filter = String::from("FILTER(true ");
        let _ = write!(filter, "{}", operator.range_filter(value));
        filter.push(')');

        let query = builder
            .lower_literal(property_name)
            .raw(
                "))\n    OPTIONAL { ?prop ts:minimum ?propMin }\n    \
                 OPTIONAL { ?prop ts:maximum ?propMax }\n    \
                 OPTIONAL { ?prop ts:unit ?unit }\n    \
                 OPTIONAL { ?interface ts:description ?description }\n    \
                 OPTIONAL { ?interface ts:thingType ?thingType }\n  }\n  ",
            )
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n  ")
            .raw(&filter)
            .raw("\n}\nORDER BY ?name\nLIMIT ")
            .count(limit)
            .build();

        let rows = self.client.select(&query).await?;
        Ok(rows
            .into_iter()
            .map(|row| PropertyMatch {
                thing_id: row.get("interface").cloned().unwrap_or_default(),
                name: row.get("name").cloned().unwrap_or_default(),
                property: row.get("propName").cloned().unwrap_or_default(),
                property_type: row.get("propType").cloned().unwrap_or_default(),
                min: row.get("propMin").cloned(),
                max: row.get("propMax").cloned(),
                unit: row.get("unit").cloned(),
                description: row.get("description").cloned(),
                thing_type: row.get("thingType").cloned(),
                graph: row.get("graph").cloned().unwrap_or_default(),
            })
            .collect())
    }

    /// Lists the relationships of an instance with each target's interface.
    pub async fn instance_relationships(
        &self,
        instance_name: &str,
        tenant: Option<&str>,
    ) -> Result<Vec<BindingRow>> {
        let uri = vocab::instance_uri(instance_name);
        let query = QueryBuilder::with_prefixes()
            .raw(
                "SELECT ?relName ?targetInstance ?targetInterface ?graph\n\
                 WHERE {\n  GRAPH ?graph {\n    ",
            )
            .iri(uri.as_str())
            .raw(
                " ts:hasInstanceRelationship ?rel .\n    \
                 ?rel ts:relationshipName ?relName .\n    \
                 ?rel ts:targetInstance ?target .\n    \
                 ?target ts:name ?targetInstance .\n    \
                 ?target ts:instanceOf ?interface .\n    \
                 ?interface ts:name ?targetInterface .\n  }\n  ",
            )
            .raw(&self.tenant_graph_filter(tenant))
            .raw("\n}")
            .build();
        self.client.select(&query).await
    }

    /// Probes the store with a triple count. Reports rather than errors.
    pub async fn health(&self) -> StoreHealth {
        let query = "SELECT (COUNT(*) AS ?count) WHERE { ?s ?p ?o }";
        match self.client.select(query).await {
            Ok(rows) => StoreHealth {
                status: "healthy",
                endpoint: self.endpoint.clone(),
                triple_count: rows
                    .first()
                    .and_then(|row| row.get("count"))
                    .cloned()
                    .or_else(|| Some("0".to_string())),
                error: None,
            },
            Err(err) => StoreHealth {
                status: "unhealthy",
                endpoint: self.endpoint.clone(),
                triple_count: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Serializes a graph as N-Triples lines, which any Turtle endpoint accepts.
fn to_turtle(graph: &Graph) -> String {
    let mut out = String::new();
    for triple in graph.iter() {
        let _ = writeln!(out, "{triple} .");
    }
    out
}
