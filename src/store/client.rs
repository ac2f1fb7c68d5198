//! SPARQL protocol client.
//!
//! Two safety transforms guard the read path: prefix completion, which
//! prepends missing PREFIX declarations for the namespaces queries are
//! allowed to abbreviate, and query-kind enforcement, which rejects anything
//! that is not a SELECT before a single byte goes over the wire. Updates and
//! graph replacement travel through separate methods that never accept
//! external query text.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::StoreSettings;
use crate::error::{Error, Result};

use super::results::{parse_bindings, BindingRow};

/// Namespace abbreviations completed on the read path, paired with their
/// declarations. Checked longest-abbreviation-first so an abbreviation is
/// never mistaken for another that extends it.
pub const KNOWN_PREFIXES: &[(&str, &str)] = &[
    ("tsd", "PREFIX tsd: <http://iodt2.com/>"),
    ("rdfs", "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>"),
    ("rdf", "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>"),
    ("xsd", "PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>"),
    ("ts", "PREFIX ts: <http://twin.dtd/ontology#>"),
];

/// Prepends PREFIX declarations for every known abbreviation the query uses
/// but does not declare. Idempotent: complete text passes through untouched.
#[must_use]
pub fn ensure_prefixes(query: &str) -> String {
    let mut ordered: Vec<&(&str, &str)> = KNOWN_PREFIXES.iter().collect();
    ordered.sort_by_key(|(abbr, _)| std::cmp::Reverse(abbr.len()));

    let mut missing = Vec::new();
    for (abbr, declaration) in ordered {
        // A letter right before the abbreviation means it is the tail of a
        // longer token (`https:` must not count as a use of `ts:`).
        let usage =
            Regex::new(&format!("(?:^|[^A-Za-z]){}:", regex::escape(abbr))).expect("valid pattern");
        let declared = Regex::new(&format!(r"(?i)PREFIX\s+{}:", regex::escape(abbr)))
            .expect("valid pattern");
        if usage.is_match(query) && !declared.is_match(query) {
            missing.push(*declaration);
        }
    }

    if missing.is_empty() {
        query.to_string()
    } else {
        format!("{}\n\n{query}", missing.join("\n"))
    }
}

/// Returns true when the first keyword after PREFIX declarations and blank
/// lines is SELECT.
#[must_use]
pub fn is_select_query(query: &str) -> bool {
    for line in query.trim().lines() {
        let stripped = line.trim().to_uppercase();
        if stripped.is_empty() || stripped.starts_with("PREFIX") {
            continue;
        }
        return stripped.starts_with("SELECT");
    }
    false
}

/// Transport seam between the client and the store's HTTP endpoints. Tests
/// substitute recording stubs; production uses [`HttpTransport`].
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// Executes a SELECT query, returning the raw SPARQL JSON document.
    async fn select(&self, query: &str) -> Result<serde_json::Value>;

    /// Executes a SPARQL UPDATE.
    async fn update(&self, update: &str) -> Result<()>;

    /// Replaces the full content of a named graph with Turtle data.
    async fn replace_graph(&self, graph_uri: &str, turtle: &str) -> Result<()>;
}

/// Transport implementation speaking the SPARQL protocol over HTTP with
/// basic auth and a bounded per-request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    query_endpoint: String,
    update_endpoint: String,
    data_endpoint: String,
    username: String,
    password: String,
}

impl HttpTransport {
    /// Builds a transport from store settings.
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            client,
            query_endpoint: settings.query_endpoint(),
            update_endpoint: settings.update_endpoint(),
            data_endpoint: settings.data_endpoint(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    async fn check(response: reqwest::Response, accepted: &[StatusCode]) -> Result<reqwest::Response> {
        let status = response.status();
        if accepted.contains(&status) {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::transport(Some(status.as_u16()), body))
        }
    }
}

#[async_trait]
impl StoreTransport for HttpTransport {
    async fn select(&self, query: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(&self.query_endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .await?;
        let response = Self::check(response, &[StatusCode::OK]).await?;
        Ok(response.json().await?)
    }

    async fn update(&self, update: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.update_endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "application/sparql-update")
            .body(update.to_string())
            .send()
            .await?;
        Self::check(response, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    async fn replace_graph(&self, graph_uri: &str, turtle: &str) -> Result<()> {
        let response = self
            .client
            .put(&self.data_endpoint)
            .query(&[("graph", graph_uri)])
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "text/turtle")
            .body(turtle.to_string())
            .send()
            .await?;
        Self::check(
            response,
            &[StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT],
        )
        .await?;
        Ok(())
    }
}

/// SPARQL client applying the read-path safety transforms in front of a
/// [`StoreTransport`].
#[derive(Clone)]
pub struct SparqlClient {
    transport: Arc<dyn StoreTransport>,
}

impl SparqlClient {
    /// Creates a client backed by [`HttpTransport`].
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(settings)?)))
    }

    /// Creates a client over an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn StoreTransport>) -> Self {
        Self { transport }
    }

    /// Completes prefixes, enforces SELECT, executes the query and parses the
    /// bindings into flat rows. Every query, templated or externally
    /// supplied, goes through here.
    pub async fn select(&self, query: &str) -> Result<Vec<BindingRow>> {
        let query = ensure_prefixes(query);
        if !is_select_query(&query) {
            return Err(Error::QueryRejected(truncate(&query)));
        }
        debug!(query = %query, "executing SPARQL select");
        let document = self.transport.select(&query).await?;
        Ok(parse_bindings(&document))
    }

    /// Executes a SPARQL UPDATE. Not reachable from the read path; callers
    /// pass internally templated text only.
    pub(crate) async fn update(&self, update: &str) -> Result<()> {
        debug!(update = %update, "executing SPARQL update");
        self.transport.update(update).await
    }

    /// Replaces a named graph's content.
    pub(crate) async fn replace_graph(&self, graph_uri: &str, turtle: &str) -> Result<()> {
        self.transport.replace_graph(graph_uri, turtle).await
    }
}

fn truncate(query: &str) -> String {
    const LIMIT: usize = 120;
    let trimmed = query.trim();
    if trimmed.len() <= LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(LIMIT).collect();
        format!("{cut}…")
    }
}
