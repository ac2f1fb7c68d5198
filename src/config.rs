//! Runtime configuration.
//!
//! Settings deserialize from YAML and fall back to the same defaults the
//! development triplestore ships with. Environment variables override file
//! values so containerized deployments need no config file at all.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top level settings for the catalog.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Triplestore connection settings.
    pub store: StoreSettings,
    /// Tenant isolation settings.
    pub tenancy: TenantSettings,
}

impl Settings {
    /// Parses settings from a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }

    /// Builds settings from environment variables, starting from defaults.
    ///
    /// Recognized variables: `FUSEKI_URL`, `FUSEKI_DATASET`,
    /// `FUSEKI_USERNAME`, `FUSEKI_PASSWORD`, `FUSEKI_TIMEOUT_SECS`,
    /// `DEFAULT_TENANT_ID`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = env::var("FUSEKI_URL") {
            settings.store.url = url;
        }
        if let Ok(dataset) = env::var("FUSEKI_DATASET") {
            settings.store.dataset = dataset;
        }
        if let Ok(username) = env::var("FUSEKI_USERNAME") {
            settings.store.username = username;
        }
        if let Ok(password) = env::var("FUSEKI_PASSWORD") {
            settings.store.password = password;
        }
        if let Ok(timeout) = env::var("FUSEKI_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                settings.store.timeout_secs = secs;
            }
        }
        if let Ok(tenant) = env::var("DEFAULT_TENANT_ID") {
            settings.tenancy.default_tenant = tenant;
        }
        settings
    }
}

/// Connection settings for the external triplestore.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSettings {
    /// Base URL of the store, without the dataset segment.
    pub url: String,
    /// Dataset name appended to the base URL.
    pub dataset: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Per-request timeout. Every external call is bounded by this.
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:3030".to_string(),
            dataset: "twin-db".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            timeout_secs: 30,
        }
    }
}

impl StoreSettings {
    /// Returns the dataset endpoint, e.g. `http://localhost:3030/twin-db`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.dataset)
    }

    /// SPARQL query endpoint.
    #[must_use]
    pub fn query_endpoint(&self) -> String {
        format!("{}/query", self.endpoint())
    }

    /// SPARQL update endpoint.
    #[must_use]
    pub fn update_endpoint(&self) -> String {
        format!("{}/update", self.endpoint())
    }

    /// Graph store protocol endpoint.
    #[must_use]
    pub fn data_endpoint(&self) -> String {
        format!("{}/data", self.endpoint())
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tenant isolation settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TenantSettings {
    /// Tenant whose graphs are visible to every scoped read.
    pub default_tenant: String,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            default_tenant: "default".to_string(),
        }
    }
}
