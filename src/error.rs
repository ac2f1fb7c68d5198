//! Crate-wide error type.
//!
//! Fine-grained errors live next to the module that raises them (for example
//! [`crate::twin::entities::TwinDefinitionError`]); this enum is the single
//! surface handlers match on.

use thiserror::Error;

use crate::dtdl::model::DtmiError;
use crate::twin::entities::TwinDefinitionError;

/// Errors surfaced by store and catalog operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The submitted twin definition could not be mapped to triples. Raised
    /// before any network call; nothing partial is ever stored.
    #[error("invalid twin definition: {0}")]
    Mapping(#[from] TwinDefinitionError),

    /// The triplestore answered with a non-success status, or the request
    /// never reached it. Callers are not expected to distinguish the two
    /// cases; `status` is absent for pure transport failures.
    #[error("store request failed{}: {body}", fmt_status(.status))]
    StoreTransport { status: Option<u16>, body: String },

    /// Non-SELECT text was submitted through the read path. Rejected before
    /// any network call.
    #[error("only SELECT queries are accepted, got: {0}")]
    QueryRejected(String),

    /// A referenced resource does not exist where absence is not a normal
    /// outcome for the caller.
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },

    /// A catalog identifier failed DTMI format validation.
    #[error(transparent)]
    Dtmi(#[from] DtmiError),

    /// The embedded interface catalog could not be loaded or parsed.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Configuration could not be read or deserialized.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn transport(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::StoreTransport {
            status,
            body: body.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::StoreTransport {
            status: err.status().map(|code| code.as_u16()),
            body: err.to_string(),
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" with status {code}"))
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
