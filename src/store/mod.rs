//! Triplestore access layer.
//!
//! [`client`] owns the HTTP plumbing and the safety transforms applied to
//! query text, [`query`] builds templated SELECT queries with escaped
//! interpolation, [`results`] turns SPARQL JSON bindings into domain records,
//! and [`graphs`] combines them into the tenant-scoped twin store.

pub mod client;
pub mod graphs;
pub mod query;
pub mod results;

pub use client::{HttpTransport, SparqlClient, StoreTransport};
pub use graphs::{CompareOp, PropertyMatch, StoreHealth, TwinStore};
pub use results::{BindingRow, InterfaceDetails, Page, ThingKind, ThingRecord, ThingSummary};
