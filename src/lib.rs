//! Digital-twin catalog core.
//!
//! The crate persists twin definitions (interfaces and instances) as RDF
//! triples inside tenant-scoped named graphs of an external triplestore, and
//! scores arbitrary device data against a library of standardized DTDL
//! interface definitions.
//!
//! The two subsystems are independent: [`store`] talks to the triplestore
//! over HTTP and never touches the catalog, while [`dtdl`] is a purely
//! in-memory registry plus scorer. [`twin`] holds the domain entities and the
//! mapping from entities to triples that both the store and its tests share.

pub mod config;
pub mod dtdl;
pub mod error;
pub mod store;
pub mod twin;

pub use config::Settings;
pub use error::{Error, Result};
