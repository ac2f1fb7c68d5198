//! DTDL interface catalog and compatibility engine.
//!
//! [`model`] defines the catalog entry types and the DTMI value object,
//! [`registry`] holds the indexed in-memory catalog behind an atomically
//! swappable snapshot, and [`validator`] scores device data against catalog
//! interfaces.

pub mod model;
pub mod registry;
pub mod validator;

pub use model::{CatalogEntry, Content, Dtmi, DtmiError, InterfaceDefinition, Schema};
pub use registry::{InterfaceRegistry, SearchFilter};
pub use validator::{
    DeviceData, InterfaceRequirements, InterfaceValidator, Severity, ValidationIssue,
    ValidationResult,
};
