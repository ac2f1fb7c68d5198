//! Twin domain primitives and their RDF mapping.
//!
//! The module keeps pure domain constructs only: entity aggregates describing
//! interfaces and instances, the fixed ontology vocabulary, and the
//! deterministic mapping from entities to triple sets. Persistence lives in
//! [`crate::store`].

pub mod crd;
pub mod entities;
pub mod mapper;
pub mod vocab;

pub use entities::{
    InstanceRelationship, PropertyType, TwinCommand, TwinDefinitionError, TwinInstance,
    TwinInterface, TwinMetadata, TwinProperty, TwinRelationship,
};
pub use mapper::{map_instance, map_interface, map_twin};
