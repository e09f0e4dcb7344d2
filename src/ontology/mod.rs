//! Vocabulary, collaborator interfaces and the precomputed hierarchy

mod hierarchy;
mod ids;
mod memory;
mod oracle;

pub use hierarchy::{DataThresholds, Hierarchy};
pub use ids::{ClassId, DataPropertyId, IndividualId, Label, RoleId};
pub use memory::FactBase;
pub use oracle::{
    AssertionSource, HierarchyOracle, OracleError, OracleResult, Reasoner, SubsumptionAxiom,
    UniversalAxiom,
};
