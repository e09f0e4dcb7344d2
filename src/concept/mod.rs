//! Concept descriptions: arena trees, metrics and canonical forms

mod node;
mod canonical;

pub use node::{Comparison, Concept, ConceptNode, Edge, NodeId, Threshold};
pub use canonical::{CanonicalEdge, CanonicalForm};
