//! Structural instance cache: expansions, clusters and matching

mod cluster;
mod expansion;
mod instances;
mod matching;

pub use cluster::{cluster, fingerprints, Cluster};
pub use expansion::{build_expansions, Expansion, ExpansionEdge, Quantifier};
pub use instances::{ClusterHit, Coverage, InstanceCache};
pub use matching::matches;
