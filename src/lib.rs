//! # dl-learner: frequent concept learning over description-logic knowledge bases
//!
//! Candidate concept descriptions are produced by a downward refinement
//! operator starting from ⊤ and explored by a beam search. Coverage is
//! computed by matching candidates against individual expansions: each
//! individual is unfolded into a finite tree of its entailed labels and
//! role successors, and individuals with identical trees share one
//! cluster. A reasoner can stand in for the cache when exact answers are
//! required.
//!
//! ## Features
//!
//! - **Concepts**: arena trees with conjunction, negated atoms, atomic
//!   disjunction, existential and universal restrictions and numeric
//!   data restrictions
//! - **Instance cache**: expansions, clustering and homomorphism matching
//! - **Refinement**: specialisation along the class hierarchy with
//!   redundancy and disjointness pruning
//! - **Search**: beam search with support threshold, caps, two-class
//!   scoring and resumption under a larger length budget

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Identifiers, collaborator traits and the class hierarchy
pub mod ontology;

/// Concept descriptions
pub mod concept;

/// Individual expansions and the structural instance cache
pub mod cache;

/// The refinement operator
pub mod refine;

/// Beam search over refinements
pub mod search;

/// Configuration and the learner entry point
pub mod core;

/// Utility functions and helpers
pub mod utils;

pub use crate::core::{ConceptLearner, LearnerConfig, LearningReport};
pub use cache::InstanceCache;
pub use concept::Concept;
pub use ontology::{FactBase, Hierarchy};
pub use refine::RefinementOperator;
pub use search::{BeamSearch, LearnedConcept};

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum LearnerError {
    /// Configuration rejected before any work started
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Malformed concept tree
    #[error("Invalid concept: {0}")]
    InvalidConcept(String),

    /// Reasoner or oracle failure that could not be recovered locally
    #[error("Oracle error: {0}")]
    Oracle(#[from] ontology::OracleError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, LearnerError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        cache::{Coverage, InstanceCache},
        concept::{Comparison, Concept},
        core::{ConceptLearner, LearnerConfig, LearningReport},
        ontology::{
            AssertionSource, ClassId, DataPropertyId, FactBase, Hierarchy, HierarchyOracle,
            IndividualId, Label, Reasoner, RoleId,
        },
        refine::RefinementOperator,
        search::{
            BeamSearch, CoverageEvaluator, LearnedConcept, ReasonerEvaluator, SearchStats,
            SeedClasses, StructuralEvaluator,
        },
        LearnerError, Result,
    };
}
