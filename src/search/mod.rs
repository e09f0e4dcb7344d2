//! Search over the refinement lattice

mod beam;
mod evaluator;
mod frontier;
mod scoring;

pub use beam::{BeamSearch, LearnedConcept, SearchState, SearchStats};
pub use evaluator::{CoverageEvaluator, ReasonerEvaluator, StructuralEvaluator};
pub use frontier::Frontier;
pub use scoring::{description_quality, Scoring, SeedClasses};
