//! Configuration and the learner entry point

mod config;
mod learner;

pub use config::LearnerConfig;
pub use learner::{ConceptLearner, LearningReport};
