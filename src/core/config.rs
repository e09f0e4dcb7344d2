//! Learner configuration

use crate::{LearnerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration shared by the hierarchy, the instance cache, the
/// refinement operator and the search engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Depth of individual expansions and maximal role depth of concepts
    pub max_role_depth: usize,
    /// Minimal number of covered individuals for a concept to be accepted
    pub min_support: usize,
    /// Maximal syntactic length of a concept
    pub max_concept_length: usize,
    /// Maximal number of concepts accepted over one run
    pub max_concept_number: usize,
    /// Maximal number of concepts carried into the frontier per round
    pub beam_size: usize,
    /// Skip refinements implied by the class hierarchy
    pub check_redundancy: bool,
    /// Use class disjointness when checking redundancy
    pub check_disjointness: bool,
    /// Allow negated atomic classes
    pub use_negation: bool,
    /// Allow disjunctions of atomic classes
    pub use_disjunction: bool,
    /// Allow universal restrictions
    pub use_universal_restriction: bool,
    /// Allow numeric data restrictions
    pub use_data_properties: bool,
    /// Number of buckets the thresholds of a data property are split into
    pub data_thresholds_number: usize,
    /// Ask the reasoner for instances of atomic classes instead of using
    /// told assertions only
    pub use_reasoner_for_atomic_instances: bool,
    /// Offer every atomic class as a candidate when refining ⊤
    pub seed_atomic_classes: bool,
    /// Ask the reasoner when structural matching cannot decide
    pub oracle_fallback: bool,
    /// Drop redundant concepts from the final result
    pub remove_redundant_concepts: bool,
}

impl LearnerConfig {
    /// Conjunctions and existential restrictions only
    pub fn el() -> Self {
        LearnerConfig {
            max_role_depth: 2,
            min_support: 10,
            max_concept_length: 4,
            max_concept_number: 1000,
            beam_size: 100,
            check_redundancy: true,
            check_disjointness: true,
            use_negation: false,
            use_disjunction: false,
            use_universal_restriction: false,
            use_data_properties: false,
            data_thresholds_number: 10,
            use_reasoner_for_atomic_instances: false,
            seed_atomic_classes: true,
            oracle_fallback: false,
            remove_redundant_concepts: true,
        }
    }

    /// Every constructor the operator knows
    pub fn alc() -> Self {
        LearnerConfig {
            use_negation: true,
            use_disjunction: true,
            use_universal_restriction: true,
            use_data_properties: true,
            oracle_fallback: true,
            ..Self::el()
        }
    }

    /// Set the support threshold
    pub fn with_min_support(mut self, min_support: usize) -> Self {
        self.min_support = min_support;
        self
    }

    /// Set the length budget
    pub fn with_max_concept_length(mut self, max_concept_length: usize) -> Self {
        self.max_concept_length = max_concept_length;
        self
    }

    /// Set the role depth
    pub fn with_max_role_depth(mut self, max_role_depth: usize) -> Self {
        self.max_role_depth = max_role_depth;
        self
    }

    /// Set the beam width
    pub fn with_beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = beam_size;
        self
    }

    /// Set the global cap on accepted concepts
    pub fn with_max_concept_number(mut self, max_concept_number: usize) -> Self {
        self.max_concept_number = max_concept_number;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(LearnerError::InvalidConfiguration(
                "Beam size must be positive".to_string(),
            ));
        }

        if self.max_concept_length < 1 {
            return Err(LearnerError::InvalidConfiguration(
                "Maximal concept length must be at least 1".to_string(),
            ));
        }

        if self.max_concept_number == 0 {
            return Err(LearnerError::InvalidConfiguration(
                "Maximal concept number must be positive".to_string(),
            ));
        }

        if self.use_data_properties && self.data_thresholds_number == 0 {
            return Err(LearnerError::InvalidConfiguration(
                "Number of data thresholds must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self::el()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = LearnerConfig::default();
        assert!(config.validate().is_ok());

        config.beam_size = 0;
        assert!(matches!(
            config.validate(),
            Err(LearnerError::InvalidConfiguration(_))
        ));

        config.beam_size = 5;
        config.max_concept_length = 0;
        assert!(config.validate().is_err());

        config.max_concept_length = 3;
        config.use_data_properties = true;
        config.data_thresholds_number = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_predefined_configs() {
        let el = LearnerConfig::el();
        assert!(el.validate().is_ok());
        assert!(!el.use_negation);

        let alc = LearnerConfig::alc();
        assert!(alc.validate().is_ok());
        assert!(alc.use_disjunction && alc.use_universal_restriction);
        assert_eq!(alc.min_support, el.min_support);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LearnerConfig =
            serde_json::from_str(r#"{"min_support": 3, "beam_size": 7}"#).unwrap();
        assert_eq!(config.min_support, 3);
        assert_eq!(config.beam_size, 7);
        assert_eq!(config.max_concept_length, LearnerConfig::el().max_concept_length);
    }
}
