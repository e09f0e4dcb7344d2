//! Support scores for unsupervised and two-class runs

use super::evaluator::CoverageEvaluator;
use crate::ontology::{ClassId, IndividualId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Designated positive and negative classes of a two-class run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedClasses {
    /// Positive class
    pub positive: ClassId,
    /// Negative class
    pub negative: ClassId,
}

impl SeedClasses {
    /// Pair of seed classes
    pub fn new(positive: impl AsRef<str>, negative: impl AsRef<str>) -> Self {
        SeedClasses {
            positive: ClassId::new(positive),
            negative: ClassId::new(negative),
        }
    }

    /// Whether `class` is one of the seeds
    pub fn contains(&self, class: &ClassId) -> bool {
        &self.positive == class || &self.negative == class
    }
}

/// Quality of a description in a two-class run: the larger of its positive
/// and negative hits, zero when it hits neither
pub fn description_quality(positive_hits: usize, negative_hits: usize) -> usize {
    positive_hits.max(negative_hits)
}

/// How coverage turns into the support compared with the threshold
#[derive(Clone, Debug, Default)]
pub enum Scoring {
    /// Number of covered individuals
    #[default]
    Unsupervised,
    /// Hits among the instances of the seed classes
    Supervised {
        /// Instances of the positive class
        positives: BTreeSet<IndividualId>,
        /// Instances of the negative class
        negatives: BTreeSet<IndividualId>,
    },
}

impl Scoring {
    /// Support of a coverage
    pub fn score<E: CoverageEvaluator>(&self, evaluator: &E, coverage: &E::Coverage) -> usize {
        match self {
            Scoring::Unsupervised => evaluator.count(coverage),
            Scoring::Supervised {
                positives,
                negatives,
            } => description_quality(
                evaluator.count_intersection(coverage, positives),
                evaluator.count_intersection(coverage, negatives),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_quality() {
        assert_eq!(description_quality(0, 0), 0);
        assert_eq!(description_quality(3, 1), 3);
        assert_eq!(description_quality(2, 5), 5);
        assert_eq!(description_quality(4, 4), 4);
    }

    #[test]
    fn test_seed_membership() {
        let seeds = SeedClasses::new("Pos", "Neg");
        assert!(seeds.contains(&ClassId::new("Neg")));
        assert!(!seeds.contains(&ClassId::new("Other")));
    }
}
