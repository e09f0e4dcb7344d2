//! Coverage of candidate concepts: structural cache or reasoner

use crate::cache::{Coverage, InstanceCache};
use crate::concept::Concept;
use crate::ontology::{IndividualId, Reasoner};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::{trace, warn};

/// Source of coverage for the search engine
pub trait CoverageEvaluator {
    /// Representation of a covered set
    type Coverage: Clone;

    /// Coverage of ⊤
    fn universe(&self) -> Self::Coverage;

    /// Coverage of `concept`, a refinement of `parent` whose coverage is
    /// `current`; `None` when the candidate should be skipped
    fn evaluate(&self, concept: &Concept, parent: &Concept, current: &Self::Coverage) -> Option<Self::Coverage>;

    /// Number of covered individuals
    fn count(&self, coverage: &Self::Coverage) -> usize;

    /// Number of covered individuals that belong to `set`
    fn count_intersection(&self, coverage: &Self::Coverage, set: &BTreeSet<IndividualId>) -> usize;

    /// Covered individuals
    fn individuals(&self, coverage: &Self::Coverage) -> BTreeSet<IndividualId>;
}

/// Scores concepts by matching them against cluster representatives
#[derive(Debug)]
pub struct StructuralEvaluator<'c, 'o> {
    cache: &'c InstanceCache<'o>,
}

impl<'c, 'o> StructuralEvaluator<'c, 'o> {
    /// Evaluate through `cache`
    pub fn new(cache: &'c InstanceCache<'o>) -> Self {
        StructuralEvaluator { cache }
    }
}

impl CoverageEvaluator for StructuralEvaluator<'_, '_> {
    type Coverage = Coverage;

    fn universe(&self) -> Coverage {
        self.cache.all()
    }

    fn evaluate(&self, concept: &Concept, _parent: &Concept, current: &Coverage) -> Option<Coverage> {
        Some(self.cache.get_instances(concept, current))
    }

    fn count(&self, coverage: &Coverage) -> usize {
        self.cache.count_all_instances(coverage)
    }

    fn count_intersection(&self, coverage: &Coverage, set: &BTreeSet<IndividualId>) -> usize {
        self.cache.count_intersection(coverage, set)
    }

    fn individuals(&self, coverage: &Coverage) -> BTreeSet<IndividualId> {
        self.cache.individuals(coverage)
    }
}

/// Scores concepts by asking the reasoner for their instances
pub struct ReasonerEvaluator<'r> {
    reasoner: &'r dyn Reasoner,
    individuals: Rc<BTreeSet<IndividualId>>,
}

impl<'r> ReasonerEvaluator<'r> {
    /// Evaluate through `reasoner` over `individuals`
    pub fn new(reasoner: &'r dyn Reasoner, individuals: BTreeSet<IndividualId>) -> Self {
        ReasonerEvaluator {
            reasoner,
            individuals: Rc::new(individuals),
        }
    }
}

impl CoverageEvaluator for ReasonerEvaluator<'_> {
    type Coverage = Rc<BTreeSet<IndividualId>>;

    fn universe(&self) -> Self::Coverage {
        Rc::clone(&self.individuals)
    }

    fn evaluate(&self, concept: &Concept, parent: &Concept, _current: &Self::Coverage) -> Option<Self::Coverage> {
        match self.reasoner.is_equivalent(concept, parent) {
            Ok(true) => {
                trace!(concept = %concept, parent = %parent, "equivalent to parent");
                return None;
            }
            Ok(false) => {}
            Err(e) => warn!(concept = %concept, error = %e, "equivalence check failed"),
        }
        let instances = match self.reasoner.is_satisfiable(concept) {
            Ok(false) => BTreeSet::new(),
            Ok(true) => self.reasoner.instances(concept).unwrap_or_else(|e| {
                warn!(concept = %concept, error = %e, "instance retrieval failed, treating as empty");
                BTreeSet::new()
            }),
            Err(e) => {
                warn!(concept = %concept, error = %e, "satisfiability check failed, treating as empty");
                BTreeSet::new()
            }
        };
        Some(Rc::new(instances))
    }

    fn count(&self, coverage: &Self::Coverage) -> usize {
        coverage.len()
    }

    fn count_intersection(&self, coverage: &Self::Coverage, set: &BTreeSet<IndividualId>) -> usize {
        coverage.intersection(set).count()
    }

    fn individuals(&self, coverage: &Self::Coverage) -> BTreeSet<IndividualId> {
        coverage.as_ref().clone()
    }
}

impl std::fmt::Debug for ReasonerEvaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasonerEvaluator")
            .field("individuals", &self.individuals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{AssertionSource, FactBase, Label, OracleError, OracleResult, SubsumptionAxiom};

    struct Failing;

    impl Reasoner for Failing {
        fn is_satisfiable(&self, _concept: &Concept) -> OracleResult<bool> {
            Ok(true)
        }

        fn instances(&self, _concept: &Concept) -> OracleResult<BTreeSet<IndividualId>> {
            Err(OracleError::Timeout("instances".to_string()))
        }

        fn is_entailed(&self, _axiom: &SubsumptionAxiom) -> OracleResult<bool> {
            Err(OracleError::Failure("entailment".to_string()))
        }
    }

    #[test]
    fn test_oracle_failure_scores_zero() {
        let all: BTreeSet<IndividualId> = ["a", "b"].into_iter().map(IndividualId::new).collect();
        let evaluator = ReasonerEvaluator::new(&Failing, all);
        let universe = evaluator.universe();
        assert_eq!(evaluator.count(&universe), 2);
        let cov = evaluator
            .evaluate(&Concept::atomic(Label::atom("A")), &Concept::top(), &universe)
            .unwrap();
        assert_eq!(evaluator.count(&cov), 0);
    }

    #[test]
    fn test_equivalent_refinement_is_skipped() {
        let mut kb = FactBase::new();
        kb.add_equivalent("Human", "Person").assert_class("ann", "Person");
        let evaluator = ReasonerEvaluator::new(&kb, kb.individuals());
        let person = Concept::atomic(Label::atom("Person"));
        let both = person.clone().with_label(Label::atom("Human"));
        assert!(evaluator.evaluate(&both, &person, &evaluator.universe()).is_none());
        let cov = evaluator.evaluate(&person, &Concept::top(), &evaluator.universe()).unwrap();
        assert_eq!(evaluator.individuals(&cov).len(), 1);
    }
}
