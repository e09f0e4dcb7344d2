//! Beam search over the refinement lattice

use super::evaluator::CoverageEvaluator;
use super::frontier::Frontier;
use super::scoring::{Scoring, SeedClasses};
use crate::concept::{CanonicalForm, Concept};
use crate::core::LearnerConfig;
use crate::ontology::{IndividualId, Label};
use crate::refine::RefinementOperator;
use crate::{LearnerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, trace};

/// Lifecycle of a search
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    /// Nothing done yet
    Idle,
    /// Frontier being filled with seeds
    Seeding,
    /// Main loop running
    Iterating,
    /// Frontier exhausted or cap reached
    Terminated,
}

/// Counters of a search
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Concepts popped from the frontier
    pub iterations: usize,
    /// Refinements visited; those left after the cap stopped a round are
    /// not counted
    pub extensions: usize,
    /// Refinements whose coverage was computed
    pub evaluated: usize,
    /// Accepted concepts, seeds excluded
    pub accepted: usize,
    /// Accepted concepts dropped as redundant
    pub removed_redundant: usize,
    /// Largest number of concepts added to the frontier in one round
    pub largest_beam: usize,
    /// Whether the concept cap stopped the search
    pub capped: bool,
}

/// An accepted concept with its covering individuals
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnedConcept {
    /// The concept
    pub concept: Concept,
    /// The concept it was refined from
    pub parent: Option<Concept>,
    /// Score compared with the support threshold
    pub support: usize,
    /// Covering individuals
    pub instances: BTreeSet<IndividualId>,
    /// Seconds spent evaluating the concept
    pub seconds: f64,
}

struct Accepted<C> {
    concept: Concept,
    parent: Option<Concept>,
    coverage: C,
    support: usize,
    seconds: f64,
    seed: bool,
}

/// Breadth-limited best-first search from ⊤.
///
/// Refinements are evaluated shortest first. A refinement is accepted when
/// its support reaches the threshold; at most `beam_size` accepted
/// refinements per round are queued for further refinement, and the run
/// stops after `max_concept_number` acceptances.
pub struct BeamSearch<'h, E: CoverageEvaluator> {
    operator: RefinementOperator<'h>,
    evaluator: E,
    config: LearnerConfig,
    seeds: Option<SeedClasses>,
    scoring: Scoring,
    state: SearchState,
    frontier: Frontier,
    processed: HashSet<CanonicalForm>,
    accepted: Vec<Accepted<E::Coverage>>,
    index: HashMap<CanonicalForm, usize>,
    stats: SearchStats,
}

impl<'h, E: CoverageEvaluator> BeamSearch<'h, E> {
    /// Search with `operator`, scoring through `evaluator`
    pub fn new(operator: RefinementOperator<'h>, evaluator: E) -> Self {
        let config = operator.config().clone();
        BeamSearch {
            operator,
            evaluator,
            config,
            seeds: None,
            scoring: Scoring::Unsupervised,
            state: SearchState::Idle,
            frontier: Frontier::new(),
            processed: HashSet::new(),
            accepted: Vec::new(),
            index: HashMap::new(),
            stats: SearchStats::default(),
        }
    }

    /// Two-class run: support counts hits among the seed classes' instances
    /// and refinements mentioning a seed class are skipped
    pub fn with_seeds(mut self, seeds: SeedClasses) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Current state
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// The evaluator
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Run until the frontier is empty or the cap is reached
    #[tracing::instrument(skip_all)]
    pub fn run(&mut self) -> SearchStats {
        match self.state {
            SearchState::Idle => self.seed(),
            SearchState::Terminated => return self.stats.clone(),
            SearchState::Seeding | SearchState::Iterating => {}
        }
        self.iterate();
        self.finish();
        self.stats.clone()
    }

    /// Continue a finished search with a new length budget; every accepted
    /// concept goes back into the frontier
    pub fn resume(&mut self, max_concept_length: usize) -> Result<SearchStats> {
        if max_concept_length < 1 {
            return Err(LearnerError::InvalidConfiguration(
                "Maximal concept length must be at least 1".to_string(),
            ));
        }
        self.config.max_concept_length = max_concept_length;
        self.operator.set_max_concept_length(max_concept_length);
        if self.state == SearchState::Terminated {
            self.processed = self.index.keys().cloned().collect();
            self.frontier = Frontier::new();
            self.frontier
                .extend(self.accepted.iter().map(|a| a.concept.clone()));
            self.stats.capped = false;
            self.state = SearchState::Seeding;
            info!(
                frontier = self.frontier.len(),
                max_concept_length, "search resumed"
            );
        }
        Ok(self.run())
    }

    fn seed(&mut self) {
        self.state = SearchState::Seeding;
        let top = Concept::top();
        let universe = self.evaluator.universe();
        if let Some(seeds) = self.seeds.clone() {
            let positive = Concept::atomic(Label::Atom(seeds.positive));
            let negative = Concept::atomic(Label::Atom(seeds.negative));
            let positive_cov = self
                .evaluator
                .evaluate(&positive, &top, &universe)
                .unwrap_or_else(|| universe.clone());
            let negative_cov = self
                .evaluator
                .evaluate(&negative, &top, &universe)
                .unwrap_or_else(|| universe.clone());
            self.scoring = Scoring::Supervised {
                positives: self.evaluator.individuals(&positive_cov),
                negatives: self.evaluator.individuals(&negative_cov),
            };
            self.accept_seed(top, universe);
            self.accept_seed(positive, positive_cov);
            self.accept_seed(negative, negative_cov);
        } else {
            self.accept_seed(top, universe);
        }
        info!(seeds = self.accepted.len(), supervised = self.seeds.is_some(), "search seeded");
    }

    fn accept_seed(&mut self, concept: Concept, coverage: E::Coverage) {
        let form = concept.canonical_form();
        self.processed.insert(form.clone());
        if self.index.contains_key(&form) {
            return;
        }
        let support = self.evaluator.count(&coverage);
        self.index.insert(form, self.accepted.len());
        self.frontier.push(concept.clone());
        self.accepted.push(Accepted {
            concept,
            parent: None,
            coverage,
            support,
            seconds: 0.0,
            seed: true,
        });
    }

    fn mentions_seed(&self, concept: &Concept) -> bool {
        self.seeds
            .as_ref()
            .map_or(false, |s| concept.mentions(&s.positive) || concept.mentions(&s.negative))
    }

    fn iterate(&mut self) {
        self.state = SearchState::Iterating;
        let round_start = self.accepted.len();
        while let Some(current) = self.frontier.pop() {
            self.stats.iterations += 1;
            let Some(current_cov) = self
                .index
                .get(&current.canonical_form())
                .map(|&i| self.accepted[i].coverage.clone())
            else {
                continue;
            };

            let mut extensions = self.operator.refine(&current);
            if current.is_top() && self.config.seed_atomic_classes {
                extensions.extend(self.operator.atomic_nodes());
            }
            extensions.sort_by_key(Concept::budget_length);

            let mut beam: Vec<Concept> = Vec::new();
            let mut capped = false;
            let mut visited = 0;
            for extension in &extensions {
                visited += 1;
                if !self.processed.insert(extension.canonical_form()) {
                    continue;
                }
                if extension.depth() > self.config.max_role_depth
                    || extension.budget_length() > self.config.max_concept_length
                {
                    continue;
                }
                if self.mentions_seed(extension) {
                    trace!(concept = %extension, "mentions a seed class");
                    continue;
                }
                self.stats.evaluated += 1;
                let started = Instant::now();
                let Some(coverage) = self.evaluator.evaluate(extension, &current, &current_cov) else {
                    continue;
                };
                let support = self.scoring.score(&self.evaluator, &coverage);
                if support < self.config.min_support {
                    trace!(concept = %extension, support, "insufficient support");
                    continue;
                }
                let seconds = started.elapsed().as_secs_f64();
                self.index.insert(extension.canonical_form(), self.accepted.len());
                self.accepted.push(Accepted {
                    concept: extension.clone(),
                    parent: Some(current.clone()),
                    coverage,
                    support,
                    seconds,
                    seed: false,
                });
                beam.push(extension.clone());
                if self.accepted.len() - round_start >= self.config.max_concept_number {
                    capped = true;
                    break;
                }
            }

            self.stats.extensions += visited;
            beam.truncate(self.config.beam_size);
            self.stats.largest_beam = self.stats.largest_beam.max(beam.len());
            self.frontier.extend(beam);
            debug!(
                iteration = self.stats.iterations,
                accepted = self.accepted.len(),
                frontier = self.frontier.len(),
                extensions = extensions.len(),
                current = %current,
                "refined"
            );
            if capped {
                self.stats.capped = true;
                break;
            }
        }
        self.state = SearchState::Terminated;
    }

    fn finish(&mut self) {
        if self.config.remove_redundant_concepts && self.config.check_redundancy {
            let before = self.accepted.len();
            let operator = &self.operator;
            self.accepted
                .retain(|a| a.seed || !operator.is_redundant_concept(&a.concept));
            let removed = before - self.accepted.len();
            if removed > 0 {
                self.index = self
                    .accepted
                    .iter()
                    .enumerate()
                    .map(|(i, a)| (a.concept.canonical_form(), i))
                    .collect();
                info!(removed, "redundant concepts removed");
            }
            self.stats.removed_redundant += removed;
        }
        self.stats.accepted = self.accepted.iter().filter(|a| !a.seed).count();
        info!(
            accepted = self.stats.accepted,
            iterations = self.stats.iterations,
            capped = self.stats.capped,
            "search terminated"
        );
    }

    /// Coverage recorded for an accepted concept or seed
    pub fn coverage(&self, concept: &Concept) -> Option<&E::Coverage> {
        self.index
            .get(&concept.canonical_form())
            .map(|&i| &self.accepted[i].coverage)
    }

    /// Accepted concepts in acceptance order, seeds excluded
    pub fn results(&self) -> Vec<LearnedConcept> {
        self.accepted
            .iter()
            .filter(|a| !a.seed)
            .map(|a| LearnedConcept {
                concept: a.concept.clone(),
                parent: a.parent.clone(),
                support: a.support,
                instances: self.evaluator.individuals(&a.coverage),
                seconds: a.seconds,
            })
            .collect()
    }
}

impl<E: CoverageEvaluator> std::fmt::Debug for BeamSearch<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeamSearch")
            .field("state", &self.state)
            .field("frontier", &self.frontier.len())
            .field("accepted", &self.accepted.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InstanceCache;
    use crate::ontology::{ClassId, FactBase, Hierarchy, Reasoner};
    use crate::search::{ReasonerEvaluator, StructuralEvaluator};
    use crate::utils::synthetic::{random_fact_base, Shape};
    use proptest::prelude::*;

    fn zoo() -> FactBase {
        let mut kb = FactBase::new();
        kb.add_subclass("Cat", "Animal")
            .add_subclass("Dog", "Animal")
            .add_class("Plant")
            .add_disjoint("Animal", "Plant")
            .add_domain("eats", "Animal")
            .add_role("grows");
        for i in 0..4 {
            kb.assert_class(format!("cat{}", i), "Cat");
            kb.assert_class(format!("dog{}", i), "Dog");
            kb.assert_class(format!("plant{}", i), "Plant");
            kb.assert_role(format!("cat{}", i), "eats", format!("plant{}", i));
        }
        kb
    }

    fn config() -> LearnerConfig {
        LearnerConfig::el()
            .with_min_support(4)
            .with_max_concept_length(4)
            .with_max_role_depth(2)
            .with_beam_size(10)
            .with_max_concept_number(100)
    }

    #[test]
    fn test_results_respect_thresholds() {
        let kb = zoo();
        let config = config();
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);
        let op = RefinementOperator::new(&h, config.clone()).unwrap();
        let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        assert_eq!(search.state(), SearchState::Idle);

        let stats = search.run();
        assert_eq!(search.state(), SearchState::Terminated);
        let results = search.results();
        assert_eq!(stats.accepted, results.len());
        assert!(!results.is_empty());
        for r in &results {
            assert!(r.support >= config.min_support);
            assert!(r.concept.budget_length() <= config.max_concept_length);
            assert!(r.concept.depth() <= config.max_role_depth);
            assert_eq!(r.instances.len(), r.support);
        }
        let shown: Vec<String> = results.iter().map(|r| r.concept.to_string()).collect();
        assert!(shown.contains(&"Animal".to_string()));
        assert!(shown.contains(&"∃eats.Plant".to_string()));
    }

    #[test]
    fn test_no_duplicate_results() {
        let kb = zoo();
        let config = config();
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);
        let op = RefinementOperator::new(&h, config).unwrap();
        let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        search.run();
        let results = search.results();
        let forms: HashSet<CanonicalForm> =
            results.iter().map(|r| r.concept.canonical_form()).collect();
        assert_eq!(forms.len(), results.len());
    }

    #[test]
    fn test_coverage_shrinks_along_refinements() {
        let kb = zoo();
        let config = config().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);
        let op = RefinementOperator::new(&h, config).unwrap();
        let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        search.run();
        for r in search.results() {
            let parent = r.parent.as_ref().unwrap();
            if let Some(parent_cov) = search.coverage(parent) {
                let parent_instances = search.evaluator().individuals(parent_cov);
                assert!(
                    r.instances.is_subset(&parent_instances),
                    "{} covers more than {}",
                    r.concept,
                    parent
                );
            }
        }
    }

    #[test]
    fn test_concept_cap() {
        let kb = zoo();
        let config = config().with_min_support(1).with_max_concept_number(2);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);
        let op = RefinementOperator::new(&h, config).unwrap();
        let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        let stats = search.run();
        assert!(stats.capped);
        assert_eq!(search.results().len(), 2);
        // the first two atoms fill the cap
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.extensions, 2);
        // a finished search does not run again
        assert_eq!(search.run(), stats);
    }

    #[test]
    fn test_narrow_beam() {
        let kb = zoo();
        let config = config().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);

        let op = RefinementOperator::new(&h, config.clone().with_beam_size(1)).unwrap();
        let mut narrow = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        let narrow_stats = narrow.run();
        let op = RefinementOperator::new(&h, config).unwrap();
        let mut wide = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        let wide_stats = wide.run();

        assert_eq!(narrow_stats.largest_beam, 1);
        assert!(wide_stats.largest_beam > 1);
        assert!(narrow_stats.iterations < wide_stats.iterations);
        // everything accepted while refining ⊤ is reported, queued or not
        let narrow_shown: Vec<String> = narrow.results().iter().map(|r| r.concept.to_string()).collect();
        assert!(narrow_shown.contains(&"Animal".to_string()));
        assert!(narrow_shown.contains(&"Plant".to_string()));
    }

    #[test]
    fn test_resume_with_larger_budget() {
        let kb = zoo();
        let config = config().with_max_concept_length(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);
        let op = RefinementOperator::new(&h, config).unwrap();
        let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache));
        search.run();
        let before = search.results();
        assert!(before.iter().all(|r| r.concept.budget_length() <= 1));

        search.resume(3).unwrap();
        let after = search.results();
        assert!(after.len() > before.len());
        assert_eq!(&after[..before.len()], &before[..]);
        assert!(after.iter().any(|r| r.concept.budget_length() > 1));
        assert!(search.resume(0).is_err());
    }

    #[test]
    fn test_supervised_run_skips_seed_classes() {
        let kb = zoo();
        let config = config().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let cache = InstanceCache::build(&kb, &h, &config);
        let op = RefinementOperator::new(&h, config).unwrap();
        let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache))
            .with_seeds(SeedClasses::new("Cat", "Dog"));
        search.run();
        let results = search.results();
        let cat = ClassId::new("Cat");
        let dog = ClassId::new("Dog");
        assert!(results.iter().all(|r| !r.concept.mentions(&cat) && !r.concept.mentions(&dog)));
        // plants are neither cats nor dogs
        assert!(results.iter().all(|r| r.concept.to_string() != "Plant"));
        let eats = results
            .iter()
            .find(|r| r.concept.to_string() == "∃eats.⊤")
            .unwrap();
        assert_eq!(eats.support, 4);
    }

    #[test]
    fn test_reasoner_evaluator_agrees_on_instances() {
        let kb = zoo();
        let config = config();
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = RefinementOperator::new(&h, config).unwrap();
        let evaluator = ReasonerEvaluator::new(&kb, h.individuals().clone());
        let mut search = BeamSearch::new(op, evaluator);
        search.run();
        let results = search.results();
        assert!(!results.is_empty());
        for r in results {
            assert_eq!(r.instances, kb.instances(&r.concept).unwrap());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn prop_search_bounds(
            seed in any::<u64>(),
            min_support in 1usize..6,
            cap in 1usize..30,
            beam_size in 1usize..6,
        ) {
            let shape = Shape { individuals: 30, classes: 6, roles: 2, fan_out: 2 };
            let kb = random_fact_base(seed, shape);
            let config = LearnerConfig::el()
                .with_min_support(min_support)
                .with_max_concept_length(3)
                .with_max_concept_number(cap)
                .with_beam_size(beam_size);
            let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
            let cache = InstanceCache::build(&kb, &h, &config);
            let op = RefinementOperator::new(&h, config).unwrap();
            let mut search = BeamSearch::new(op, StructuralEvaluator::new(&cache));
            search.run();
            let results = search.results();
            prop_assert!(results.len() <= cap);
            prop_assert!(search.stats().largest_beam <= beam_size);
            for r in &results {
                prop_assert!(r.support >= min_support);
                prop_assert!(r.concept.budget_length() <= 3);
                prop_assert_eq!(&r.instances, &kb.instances(&r.concept).unwrap());
                if let Some(parent_cov) = r.parent.as_ref().and_then(|p| search.coverage(p)) {
                    prop_assert!(r.instances.is_subset(&search.evaluator().individuals(parent_cov)));
                }
            }
        }
    }
}
