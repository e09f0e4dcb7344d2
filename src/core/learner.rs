//! Entry point wiring hierarchy, cache, operator and search

use crate::cache::InstanceCache;
use crate::core::LearnerConfig;
use crate::ontology::{AssertionSource, Hierarchy, HierarchyOracle, Reasoner};
use crate::refine::RefinementOperator;
use crate::search::{
    BeamSearch, CoverageEvaluator, LearnedConcept, ReasonerEvaluator, SearchStats, SeedClasses,
    StructuralEvaluator,
};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of a learning run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningReport {
    /// Configuration the run used
    pub config: LearnerConfig,
    /// Search counters
    pub stats: SearchStats,
    /// Number of clusters in the instance cache, zero for reasoner runs
    pub clusters: usize,
    /// Accepted concepts in acceptance order
    pub concepts: Vec<LearnedConcept>,
}

/// Learns frequent concepts from a knowledge base
#[derive(Clone, Debug)]
pub struct ConceptLearner {
    config: LearnerConfig,
    seeds: Option<SeedClasses>,
}

impl ConceptLearner {
    /// Create learner with a validated configuration
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(ConceptLearner { config, seeds: None })
    }

    /// Two-class learning between `seeds`
    pub fn with_seeds(mut self, seeds: SeedClasses) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// The configuration
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Precompute the class hierarchy of `kb`
    pub fn hierarchy<K>(&self, kb: &K) -> Result<Hierarchy>
    where
        K: Reasoner + HierarchyOracle + AssertionSource,
    {
        Hierarchy::build(kb, kb, Some(kb), &self.config)
    }

    /// Learn with coverage computed on the structural instance cache; the
    /// reasoner only answers concepts the cache cannot, when
    /// `oracle_fallback` is set
    pub fn learn<K>(&self, kb: &K) -> Result<LearningReport>
    where
        K: Reasoner + HierarchyOracle + AssertionSource,
    {
        let hierarchy = self.hierarchy(kb)?;
        let mut cache = InstanceCache::build(kb, &hierarchy, &self.config);
        if self.config.oracle_fallback {
            cache = cache.with_oracle(kb);
        }
        let clusters = cache.clusters().len();
        info!(
            individuals = cache.expansion_count(),
            clusters, "learning with the instance cache"
        );
        let operator = RefinementOperator::new(&hierarchy, self.config.clone())?;
        let search = BeamSearch::new(operator, StructuralEvaluator::new(&cache));
        Ok(self.drive(search, clusters))
    }

    /// Learn with every coverage retrieved from the reasoner
    pub fn learn_with_reasoner<K>(&self, kb: &K) -> Result<LearningReport>
    where
        K: Reasoner + HierarchyOracle + AssertionSource,
    {
        let hierarchy = self.hierarchy(kb)?;
        info!(
            individuals = hierarchy.individuals().len(),
            "learning with the reasoner"
        );
        let operator = RefinementOperator::new(&hierarchy, self.config.clone())?;
        let evaluator = ReasonerEvaluator::new(kb, hierarchy.individuals().clone());
        Ok(self.drive(BeamSearch::new(operator, evaluator), 0))
    }

    fn drive<E: CoverageEvaluator>(&self, mut search: BeamSearch<'_, E>, clusters: usize) -> LearningReport {
        if let Some(seeds) = &self.seeds {
            search = search.with_seeds(seeds.clone());
        }
        let stats = search.run();
        LearningReport {
            config: self.config.clone(),
            stats,
            clusters,
            concepts: search.results(),
        }
    }
}
