//! Cluster-level instance retrieval with optional oracle fallback

use super::cluster::{cluster, Cluster};
use super::expansion::{build_expansions, Expansion};
use super::matching::matches;
use crate::concept::{CanonicalForm, Concept};
use crate::core::LearnerConfig;
use crate::ontology::{AssertionSource, Hierarchy, IndividualId, Reasoner};
use crate::utils::timing::Timer;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use tracing::{info, trace, warn};

/// One matched cluster, with the subset of its members that are instances
/// when not all of them are
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterHit {
    /// Cluster position in the cache
    pub cluster: usize,
    /// `None` when every member is covered
    pub members: Option<BTreeSet<IndividualId>>,
}

/// Clusters covered by a concept
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    hits: Vec<ClusterHit>,
}

impl Coverage {
    /// Matched clusters in cache order
    pub fn hits(&self) -> &[ClusterHit] {
        &self.hits
    }

    /// Whether no cluster matched
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of matched clusters
    pub fn cluster_count(&self) -> usize {
        self.hits.len()
    }
}

/// Structural instance cache over clustered expansions
pub struct InstanceCache<'o> {
    clusters: Vec<Cluster>,
    expansions: usize,
    oracle: Option<&'o dyn Reasoner>,
    answers: RefCell<HashMap<CanonicalForm, Rc<BTreeSet<IndividualId>>>>,
}

impl<'o> InstanceCache<'o> {
    /// Unfold every individual, then cluster the expansions
    pub fn build(assertions: &dyn AssertionSource, hierarchy: &Hierarchy, config: &LearnerConfig) -> Self {
        let _timer = Timer::new("instance cache");
        let expansions = build_expansions(hierarchy.individuals(), assertions, hierarchy, config);
        let cache = Self::from_expansions(expansions);
        info!(
            expansions = cache.expansions,
            clusters = cache.clusters.len(),
            "instance cache built"
        );
        cache
    }

    /// Cluster prepared root expansions
    pub fn from_expansions(expansions: Vec<Expansion>) -> Self {
        let count = expansions.len();
        InstanceCache {
            clusters: cluster(expansions),
            expansions: count,
            oracle: None,
            answers: RefCell::new(HashMap::new()),
        }
    }

    /// Ask `oracle` whenever structural matching rejects a concept outside
    /// the structural fragment
    pub fn with_oracle(mut self, oracle: &'o dyn Reasoner) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// All clusters
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of root expansions clustered
    pub fn expansion_count(&self) -> usize {
        self.expansions
    }

    /// Coverage of ⊤: every cluster in full
    pub fn all(&self) -> Coverage {
        Coverage {
            hits: (0..self.clusters.len())
                .map(|cluster| ClusterHit {
                    cluster,
                    members: None,
                })
                .collect(),
        }
    }

    /// Coverage of `concept` among the clusters of `current`.
    ///
    /// A refinement is never more general than its parent, so only the
    /// parent's clusters need to be tested.
    pub fn get_instances(&self, concept: &Concept, current: &Coverage) -> Coverage {
        let fallback = self
            .oracle
            .filter(|_| concept.uses_non_el_constructors());
        let mut hits = Vec::new();
        for hit in &current.hits {
            let Some(cluster) = self.clusters.get(hit.cluster) else {
                continue;
            };
            if matches(concept, cluster.representative()) {
                hits.push(hit.clone());
                continue;
            }
            let Some(oracle) = fallback else {
                continue;
            };
            let answer = self.oracle_instances(oracle, concept);
            let candidates: Box<dyn Iterator<Item = &IndividualId>> = match &hit.members {
                Some(members) => Box::new(members.iter()),
                None => Box::new(cluster.members().iter()),
            };
            let covered: BTreeSet<IndividualId> =
                candidates.filter(|i| answer.contains(*i)).cloned().collect();
            if covered.is_empty() {
                continue;
            }
            let members = if covered.len() == cluster.len() {
                None
            } else {
                Some(covered)
            };
            hits.push(ClusterHit {
                cluster: hit.cluster,
                members,
            });
        }
        Coverage { hits }
    }

    /// Coverage of `concept` over every cluster
    pub fn get_all_instances(&self, concept: &Concept) -> Coverage {
        self.get_instances(concept, &self.all())
    }

    fn oracle_instances(&self, oracle: &dyn Reasoner, concept: &Concept) -> Rc<BTreeSet<IndividualId>> {
        let key = concept.canonical_form();
        if let Some(found) = self.answers.borrow().get(&key) {
            return Rc::clone(found);
        }
        let found = match oracle.instances(concept) {
            Ok(found) => found,
            Err(e) => {
                warn!(concept = %concept, error = %e, "instance retrieval failed, treating as empty");
                BTreeSet::new()
            }
        };
        trace!(concept = %concept, instances = found.len(), "oracle fallback");
        let found = Rc::new(found);
        self.answers.borrow_mut().insert(key, Rc::clone(&found));
        found
    }

    /// Number of covered individuals, summed per cluster
    pub fn count_all_instances(&self, coverage: &Coverage) -> usize {
        coverage
            .hits
            .iter()
            .map(|hit| match &hit.members {
                Some(members) => members.len(),
                None => self.clusters.get(hit.cluster).map_or(0, Cluster::len),
            })
            .sum()
    }

    /// Covered individuals
    pub fn individuals(&self, coverage: &Coverage) -> BTreeSet<IndividualId> {
        let mut out = BTreeSet::new();
        for hit in &coverage.hits {
            match &hit.members {
                Some(members) => out.extend(members.iter().cloned()),
                None => {
                    if let Some(cluster) = self.clusters.get(hit.cluster) {
                        out.extend(cluster.members().iter().cloned());
                    }
                }
            }
        }
        out
    }

    /// Number of covered individuals that belong to `set`
    pub fn count_intersection(&self, coverage: &Coverage, set: &BTreeSet<IndividualId>) -> usize {
        coverage
            .hits
            .iter()
            .map(|hit| match &hit.members {
                Some(members) => members.intersection(set).count(),
                None => self.clusters.get(hit.cluster).map_or(0, |c| {
                    c.members().iter().filter(|i| set.contains(*i)).count()
                }),
            })
            .sum()
    }
}

impl std::fmt::Debug for InstanceCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCache")
            .field("clusters", &self.clusters.len())
            .field("expansions", &self.expansions)
            .field("oracle", &self.oracle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{FactBase, Label, RoleId};

    fn twins() -> FactBase {
        let mut kb = FactBase::new();
        kb.add_subclass("Cat", "Animal")
            .add_disjoint("Cat", "Dog")
            .assert_class("a", "Cat")
            .assert_class("b", "Cat")
            .assert_class("x", "Toy")
            .assert_class("y", "Toy")
            .assert_role("a", "plays", "x")
            .assert_role("b", "plays", "y")
            .assert_class("d", "Dog")
            .add_individual("e");
        kb
    }

    fn cache<'o>(kb: &FactBase, config: &LearnerConfig) -> InstanceCache<'o> {
        let h = Hierarchy::build(kb, kb, None, config).unwrap();
        InstanceCache::build(kb, &h, config)
    }

    #[test]
    fn test_twins_share_a_cluster() {
        let kb = twins();
        let cache = cache(&kb, &LearnerConfig::el());
        // {a, b}, {x, y}, {d}, {e}
        assert_eq!(cache.clusters().len(), 4);
        assert_eq!(cache.expansion_count(), 6);

        let toy = Concept::atomic(Label::atom("Toy"));
        let player = Concept::atomic(Label::atom("Cat")).with_exists(RoleId::new("plays"), &toy);
        let cov = cache.get_all_instances(&player);
        assert_eq!(cov.cluster_count(), 1);
        assert_eq!(cache.count_all_instances(&cov), 2);
        assert_eq!(
            cache.individuals(&cov),
            [IndividualId::new("a"), IndividualId::new("b")].into_iter().collect()
        );
    }

    #[test]
    fn test_refinement_coverage_is_nested() {
        let kb = twins();
        let cache = cache(&kb, &LearnerConfig::el());
        let top = cache.all();
        assert_eq!(cache.count_all_instances(&top), 6);
        let animal = Concept::atomic(Label::atom("Animal"));
        let cov = cache.get_instances(&animal, &top);
        assert_eq!(cache.count_all_instances(&cov), 2);
        let cat = Concept::atomic(Label::atom("Cat"));
        let narrower = cache.get_instances(&cat, &cov);
        assert!(narrower.hits().iter().all(|h| cov.hits().contains(h)));
        let none = cache.get_instances(&Concept::atomic(Label::atom("Dog")), &cov);
        assert!(none.is_empty());
    }

    #[test]
    fn test_oracle_fallback_for_negation() {
        let kb = twins();
        let config = LearnerConfig::el();
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        // without negation the expansions carry no negated labels
        let structural = InstanceCache::build(&kb, &h, &config);
        let not_dog = Concept::atomic(Label::not("Dog"));
        assert!(structural.get_all_instances(&not_dog).is_empty());

        let with_oracle = InstanceCache::build(&kb, &h, &config).with_oracle(&kb);
        let cov = with_oracle.get_all_instances(&not_dog);
        assert_eq!(
            with_oracle.individuals(&cov),
            [IndividualId::new("a"), IndividualId::new("b")].into_iter().collect()
        );
        let cats: BTreeSet<IndividualId> = [IndividualId::new("a")].into_iter().collect();
        assert_eq!(with_oracle.count_intersection(&cov, &cats), 1);
    }

    #[test]
    fn test_empty_cache() {
        let cache = InstanceCache::from_expansions(Vec::new());
        assert!(cache.all().is_empty());
        assert_eq!(cache.count_all_instances(&cache.get_all_instances(&Concept::top())), 0);
    }
}
