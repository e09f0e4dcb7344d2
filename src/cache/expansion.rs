//! Bounded-depth unfoldings of individuals over the ABox graph

use crate::concept::{CanonicalEdge, CanonicalForm, Threshold};
use crate::core::LearnerConfig;
use crate::ontology::{AssertionSource, DataPropertyId, Hierarchy, IndividualId, Label, RoleId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// Kind of an expansion edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quantifier {
    /// A role assertion to an actual successor
    Some,
    /// Labels every successor must carry (from ranges and universal axioms)
    Only,
}

/// Edge of an [`Expansion`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpansionEdge {
    /// Edge kind
    pub kind: Quantifier,
    /// Role
    pub role: RoleId,
    /// Child expansion
    pub target: Expansion,
}

/// Local structure of one individual unfolded to a fixed depth
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    /// Originating individual; only set on roots
    pub individual: Option<IndividualId>,
    /// Materialised labels
    pub labels: BTreeSet<Label>,
    /// Distance from the root
    pub depth: usize,
    /// Observed data values
    pub data: BTreeMap<DataPropertyId, BTreeSet<Threshold>>,
    /// Outgoing edges
    pub edges: Vec<ExpansionEdge>,
}

impl Expansion {
    /// Leaf expansion at a given depth
    pub fn leaf(labels: BTreeSet<Label>, depth: usize) -> Self {
        Expansion {
            labels,
            depth,
            ..Expansion::default()
        }
    }

    /// Order-independent structural key; the originating individual is
    /// not part of it
    pub fn canonical_form(&self) -> CanonicalForm {
        let edges = self
            .edges
            .iter()
            .map(|e| match e.kind {
                Quantifier::Some => CanonicalEdge::Exists(e.role.clone(), e.target.canonical_form()),
                Quantifier::Only => CanonicalEdge::Forall(e.role.clone(), e.target.canonical_form()),
            })
            .chain(self.data.iter().flat_map(|(p, values)| {
                values.iter().map(move |v| CanonicalEdge::Value(p.clone(), *v))
            }))
            .collect::<Vec<_>>();
        CanonicalForm::from_parts(self.labels.iter().cloned(), std::iter::empty(), edges)
    }

    /// Same expansion with children recursively normalised, sorted by
    /// canonical form and deduplicated
    pub fn normalized(&self) -> Expansion {
        let mut keyed: Vec<(Quantifier, RoleId, CanonicalForm, Expansion)> = self
            .edges
            .iter()
            .map(|e| {
                let child = e.target.normalized();
                (e.kind, e.role.clone(), child.canonical_form(), child)
            })
            .collect();
        keyed.sort_by(|a, b| (a.0, &a.1, &a.2).cmp(&(b.0, &b.1, &b.2)));
        keyed.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1 && a.2 == b.2);
        Expansion {
            individual: self.individual.clone(),
            labels: self.labels.clone(),
            depth: self.depth,
            data: self.data.clone(),
            edges: keyed
                .into_iter()
                .map(|(kind, role, _, target)| ExpansionEdge { kind, role, target })
                .collect(),
        }
    }

    /// Labels every `role`-successor must carry
    pub fn only_labels(&self, role: &RoleId) -> BTreeSet<&Label> {
        self.edges
            .iter()
            .filter(|e| e.kind == Quantifier::Only && &e.role == role)
            .flat_map(|e| e.target.labels.iter())
            .collect()
    }

    /// Actual `role`-successors
    pub fn successors<'a>(&'a self, role: &'a RoleId) -> impl Iterator<Item = &'a Expansion> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.kind == Quantifier::Some && &e.role == role)
            .map(|e| &e.target)
    }

    /// Number of nodes
    pub fn size(&self) -> usize {
        1 + self.edges.iter().map(|e| e.target.size()).sum::<usize>()
    }
}

/// Materialised ABox: one node per individual with its closed labels,
/// role assertions as edges, plus per-role universal label sets
struct AboxGraph {
    graph: DiGraph<IndividualId, RoleId>,
    index: BTreeMap<IndividualId, NodeIndex>,
    labels: BTreeMap<IndividualId, BTreeSet<Label>>,
    only: BTreeMap<IndividualId, BTreeMap<RoleId, BTreeSet<Label>>>,
    data: BTreeMap<IndividualId, BTreeMap<DataPropertyId, BTreeSet<Threshold>>>,
}

impl AboxGraph {
    fn build(
        individuals: &BTreeSet<IndividualId>,
        assertions: &dyn AssertionSource,
        hierarchy: &Hierarchy,
        config: &LearnerConfig,
    ) -> Self {
        let mut graph = DiGraph::new();
        let index: BTreeMap<IndividualId, NodeIndex> = individuals
            .iter()
            .map(|i| (i.clone(), graph.add_node(i.clone())))
            .collect();

        let mut successors: BTreeMap<IndividualId, Vec<(RoleId, IndividualId)>> = BTreeMap::new();
        for subject in individuals {
            let asserted: Vec<(RoleId, IndividualId)> = assertions
                .role_assertions(subject)
                .into_iter()
                .filter(|(_, object)| index.contains_key(object))
                .collect();
            for (role, object) in &asserted {
                graph.add_edge(index[subject], index[object], role.clone());
            }
            successors.insert(subject.clone(), asserted);
        }

        let labels = hierarchy.materialise_labels(individuals, assertions);

        let universals = assertions.universal_restrictions();
        let mut only: BTreeMap<IndividualId, BTreeMap<RoleId, BTreeSet<Label>>> = BTreeMap::new();
        if config.use_universal_restriction {
            for (subject, asserted) in &successors {
                let roles: BTreeSet<&RoleId> = asserted.iter().map(|(r, _)| r).collect();
                for role in roles {
                    let mut forced: BTreeSet<Label> = hierarchy
                        .range(role)
                        .into_iter()
                        .flatten()
                        .cloned()
                        .map(Label::Atom)
                        .collect();
                    let subject_labels = &labels[subject];
                    for axiom in universals.iter().filter(|a| &a.role == role) {
                        if subject_labels.contains(&Label::Atom(axiom.class.clone())) {
                            forced.insert(Label::Atom(axiom.filler.clone()));
                        }
                    }
                    if !forced.is_empty() {
                        only.entry(subject.clone())
                            .or_default()
                            .insert(role.clone(), hierarchy.upward_closure(&forced));
                    }
                }
            }
        }

        let mut data: BTreeMap<IndividualId, BTreeMap<DataPropertyId, BTreeSet<Threshold>>> = BTreeMap::new();
        if config.use_data_properties {
            let properties: Vec<DataPropertyId> = hierarchy.data_properties().cloned().collect();
            for individual in individuals {
                for property in &properties {
                    let values: BTreeSet<Threshold> = assertions
                        .data_property_values(individual, property)
                        .into_iter()
                        .filter(|v| v.is_finite())
                        .map(Threshold::new)
                        .collect();
                    if !values.is_empty() {
                        data.entry(individual.clone())
                            .or_default()
                            .insert(property.clone(), values);
                    }
                }
            }
        }

        AboxGraph {
            graph,
            index,
            labels,
            only,
            data,
        }
    }

    fn node(&self, individual: &IndividualId, depth: usize) -> Expansion {
        Expansion {
            individual: None,
            labels: self.labels.get(individual).cloned().unwrap_or_default(),
            depth,
            data: self.data.get(individual).cloned().unwrap_or_default(),
            edges: Vec::new(),
        }
    }

    /// Breadth-first unfolding of `root` up to `max_depth` role steps
    fn unfold(&self, root: &IndividualId, max_depth: usize) -> Expansion {
        // nodes are kept in a flat arena while unfolding, then assembled
        let mut arena: Vec<(Expansion, Vec<(Quantifier, RoleId, usize)>)> = Vec::new();
        arena.push((self.node(root, 0), Vec::new()));
        let mut queue: VecDeque<(usize, IndividualId)> = VecDeque::new();
        queue.push_back((0, root.clone()));
        while let Some((slot, individual)) = queue.pop_front() {
            let depth = arena[slot].0.depth;
            if depth >= max_depth {
                continue;
            }
            if let Some(&start) = self.index.get(&individual) {
                for edge in self.graph.edges(start) {
                    let object = self.graph[edge.target()].clone();
                    let child = arena.len();
                    arena.push((self.node(&object, depth + 1), Vec::new()));
                    arena[slot].1.push((Quantifier::Some, edge.weight().clone(), child));
                    queue.push_back((child, object));
                }
            }
            for (role, labels) in self.only.get(&individual).into_iter().flatten() {
                let child = arena.len();
                arena.push((Expansion::leaf(labels.clone(), depth + 1), Vec::new()));
                arena[slot].1.push((Quantifier::Only, role.clone(), child));
            }
        }
        let mut root_expansion = assemble(&mut arena, 0);
        root_expansion.individual = Some(root.clone());
        root_expansion
    }
}

fn assemble(arena: &mut Vec<(Expansion, Vec<(Quantifier, RoleId, usize)>)>, slot: usize) -> Expansion {
    let children = std::mem::take(&mut arena[slot].1);
    let mut expansion = std::mem::take(&mut arena[slot].0);
    for (kind, role, child) in children {
        let target = assemble(arena, child);
        expansion.edges.push(ExpansionEdge { kind, role, target });
    }
    expansion
}

/// One root expansion per individual, in individual order
pub fn build_expansions(
    individuals: &BTreeSet<IndividualId>,
    assertions: &dyn AssertionSource,
    hierarchy: &Hierarchy,
    config: &LearnerConfig,
) -> Vec<Expansion> {
    let abox = AboxGraph::build(individuals, assertions, hierarchy, config);
    let expansions: Vec<Expansion> = individuals
        .iter()
        .map(|i| abox.unfold(i, config.max_role_depth))
        .collect();
    debug!(expansions = expansions.len(), "expansions built");
    expansions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::FactBase;

    fn kb() -> FactBase {
        let mut kb = FactBase::new();
        kb.add_subclass("Cat", "Animal")
            .add_range("owns", "Animal")
            .add_universal("Breeder", "owns", "Cat")
            .assert_class("ann", "Breeder")
            .assert_role("ann", "owns", "tom")
            .assert_role("tom", "likes", "ann")
            .assert_data("tom", "weight", 4.0)
            .add_individual("ghost");
        kb
    }

    fn expansions(config: &LearnerConfig) -> Vec<Expansion> {
        let kb = kb();
        let h = Hierarchy::build(&kb, &kb, None, config).unwrap();
        build_expansions(&kb.individuals(), &kb, &h, config)
    }

    #[test]
    fn test_unfolding_is_depth_bounded() {
        let config = LearnerConfig::alc().with_max_role_depth(2);
        let all = expansions(&config);
        let ann = all.iter().find(|e| e.individual == Some(IndividualId::new("ann"))).unwrap();
        let owns = RoleId::new("owns");
        let tom = ann.successors(&owns).next().unwrap();
        // range closure reaches the successor
        assert!(tom.labels.contains(&Label::atom("Animal")));
        assert_eq!(tom.depth, 1);
        let likes = RoleId::new("likes");
        let back = tom.successors(&likes).next().unwrap();
        assert_eq!(back.depth, 2);
        assert!(back.edges.is_empty());

        let only = ann.only_labels(&RoleId::new("owns"));
        assert!(only.contains(&Label::atom("Cat")));
        assert!(only.contains(&Label::atom("Animal")));

        assert!(tom.data.contains_key(&DataPropertyId::new("weight")));
    }

    #[test]
    fn test_individual_without_assertions() {
        let all = expansions(&LearnerConfig::alc());
        let ghost = all.iter().find(|e| e.individual == Some(IndividualId::new("ghost"))).unwrap();
        assert!(ghost.labels.is_empty());
        assert!(ghost.edges.is_empty());
        assert_eq!(ghost.size(), 1);
    }

    #[test]
    fn test_zero_depth_has_no_edges() {
        let config = LearnerConfig::alc().with_max_role_depth(0);
        assert!(expansions(&config).iter().all(|e| e.edges.is_empty()));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let all = expansions(&LearnerConfig::alc());
        for e in &all {
            let once = e.normalized();
            assert_eq!(once.normalized(), once);
            assert_eq!(once.canonical_form(), e.canonical_form());
        }
    }
}
