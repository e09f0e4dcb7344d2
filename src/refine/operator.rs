//! Downward refinement operator over concept trees

use crate::concept::{Concept, NodeId};
use crate::core::LearnerConfig;
use crate::ontology::{Hierarchy, Label, RoleId};
use crate::Result;
use std::collections::HashSet;

/// Produces the one-step specialisations of a concept.
///
/// Every refinement is a fresh clone of the input with exactly one node
/// changed; the input itself is never touched. Node positions are stable
/// across clones, so a position found in the input addresses the same
/// node in every refinement.
#[derive(Clone, Debug)]
pub struct RefinementOperator<'h> {
    pub(super) hierarchy: &'h Hierarchy,
    pub(super) config: LearnerConfig,
}

/// Refinements in generation order without arena duplicates
#[derive(Default)]
pub(super) struct Refinements {
    seen: HashSet<Concept>,
    out: Vec<Concept>,
}

impl Refinements {
    pub(super) fn push(&mut self, concept: Concept) {
        if self.seen.insert(concept.clone()) {
            self.out.push(concept);
        }
    }

    pub(super) fn into_vec(self) -> Vec<Concept> {
        self.out
    }
}

impl<'h> RefinementOperator<'h> {
    /// Operator over a hierarchy built with the same configuration
    pub fn new(hierarchy: &'h Hierarchy, config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(RefinementOperator { hierarchy, config })
    }

    /// The hierarchy the operator reads
    pub fn hierarchy(&self) -> &'h Hierarchy {
        self.hierarchy
    }

    /// The active configuration
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Change the length budget, e.g. before resuming a search
    pub fn set_max_concept_length(&mut self, max_concept_length: usize) {
        self.config.max_concept_length = max_concept_length;
    }

    fn within_budget(&self, concept: &Concept) -> bool {
        concept.budget_length() <= self.config.max_concept_length
            && concept.depth() <= self.config.max_role_depth
    }

    /// All one-step refinements of `current` within the length budget;
    /// empty when `current` itself exceeds a budget
    pub fn refine(&self, current: &Concept) -> Vec<Concept> {
        if !self.within_budget(current) {
            return Vec::new();
        }
        let mut refinements = Refinements::default();
        for id in current.traverse() {
            self.refine_node(current, id, &mut refinements);
        }
        let mut out = refinements.into_vec();
        out.retain(|c| self.within_budget(c));
        out
    }

    /// One-label concepts for every atomic class
    pub fn atomic_nodes(&self) -> Vec<Concept> {
        self.hierarchy
            .classes()
            .iter()
            .map(|c| Concept::atomic(Label::Atom(c.clone())))
            .collect()
    }

    fn refine_node(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        let length = current.budget_length();
        let max_length = self.config.max_concept_length;
        self.refine_labels(current, id, out);

        let room_for_edge = length + 2 <= max_length;
        let room_for_depth = current.node_depth(id) < self.config.max_role_depth;
        if room_for_edge && room_for_depth {
            for role in self.hierarchy.roles() {
                if !self.config.check_redundancy || !self.is_redundant_existential(role, current, id) {
                    out.push(self.restriction(current, id, role, false));
                }
            }
            if self.config.use_universal_restriction {
                for role in self.hierarchy.roles() {
                    out.push(self.restriction(current, id, role, true));
                }
            }
        }

        if self.config.use_data_properties {
            self.refine_data_values(current, id, out);
            if room_for_edge {
                self.add_data_restrictions(current, id, out);
            }
        }
    }

    fn restriction(&self, current: &Concept, id: NodeId, role: &RoleId, universal: bool) -> Concept {
        let mut extension = current.clone();
        extension.push_restriction(id, role.clone(), universal);
        extension
    }

    fn refine_labels(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        if current.node(id).has_no_labels() {
            self.refine_labels_empty(current, id, out);
        } else {
            self.specialise_labels(current, id, out);
            if current.budget_length() + 2 <= self.config.max_concept_length {
                self.extend_labels(current, id, out);
            }
        }
    }

    /// Conjoin a most general label to a labelled node
    fn extend_labels(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        let node = current.node(id);
        for label in self.hierarchy.top_level() {
            if node.conjuncts().contains(label) {
                continue;
            }
            if self.config.check_redundancy && self.is_redundant_for_addition(label, current, id, true) {
                continue;
            }
            let mut extension = current.clone();
            extension.conjuncts_mut(id).insert(label.clone());
            out.push(extension);
        }
    }

    /// Replace each label by its direct specialisations
    fn specialise_labels(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        let node = current.node(id);
        for label in node.conjuncts() {
            for sub in self.hierarchy.specialisations(label) {
                if self.config.check_redundancy
                    && self.is_redundant_for_specialisation(sub, current, id, Some(label))
                {
                    continue;
                }
                let mut extension = current.clone();
                let conjuncts = extension.conjuncts_mut(id);
                conjuncts.remove(label);
                conjuncts.insert(sub.clone());
                out.push(extension);
            }
        }
        for label in node.disjuncts() {
            if self.hierarchy.specialisations(label).is_empty() {
                if let Some(extension) = self.drop_disjunct(label, current, id) {
                    out.push(extension);
                }
            } else {
                self.replace_disjunct(label, current, id, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Edge;
    use crate::ontology::{ClassId, FactBase};

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

    fn operator_for<'h>(h: &'h Hierarchy, config: LearnerConfig) -> RefinementOperator<'h> {
        RefinementOperator::new(h, config).unwrap()
    }

    #[test]
    fn test_refining_top() {
        let kb = zoo();
        let config = LearnerConfig::el().with_min_support(1).with_max_concept_length(3);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config);
        let refinements = op.refine(&Concept::top());
        let shown: Vec<String> = refinements.iter().map(|c| c.to_string()).collect();
        assert!(shown.contains(&"Animal".to_string()));
        assert!(shown.contains(&"Plant".to_string()));
        assert!(shown.contains(&"∃eats.⊤".to_string()));
        assert!(shown.contains(&"∃grows.⊤".to_string()));
        // no disjunctions in EL
        assert!(refinements.iter().all(|c| c.node(0).disjuncts().is_empty()));
    }

    #[test]
    fn test_specialisation_replaces_the_label() {
        let kb = zoo();
        let config = LearnerConfig::el().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config);
        let animal = Concept::atomic(Label::atom("Animal"));
        let refinements = op.refine(&animal);
        let shown: Vec<String> = refinements.iter().map(|c| c.to_string()).collect();
        assert!(shown.contains(&"Cat".to_string()));
        assert!(shown.contains(&"Dog".to_string()));
        assert!(!shown.iter().any(|s| s.contains("Animal ⊓ Cat")));
        // Animal ⊓ Plant is disjoint
        assert!(!shown.iter().any(|s| s.contains("Plant")));
        assert!(refinements.iter().all(|c| !c.is_isomorphic(&animal)));
    }

    #[test]
    fn test_root_support_prunes_specialisation() {
        let mut kb = zoo();
        kb.add_subclass("Kitten", "Cat").assert_class("tiny", "Kitten");
        let config = LearnerConfig::el().with_min_support(2);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config);
        let refinements = op.refine(&Concept::atomic(Label::atom("Cat")));
        assert!(!refinements.iter().any(|c| c.mentions(&ClassId::new("Kitten"))));
        // below the root the support check does not apply
        let nested = Concept::top().with_exists(RoleId::new("grows"), &Concept::atomic(Label::atom("Cat")));
        let refinements = op.refine(&nested);
        assert!(refinements.iter().any(|c| c.mentions(&ClassId::new("Kitten"))));
    }

    #[test]
    fn test_budgets() {
        let kb = zoo();
        let config = LearnerConfig::el().with_min_support(1).with_max_concept_length(2);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config.clone());
        for c in op.refine(&Concept::top()) {
            assert!(c.budget_length() <= 2);
            for r in op.refine(&c) {
                assert!(r.budget_length() <= 2);
                assert!(r.depth() <= config.max_role_depth);
            }
        }
        let long = Concept::atomic(Label::atom("Cat"))
            .with_label(Label::atom("Dog"))
            .with_label(Label::atom("Plant"));
        assert!(op.refine(&long).is_empty());

        let shallow = LearnerConfig::el().with_min_support(1).with_max_role_depth(0);
        let h = Hierarchy::build(&kb, &kb, None, &shallow).unwrap();
        let op = operator_for(&h, shallow);
        assert!(op
            .refine(&Concept::top())
            .iter()
            .all(|c| c.node(0).edges().iter().all(|e| !matches!(e, Edge::Exists { .. }))));
    }

    #[test]
    fn test_existential_domain_redundancy() {
        let kb = zoo();
        let config = LearnerConfig::el().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config);
        let plant = Concept::atomic(Label::atom("Plant"));
        let shown: Vec<String> = op.refine(&plant).iter().map(|c| c.to_string()).collect();
        assert!(!shown.contains(&"Plant ⊓ ∃eats.⊤".to_string()));
        assert!(shown.contains(&"Plant ⊓ ∃grows.⊤".to_string()));
    }

    #[test]
    fn test_input_is_untouched() {
        let kb = zoo();
        let config = LearnerConfig::alc().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config);
        let c = Concept::atomic(Label::atom("Animal")).with_exists(RoleId::new("eats"), &Concept::top());
        let before = c.clone();
        let _ = op.refine(&c);
        assert_eq!(c, before);
    }

    #[test]
    fn test_atomic_nodes() {
        let kb = zoo();
        let config = LearnerConfig::el();
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = operator_for(&h, config);
        assert_eq!(op.atomic_nodes().len(), 4);
    }
}
