//! Hierarchy-based redundancy predicates

use super::operator::RefinementOperator;
use crate::concept::{Concept, Edge, NodeId};
use crate::ontology::{ClassId, Label, RoleId};

impl RefinementOperator<'_> {
    /// `label` repeats, generalises, specialises or negates one of `labels`
    pub(super) fn is_redundant_with_labels<'a>(
        &self,
        label: &Label,
        labels: impl IntoIterator<Item = &'a Label>,
    ) -> bool {
        labels
            .into_iter()
            .any(|other| self.hierarchy.are_related(label, other) || *other == label.complement())
    }

    fn is_disjoint_with_labels<'a>(&self, label: &Label, labels: impl IntoIterator<Item = &'a Label>) -> bool {
        labels
            .into_iter()
            .any(|other| self.hierarchy.are_disjoint(label, other))
    }

    /// Domains of the roles and data properties leaving `id`
    fn outgoing_domains(&self, concept: &Concept, id: NodeId) -> Vec<&ClassId> {
        concept
            .node(id)
            .edges()
            .iter()
            .flat_map(|edge| match edge {
                Edge::Exists { role, .. } | Edge::Forall { role, .. } => {
                    self.hierarchy.domain(role).into_iter().flatten().collect::<Vec<_>>()
                }
                Edge::Data { property, .. } => self
                    .hierarchy
                    .data_domain(property)
                    .into_iter()
                    .flatten()
                    .collect(),
            })
            .collect()
    }

    /// Range of the role leading into `id`
    fn incoming_range(&self, concept: &Concept, id: NodeId) -> Vec<&ClassId> {
        concept
            .incoming_role(id)
            .and_then(|role| self.hierarchy.range(role))
            .into_iter()
            .flatten()
            .collect()
    }

    fn is_insufficient_at_root(&self, label: &Label, concept: &Concept, id: NodeId) -> bool {
        id == concept.root() && self.hierarchy.support(label) < self.config.min_support
    }

    /// Whether `label` may not replace `replaced` (or be placed on an empty
    /// node when `replaced` is `None`)
    pub(super) fn is_redundant_for_specialisation(
        &self,
        label: &Label,
        concept: &Concept,
        id: NodeId,
        replaced: Option<&Label>,
    ) -> bool {
        let others = concept
            .node(id)
            .conjuncts()
            .iter()
            .filter(|l| Some(*l) != replaced);
        self.is_disjoint_with_labels(label, others)
            || self.is_insufficient_at_root(label, concept, id)
            || self.hierarchy.disjoint_with_any(label, self.outgoing_domains(concept, id))
            || self.hierarchy.disjoint_with_any(label, self.incoming_range(concept, id))
    }

    /// Whether `label` may not be conjoined to the node; disjuncts are
    /// considered only when `with_disjuncts` is set
    pub(super) fn is_redundant_for_addition(
        &self,
        label: &Label,
        concept: &Concept,
        id: NodeId,
        with_disjuncts: bool,
    ) -> bool {
        let node = concept.node(id);
        let redundant = if with_disjuncts {
            self.is_redundant_with_labels(label, node.conjuncts().iter().chain(node.disjuncts()))
        } else {
            self.is_redundant_with_labels(label, node.conjuncts())
        };
        redundant || self.is_redundant_for_specialisation(label, concept, id, None)
    }

    /// Whether `∃role` cannot apply to the node's labels
    pub(super) fn is_redundant_existential(&self, role: &RoleId, concept: &Concept, id: NodeId) -> bool {
        let conjuncts = concept.node(id).conjuncts();
        self.hierarchy
            .domain(role)
            .into_iter()
            .flatten()
            .any(|d| self.is_disjoint_with_labels(&Label::Atom(d.clone()), conjuncts))
    }

    /// `label` follows from a role domain or range around the node
    fn is_implied_by_roles(&self, label: &Label, concept: &Concept, id: NodeId) -> bool {
        self.outgoing_domains(concept, id)
            .into_iter()
            .chain(self.incoming_range(concept, id))
            .any(|c| self.hierarchy.is_subsumed_by(&Label::Atom(c.clone()), label))
    }

    fn is_redundant_conjunct(&self, label: &Label, concept: &Concept, id: NodeId) -> bool {
        let node = concept.node(id);
        let others = node.conjuncts().iter().filter(|l| *l != label);
        self.is_redundant_for_specialisation(label, concept, id, Some(label))
            || self.is_redundant_with_labels(label, others.chain(node.disjuncts()))
            || self.is_implied_by_roles(label, concept, id)
    }

    fn is_redundant_disjunct(&self, label: &Label, concept: &Concept, id: NodeId) -> bool {
        let others = concept.node(id).disjuncts().iter().filter(|l| *l != label);
        self.is_redundant_with_labels(label, others)
    }

    /// Whether some label of the concept is implied by, or clashes with,
    /// the rest of its node
    pub fn is_redundant_concept(&self, concept: &Concept) -> bool {
        concept.traverse().into_iter().any(|id| {
            let node = concept.node(id);
            node.conjuncts()
                .iter()
                .any(|l| self.is_redundant_conjunct(l, concept, id))
                || node
                    .disjuncts()
                    .iter()
                    .any(|l| self.is_redundant_disjunct(l, concept, id))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::concept::Concept;
    use crate::core::LearnerConfig;
    use crate::ontology::{FactBase, Hierarchy, Label, RoleId};
    use crate::refine::RefinementOperator;

    fn kb() -> FactBase {
        let mut kb = FactBase::new();
        kb.add_subclass("Cat", "Animal")
            .add_class("Rock")
            .add_disjoint("Animal", "Rock")
            .add_range("owns", "Animal")
            .assert_class("tom", "Cat")
            .assert_class("stone", "Rock");
        kb
    }

    #[test]
    fn test_redundant_concepts() {
        let kb = kb();
        let config = LearnerConfig::alc().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = RefinementOperator::new(&h, config).unwrap();

        let cat = Concept::atomic(Label::atom("Cat"));
        assert!(!op.is_redundant_concept(&cat));
        assert!(op.is_redundant_concept(&cat.clone().with_label(Label::atom("Animal"))));
        assert!(op.is_redundant_concept(&cat.clone().with_label(Label::atom("Rock"))));
        assert!(op.is_redundant_concept(&cat.clone().with_label(Label::not("Cat"))));
        assert!(op.is_redundant_concept(
            &Concept::top().with_disjunction([Label::atom("Cat"), Label::atom("Animal")])
        ));
        assert!(!op.is_redundant_concept(
            &Concept::top().with_disjunction([Label::atom("Cat"), Label::atom("Rock")])
        ));
        // the range of owns already forces Animal
        let owns = RoleId::new("owns");
        assert!(op.is_redundant_concept(&Concept::top().with_exists(owns.clone(), &Concept::atomic(Label::atom("Animal")))));
        assert!(!op.is_redundant_concept(&Concept::top().with_exists(owns, &cat)));
    }

    #[test]
    fn test_support_counts_only_at_root() {
        let kb = kb();
        let config = LearnerConfig::el().with_min_support(2);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = RefinementOperator::new(&h, config).unwrap();
        assert!(op.is_redundant_concept(&Concept::atomic(Label::atom("Cat"))));
        let nested = Concept::top().with_exists(RoleId::new("likes"), &Concept::atomic(Label::atom("Cat")));
        assert!(!op.is_redundant_concept(&nested));
    }
}
