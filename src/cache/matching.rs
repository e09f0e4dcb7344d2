//! Homomorphism test of a concept tree into an expansion

use super::expansion::Expansion;
use crate::concept::{Concept, Edge, NodeId};
use crate::ontology::RoleId;

/// Whether `concept` embeds into `expansion` at the root.
///
/// Sound for every constructor: a positive answer means each individual
/// with this expansion is an instance. Negative answers are only complete
/// for conjunctions, existential and data restrictions over told labels.
pub fn matches(concept: &Concept, expansion: &Expansion) -> bool {
    match_node(concept, concept.root(), expansion)
}

fn match_node(concept: &Concept, id: NodeId, expansion: &Expansion) -> bool {
    let node = concept.node(id);
    if !node.conjuncts().is_subset(&expansion.labels) {
        return false;
    }
    if !node.disjuncts().is_empty() && node.disjuncts().is_disjoint(&expansion.labels) {
        return false;
    }
    node.edges().iter().all(|edge| match edge {
        Edge::Exists { role, target } => expansion
            .successors(role)
            .any(|child| match_node(concept, *target, child)),
        Edge::Forall { role, target } => match_universal(concept, *target, expansion, role),
        Edge::Data {
            property,
            comparison,
            value,
        } => expansion
            .data
            .get(property)
            .map_or(false, |values| values.iter().any(|v| comparison.admits(*v, *value))),
    })
}

fn match_universal(
    concept: &Concept,
    filler: NodeId,
    expansion: &Expansion,
    role: &RoleId,
) -> bool {
    let node = concept.node(filler);
    if node.is_top() {
        return true;
    }
    if !node.disjuncts().is_empty() || !node.edges().is_empty() {
        return false;
    }
    let forced = expansion.only_labels(role);
    !forced.is_empty() && node.conjuncts().iter().all(|l| forced.contains(l))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::expansion::{ExpansionEdge, Quantifier};
    use crate::concept::{Comparison, Threshold};
    use crate::ontology::{DataPropertyId, Label, RoleId};

    fn sample() -> Expansion {
        let mut child = Expansion::leaf([Label::atom("B"), Label::atom("C")].into_iter().collect(), 1);
        child
            .data
            .insert(DataPropertyId::new("age"), [Threshold::new(30.0)].into_iter().collect());
        let mut root = Expansion::leaf([Label::atom("A"), Label::not("D")].into_iter().collect(), 0);
        root.edges.push(ExpansionEdge {
            kind: Quantifier::Some,
            role: RoleId::new("r"),
            target: child,
        });
        root.edges.push(ExpansionEdge {
            kind: Quantifier::Only,
            role: RoleId::new("r"),
            target: Expansion::leaf([Label::atom("B")].into_iter().collect(), 1),
        });
        root
    }

    #[test]
    fn test_top_matches_everything() {
        assert!(matches(&Concept::top(), &sample()));
        assert!(matches(&Concept::top(), &Expansion::default()));
    }

    #[test]
    fn test_labels_and_existentials() {
        let e = sample();
        let r = RoleId::new("r");
        let b = Concept::atomic(Label::atom("B"));
        assert!(matches(&Concept::atomic(Label::atom("A")).with_exists(r.clone(), &b), &e));
        assert!(!matches(&Concept::atomic(Label::atom("B")), &e));
        assert!(!matches(&Concept::top().with_exists(RoleId::new("s"), &Concept::top()), &e));
        assert!(matches(&Concept::atomic(Label::not("D")), &e));
        assert!(!matches(&Concept::atomic(Label::not("A")), &e));
    }

    #[test]
    fn test_disjunction_universal_and_data() {
        let e = sample();
        let r = RoleId::new("r");
        assert!(matches(&Concept::top().with_disjunction([Label::atom("A"), Label::atom("Z")]), &e));
        assert!(!matches(&Concept::top().with_disjunction([Label::atom("Y"), Label::atom("Z")]), &e));

        let b = Concept::atomic(Label::atom("B"));
        let c = Concept::atomic(Label::atom("C"));
        assert!(matches(&Concept::top().with_forall(r.clone(), &b), &e));
        // C holds for the only successor but is not forced on all of them
        assert!(!matches(&Concept::top().with_forall(r.clone(), &c), &e));
        assert!(matches(&Concept::top().with_forall(RoleId::new("s"), &Concept::top()), &e));

        let age = DataPropertyId::new("age");
        let old = Concept::top().with_data(age.clone(), Comparison::AtLeast, 30.0);
        let young = Concept::top().with_data(age, Comparison::AtMost, 20.0);
        assert!(matches(&Concept::top().with_exists(r.clone(), &old), &e));
        assert!(!matches(&Concept::top().with_exists(r, &young), &e));
    }
}
