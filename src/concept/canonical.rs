//! Order-independent canonical forms for concept and expansion trees

use super::node::{Comparison, Concept, Edge, NodeId, Threshold};
use crate::ontology::{DataPropertyId, Label, RoleId};
use serde::{Deserialize, Serialize};

/// Canonical edge of a [`CanonicalForm`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalEdge {
    /// Existential edge with canonical filler
    Exists(RoleId, CanonicalForm),
    /// Universal edge with canonical filler
    Forall(RoleId, CanonicalForm),
    /// Data restriction bound
    Data(DataPropertyId, Comparison, Threshold),
    /// Observed literal value (expansions only)
    Value(DataPropertyId, Threshold),
}

/// Structural identity of a tree: sorted labels and recursively sorted,
/// deduplicated edges. Two trees have equal forms iff they are isomorphic
/// up to label-set equality and edge/filler equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalForm {
    /// Sorted conjuncts (or expansion labels)
    pub conjuncts: Vec<Label>,
    /// Sorted disjuncts
    pub disjuncts: Vec<Label>,
    /// Sorted, deduplicated edges
    pub edges: Vec<CanonicalEdge>,
}

impl CanonicalForm {
    /// Assemble a form from parts in any order
    pub fn from_parts(
        conjuncts: impl IntoIterator<Item = Label>,
        disjuncts: impl IntoIterator<Item = Label>,
        edges: impl IntoIterator<Item = CanonicalEdge>,
    ) -> Self {
        let mut conjuncts: Vec<Label> = conjuncts.into_iter().collect();
        conjuncts.sort();
        conjuncts.dedup();
        let mut disjuncts: Vec<Label> = disjuncts.into_iter().collect();
        disjuncts.sort();
        disjuncts.dedup();
        let mut edges: Vec<CanonicalEdge> = edges.into_iter().collect();
        edges.sort();
        edges.dedup();
        CanonicalForm {
            conjuncts,
            disjuncts,
            edges,
        }
    }

    /// Number of nodes in the described tree
    pub fn size(&self) -> usize {
        1 + self
            .edges
            .iter()
            .map(|e| match e {
                CanonicalEdge::Exists(_, f) | CanonicalEdge::Forall(_, f) => f.size(),
                _ => 0,
            })
            .sum::<usize>()
    }

    /// Rebuild a concept whose arena follows canonical order
    pub fn to_concept(&self) -> Concept {
        let mut concept = Concept::top();
        fill(&mut concept, 0, self);
        concept
    }
}

fn fill(concept: &mut Concept, id: NodeId, form: &CanonicalForm) {
    concept.conjuncts_mut(id).extend(form.conjuncts.iter().cloned());
    concept.disjuncts_mut(id).extend(form.disjuncts.iter().cloned());
    for edge in &form.edges {
        match edge {
            CanonicalEdge::Exists(role, filler) => {
                let child = concept.push_restriction(id, role.clone(), false);
                fill(concept, child, filler);
            }
            CanonicalEdge::Forall(role, filler) => {
                let child = concept.push_restriction(id, role.clone(), true);
                fill(concept, child, filler);
            }
            CanonicalEdge::Data(property, comparison, value) => {
                concept.push_data(id, property.clone(), *comparison, *value);
            }
            CanonicalEdge::Value(..) => {}
        }
    }
}

impl Concept {
    /// Canonical form of the whole concept
    pub fn canonical_form(&self) -> CanonicalForm {
        self.canonical_form_at(self.root())
    }

    /// Canonical form of the subtree rooted at `id`
    pub fn canonical_form_at(&self, id: NodeId) -> CanonicalForm {
        let node = self.node(id);
        let edges = node.edges().iter().map(|edge| match edge {
            Edge::Exists { role, target } => {
                CanonicalEdge::Exists(role.clone(), self.canonical_form_at(*target))
            }
            Edge::Forall { role, target } => {
                CanonicalEdge::Forall(role.clone(), self.canonical_form_at(*target))
            }
            Edge::Data {
                property,
                comparison,
                value,
            } => CanonicalEdge::Data(property.clone(), *comparison, *value),
        });
        CanonicalForm::from_parts(
            node.conjuncts().iter().cloned(),
            node.disjuncts().iter().cloned(),
            edges.collect::<Vec<_>>(),
        )
    }

    /// Structurally equal concept laid out in canonical order
    pub fn normalized(&self) -> Concept {
        self.canonical_form().to_concept()
    }

    /// Structural equality
    pub fn is_isomorphic(&self, other: &Concept) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(ids: std::collections::BTreeSet<usize>) -> Concept {
        ids.into_iter()
            .fold(Concept::top(), |c, i| c.with_label(Label::atom(format!("A{}", i))))
    }

    fn arb_concept() -> impl Strategy<Value = Concept> {
        let leaf = prop::collection::btree_set(0..4usize, 0..3).prop_map(labels);
        leaf.prop_recursive(3, 16, 3, |inner| {
            (
                prop::collection::btree_set(0..4usize, 0..2),
                prop::collection::vec((0..2usize, any::<bool>(), inner), 0..3),
            )
                .prop_map(|(ids, edges)| {
                    edges.into_iter().fold(labels(ids), |c, (role, universal, filler)| {
                        let role = RoleId::new(format!("r{}", role));
                        if universal {
                            c.with_forall(role, &filler)
                        } else {
                            c.with_exists(role, &filler)
                        }
                    })
                })
        })
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(c in arb_concept()) {
            let once = c.normalized();
            prop_assert_eq!(once.normalized(), once.clone());
            prop_assert!(once.is_isomorphic(&c));
            prop_assert!(once.length() <= c.length());
            prop_assert_eq!(once.depth(), c.depth());
        }
    }

    fn r() -> RoleId {
        RoleId::new("r")
    }

    #[test]
    fn test_order_independence() {
        let b = Concept::atomic(Label::atom("B"));
        let c = Concept::atomic(Label::atom("C"));
        let x = Concept::atomic(Label::atom("A"))
            .with_exists(r(), &b)
            .with_exists(r(), &c);
        let y = Concept::top()
            .with_exists(r(), &c)
            .with_label(Label::atom("A"))
            .with_exists(r(), &b);
        assert_ne!(x, y);
        assert!(x.is_isomorphic(&y));
        assert_eq!(x.canonical_form(), y.canonical_form());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inner = Concept::atomic(Label::atom("B")).with_data(
            DataPropertyId::new("p"),
            Comparison::AtMost,
            3.0,
        );
        let x = Concept::top()
            .with_forall(r(), &inner)
            .with_disjunction([Label::atom("D"), Label::not("E")])
            .with_exists(RoleId::new("s"), &Concept::top());
        let once = x.normalized();
        let twice = once.normalized();
        assert_eq!(once, twice);
        assert_eq!(once.canonical_form(), x.canonical_form());
        assert_eq!(once.length(), x.length());
        assert_eq!(x.canonical_form().size(), x.size());
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let b = Concept::atomic(Label::atom("B"));
        let x = Concept::top().with_exists(r(), &b).with_exists(r(), &b);
        let y = Concept::top().with_exists(r(), &b);
        assert_eq!(x.canonical_form(), y.canonical_form());
    }
}
