//! Label sets for empty nodes and disjunct replacement

use super::operator::{RefinementOperator, Refinements};
use crate::concept::{Concept, NodeId};
use crate::ontology::Label;
use std::collections::BTreeSet;

/// Length of a label group once placed in a disjunction
fn group_length(labels: &BTreeSet<Label>) -> usize {
    labels.iter().map(Label::length).sum::<usize>() + labels.len().saturating_sub(1)
}

impl RefinementOperator<'_> {
    /// Candidate label groups drawn from `candidates` that fit into
    /// `length_to_fill`: single atoms first, then single negations, then
    /// disjunctive combinations when enabled
    pub(super) fn generate_disjunctions(&self, candidates: &[Label], length_to_fill: usize) -> Vec<BTreeSet<Label>> {
        let mut groups: BTreeSet<BTreeSet<Label>> = BTreeSet::new();
        if length_to_fill == 0 {
            return Vec::new();
        }
        for label in candidates.iter().filter(|l| !l.is_negated()) {
            groups.insert(std::iter::once(label.clone()).collect());
        }
        if length_to_fill > 1 && self.config.use_negation {
            for label in candidates.iter().filter(|l| l.is_negated()) {
                groups.insert(std::iter::once(label.clone()).collect());
            }
        }
        if length_to_fill > 2 && self.config.use_disjunction {
            groups.extend(self.generate_combinations(candidates, length_to_fill));
        }
        groups.into_iter().collect()
    }

    /// Grow combinations one label at a time up to half the length,
    /// skipping related labels and labels without instances
    fn generate_combinations(&self, candidates: &[Label], length: usize) -> BTreeSet<BTreeSet<Label>> {
        let mut combinations: BTreeSet<BTreeSet<Label>> = candidates
            .iter()
            .map(|l| std::iter::once(l.clone()).collect())
            .collect();
        if candidates.len() <= 1 {
            return combinations;
        }
        let widest = (length + 1) / 2;
        for size in 2..=widest {
            let mut grown = BTreeSet::new();
            for combination in combinations.iter().filter(|c| c.len() == size - 1) {
                for label in candidates {
                    if combination.contains(label) {
                        continue;
                    }
                    if self.config.check_redundancy
                        && (self.is_redundant_with_labels(label, combination)
                            || self.hierarchy.support(label) == 0)
                    {
                        continue;
                    }
                    let mut next = combination.clone();
                    next.insert(label.clone());
                    if group_length(&next) <= length {
                        grown.insert(next);
                    }
                }
            }
            combinations.extend(grown);
        }
        combinations
    }

    /// Labels for a node without any: a single label or a disjunction of
    /// most general labels
    pub(super) fn refine_labels_empty(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        // an empty leaf stands for ⊤ and is replaced; next to edges a label
        // also pays for the conjunction
        let used = if current.node(id).is_top() {
            current.budget_length().saturating_sub(1)
        } else {
            current.budget_length() + 1
        };
        let length_to_fill = self.config.max_concept_length.saturating_sub(used);
        let groups = self.generate_disjunctions(self.hierarchy.top_level(), length_to_fill);
        self.extend_disjunctions(groups, current, id, out);
    }

    fn extend_disjunctions(&self, groups: Vec<BTreeSet<Label>>, current: &Concept, id: NodeId, out: &mut Refinements) {
        for group in groups {
            let mut extension = current.clone();
            if group.len() == 1 {
                let Some(label) = group.into_iter().next() else {
                    continue;
                };
                if self.config.check_redundancy
                    && self.is_redundant_for_specialisation(&label, &extension, id, None)
                {
                    continue;
                }
                extension.conjuncts_mut(id).insert(label);
            } else {
                extension.disjuncts_mut(id).extend(group);
            }
            extension.settle_disjunction(id);
            out.push(extension);
        }
    }

    /// Replace one disjunct by groups of its specialisations; the node
    /// stays a disjunction
    pub(super) fn replace_disjunct(&self, label: &Label, current: &Concept, id: NodeId, out: &mut Refinements) {
        let mut base = current.clone();
        base.disjuncts_mut(id).remove(label);
        let length_to_fill = self.config.max_concept_length.saturating_sub(base.budget_length());
        let groups = self.generate_disjunctions(self.hierarchy.specialisations(label), length_to_fill);
        for group in groups {
            let mut extension = base.clone();
            extension.disjuncts_mut(id).extend(group);
            extension.settle_disjunction(id);
            out.push(extension);
        }
    }

    /// Drop a disjunct without specialisations; a two-element disjunction
    /// collapses into a conjunct unless that conjunct is redundant
    pub(super) fn drop_disjunct(&self, label: &Label, current: &Concept, id: NodeId) -> Option<Concept> {
        let node = current.node(id);
        if node.disjuncts().len() <= 1 && node.conjuncts().is_empty() {
            return None;
        }
        if node.disjuncts().len() == 2 {
            let remain = node.disjuncts().iter().find(|l| *l != label)?;
            if self.config.check_redundancy && self.is_redundant_for_addition(remain, current, id, false) {
                return None;
            }
        }
        let mut extension = current.clone();
        extension.disjuncts_mut(id).remove(label);
        extension.settle_disjunction(id);
        Some(extension)
    }
}
