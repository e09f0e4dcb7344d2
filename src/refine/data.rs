//! Numeric data-restriction refinements

use super::operator::{RefinementOperator, Refinements};
use crate::concept::{Comparison, Concept, Edge, NodeId};
use crate::ontology::DataPropertyId;

impl RefinementOperator<'_> {
    fn has_data_restriction(&self, concept: &Concept, id: NodeId, property: &DataPropertyId, comparison: Comparison) -> bool {
        concept.node(id).edges().iter().any(|edge| {
            matches!(edge, Edge::Data { property: p, comparison: c, .. } if p == property && *c == comparison)
        })
    }

    /// Open `∃p.[≥ first]` and `∃p.[≤ last]` for every data property with
    /// thresholds, once per direction
    pub(super) fn add_data_restrictions(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        for property in self.hierarchy.data_properties() {
            let Some(thresholds) = self.hierarchy.thresholds(property) else {
                continue;
            };
            let bounds = [
                (Comparison::AtMost, thresholds.last()),
                (Comparison::AtLeast, thresholds.first()),
            ];
            for (comparison, bound) in bounds {
                let Some(bound) = bound else {
                    continue;
                };
                if self.config.check_redundancy && self.has_data_restriction(current, id, property, comparison) {
                    continue;
                }
                let mut extension = current.clone();
                extension.push_data(id, property.clone(), comparison, bound);
                out.push(extension);
            }
        }
    }

    /// Tighten each data bound of the node by one step
    pub(super) fn refine_data_values(&self, current: &Concept, id: NodeId, out: &mut Refinements) {
        for (pos, edge) in current.node(id).edges().iter().enumerate() {
            let Edge::Data {
                property,
                comparison,
                value,
            } = edge
            else {
                continue;
            };
            let Some(thresholds) = self.hierarchy.thresholds(property) else {
                continue;
            };
            let Some(index) = thresholds.index_of(*value) else {
                continue;
            };
            let step = thresholds.step();
            let next = match comparison {
                Comparison::AtLeast => index.checked_add(step).filter(|&i| i < thresholds.values().len()),
                Comparison::AtMost => index.checked_sub(step),
            };
            if let Some(next) = next {
                let mut extension = current.clone();
                extension.set_data_value(id, pos, thresholds.values()[next]);
                out.push(extension);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::concept::{Comparison, Concept, Edge};
    use crate::core::LearnerConfig;
    use crate::ontology::{DataPropertyId, FactBase, Hierarchy};
    use crate::refine::RefinementOperator;

    fn kb(values: &[f64]) -> FactBase {
        let mut kb = FactBase::new();
        for (i, v) in values.iter().enumerate() {
            kb.assert_data(format!("i{}", i), "age", *v);
        }
        kb
    }

    fn bounds(concepts: &[Concept]) -> Vec<(Comparison, f64)> {
        concepts
            .iter()
            .flat_map(|c| c.node(0).edges().to_vec())
            .filter_map(|e| match e {
                Edge::Data { comparison, value, .. } => Some((comparison, value.value())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_open_and_step() {
        let kb = kb(&[1.0, 2.0, 3.0, 4.0]);
        let config = LearnerConfig::alc().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = RefinementOperator::new(&h, config).unwrap();
        let opened = op.refine(&Concept::top());
        let found = bounds(&opened);
        assert!(found.contains(&(Comparison::AtMost, 4.0)));
        assert!(found.contains(&(Comparison::AtLeast, 1.0)));

        let age = DataPropertyId::new("age");
        let at_least = Concept::top().with_data(age.clone(), Comparison::AtLeast, 2.0);
        let stepped = bounds(&op.refine(&at_least));
        assert!(stepped.contains(&(Comparison::AtLeast, 3.0)));
        // the same direction is not opened twice
        assert!(!stepped.contains(&(Comparison::AtLeast, 1.0)));

        let at_most = Concept::top().with_data(age.clone(), Comparison::AtMost, 2.0);
        assert!(bounds(&op.refine(&at_most)).contains(&(Comparison::AtMost, 1.0)));
    }

    #[test]
    fn test_stepping_stops_at_the_ends() {
        let kb = kb(&[1.0, 2.0, 3.0]);
        let config = LearnerConfig::alc().with_min_support(1);
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = RefinementOperator::new(&h, config).unwrap();
        let age = DataPropertyId::new("age");
        let last = Concept::top().with_data(age.clone(), Comparison::AtLeast, 3.0);
        assert!(!bounds(&op.refine(&last)).iter().any(|(c, v)| *c == Comparison::AtLeast && *v != 3.0));
        let first = Concept::top().with_data(age, Comparison::AtMost, 1.0);
        assert!(!bounds(&op.refine(&first)).iter().any(|(c, v)| *c == Comparison::AtMost && *v != 1.0));
    }

    #[test]
    fn test_coarse_steps() {
        let values: Vec<f64> = (0..30).map(f64::from).collect();
        let kb = kb(&values);
        let mut config = LearnerConfig::alc().with_min_support(1);
        config.data_thresholds_number = 3;
        let h = Hierarchy::build(&kb, &kb, None, &config).unwrap();
        let op = RefinementOperator::new(&h, config).unwrap();
        let c = Concept::top().with_data(DataPropertyId::new("age"), Comparison::AtLeast, 0.0);
        assert!(bounds(&op.refine(&c)).contains(&(Comparison::AtLeast, 10.0)));
    }
}
