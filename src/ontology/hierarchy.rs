//! Precomputed class/property hierarchy, instance map and data thresholds

use super::ids::{ClassId, DataPropertyId, IndividualId, Label, RoleId};
use super::oracle::{AssertionSource, HierarchyOracle, Reasoner};
use crate::concept::{Concept, Threshold};
use crate::core::LearnerConfig;
use crate::utils::timing::Timer;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Sorted distinct values of a data property and the refinement step
#[derive(Clone, Debug, PartialEq)]
pub struct DataThresholds {
    values: Vec<Threshold>,
    step: usize,
}

impl DataThresholds {
    /// Build from observed values; `buckets` controls the step width
    pub fn new(values: impl IntoIterator<Item = Threshold>, buckets: usize) -> Self {
        let values: Vec<Threshold> = values
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let step = (values.len() / buckets.max(1)).max(1);
        DataThresholds { values, step }
    }

    /// Sorted distinct values
    pub fn values(&self) -> &[Threshold] {
        &self.values
    }

    /// Number of positions a bound moves per refinement
    pub fn step(&self) -> usize {
        self.step
    }

    /// Smallest observed value
    pub fn first(&self) -> Option<Threshold> {
        self.values.first().copied()
    }

    /// Largest observed value
    pub fn last(&self) -> Option<Threshold> {
        self.values.last().copied()
    }

    /// Position of a value
    pub fn index_of(&self, value: Threshold) -> Option<usize> {
        self.values.binary_search(&value).ok()
    }

    /// Whether no value was observed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Immutable vocabulary context built once from the oracle and the ABox.
///
/// Holds direct and transitive class relations, the specialisation map used
/// by the refinement operator (including negated labels when negation is
/// enabled), property domains and ranges, the instance sets of atomic labels
/// and the numeric thresholds of data properties.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    classes: BTreeSet<ClassId>,
    roles: BTreeSet<RoleId>,
    data_properties: BTreeSet<DataPropertyId>,
    top: Vec<Label>,
    specialisations: BTreeMap<Label, Vec<Label>>,
    direct_sub: BTreeMap<ClassId, BTreeSet<ClassId>>,
    direct_sup: BTreeMap<ClassId, BTreeSet<ClassId>>,
    sub_closure: BTreeMap<ClassId, BTreeSet<ClassId>>,
    sup_closure: BTreeMap<ClassId, BTreeSet<ClassId>>,
    equivalents: BTreeMap<ClassId, BTreeSet<ClassId>>,
    disjoint: BTreeMap<ClassId, BTreeSet<ClassId>>,
    domains: BTreeMap<RoleId, BTreeSet<ClassId>>,
    ranges: BTreeMap<RoleId, BTreeSet<ClassId>>,
    data_domains: BTreeMap<DataPropertyId, BTreeSet<ClassId>>,
    instances: BTreeMap<Label, BTreeSet<IndividualId>>,
    individuals: BTreeSet<IndividualId>,
    thresholds: BTreeMap<DataPropertyId, DataThresholds>,
    use_negation: bool,
    check_disjointness: bool,
}

impl Hierarchy {
    /// Query the oracle and the assertions once and freeze the result
    pub fn build(
        oracle: &dyn HierarchyOracle,
        assertions: &dyn AssertionSource,
        reasoner: Option<&dyn Reasoner>,
        config: &LearnerConfig,
    ) -> crate::Result<Self> {
        config.validate()?;
        let _timer = Timer::new("hierarchy");
        let classes = oracle.classes();
        let mut hierarchy = Hierarchy {
            roles: oracle.roles(),
            data_properties: oracle.data_properties(),
            use_negation: config.use_negation,
            check_disjointness: config.check_disjointness,
            ..Hierarchy::default()
        };

        for class in &classes {
            let keep = |set: BTreeSet<ClassId>| -> BTreeSet<ClassId> {
                set.into_iter().filter(|c| classes.contains(c) && c != class).collect()
            };
            hierarchy.direct_sub.insert(class.clone(), keep(oracle.direct_subclasses(class)));
            hierarchy.direct_sup.insert(class.clone(), keep(oracle.direct_superclasses(class)));
            hierarchy.equivalents.insert(class.clone(), keep(oracle.equivalent_classes(class)));
            if config.check_disjointness {
                hierarchy.disjoint.insert(class.clone(), keep(oracle.disjoint_classes(class)));
            }
        }
        hierarchy.classes = classes;
        hierarchy.close_relations();

        for role in &hierarchy.roles {
            hierarchy.domains.insert(role.clone(), oracle.property_domain(role));
            hierarchy.ranges.insert(role.clone(), oracle.property_range(role));
        }
        for property in &hierarchy.data_properties {
            hierarchy
                .data_domains
                .insert(property.clone(), oracle.data_property_domain(property));
        }

        hierarchy.build_specialisations(oracle, config);
        hierarchy.build_instances(assertions, reasoner, config);
        if config.use_data_properties {
            hierarchy.build_thresholds(assertions, config);
        }

        info!(
            classes = hierarchy.classes.len(),
            roles = hierarchy.roles.len(),
            data_properties = hierarchy.thresholds.len(),
            individuals = hierarchy.individuals.len(),
            "hierarchy built"
        );
        Ok(hierarchy)
    }

    fn close_relations(&mut self) {
        for class in &self.classes {
            self.sub_closure
                .insert(class.clone(), reach(class, &self.direct_sub));
            self.sup_closure
                .insert(class.clone(), reach(class, &self.direct_sup));
        }
        // disjointness is inherited by subclasses and equivalents
        let mut closed: BTreeMap<ClassId, BTreeSet<ClassId>> = BTreeMap::new();
        for (a, disjoint) in &self.disjoint {
            for b in disjoint {
                for x in self.down_set(a) {
                    for y in self.down_set(b) {
                        closed.entry(x.clone()).or_default().insert(y.clone());
                        closed.entry(y.clone()).or_default().insert(x.clone());
                    }
                }
            }
        }
        self.disjoint = closed;
    }

    fn down_set(&self, class: &ClassId) -> BTreeSet<ClassId> {
        let mut set = BTreeSet::new();
        set.insert(class.clone());
        for c in self.sub_closure.get(class).into_iter().flatten() {
            set.insert(c.clone());
        }
        for c in self.equivalents.get(class).into_iter().flatten() {
            set.insert(c.clone());
            for s in self.sub_closure.get(c).into_iter().flatten() {
                set.insert(s.clone());
            }
        }
        set
    }

    fn build_specialisations(&mut self, oracle: &dyn HierarchyOracle, config: &LearnerConfig) {
        if !config.check_redundancy {
            self.top = self.classes.iter().cloned().map(Label::Atom).collect();
            if config.use_negation {
                self.top
                    .extend(self.classes.iter().cloned().map(Label::Negated));
            }
            return;
        }
        self.top = oracle
            .top_classes()
            .into_iter()
            .filter(|c| self.classes.contains(c))
            .map(Label::Atom)
            .collect();
        for (class, subs) in &self.direct_sub {
            if !subs.is_empty() {
                self.specialisations.insert(
                    Label::Atom(class.clone()),
                    subs.iter().cloned().map(Label::Atom).collect(),
                );
            }
        }
        if config.use_negation {
            self.top.extend(
                oracle
                    .bottom_classes()
                    .into_iter()
                    .filter(|c| self.classes.contains(c))
                    .map(Label::Negated),
            );
            for (class, sups) in &self.direct_sup {
                if !sups.is_empty() {
                    self.specialisations.insert(
                        Label::Negated(class.clone()),
                        sups.iter().cloned().map(Label::Negated).collect(),
                    );
                }
            }
        }
    }

    fn build_instances(
        &mut self,
        assertions: &dyn AssertionSource,
        reasoner: Option<&dyn Reasoner>,
        config: &LearnerConfig,
    ) {
        self.individuals = assertions.individuals();
        let mut instances: BTreeMap<Label, BTreeSet<IndividualId>> = BTreeMap::new();
        for (individual, labels) in self.materialise_labels(&self.individuals, assertions) {
            for label in labels {
                instances.entry(label).or_default().insert(individual.clone());
            }
        }
        if let (true, Some(reasoner)) = (config.use_reasoner_for_atomic_instances, reasoner) {
            for class in &self.classes {
                let label = Label::Atom(class.clone());
                match reasoner.instances(&Concept::atomic(label.clone())) {
                    Ok(found) => instances.entry(label).or_default().extend(found),
                    Err(e) => warn!(class = %class, error = %e, "instance retrieval failed"),
                }
            }
        }
        self.instances = instances;
    }

    fn build_thresholds(&mut self, assertions: &dyn AssertionSource, config: &LearnerConfig) {
        for property in &self.data_properties {
            let values: Vec<Threshold> = self
                .individuals
                .iter()
                .flat_map(|ind| assertions.data_property_values(ind, property))
                .filter(|v| v.is_finite())
                .map(Threshold::new)
                .collect();
            let thresholds = DataThresholds::new(values, config.data_thresholds_number);
            if !thresholds.is_empty() {
                self.thresholds.insert(property.clone(), thresholds);
            }
        }
    }

    /// Entailed labels of `individuals`: told labels plus the ranges of the
    /// roles each one is an object of, closed upward. Negated told labels
    /// are kept only when negation is enabled.
    pub fn materialise_labels(
        &self,
        individuals: &BTreeSet<IndividualId>,
        assertions: &dyn AssertionSource,
    ) -> BTreeMap<IndividualId, BTreeSet<Label>> {
        let mut told: BTreeMap<IndividualId, BTreeSet<Label>> = individuals
            .iter()
            .map(|i| {
                let labels = assertions
                    .class_assertions(i)
                    .into_iter()
                    .filter(|l| self.use_negation || !l.is_negated())
                    .collect();
                (i.clone(), labels)
            })
            .collect();
        for subject in individuals {
            for (role, object) in assertions.role_assertions(subject) {
                if let (Some(range), Some(labels)) = (self.ranges.get(&role), told.get_mut(&object)) {
                    labels.extend(range.iter().cloned().map(Label::Atom));
                }
            }
        }
        told.into_iter()
            .map(|(i, labels)| {
                let closed = self.upward_closure(&labels);
                (i, closed)
            })
            .collect()
    }

    /// Atomic classes
    pub fn classes(&self) -> &BTreeSet<ClassId> {
        &self.classes
    }

    /// Object properties
    pub fn roles(&self) -> &BTreeSet<RoleId> {
        &self.roles
    }

    /// Data properties that have thresholds
    pub fn data_properties(&self) -> impl Iterator<Item = &DataPropertyId> {
        self.thresholds.keys()
    }

    /// All individuals
    pub fn individuals(&self) -> &BTreeSet<IndividualId> {
        &self.individuals
    }

    /// Most general labels (the specialisations of ⊤)
    pub fn top_level(&self) -> &[Label] {
        &self.top
    }

    /// One-step specialisations of a label
    pub fn specialisations(&self, label: &Label) -> &[Label] {
        self.specialisations
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct subclasses of a class
    pub fn direct_subclasses(&self, class: &ClassId) -> Option<&BTreeSet<ClassId>> {
        self.direct_sub.get(class)
    }

    /// Direct superclasses of a class
    pub fn direct_superclasses(&self, class: &ClassId) -> Option<&BTreeSet<ClassId>> {
        self.direct_sup.get(class)
    }

    /// Strict superclasses of a class
    pub fn superclasses(&self, class: &ClassId) -> Option<&BTreeSet<ClassId>> {
        self.sup_closure.get(class)
    }

    /// Strict subclasses of a class
    pub fn subclasses(&self, class: &ClassId) -> Option<&BTreeSet<ClassId>> {
        self.sub_closure.get(class)
    }

    /// Equivalent classes of a class
    pub fn equivalent_classes(&self, class: &ClassId) -> Option<&BTreeSet<ClassId>> {
        self.equivalents.get(class)
    }

    /// Classes disjoint with a class
    pub fn disjoint_classes(&self, class: &ClassId) -> Option<&BTreeSet<ClassId>> {
        self.disjoint.get(class)
    }

    /// Domain of a role
    pub fn domain(&self, role: &RoleId) -> Option<&BTreeSet<ClassId>> {
        self.domains.get(role)
    }

    /// Range of a role
    pub fn range(&self, role: &RoleId) -> Option<&BTreeSet<ClassId>> {
        self.ranges.get(role)
    }

    /// Domain of a data property
    pub fn data_domain(&self, property: &DataPropertyId) -> Option<&BTreeSet<ClassId>> {
        self.data_domains.get(property)
    }

    /// Thresholds of a data property
    pub fn thresholds(&self, property: &DataPropertyId) -> Option<&DataThresholds> {
        self.thresholds.get(property)
    }

    /// Known instances of a label
    pub fn instances(&self, label: &Label) -> Option<&BTreeSet<IndividualId>> {
        self.instances.get(label)
    }

    /// Number of known instances of a label
    pub fn support(&self, label: &Label) -> usize {
        self.instances.get(label).map_or(0, BTreeSet::len)
    }

    /// Whether `a` and `b` are equal or related by equivalence or
    /// subsumption in either direction
    pub fn are_related(&self, a: &Label, b: &Label) -> bool {
        if a.is_negated() != b.is_negated() {
            return false;
        }
        let (x, y) = (a.class(), b.class());
        x == y
            || contains(&self.equivalents, x, y)
            || contains(&self.sub_closure, x, y)
            || contains(&self.sup_closure, x, y)
    }

    /// Whether `a ⊑ b` follows from the hierarchy
    pub fn is_subsumed_by(&self, a: &Label, b: &Label) -> bool {
        match (a, b) {
            (Label::Atom(x), Label::Atom(y)) => {
                x == y || contains(&self.sup_closure, x, y) || contains(&self.equivalents, x, y)
            }
            (Label::Negated(x), Label::Negated(y)) => {
                x == y || contains(&self.sub_closure, x, y) || contains(&self.equivalents, x, y)
            }
            (Label::Atom(x), Label::Negated(y)) => self.check_disjointness && contains(&self.disjoint, x, y),
            (Label::Negated(_), Label::Atom(_)) => false,
        }
    }

    /// Whether `a ⊓ b` is unsatisfiable according to the hierarchy
    pub fn are_disjoint(&self, a: &Label, b: &Label) -> bool {
        match (a, b) {
            (Label::Atom(x), Label::Atom(y)) => {
                self.check_disjointness && contains(&self.disjoint, x, y)
            }
            (Label::Atom(x), Label::Negated(y)) | (Label::Negated(y), Label::Atom(x)) => {
                self.is_subsumed_by(&Label::Atom(x.clone()), &Label::Atom(y.clone()))
            }
            (Label::Negated(_), Label::Negated(_)) => false,
        }
    }

    /// Whether any class of `classes` is disjoint with `label`
    pub fn disjoint_with_any<'a>(&self, label: &Label, classes: impl IntoIterator<Item = &'a ClassId>) -> bool {
        classes
            .into_iter()
            .any(|c| self.are_disjoint(label, &Label::Atom(c.clone())))
    }

    /// Labels entailed by a set of labels: superclasses and equivalents of
    /// atoms, subclasses of negated classes and, with negation, the
    /// negations of disjoint classes
    pub fn upward_closure(&self, labels: &BTreeSet<Label>) -> BTreeSet<Label> {
        let mut closed = BTreeSet::new();
        for label in labels {
            closed.insert(label.clone());
            match label {
                Label::Atom(c) => {
                    let related = self
                        .sup_closure
                        .get(c)
                        .into_iter()
                        .flatten()
                        .chain(self.equivalents.get(c).into_iter().flatten());
                    for s in related {
                        closed.insert(Label::Atom(s.clone()));
                    }
                    if self.use_negation {
                        for d in self.disjoint.get(c).into_iter().flatten() {
                            closed.insert(Label::Negated(d.clone()));
                        }
                    }
                }
                Label::Negated(c) => {
                    let related = self
                        .sub_closure
                        .get(c)
                        .into_iter()
                        .flatten()
                        .chain(self.equivalents.get(c).into_iter().flatten());
                    for s in related {
                        closed.insert(Label::Negated(s.clone()));
                    }
                }
            }
        }
        closed
    }
}

fn contains(map: &BTreeMap<ClassId, BTreeSet<ClassId>>, key: &ClassId, value: &ClassId) -> bool {
    map.get(key).map_or(false, |set| set.contains(value))
}

fn reach(start: &ClassId, direct: &BTreeMap<ClassId, BTreeSet<ClassId>>) -> BTreeSet<ClassId> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&ClassId> = direct.get(start).into_iter().flatten().collect();
    while let Some(c) = stack.pop() {
        if c != start && seen.insert(c.clone()) {
            stack.extend(direct.get(c).into_iter().flatten());
        }
    }
    seen
}
