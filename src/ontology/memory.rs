//! Finite in-memory knowledge base implementing every collaborator trait

use super::ids::{ClassId, DataPropertyId, IndividualId, Label, RoleId};
use super::oracle::{
    AssertionSource, HierarchyOracle, OracleResult, Reasoner, SubsumptionAxiom, UniversalAxiom,
};
use crate::concept::{Concept, Edge, NodeId, Threshold};
use once_cell::unsync::OnceCell;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Told facts of a small knowledge base.
///
/// The TBox holds atomic subsumptions, equivalences, disjointness, role
/// domains and ranges and universal axioms with atomic fillers. The ABox
/// holds class, role and numeric data assertions. Entailments are computed
/// lazily and cached until the next mutation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FactBase {
    classes: BTreeSet<ClassId>,
    roles: BTreeSet<RoleId>,
    data_properties: BTreeSet<DataPropertyId>,
    subclass_axioms: BTreeSet<(ClassId, ClassId)>,
    equivalence_axioms: BTreeSet<(ClassId, ClassId)>,
    disjoint_axioms: BTreeSet<(ClassId, ClassId)>,
    domains: BTreeMap<RoleId, BTreeSet<ClassId>>,
    ranges: BTreeMap<RoleId, BTreeSet<ClassId>>,
    data_domains: BTreeMap<DataPropertyId, BTreeSet<ClassId>>,
    universals: BTreeSet<UniversalAxiom>,
    individuals: BTreeSet<IndividualId>,
    class_assertions: BTreeMap<IndividualId, BTreeSet<Label>>,
    role_assertions: BTreeMap<IndividualId, Vec<(RoleId, IndividualId)>>,
    data_assertions: BTreeMap<IndividualId, BTreeMap<DataPropertyId, Vec<f64>>>,
    #[serde(skip)]
    taxonomy: OnceCell<Taxonomy>,
    #[serde(skip)]
    interpretation: OnceCell<Interpretation>,
}

/// Entailed class relations
#[derive(Clone, Debug, Default)]
struct Taxonomy {
    equivalents: BTreeMap<ClassId, BTreeSet<ClassId>>,
    strict_sup: BTreeMap<ClassId, BTreeSet<ClassId>>,
    strict_sub: BTreeMap<ClassId, BTreeSet<ClassId>>,
    direct_sup: BTreeMap<ClassId, BTreeSet<ClassId>>,
    direct_sub: BTreeMap<ClassId, BTreeSet<ClassId>>,
    disjoint: BTreeMap<ClassId, BTreeSet<ClassId>>,
}

/// Materialised individual types and the role graph between individuals
#[derive(Clone, Debug, Default)]
struct Interpretation {
    types: BTreeMap<IndividualId, BTreeSet<Label>>,
    abox: DiGraph<IndividualId, RoleId>,
    index: BTreeMap<IndividualId, NodeIndex>,
}

impl FactBase {
    /// Empty knowledge base
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.taxonomy.take();
        self.interpretation.take();
    }

    /// Declare a class
    pub fn add_class(&mut self, class: impl AsRef<str>) -> &mut Self {
        self.classes.insert(ClassId::new(class));
        self.touch();
        self
    }

    /// Declare a role
    pub fn add_role(&mut self, role: impl AsRef<str>) -> &mut Self {
        self.roles.insert(RoleId::new(role));
        self
    }

    /// `sub ⊑ sup`
    pub fn add_subclass(&mut self, sub: impl AsRef<str>, sup: impl AsRef<str>) -> &mut Self {
        let (sub, sup) = (ClassId::new(sub), ClassId::new(sup));
        self.classes.insert(sub.clone());
        self.classes.insert(sup.clone());
        self.subclass_axioms.insert((sub, sup));
        self.touch();
        self
    }

    /// `a ≡ b`
    pub fn add_equivalent(&mut self, a: impl AsRef<str>, b: impl AsRef<str>) -> &mut Self {
        let (a, b) = (ClassId::new(a), ClassId::new(b));
        self.classes.insert(a.clone());
        self.classes.insert(b.clone());
        self.equivalence_axioms.insert((a, b));
        self.touch();
        self
    }

    /// `a ⊓ b ⊑ ⊥`
    pub fn add_disjoint(&mut self, a: impl AsRef<str>, b: impl AsRef<str>) -> &mut Self {
        let (a, b) = (ClassId::new(a), ClassId::new(b));
        self.classes.insert(a.clone());
        self.classes.insert(b.clone());
        self.disjoint_axioms.insert((a, b));
        self.touch();
        self
    }

    /// `∃role.⊤ ⊑ class`
    pub fn add_domain(&mut self, role: impl AsRef<str>, class: impl AsRef<str>) -> &mut Self {
        let (role, class) = (RoleId::new(role), ClassId::new(class));
        self.roles.insert(role.clone());
        self.classes.insert(class.clone());
        self.domains.entry(role).or_default().insert(class);
        self.touch();
        self
    }

    /// `⊤ ⊑ ∀role.class`
    pub fn add_range(&mut self, role: impl AsRef<str>, class: impl AsRef<str>) -> &mut Self {
        let (role, class) = (RoleId::new(role), ClassId::new(class));
        self.roles.insert(role.clone());
        self.classes.insert(class.clone());
        self.ranges.entry(role).or_default().insert(class);
        self.touch();
        self
    }

    /// `∃property ⊑ class`
    pub fn add_data_domain(&mut self, property: impl AsRef<str>, class: impl AsRef<str>) -> &mut Self {
        let (property, class) = (DataPropertyId::new(property), ClassId::new(class));
        self.data_properties.insert(property.clone());
        self.classes.insert(class.clone());
        self.data_domains.entry(property).or_default().insert(class);
        self.touch();
        self
    }

    /// `class ⊑ ∀role.filler`
    pub fn add_universal(
        &mut self,
        class: impl AsRef<str>,
        role: impl AsRef<str>,
        filler: impl AsRef<str>,
    ) -> &mut Self {
        let axiom = UniversalAxiom {
            class: ClassId::new(class),
            role: RoleId::new(role),
            filler: ClassId::new(filler),
        };
        self.classes.insert(axiom.class.clone());
        self.classes.insert(axiom.filler.clone());
        self.roles.insert(axiom.role.clone());
        self.universals.insert(axiom);
        self.touch();
        self
    }

    /// Declare an individual without assertions
    pub fn add_individual(&mut self, individual: impl AsRef<str>) -> &mut Self {
        self.individuals.insert(IndividualId::new(individual));
        self.touch();
        self
    }

    /// `class(individual)`
    pub fn assert_class(&mut self, individual: impl AsRef<str>, class: impl AsRef<str>) -> &mut Self {
        self.assert_label(individual, Label::atom(class))
    }

    /// `¬class(individual)`
    pub fn assert_not(&mut self, individual: impl AsRef<str>, class: impl AsRef<str>) -> &mut Self {
        self.assert_label(individual, Label::not(class))
    }

    fn assert_label(&mut self, individual: impl AsRef<str>, label: Label) -> &mut Self {
        let individual = IndividualId::new(individual);
        self.classes.insert(label.class().clone());
        self.individuals.insert(individual.clone());
        self.class_assertions.entry(individual).or_default().insert(label);
        self.touch();
        self
    }

    /// `role(subject, object)`
    pub fn assert_role(
        &mut self,
        subject: impl AsRef<str>,
        role: impl AsRef<str>,
        object: impl AsRef<str>,
    ) -> &mut Self {
        let (subject, object) = (IndividualId::new(subject), IndividualId::new(object));
        let role = RoleId::new(role);
        self.individuals.insert(subject.clone());
        self.individuals.insert(object.clone());
        self.roles.insert(role.clone());
        let successors = self.role_assertions.entry(subject).or_default();
        if !successors.contains(&(role.clone(), object.clone())) {
            successors.push((role, object));
        }
        self.touch();
        self
    }

    /// `property(individual, value)`
    pub fn assert_data(
        &mut self,
        individual: impl AsRef<str>,
        property: impl AsRef<str>,
        value: f64,
    ) -> &mut Self {
        let individual = IndividualId::new(individual);
        let property = DataPropertyId::new(property);
        self.individuals.insert(individual.clone());
        self.data_properties.insert(property.clone());
        self.data_assertions
            .entry(individual)
            .or_default()
            .entry(property)
            .or_default()
            .push(value);
        self.touch();
        self
    }

    /// Number of individuals
    pub fn individual_count(&self) -> usize {
        self.individuals.len()
    }

    fn taxonomy(&self) -> &Taxonomy {
        self.taxonomy.get_or_init(|| self.build_taxonomy())
    }

    fn interpretation(&self) -> &Interpretation {
        self.interpretation.get_or_init(|| self.build_interpretation())
    }

    fn build_taxonomy(&self) -> Taxonomy {
        let mut graph: DiGraph<ClassId, ()> = DiGraph::new();
        let index: BTreeMap<ClassId, NodeIndex> = self
            .classes
            .iter()
            .map(|c| (c.clone(), graph.add_node(c.clone())))
            .collect();
        for (sub, sup) in &self.subclass_axioms {
            graph.add_edge(index[sub], index[sup], ());
        }
        for (a, b) in &self.equivalence_axioms {
            graph.add_edge(index[a], index[b], ());
            graph.add_edge(index[b], index[a], ());
        }

        let mut tax = Taxonomy::default();
        for component in tarjan_scc(&graph) {
            let members: BTreeSet<ClassId> = component.iter().map(|&n| graph[n].clone()).collect();
            for member in &members {
                let mut others = members.clone();
                others.remove(member);
                tax.equivalents.insert(member.clone(), others);
            }
        }

        for (class, &start) in &index {
            let mut sups = BTreeSet::new();
            let mut dfs = Dfs::new(&graph, start);
            while let Some(n) = dfs.next(&graph) {
                let reached = &graph[n];
                if reached != class && !tax.equivalents[class].contains(reached) {
                    sups.insert(reached.clone());
                }
            }
            tax.strict_sup.insert(class.clone(), sups);
            tax.strict_sub.entry(class.clone()).or_default();
        }
        for (class, sups) in &tax.strict_sup {
            for sup in sups {
                tax.strict_sub.entry(sup.clone()).or_default().insert(class.clone());
            }
        }

        for (class, sups) in &tax.strict_sup {
            let direct: BTreeSet<ClassId> = sups
                .iter()
                .filter(|s| {
                    !sups
                        .iter()
                        .any(|t| t != *s && tax.strict_sup[t].contains(*s))
                })
                .cloned()
                .collect();
            for sup in &direct {
                tax.direct_sub.entry(sup.clone()).or_default().insert(class.clone());
            }
            tax.direct_sup.insert(class.clone(), direct);
            tax.direct_sub.entry(class.clone()).or_default();
        }

        let down = |c: &ClassId| -> BTreeSet<ClassId> {
            let mut set: BTreeSet<ClassId> = tax.strict_sub[c].clone();
            set.extend(tax.equivalents[c].iter().cloned());
            set.insert(c.clone());
            set
        };
        let mut disjoint: BTreeMap<ClassId, BTreeSet<ClassId>> = BTreeMap::new();
        for (a, b) in &self.disjoint_axioms {
            for x in down(a) {
                for y in down(b) {
                    disjoint.entry(x.clone()).or_default().insert(y.clone());
                    disjoint.entry(y).or_default().insert(x.clone());
                }
            }
        }
        tax.disjoint = disjoint;
        tax
    }

    fn build_interpretation(&self) -> Interpretation {
        let tax = self.taxonomy();
        let mut abox = DiGraph::new();
        let index: BTreeMap<IndividualId, NodeIndex> = self
            .individuals
            .iter()
            .map(|i| (i.clone(), abox.add_node(i.clone())))
            .collect();
        let mut told: BTreeMap<IndividualId, BTreeSet<Label>> = self
            .individuals
            .iter()
            .map(|i| (i.clone(), self.class_assertions.get(i).cloned().unwrap_or_default()))
            .collect();
        for (subject, successors) in &self.role_assertions {
            for (role, object) in successors {
                abox.add_edge(index[subject], index[object], role.clone());
                let range = self.ranges.get(role).into_iter().flatten();
                if let Some(labels) = told.get_mut(object) {
                    labels.extend(range.cloned().map(Label::Atom));
                }
            }
        }
        let types = told
            .into_iter()
            .map(|(ind, labels)| {
                let closed = tax.close(&labels);
                (ind, closed)
            })
            .collect();
        Interpretation { types, abox, index }
    }

    fn satisfies(&self, individual: &IndividualId, concept: &Concept, id: NodeId) -> bool {
        let interp = self.interpretation();
        let Some(types) = interp.types.get(individual) else {
            return false;
        };
        let node = concept.node(id);
        if !node.conjuncts().is_subset(types) {
            return false;
        }
        if !node.disjuncts().is_empty() && node.disjuncts().is_disjoint(types) {
            return false;
        }
        node.edges().iter().all(|edge| match edge {
            Edge::Exists { role, target } => self
                .successors(individual, role)
                .iter()
                .any(|succ| self.satisfies(succ, concept, *target)),
            Edge::Forall { role, target } => self.entails_universal(types, role, concept, *target),
            Edge::Data {
                property,
                comparison,
                value,
            } => self
                .data_values(individual, property)
                .any(|v| comparison.admits(Threshold::new(v), *value)),
        })
    }

    fn successors(&self, individual: &IndividualId, role: &RoleId) -> Vec<IndividualId> {
        let interp = self.interpretation();
        let Some(&start) = interp.index.get(individual) else {
            return Vec::new();
        };
        interp
            .abox
            .edges(start)
            .filter(|e| e.weight() == role)
            .map(|e| interp.abox[e.target()].clone())
            .collect()
    }

    fn data_values<'a>(
        &'a self,
        individual: &IndividualId,
        property: &DataPropertyId,
    ) -> impl Iterator<Item = f64> + 'a {
        self.data_assertions
            .get(individual)
            .and_then(|m| m.get(property))
            .into_iter()
            .flatten()
            .copied()
    }

    /// `∀role.C` is entailed when every conjunct of `C` follows from the
    /// role range or from universal axioms on the individual's types
    fn entails_universal(&self, types: &BTreeSet<Label>, role: &RoleId, concept: &Concept, id: NodeId) -> bool {
        let node = concept.node(id);
        if node.is_top() {
            return true;
        }
        if !node.disjuncts().is_empty() || !node.edges().is_empty() {
            return false;
        }
        let mut forced: BTreeSet<Label> = self
            .ranges
            .get(role)
            .into_iter()
            .flatten()
            .cloned()
            .map(Label::Atom)
            .collect();
        for axiom in &self.universals {
            if &axiom.role == role && types.contains(&Label::Atom(axiom.class.clone())) {
                forced.insert(Label::Atom(axiom.filler.clone()));
            }
        }
        let forced = self.taxonomy().close(&forced);
        node.conjuncts().is_subset(&forced)
    }

    fn node_is_satisfiable(&self, concept: &Concept, id: NodeId) -> bool {
        let tax = self.taxonomy();
        let node = concept.node(id);
        let closed = tax.close(node.conjuncts());
        let clash = closed.iter().any(|l| match l {
            Label::Atom(a) => {
                closed.contains(&Label::Negated(a.clone()))
                    || tax.disjoint.get(a).map_or(false, |d| {
                        d.iter().any(|b| closed.contains(&Label::Atom(b.clone())))
                    })
            }
            Label::Negated(_) => false,
        });
        if clash {
            return false;
        }
        node.edges().iter().all(|edge| match edge {
            Edge::Exists { target, .. } => self.node_is_satisfiable(concept, *target),
            _ => true,
        })
    }

    fn subsumes(&self, sub: &Concept, sub_id: NodeId, sup: &Concept, sup_id: NodeId) -> bool {
        let tax = self.taxonomy();
        let (sn, pn) = (sub.node(sub_id), sup.node(sup_id));
        let closed = tax.close(sn.conjuncts());
        if !pn.conjuncts().is_subset(&closed) {
            return false;
        }
        if !pn.disjuncts().is_empty() {
            let via_conjunct = !pn.disjuncts().is_disjoint(&closed);
            let via_disjuncts = !sn.disjuncts().is_empty()
                && sn.disjuncts().iter().all(|d| {
                    let single: BTreeSet<Label> = std::iter::once(d.clone()).collect();
                    !pn.disjuncts().is_disjoint(&tax.close(&single))
                });
            if !via_conjunct && !via_disjuncts {
                return false;
            }
        }
        pn.edges().iter().all(|pe| {
            sn.edges().iter().any(|se| match (se, pe) {
                (Edge::Exists { role: r1, target: t1 }, Edge::Exists { role: r2, target: t2 })
                | (Edge::Forall { role: r1, target: t1 }, Edge::Forall { role: r2, target: t2 }) => {
                    r1 == r2 && self.subsumes(sub, *t1, sup, *t2)
                }
                (
                    Edge::Data { property: p1, comparison: c1, value: v1 },
                    Edge::Data { property: p2, comparison: c2, value: v2 },
                ) => p1 == p2 && c1 == c2 && c2.admits(*v1, *v2),
                _ => false,
            })
        })
    }
}

impl Taxonomy {
    /// Upward closure of a label set, including negations of disjoint classes
    fn close(&self, labels: &BTreeSet<Label>) -> BTreeSet<Label> {
        let mut closed = labels.clone();
        for label in labels {
            match label {
                Label::Atom(c) => {
                    let ups = self.strict_sup.get(c).into_iter().flatten();
                    let eqs = self.equivalents.get(c).into_iter().flatten();
                    for s in ups.chain(eqs) {
                        closed.insert(Label::Atom(s.clone()));
                    }
                    let atoms: Vec<ClassId> = closed
                        .iter()
                        .filter(|l| !l.is_negated())
                        .map(|l| l.class().clone())
                        .collect();
                    for a in atoms {
                        for d in self.disjoint.get(&a).into_iter().flatten() {
                            closed.insert(Label::Negated(d.clone()));
                        }
                    }
                }
                Label::Negated(c) => {
                    let downs = self.strict_sub.get(c).into_iter().flatten();
                    let eqs = self.equivalents.get(c).into_iter().flatten();
                    for s in downs.chain(eqs) {
                        closed.insert(Label::Negated(s.clone()));
                    }
                }
            }
        }
        closed
    }
}

impl Reasoner for FactBase {
    fn is_satisfiable(&self, concept: &Concept) -> OracleResult<bool> {
        Ok(self.node_is_satisfiable(concept, concept.root()))
    }

    fn instances(&self, concept: &Concept) -> OracleResult<BTreeSet<IndividualId>> {
        Ok(self
            .individuals
            .iter()
            .filter(|ind| self.satisfies(ind, concept, concept.root()))
            .cloned()
            .collect())
    }

    fn is_entailed(&self, axiom: &SubsumptionAxiom) -> OracleResult<bool> {
        if axiom.sup.is_top() || !self.node_is_satisfiable(&axiom.sub, axiom.sub.root()) {
            return Ok(true);
        }
        Ok(self.subsumes(&axiom.sub, axiom.sub.root(), &axiom.sup, axiom.sup.root()))
    }
}

impl HierarchyOracle for FactBase {
    fn classes(&self) -> BTreeSet<ClassId> {
        self.classes.clone()
    }

    fn roles(&self) -> BTreeSet<RoleId> {
        self.roles.clone()
    }

    fn data_properties(&self) -> BTreeSet<DataPropertyId> {
        self.data_properties.clone()
    }

    fn top_classes(&self) -> BTreeSet<ClassId> {
        let tax = self.taxonomy();
        self.classes
            .iter()
            .filter(|c| tax.strict_sup.get(*c).map_or(true, BTreeSet::is_empty))
            .cloned()
            .collect()
    }

    fn bottom_classes(&self) -> BTreeSet<ClassId> {
        let tax = self.taxonomy();
        self.classes
            .iter()
            .filter(|c| tax.strict_sub.get(*c).map_or(true, BTreeSet::is_empty))
            .cloned()
            .collect()
    }

    fn direct_subclasses(&self, class: &ClassId) -> BTreeSet<ClassId> {
        self.taxonomy().direct_sub.get(class).cloned().unwrap_or_default()
    }

    fn direct_superclasses(&self, class: &ClassId) -> BTreeSet<ClassId> {
        self.taxonomy().direct_sup.get(class).cloned().unwrap_or_default()
    }

    fn equivalent_classes(&self, class: &ClassId) -> BTreeSet<ClassId> {
        self.taxonomy().equivalents.get(class).cloned().unwrap_or_default()
    }

    fn disjoint_classes(&self, class: &ClassId) -> BTreeSet<ClassId> {
        self.taxonomy().disjoint.get(class).cloned().unwrap_or_default()
    }

    fn property_domain(&self, role: &RoleId) -> BTreeSet<ClassId> {
        self.domains.get(role).cloned().unwrap_or_default()
    }

    fn property_range(&self, role: &RoleId) -> BTreeSet<ClassId> {
        self.ranges.get(role).cloned().unwrap_or_default()
    }

    fn data_property_domain(&self, property: &DataPropertyId) -> BTreeSet<ClassId> {
        self.data_domains.get(property).cloned().unwrap_or_default()
    }
}

impl AssertionSource for FactBase {
    fn individuals(&self) -> BTreeSet<IndividualId> {
        self.individuals.clone()
    }

    fn class_assertions(&self, individual: &IndividualId) -> BTreeSet<Label> {
        self.class_assertions.get(individual).cloned().unwrap_or_default()
    }

    fn role_assertions(&self, individual: &IndividualId) -> Vec<(RoleId, IndividualId)> {
        self.role_assertions.get(individual).cloned().unwrap_or_default()
    }

    fn data_property_values(&self, individual: &IndividualId, property: &DataPropertyId) -> Vec<f64> {
        self.data_values(individual, property).collect()
    }

    fn universal_restrictions(&self) -> Vec<UniversalAxiom> {
        self.universals.iter().cloned().collect()
    }
}
