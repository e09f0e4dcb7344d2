//! Concept description trees stored in an index arena

use crate::ontology::{ClassId, DataPropertyId, Label, RoleId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable index of a node inside a [`Concept`] arena
pub type NodeId = usize;

/// Numeric literal used as a data-restriction bound or an observed value.
///
/// Compared with `f64::total_cmp` so it can serve as a map key; `-0.0` is
/// folded into `0.0` on construction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Threshold(f64);

impl Threshold {
    /// Wrap a literal value
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Threshold(0.0)
        } else {
            Threshold(value)
        }
    }

    /// The wrapped value
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Threshold {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Threshold {}

impl Ord for Threshold {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Threshold {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Threshold {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Threshold::new(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a data-comparison edge (bounds are inclusive)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Comparison {
    /// `p ≥ v`
    AtLeast,
    /// `p ≤ v`
    AtMost,
}

impl Comparison {
    /// Whether `value` satisfies the bound
    pub fn admits(self, value: Threshold, bound: Threshold) -> bool {
        match self {
            Comparison::AtLeast => value >= bound,
            Comparison::AtMost => value <= bound,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::AtLeast => "≥",
            Comparison::AtMost => "≤",
        }
    }
}

/// Outgoing edge of a concept node
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Existential restriction `∃role.target`
    Exists {
        /// Restricted role
        role: RoleId,
        /// Filler node
        target: NodeId,
    },
    /// Universal restriction `∀role.target`
    Forall {
        /// Restricted role
        role: RoleId,
        /// Filler node
        target: NodeId,
    },
    /// Data restriction `∃property.[comparison value]`; has no child node
    Data {
        /// Restricted data property
        property: DataPropertyId,
        /// Bound direction
        comparison: Comparison,
        /// Bound value
        value: Threshold,
    },
}

impl Edge {
    /// Child node of an object restriction
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Edge::Exists { target, .. } | Edge::Forall { target, .. } => Some(*target),
            Edge::Data { .. } => None,
        }
    }

    /// Role of an object restriction
    pub fn role(&self) -> Option<&RoleId> {
        match self {
            Edge::Exists { role, .. } | Edge::Forall { role, .. } => Some(role),
            Edge::Data { .. } => None,
        }
    }
}

/// A single node of a concept description
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Conjoined labels
    pub(crate) conjuncts: BTreeSet<Label>,
    /// Disjoined labels; never holds exactly one element
    pub(crate) disjuncts: BTreeSet<Label>,
    /// Owned outgoing edges
    pub(crate) edges: Vec<Edge>,
    /// Incoming edge as (parent node, edge position); `None` for the root
    pub(crate) parent: Option<(NodeId, usize)>,
}

impl ConceptNode {
    /// Conjoined labels
    pub fn conjuncts(&self) -> &BTreeSet<Label> {
        &self.conjuncts
    }

    /// Disjoined labels
    pub fn disjuncts(&self) -> &BTreeSet<Label> {
        &self.disjuncts
    }

    /// Outgoing edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Incoming edge, if any
    pub fn parent(&self) -> Option<(NodeId, usize)> {
        self.parent
    }

    /// No labels at all
    pub fn has_no_labels(&self) -> bool {
        self.conjuncts.is_empty() && self.disjuncts.is_empty()
    }

    /// No labels and no edges: this node stands for ⊤
    pub fn is_top(&self) -> bool {
        self.has_no_labels() && self.edges.is_empty()
    }
}

/// A concept description as a rooted tree.
///
/// - Node 0 is always the root
/// - Nodes are never removed, so a [`NodeId`] found in one concept names the
///   same position in every clone of it
/// - Equality and hashing are by arena layout; use
///   [`Concept::canonical_form`] for structural identity
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concept {
    nodes: Vec<ConceptNode>,
}

impl Concept {
    /// The universal concept ⊤
    pub fn top() -> Self {
        Concept {
            nodes: vec![ConceptNode::default()],
        }
    }

    /// A concept made of a single label
    pub fn atomic(label: Label) -> Self {
        Concept::top().with_label(label)
    }

    /// Rebuild a concept from raw nodes, checking arena consistency
    pub fn from_nodes(nodes: Vec<ConceptNode>) -> crate::Result<Self> {
        if nodes.is_empty() {
            return Err(crate::LearnerError::InvalidConcept(
                "Concept must have a root node".to_string(),
            ));
        }
        if nodes[0].parent.is_some() {
            return Err(crate::LearnerError::InvalidConcept(
                "Root node cannot have an incoming edge".to_string(),
            ));
        }
        let n_nodes = nodes.len();
        let mut seen = vec![false; n_nodes];
        seen[0] = true;
        let mut queue = VecDeque::new();
        queue.push_back(0);
        while let Some(id) = queue.pop_front() {
            for (pos, edge) in nodes[id].edges.iter().enumerate() {
                let Some(target) = edge.target() else {
                    continue;
                };
                if target >= n_nodes {
                    return Err(crate::LearnerError::InvalidConcept(format!(
                        "Edge target {} out of bounds",
                        target
                    )));
                }
                if seen[target] {
                    return Err(crate::LearnerError::InvalidConcept(format!(
                        "Node {} is reachable twice",
                        target
                    )));
                }
                if nodes[target].parent != Some((id, pos)) {
                    return Err(crate::LearnerError::InvalidConcept(format!(
                        "Node {} has an inconsistent parent link",
                        target
                    )));
                }
                seen[target] = true;
                queue.push_back(target);
            }
            if nodes[id].disjuncts.len() == 1 {
                return Err(crate::LearnerError::InvalidConcept(
                    "Disjunction must have at least two disjuncts".to_string(),
                ));
            }
        }
        if seen.iter().any(|&v| !v) {
            return Err(crate::LearnerError::InvalidConcept(
                "Concept is not connected".to_string(),
            ));
        }
        Ok(Concept { nodes })
    }

    /// Root position
    pub fn root(&self) -> NodeId {
        0
    }

    /// Number of nodes in the arena
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> &ConceptNode {
        &self.nodes[id]
    }

    /// Whether the whole concept is ⊤
    pub fn is_top(&self) -> bool {
        self.nodes[0].is_top()
    }

    /// Role of the edge leading into `id`
    pub fn incoming_role(&self, id: NodeId) -> Option<&RoleId> {
        let (parent, pos) = self.nodes[id].parent?;
        self.nodes[parent].edges[pos].role()
    }

    /// Nodes reachable from the root, parents before children
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::new();
        queue.push_back(0);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for edge in &self.nodes[id].edges {
                if let Some(target) = edge.target() {
                    queue.push_back(target);
                }
            }
        }
        order
    }

    /// Syntactic length of the whole concept
    pub fn length(&self) -> usize {
        self.node_length(0)
    }

    /// Length counted against the budget: ⊤ at the root is free
    pub fn budget_length(&self) -> usize {
        if self.is_top() {
            0
        } else {
            self.length()
        }
    }

    /// Syntactic length of the subtree rooted at `id`
    pub fn node_length(&self, id: NodeId) -> usize {
        let node = &self.nodes[id];
        let mut parts = 0;
        let mut total = 0;
        for label in &node.conjuncts {
            parts += 1;
            total += label.length();
        }
        if !node.disjuncts.is_empty() {
            parts += 1;
            total += node.disjuncts.iter().map(Label::length).sum::<usize>()
                + node.disjuncts.len()
                - 1;
        }
        for edge in &node.edges {
            parts += 1;
            total += match edge {
                Edge::Exists { target, .. } | Edge::Forall { target, .. } => {
                    1 + self.node_length(*target)
                }
                Edge::Data { .. } => 2,
            };
        }
        if parts == 0 {
            1
        } else {
            total + parts - 1
        }
    }

    /// Role depth of the whole concept
    pub fn depth(&self) -> usize {
        self.height(0)
    }

    /// Role depth of the subtree rooted at `id`
    pub fn height(&self, id: NodeId) -> usize {
        self.nodes[id]
            .edges
            .iter()
            .filter_map(Edge::target)
            .map(|child| 1 + self.height(child))
            .max()
            .unwrap_or(0)
    }

    /// Distance of `id` from the root
    pub fn node_depth(&self, mut id: NodeId) -> usize {
        let mut depth = 0;
        while let Some((parent, _)) = self.nodes[id].parent {
            depth += 1;
            id = parent;
        }
        depth
    }

    /// Whether a class occurs anywhere in the concept
    pub fn mentions(&self, class: &ClassId) -> bool {
        self.nodes.iter().any(|node| {
            node.conjuncts
                .iter()
                .chain(node.disjuncts.iter())
                .any(|label| label.class() == class)
        })
    }

    /// Whether the concept uses a constructor beyond conjunction,
    /// existential and data restrictions over atomic labels
    pub fn uses_non_el_constructors(&self) -> bool {
        self.nodes.iter().any(|node| {
            !node.disjuncts.is_empty()
                || node.conjuncts.iter().any(Label::is_negated)
                || node.edges.iter().any(|e| matches!(e, Edge::Forall { .. }))
        })
    }

    /// Add a conjunct to the root
    pub fn with_label(mut self, label: Label) -> Self {
        self.nodes[0].conjuncts.insert(label);
        self
    }

    /// Add a disjunction to the root; a single label becomes a conjunct
    pub fn with_disjunction<I: IntoIterator<Item = Label>>(mut self, labels: I) -> Self {
        let labels: BTreeSet<Label> = labels.into_iter().collect();
        if labels.len() == 1 {
            self.nodes[0].conjuncts.extend(labels);
        } else {
            self.nodes[0].disjuncts.extend(labels);
        }
        self
    }

    /// Add `∃role.filler` to the root
    pub fn with_exists(mut self, role: RoleId, filler: &Concept) -> Self {
        let target = self.graft(filler);
        self.attach(0, |target| Edge::Exists { role, target }, target);
        self
    }

    /// Add `∀role.filler` to the root
    pub fn with_forall(mut self, role: RoleId, filler: &Concept) -> Self {
        let target = self.graft(filler);
        self.attach(0, |target| Edge::Forall { role, target }, target);
        self
    }

    /// Add a data restriction to the root
    pub fn with_data(mut self, property: DataPropertyId, comparison: Comparison, value: f64) -> Self {
        self.nodes[0].edges.push(Edge::Data {
            property,
            comparison,
            value: Threshold::new(value),
        });
        self
    }

    fn graft(&mut self, filler: &Concept) -> NodeId {
        let offset = self.nodes.len();
        for node in &filler.nodes {
            let mut copy = node.clone();
            copy.parent = copy.parent.map(|(p, pos)| (p + offset, pos));
            for edge in &mut copy.edges {
                match edge {
                    Edge::Exists { target, .. } | Edge::Forall { target, .. } => *target += offset,
                    Edge::Data { .. } => {}
                }
            }
            self.nodes.push(copy);
        }
        offset
    }

    fn attach<F: FnOnce(NodeId) -> Edge>(&mut self, parent: NodeId, make: F, target: NodeId) {
        let pos = self.nodes[parent].edges.len();
        self.nodes[parent].edges.push(make(target));
        self.nodes[target].parent = Some((parent, pos));
    }

    /// Mutable access to the conjuncts of `id`; only call on a fresh clone
    pub(crate) fn conjuncts_mut(&mut self, id: NodeId) -> &mut BTreeSet<Label> {
        &mut self.nodes[id].conjuncts
    }

    /// Mutable access to the disjuncts of `id`; only call on a fresh clone
    pub(crate) fn disjuncts_mut(&mut self, id: NodeId) -> &mut BTreeSet<Label> {
        &mut self.nodes[id].disjuncts
    }

    /// Collapse a one-element disjunction at `id` into a conjunct
    pub(crate) fn settle_disjunction(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        if node.disjuncts.len() == 1 {
            let remaining = std::mem::take(&mut node.disjuncts);
            node.conjuncts.extend(remaining);
        }
    }

    /// Append an empty filler under `id` via an existential or universal edge
    pub(crate) fn push_restriction(&mut self, id: NodeId, role: RoleId, universal: bool) -> NodeId {
        let target = self.nodes.len();
        self.nodes.push(ConceptNode::default());
        if universal {
            self.attach(id, |target| Edge::Forall { role, target }, target);
        } else {
            self.attach(id, |target| Edge::Exists { role, target }, target);
        }
        target
    }

    /// Append a data edge under `id`
    pub(crate) fn push_data(&mut self, id: NodeId, property: DataPropertyId, comparison: Comparison, value: Threshold) {
        self.nodes[id].edges.push(Edge::Data {
            property,
            comparison,
            value,
        });
    }

    /// Move the bound of the data edge at `(id, pos)`
    pub(crate) fn set_data_value(&mut self, id: NodeId, pos: usize, new_value: Threshold) {
        if let Some(Edge::Data { value, .. }) = self.nodes[id].edges.get_mut(pos) {
            *value = new_value;
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, nested: bool) -> fmt::Result {
        let node = &self.nodes[id];
        let mut parts: Vec<String> = node.conjuncts.iter().map(|l| l.to_string()).collect();
        if !node.disjuncts.is_empty() {
            let disj: Vec<String> = node.disjuncts.iter().map(|l| l.to_string()).collect();
            let joined = disj.join(" ⊔ ");
            let alone = node.conjuncts.is_empty() && node.edges.is_empty() && !nested;
            parts.push(if alone { joined } else { format!("({})", joined) });
        }
        for edge in &node.edges {
            parts.push(match edge {
                Edge::Exists { role, target } => format!("∃{}.{}", role, self.filler_string(*target)),
                Edge::Forall { role, target } => format!("∀{}.{}", role, self.filler_string(*target)),
                Edge::Data { property, comparison, value } => {
                    format!("∃{}.[{} {}]", property, comparison.symbol(), value)
                }
            });
        }
        if parts.is_empty() {
            return write!(f, "⊤");
        }
        if nested && parts.len() > 1 {
            write!(f, "({})", parts.join(" ⊓ "))
        } else {
            write!(f, "{}", parts.join(" ⊓ "))
        }
    }

    fn filler_string(&self, id: NodeId) -> String {
        struct Filler<'a>(&'a Concept, NodeId);
        impl fmt::Display for Filler<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt_node(f, self.1, true)
            }
        }
        Filler(self, id).to_string()
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0, false)
    }
}

impl fmt::Debug for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Concept({})", self)
    }
}

impl Default for Concept {
    fn default() -> Self {
        Self::top()
    }
}
