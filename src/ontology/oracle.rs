//! Interfaces to the external reasoning and ontology layer

use super::ids::{ClassId, DataPropertyId, IndividualId, Label, RoleId};
use crate::concept::Concept;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Failure of an oracle call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The reasoner raised an error
    #[error("Reasoner failure: {0}")]
    Failure(String),

    /// The reasoner did not answer in time
    #[error("Reasoner timed out: {0}")]
    Timeout(String),

    /// The reasoner cannot handle the request
    #[error("Unsupported by reasoner: {0}")]
    Unsupported(String),
}

/// Result type for oracle calls
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// `sub ⊑ sup`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsumptionAxiom {
    /// Subsumee
    pub sub: Concept,
    /// Subsumer
    pub sup: Concept,
}

impl SubsumptionAxiom {
    /// Build `sub ⊑ sup`
    pub fn new(sub: Concept, sup: Concept) -> Self {
        SubsumptionAxiom { sub, sup }
    }

    /// The reversed axiom `sup ⊑ sub`
    pub fn reversed(&self) -> Self {
        SubsumptionAxiom {
            sub: self.sup.clone(),
            sup: self.sub.clone(),
        }
    }
}

/// Told TBox axiom `class ⊑ ∀role.filler` with an atomic filler
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniversalAxiom {
    /// Restricted class
    pub class: ClassId,
    /// Role
    pub role: RoleId,
    /// Atomic filler
    pub filler: ClassId,
}

/// Reasoning oracle: synchronous and potentially slow
pub trait Reasoner {
    /// Whether the concept can have instances
    fn is_satisfiable(&self, concept: &Concept) -> OracleResult<bool>;

    /// All individuals entailed to be instances of the concept
    fn instances(&self, concept: &Concept) -> OracleResult<BTreeSet<IndividualId>>;

    /// Whether the subsumption is entailed
    fn is_entailed(&self, axiom: &SubsumptionAxiom) -> OracleResult<bool>;

    /// Whether both concepts subsume each other
    fn is_equivalent(&self, a: &Concept, b: &Concept) -> OracleResult<bool> {
        let axiom = SubsumptionAxiom::new(a.clone(), b.clone());
        Ok(self.is_entailed(&axiom)? && self.is_entailed(&axiom.reversed())?)
    }
}

/// Classified vocabulary, queried once when building a
/// [`Hierarchy`](super::Hierarchy)
pub trait HierarchyOracle {
    /// Atomic classes, excluding ⊤ and ⊥
    fn classes(&self) -> BTreeSet<ClassId>;

    /// Object properties, excluding the top and bottom roles
    fn roles(&self) -> BTreeSet<RoleId>;

    /// Data properties
    fn data_properties(&self) -> BTreeSet<DataPropertyId> {
        BTreeSet::new()
    }

    /// Direct subclasses of ⊤
    fn top_classes(&self) -> BTreeSet<ClassId>;

    /// Direct superclasses of ⊥
    fn bottom_classes(&self) -> BTreeSet<ClassId>;

    /// Direct subclasses of a class
    fn direct_subclasses(&self, class: &ClassId) -> BTreeSet<ClassId>;

    /// Direct superclasses of a class
    fn direct_superclasses(&self, class: &ClassId) -> BTreeSet<ClassId>;

    /// Classes equivalent to a class, excluding itself
    fn equivalent_classes(&self, class: &ClassId) -> BTreeSet<ClassId>;

    /// Classes disjoint with a class
    fn disjoint_classes(&self, class: &ClassId) -> BTreeSet<ClassId>;

    /// Domain classes of a role
    fn property_domain(&self, role: &RoleId) -> BTreeSet<ClassId>;

    /// Range classes of a role
    fn property_range(&self, role: &RoleId) -> BTreeSet<ClassId>;

    /// Domain classes of a data property
    fn data_property_domain(&self, _property: &DataPropertyId) -> BTreeSet<ClassId> {
        BTreeSet::new()
    }
}

/// Assertional data (ABox)
pub trait AssertionSource {
    /// All named individuals
    fn individuals(&self) -> BTreeSet<IndividualId>;

    /// Told class assertions of an individual (atomic or negated atomic)
    fn class_assertions(&self, individual: &IndividualId) -> BTreeSet<Label>;

    /// Told role assertions with the individual as subject
    fn role_assertions(&self, individual: &IndividualId) -> Vec<(RoleId, IndividualId)>;

    /// Numeric values of a data property for an individual
    fn data_property_values(&self, individual: &IndividualId, property: &DataPropertyId) -> Vec<f64>;

    /// Told `C ⊑ ∀r.D` axioms with atomic `C` and `D`
    fn universal_restrictions(&self) -> Vec<UniversalAxiom> {
        Vec::new()
    }
}
