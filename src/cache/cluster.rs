//! Grouping of expansions by canonical form

use super::expansion::Expansion;
use crate::concept::CanonicalForm;
use crate::ontology::IndividualId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Batches at least this large are fingerprinted in parallel
const PARALLEL_BATCH: usize = 256;

/// Root expansions sharing one canonical form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    representative: Expansion,
    members: Vec<IndividualId>,
}

impl Cluster {
    /// Expansion used for matching
    pub fn representative(&self) -> &Expansion {
        &self.representative
    }

    /// Individuals whose expansion has the representative's form
    pub fn members(&self) -> &[IndividualId] {
        &self.members
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Canonical forms of a batch, in input order
pub fn fingerprints(expansions: &[Expansion]) -> Vec<CanonicalForm> {
    if expansions.len() >= PARALLEL_BATCH {
        expansions.par_iter().map(Expansion::canonical_form).collect()
    } else {
        expansions.iter().map(Expansion::canonical_form).collect()
    }
}

/// Group expansions in one pass; clusters appear in order of their first
/// member
pub fn cluster(expansions: Vec<Expansion>) -> Vec<Cluster> {
    let forms = fingerprints(&expansions);
    let mut slots: HashMap<CanonicalForm, usize> = HashMap::with_capacity(forms.len());
    let mut clusters: Vec<Cluster> = Vec::new();
    for (expansion, form) in expansions.into_iter().zip(forms) {
        let member = expansion.individual.clone();
        let slot = *slots.entry(form).or_insert_with(|| {
            clusters.push(Cluster {
                representative: expansion.normalized(),
                members: Vec::new(),
            });
            clusters.len() - 1
        });
        if let Some(individual) = member {
            clusters[slot].members.push(individual);
        }
    }
    clusters
}
