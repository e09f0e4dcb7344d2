//! Min-priority queue of concepts ordered by length, then insertion order

use crate::concept::Concept;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Entry {
    length: usize,
    seq: u64,
    concept: Concept,
}

impl Entry {
    fn key(&self) -> (usize, u64) {
        (self.length, self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Concepts waiting to be refined; the shortest pops first and ties pop
/// in insertion order
#[derive(Default)]
pub struct Frontier {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Frontier {
    /// Empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a concept
    pub fn push(&mut self, concept: Concept) {
        let entry = Entry {
            length: concept.budget_length(),
            seq: self.next_seq,
            concept,
        };
        self.next_seq += 1;
        self.heap.push(Reverse(entry));
    }

    /// Dequeue the shortest concept
    pub fn pop(&mut self) -> Option<Concept> {
        self.heap.pop().map(|Reverse(entry)| entry.concept)
    }

    /// Number of waiting concepts
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Extend<Concept> for Frontier {
    fn extend<I: IntoIterator<Item = Concept>>(&mut self, iter: I) {
        for concept in iter {
            self.push(concept);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{Label, RoleId};

    #[test]
    fn test_shortest_first_then_fifo() {
        let mut frontier = Frontier::new();
        let long = Concept::atomic(Label::atom("A")).with_exists(RoleId::new("r"), &Concept::top());
        frontier.push(long.clone());
        frontier.push(Concept::atomic(Label::atom("B")));
        frontier.push(Concept::atomic(Label::atom("C")));
        frontier.push(Concept::top());
        assert_eq!(frontier.len(), 4);
        let order: Vec<String> = std::iter::from_fn(|| frontier.pop()).map(|c| c.to_string()).collect();
        assert_eq!(order, vec!["⊤", "B", "C", "A ⊓ ∃r.⊤"]);
        assert!(frontier.is_empty());
    }
}
