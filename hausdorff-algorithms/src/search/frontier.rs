use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
};

use float_ord::FloatOrd;

use crate::grid::LatticeVertex;

/// One candidate motion of the search: a translation cell and a rotation cell at the same resolution level
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub translation: LatticeVertex,
    pub rotation: LatticeVertex,
    pub level: u32,
    /// Exact symmetric Hausdorff distance at the cell positions, minimized over the allowed reflections
    pub distance: f64,
    /// Whether `distance` was attained with the reflected motion
    pub reflect: bool,
    /// `max(0, distance - L)` for the Lipschitz bound `L` of this level
    pub lower_bound: f64,
}

struct Entry {
    key: FloatOrd<f64>,
    distance: FloatOrd<f64>,
    sequence: u64,
    candidate: Candidate,
}

impl Entry {
    fn order_key(&self) -> (FloatOrd<f64>, FloatOrd<f64>, u64) {
        (self.key, self.distance, self.sequence)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// Min-priority queue of candidates. Ties in the key are broken by the exact distance of the candidate, then by
/// insertion order
#[derive(Default)]
pub(crate) struct Frontier {
    heap: BinaryHeap<Reverse<Entry>>,
    next_sequence: u64,
}

impl Frontier {
    pub fn push(&mut self, key: f64, candidate: Candidate) {
        let entry = Entry {
            key: FloatOrd(key),
            distance: FloatOrd(candidate.distance),
            sequence: self.next_sequence,
            candidate,
        };
        self.next_sequence += 1;
        self.heap.push(Reverse(entry));
    }

    /// Removes the entry with the smallest key
    pub fn pop(&mut self) -> Option<(f64, Candidate)> {
        self.heap
            .pop()
            .map(|Reverse(entry)| (entry.key.0, entry.candidate))
    }

    pub fn min_key(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(entry)| entry.key.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.heap.iter().map(|Reverse(entry)| &entry.candidate)
    }
}
