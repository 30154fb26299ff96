//! Rank allocation for slot tables

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hands out scope-local ranks starting at 1
///
/// Uses a min-heap of reclaimed ranks so the smallest free rank is always
/// reissued first and the live rank space stays compact.
#[derive(Debug)]
pub struct RankAllocator {
    /// Reclaimed ranks
    free_ranks: BinaryHeap<Reverse<usize>>,
    /// Next never-issued rank
    next_rank: usize,
}

impl RankAllocator {
    pub fn new() -> Self {
        Self {
            free_ranks: BinaryHeap::new(),
            next_rank: 1,
        }
    }

    /// Allocate a rank, preferring the smallest reclaimed one
    pub fn allocate(&mut self) -> usize {
        if let Some(Reverse(rank)) = self.free_ranks.pop() {
            return rank;
        }

        let rank = self.next_rank;
        self.next_rank += 1;
        rank
    }

    /// Return a rank to the free list
    pub fn free(&mut self, rank: usize) {
        debug_assert!(rank >= 1 && rank < self.next_rank);
        self.free_ranks.push(Reverse(rank));
    }

    /// Forget every issued rank and restart from 1
    pub fn reset(&mut self) {
        self.free_ranks.clear();
        self.next_rank = 1;
    }

    /// Number of reclaimed ranks waiting for reuse
    pub fn free_count(&self) -> usize {
        self.free_ranks.len()
    }

    /// Rank the next allocation takes when the free list is empty
    pub fn next_rank(&self) -> usize {
        self.next_rank
    }
}

impl Default for RankAllocator {
    fn default() -> Self {
        Self::new()
    }
}
