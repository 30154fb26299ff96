//! Slot tables: content-addressed rank allocation with LRU eviction
//!
//! A slot table maps struct signatures to scope-local ranks. Entries live in
//! an arena indexed by rank, a companion map finds the rank of a signature,
//! and a [`RankAllocator`] recycles ranks freed by eviction.
//!
//! ```text
//! index: {a,b} → 1   {c} → 2   {d,e} → 4
//! slots: [_, Some({a,b}@t7), Some({c}@t3), None, Some({d,e}@t9)]
//! free:  [3]
//! ```

use super::rank::RankAllocator;
use super::signature::StructSignature;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Id reserved for the zero-field signature in both scopes
pub const EMPTY_STRUCT_ID: u64 = 0;

/// Lifetime class of a slot table
///
/// The scope is encoded in the parity of every non-zero id, so the wire
/// format needs no separate scope tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Survives batch boundaries until evicted
    Context,
    /// Dropped at every batch boundary
    Transient,
}

impl Scope {
    pub fn scope_bit(self) -> u64 {
        match self {
            Scope::Context => 1,
            Scope::Transient => 0,
        }
    }

    /// External id of `rank` in this scope
    pub fn id_for(self, rank: usize) -> u64 {
        rank as u64 * 2 + self.scope_bit()
    }

    /// Scope an id belongs to; `None` for [`EMPTY_STRUCT_ID`]
    pub fn of(id: u64) -> Option<Scope> {
        match id {
            EMPTY_STRUCT_ID => None,
            id if id & 1 == 1 => Some(Scope::Context),
            _ => Some(Scope::Transient),
        }
    }

    /// Rank addressed by an id, whichever its scope
    pub fn rank_of(id: u64) -> usize {
        (id >> 1) as usize
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Context => f.write_str("context"),
            Scope::Transient => f.write_str("transient"),
        }
    }
}

/// A resident signature
#[derive(Debug, Clone)]
pub struct SlotEntry {
    pub signature: StructSignature,
    pub rank: usize,
    pub last_access_tick: u64,
}

/// Result of registering a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// External id
    pub id: u64,
    /// True when this call allocated the entry, meaning the field names must
    /// accompany the id on the wire
    pub is_new: bool,
}

/// Per-scope signature table
pub struct SlotTable {
    scope: Scope,
    /// Arena indexed by rank; index 0 is never used
    slots: Vec<Option<SlotEntry>>,
    /// Signature → rank
    index: HashMap<StructSignature, usize>,
    ranks: RankAllocator,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl SlotTable {
    /// Create an empty table for `scope`
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            slots: Vec::new(),
            index: HashMap::new(),
            ranks: RankAllocator::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Register `signature`, stamping it with `tick`
    ///
    /// The empty signature always maps to [`EMPTY_STRUCT_ID`] and never
    /// occupies a slot.
    pub fn register(&mut self, signature: StructSignature, tick: u64) -> Registration {
        if signature.is_empty() {
            return Registration {
                id: EMPTY_STRUCT_ID,
                is_new: false,
            };
        }

        if let Some(&rank) = self.index.get(&signature) {
            if let Some(entry) = self.slots[rank].as_mut() {
                entry.last_access_tick = tick;
            }
            self.hits += 1;
            trace!(scope = %self.scope, rank, "Struct signature hit");
            return Registration {
                id: self.scope.id_for(rank),
                is_new: false,
            };
        }

        let rank = self.ranks.allocate();
        if rank >= self.slots.len() {
            self.slots.resize_with(rank + 1, || None);
        }
        self.slots[rank] = Some(SlotEntry {
            signature: signature.clone(),
            rank,
            last_access_tick: tick,
        });
        self.index.insert(signature, rank);
        self.misses += 1;

        let id = self.scope.id_for(rank);
        debug!(scope = %self.scope, rank, id, "Allocated struct signature");
        Registration { id, is_new: true }
    }

    /// Evict least-recently-used entries until at most `capacity` remain
    ///
    /// Entries are removed oldest tick first; equal ticks go smallest rank
    /// first. Returns the freed ranks in eviction order.
    pub fn evict(&mut self, capacity: usize) -> Vec<usize> {
        let resident = self.index.len();
        if resident <= capacity {
            return Vec::new();
        }
        let excess = resident - capacity;

        let mut victims: Vec<(u64, usize)> = self
            .slots
            .iter()
            .flatten()
            .map(|entry| (entry.last_access_tick, entry.rank))
            .collect();
        if excess < victims.len() {
            victims.select_nth_unstable(excess);
            victims.truncate(excess);
        }
        victims.sort_unstable();

        let mut freed = Vec::with_capacity(excess);
        for (_, rank) in victims {
            if let Some(entry) = self.slots[rank].take() {
                self.index.remove(&entry.signature);
                self.ranks.free(rank);
                freed.push(rank);
            }
        }
        self.evictions += freed.len() as u64;

        debug!(
            scope = %self.scope,
            evicted = freed.len(),
            resident = self.index.len(),
            capacity,
            "Evicted struct signatures"
        );
        freed
    }

    /// Drop every entry and restart ranks from 1
    ///
    /// Returns the number of entries dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.index.len();
        self.slots.clear();
        self.index.clear();
        self.ranks.reset();
        if dropped > 0 {
            debug!(scope = %self.scope, dropped, "Cleared struct signatures");
        }
        dropped
    }

    /// Entry resident at `rank`
    pub fn get(&self, rank: usize) -> Option<&SlotEntry> {
        self.slots.get(rank).and_then(Option::as_ref)
    }

    /// Signature addressed by `id`, if `id` belongs to this scope and is resident
    pub fn resolve(&self, id: u64) -> Option<&StructSignature> {
        if Scope::of(id) != Some(self.scope) {
            return None;
        }
        self.get(Scope::rank_of(id)).map(|entry| &entry.signature)
    }

    /// Id of `signature` without refreshing its recency
    pub fn id_of(&self, signature: &StructSignature) -> Option<u64> {
        if signature.is_empty() {
            return Some(EMPTY_STRUCT_ID);
        }
        self.index.get(signature).map(|&rank| self.scope.id_for(rank))
    }

    /// Resident entries in rank order
    pub fn entries(&self) -> impl Iterator<Item = &SlotEntry> {
        self.slots.iter().flatten()
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            scope: self.scope,
            resident: self.index.len(),
            free_ranks: self.ranks.free_count(),
            next_rank: self.ranks.next_rank(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

/// Slot table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub scope: Scope,
    pub resident: usize,
    pub free_ranks: usize,
    pub next_rank: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}
