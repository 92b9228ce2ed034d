use super::{MAX_LOCKED_WAYS, NUM_SETS, NUM_WAYS};
use std::ops::Range;

/// The lock state of every (set, way) entry of one minion's L1 data cache.
///
/// Each entry is either unlocked, or locked to the physical address of one line. Only the
/// operations in [`CacheController`](super::CacheController) mutate the table, and they uphold
/// two invariants:
/// - no set has more than [`MAX_LOCKED_WAYS`] locked ways,
/// - a physical line is locked into at most one way of a set.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct LockTable {
    sets: [[Option<u64>; NUM_WAYS]; NUM_SETS],
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the physical address that `(set, way)` is locked to, or `None` if it is unlocked
    /// or out of range.
    pub fn get(&self, set: usize, way: usize) -> Option<u64> {
        *self.sets.get(set)?.get(way)?
    }

    pub fn is_locked(&self, set: usize, way: usize) -> bool {
        self.get(set, way).is_some()
    }

    /// Returns the number of locked ways in `set`.
    pub fn locked_ways(&self, set: usize) -> usize {
        self.sets[set].iter().filter(|way| way.is_some()).count()
    }

    /// Returns the way of `set` that is locked to `paddr`, if any.
    pub fn find(&self, set: usize, paddr: u64) -> Option<usize> {
        self.sets[set].iter().position(|way| *way == Some(paddr))
    }

    /// Returns the lowest-numbered unlocked way of `set`, if the set has room for another lock.
    pub fn free_way(&self, set: usize) -> Option<usize> {
        if self.locked_ways(set) >= MAX_LOCKED_WAYS {
            return None;
        }
        self.sets[set].iter().position(Option::is_none)
    }

    /// Iterate over all locked entries as `(set, way, paddr)`.
    pub fn iter_locked(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        self.sets.iter().enumerate().flat_map(|(set, ways)| {
            ways.iter()
                .enumerate()
                .filter_map(move |(way, paddr)| paddr.map(|paddr| (set, way, paddr)))
        })
    }

    pub(super) fn lock(&mut self, set: usize, way: usize, paddr: u64) {
        self.sets[set][way] = Some(paddr);
    }

    /// Unlock `(set, way)`, returning the address it was locked to. Out of range entries are
    /// ignored.
    pub(super) fn unlock(&mut self, set: usize, way: usize) -> Option<u64> {
        self.sets.get_mut(set)?.get_mut(way)?.take()
    }

    pub(super) fn clear(&mut self) {
        self.clear_sets(0..NUM_SETS);
    }

    pub(super) fn clear_sets(&mut self, sets: Range<usize>) {
        for set in &mut self.sets[sets] {
            *set = [None; NUM_WAYS];
        }
    }
}
