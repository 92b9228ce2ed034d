use super::{
    is_scratchpad_address, CacheLevel, CacheMode, MinionCache, LINE_SIZE, MAX_LOCKED_WAYS,
    NUM_SETS, NUM_WAYS, RESERVED_SETS,
};
use crate::memory::{line_base, AccessType, CacheOp, MemoryError, Mmu, PhysicalMemory};
use crate::minion::MinionId;
use crate::tensor::{TensorError, TensorFault, TensorMask};
use log::{debug, warn};

/// A walk over `count` consecutive (set, way) entries, starting at `(set, way)`.
///
/// The set advances first. After the last set, the walk wraps to set 0 of the next way, and
/// after the last way to way 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SetWayWalk {
    /// Gate iteration `i` on bit `i` of the tensor mask.
    pub masked: bool,
    pub set: usize,
    pub way: usize,
    pub count: usize,
}

/// A walk over `count` virtual addresses: `vaddr`, `vaddr + stride`, `vaddr + 2 * stride`, ...
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AddressWalk {
    /// Gate iteration `i` on bit `i` of the tensor mask.
    pub masked: bool,
    pub vaddr: u64,
    pub count: usize,
    pub stride: u64,
}

impl AddressWalk {
    /// Iterate over the addresses of the walk, paired with their iteration index.
    fn iter(&self) -> impl Iterator<Item = (usize, u64)> {
        let Self { vaddr, stride, .. } = *self;
        (0..self.count).map(move |i| (i, vaddr.wrapping_add(stride.wrapping_mul(i as u64))))
    }
}

/// Performs cache-management operations on behalf of one hart.
///
/// A controller borrows everything an operation touches: the cache state of the hart's minion,
/// the memory collaborators, and the hart's tensor CSRs. Policy violations and faults never
/// surface as errors. They raise a bit in the hart's [`TensorError`] and stop the operation, and
/// whatever was done before the fault stays done.
///
/// The walking operations return the number of lines they operated on.
pub struct CacheController<'a, M> {
    cache: &'a mut MinionCache,
    memory: &'a mut M,
    minion: MinionId,
    hart_in_minion: usize,
    tensor_error: &'a mut TensorError,
    tensor_mask: TensorMask,
}

impl<'a, M: Mmu + PhysicalMemory> CacheController<'a, M> {
    pub fn new(
        cache: &'a mut MinionCache,
        memory: &'a mut M,
        minion: MinionId,
        hart_in_minion: usize,
        tensor_error: &'a mut TensorError,
        tensor_mask: TensorMask,
    ) -> Self {
        Self {
            cache,
            memory,
            minion,
            hart_in_minion,
            tensor_error,
            tensor_mask,
        }
    }

    /// Handle a write of `value` to `mcache_control`.
    ///
    /// Illegal mode transitions are ignored. Returns the cache mode after the write.
    pub fn write_mode(&mut self, value: u64) -> CacheMode {
        match self.cache.mode.legalize_write(value) {
            Some(mode) => self.change_mode(mode),
            None => debug!(
                "Ignoring mcache_control write {value:#x} in mode {}",
                self.cache.mode
            ),
        }
        self.cache.mode
    }

    /// Switch the minion to cache mode `new`, dropping the locks that the transition invalidates.
    ///
    /// Toggling the split clears every lock of the minion. Toggling only the scratchpad clears
    /// all but the reserved sets, and enabling the scratchpad also zeroes it.
    pub fn change_mode(&mut self, new: CacheMode) {
        let old = self.cache.mode;
        let split_change = old.is_split() != new.is_split();
        let scratchpad_change = old.scratchpad_enabled() != new.scratchpad_enabled();
        self.cache.mode = new;

        if split_change {
            debug!("Cache mode {old} -> {new}: clearing all locks");
            self.cache.locks.clear();
        } else if scratchpad_change {
            debug!("Cache mode {old} -> {new}: clearing locks outside the reserved sets");
            self.cache.locks.clear_sets(0..NUM_SETS - RESERVED_SETS);
        }

        if scratchpad_change && new.scratchpad_enabled() {
            self.memory.clear_l1_scratchpad(self.minion);
        }
    }

    /// Evict or flush the lines held by a range of (set, way) entries, up to level `dest`.
    ///
    /// Locked lines are never evicted. Flushing a line locked at an L2 scratchpad address to the
    /// L3 or beyond is refused, and stops the walk.
    ///
    /// Panics if `walk.way` is not below [`NUM_WAYS`].
    pub fn evict_flush_set_way(&mut self, evict: bool, dest: CacheLevel, walk: SetWayWalk) -> usize {
        if dest == CacheLevel::L1 || walk.set >= NUM_SETS {
            return 0;
        }
        assert!(walk.way < NUM_WAYS, "way {} out of range", walk.way);

        let name = if evict { "EvictSW" } else { "FlushSW" };
        let (mut set, mut way) = (walk.set, walk.way);
        let mut done = 0;
        for i in 0..walk.count {
            let locked = self.cache.locks.get(set, way);
            if self.passes(walk.masked, i) && !(evict && locked.is_some()) {
                let scratchpad = locked.filter(|paddr| is_scratchpad_address(*paddr));
                if let Some(paddr) = scratchpad.filter(|_| dest >= CacheLevel::L3) {
                    debug!(
                        "{name}: set {set}, way {way}, dest {dest} cannot flush L2 scratchpad \
                         address {paddr:#018x}"
                    );
                    self.tensor_error.raise(TensorFault::CacheOpFault);
                    return done;
                }
                debug!("Doing {name}: set {set}, way {way}, dest {dest}");
                done += 1;
            }

            set += 1;
            if set >= NUM_SETS {
                set = 0;
                way = (way + 1) % NUM_WAYS;
            }
        }
        done
    }

    /// Evict or flush the lines at a walk of virtual addresses, up to level `dest`.
    ///
    /// Nothing is pushed into the L1, and an eviction to memory has nowhere to push to, so both
    /// are no-ops. Lines locked in the cache are not evicted.
    pub fn evict_flush_vaddr(&mut self, evict: bool, dest: CacheLevel, walk: AddressWalk) -> usize {
        let name = if evict { "EvictVA" } else { "FlushVA" };
        let op = match (evict, dest) {
            (_, CacheLevel::L1) | (true, CacheLevel::Memory) => return 0,
            (true, CacheLevel::L2) => CacheOp::EvictL2,
            (true, CacheLevel::L3) => CacheOp::EvictL3,
            (false, CacheLevel::L2) => CacheOp::FlushL2,
            (false, CacheLevel::L3) => CacheOp::FlushL3,
            (false, CacheLevel::Memory) => CacheOp::FlushMemory,
        };

        let mut done = 0;
        for (i, vaddr) in walk.iter() {
            if !self.passes(walk.masked, i) {
                continue;
            }
            let paddr = match self.memory.translate(vaddr, AccessType::CacheOp(op)) {
                Ok(paddr) => line_base(paddr),
                Err(error) => {
                    self.fault(name, vaddr, error);
                    return done;
                }
            };
            if evict && self.locked_way(paddr).is_some() {
                debug!("Skipping {name}: {vaddr:#018x} ({paddr:#018x}) is locked");
                continue;
            }
            debug!("Doing {name}: {vaddr:#018x} ({paddr:#018x}), dest {dest}");
            done += 1;
        }
        done
    }

    /// Prefetch the lines at a walk of virtual addresses into level `dest`.
    ///
    /// Prefetching into memory is a no-op.
    pub fn prefetch_vaddr(&mut self, dest: CacheLevel, walk: AddressWalk) -> usize {
        let op = match dest {
            CacheLevel::L1 => CacheOp::PrefetchL1,
            CacheLevel::L2 => CacheOp::PrefetchL2,
            CacheLevel::L3 => CacheOp::PrefetchL3,
            CacheLevel::Memory => return 0,
        };

        let mut done = 0;
        for (i, vaddr) in walk.iter() {
            if !self.passes(walk.masked, i) {
                continue;
            }
            let result = self
                .memory
                .translate(vaddr, AccessType::Prefetch(op))
                .map(line_base)
                .and_then(|paddr| self.memory.read_line(paddr).map(|_| paddr));
            match result {
                Ok(paddr) => {
                    debug!("Doing PrefetchVA: {vaddr:#018x} ({paddr:#018x}), dest {dest}");
                    done += 1;
                }
                Err(error) => {
                    self.fault("PrefetchVA", vaddr, error);
                    return done;
                }
            }
        }
        done
    }

    /// Lock the line at physical address `paddr` into `way` of its set, zeroing the line.
    ///
    /// Refused with [`TensorFault::LockConflict`] if the line is already locked in its set, if
    /// `way` is already locked, or if the set has no lockable way left. Refused with
    /// [`TensorFault::CacheOpFault`] if the address does not permit locking, or if zeroing the
    /// line fails. A refused lock changes nothing.
    ///
    /// Returns `true` if the line was locked.
    pub fn lock_paddr(&mut self, way: usize, paddr: u64) -> bool {
        let paddr = line_base(paddr);
        if !self.memory.check_cacheop_access(paddr, CacheOp::Lock) {
            debug!("LockSW: {paddr:#018x}, way {way} access fault");
            self.tensor_error.raise(TensorFault::CacheOpFault);
            return false;
        }
        self.lock_line(Some(way), paddr, "LockSW")
    }

    /// Unlock `(set, way)`. Unlocking an unlocked or out of range entry does nothing.
    pub fn unlock_set_way(&mut self, set: usize, way: usize) {
        if let Some(paddr) = self.cache.locks.unlock(set, way) {
            debug!("Doing UnlockSW: set {set}, way {way} ({paddr:#018x})");
        }
    }

    /// Unlock whichever way of its set holds the line at physical address `paddr`.
    ///
    /// Returns `true` if a way was unlocked.
    pub fn unlock_paddr(&mut self, paddr: u64) -> bool {
        let paddr = line_base(paddr);
        let set = self.set_index(paddr);
        match self.cache.locks.find(set, paddr) {
            Some(way) => {
                self.cache.locks.unlock(set, way);
                debug!("Doing Unlock: {paddr:#018x}, set {set}, way {way}");
                true
            }
            None => false,
        }
    }

    /// Lock the lines at a walk of virtual addresses, each into the lowest free way of its set.
    ///
    /// The first translation fault or refused lock stops the walk.
    pub fn lock_vaddr(&mut self, walk: AddressWalk) -> usize {
        let mut done = 0;
        for (i, vaddr) in walk.iter() {
            if !self.passes(walk.masked, i) {
                continue;
            }
            let paddr = match self
                .memory
                .translate(vaddr, AccessType::CacheOp(CacheOp::Lock))
            {
                Ok(paddr) => line_base(paddr),
                Err(error) => {
                    self.fault("LockVA", vaddr, error);
                    return done;
                }
            };
            if !self.lock_line(None, paddr, "LockVA") {
                return done;
            }
            done += 1;
        }
        done
    }

    /// Unlock the lines at a walk of virtual addresses. Lines that are not locked are skipped.
    ///
    /// The first translation fault stops the walk.
    pub fn unlock_vaddr(&mut self, walk: AddressWalk) -> usize {
        let mut done = 0;
        for (i, vaddr) in walk.iter() {
            if !self.passes(walk.masked, i) {
                debug!("Skipping UnlockVA: {vaddr:#018x}");
                continue;
            }
            match self
                .memory
                .translate(vaddr, AccessType::CacheOp(CacheOp::Unlock))
            {
                Ok(paddr) => {
                    if self.unlock_paddr(paddr) {
                        done += 1;
                    }
                }
                Err(error) => {
                    self.fault("UnlockVA", vaddr, error);
                    return done;
                }
            }
        }
        done
    }

    /// Lock line-aligned `paddr` into `way`, or into the lowest free way if `way` is `None`.
    fn lock_line(&mut self, way: Option<usize>, paddr: u64, name: &str) -> bool {
        let set = self.set_index(paddr);
        let locks = &self.cache.locks;

        let conflict = (0..NUM_WAYS).find(|w| {
            locks
                .get(set, *w)
                .is_some_and(|locked| Some(*w) == way || locked == paddr)
        });
        if let Some(w) = conflict {
            debug!(
                "{name}: {paddr:#018x}, way {way:?} double-locking on way {w} (addr: {:#018x})",
                locks.get(set, w).unwrap_or_default()
            );
            self.tensor_error.raise(TensorFault::LockConflict);
            return false;
        }

        let way = if locks.locked_ways(set) >= MAX_LOCKED_WAYS {
            None
        } else {
            way.filter(|way| *way < NUM_WAYS)
                .or_else(|| locks.free_way(set))
        };
        let Some(way) = way else {
            debug!("{name}: {paddr:#018x}, set {set} has no way left to lock");
            self.tensor_error.raise(TensorFault::LockConflict);
            return false;
        };

        if let Err(error) = self.memory.write_line(paddr, &[0; LINE_SIZE]) {
            self.fault(name, paddr, error);
            return false;
        }
        self.cache.locks.lock(set, way, paddr);
        debug!("Doing {name}: {paddr:#018x}, set {set}, way {way}");
        true
    }

    /// Returns the way of its set that line-aligned `paddr` is locked into, if any.
    fn locked_way(&self, paddr: u64) -> Option<usize> {
        self.cache.locks.find(self.set_index(paddr), paddr)
    }

    fn set_index(&self, paddr: u64) -> usize {
        self.cache.mode.set_index(paddr, self.hart_in_minion)
    }

    fn passes(&self, masked: bool, iteration: usize) -> bool {
        !masked || self.tensor_mask.passes(iteration)
    }

    /// Record a fault that stops the operation `name` at `address`.
    fn fault(&mut self, name: &str, address: u64, error: MemoryError) {
        if error.is_bus_error() {
            warn!("{name}: {address:#018x} bus error");
        } else {
            debug!("{name}: {address:#018x} generated {error} (suppressed)");
        }
        self.tensor_error.raise(TensorFault::CacheOpFault);
    }
}
