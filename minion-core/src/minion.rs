//! Minions and their harts.
//!
//! A minion is one physical core. Its two harts share the L1 data cache, so the cache mode and
//! the lock table live in the [`Minion`], behind a mutex that every cache operation holds for its
//! whole duration. The tensor CSRs are per hart.

use crate::cache::csr::{CacheCsr, CacheRequest, CsrSpecifier, UnknownCacheCsr};
use crate::cache::{CacheController, CacheMode, LockTable, MinionCache, HARTS_PER_MINION};
use crate::memory::{Mmu, PhysicalMemory};
use crate::tensor::{TensorError, TensorMask};
use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MinionId(pub usize);

/// Global index of a hart. Harts `2n` and `2n + 1` belong to minion `n`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HartId(pub usize);

impl HartId {
    pub fn minion(self) -> MinionId {
        MinionId(self.0 / HARTS_PER_MINION)
    }

    /// The index of the hart within its minion.
    pub fn hart_in_minion(self) -> usize {
        self.0 % HARTS_PER_MINION
    }
}

impl fmt::Display for MinionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "minion {}", self.0)
    }
}

impl fmt::Display for HartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hart {}", self.0)
    }
}

/// The state shared by the harts of one minion.
#[derive(Debug)]
pub struct Minion {
    id: MinionId,
    cache: Mutex<MinionCache>,
}

impl Minion {
    /// Create a minion in the shared cache mode, with nothing locked.
    pub fn new(id: MinionId) -> Self {
        Self {
            id,
            cache: Mutex::new(MinionCache::new()),
        }
    }

    pub fn id(&self) -> MinionId {
        self.id
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache.lock().mode()
    }

    /// Returns a snapshot of the lock table.
    pub fn locks(&self) -> LockTable {
        self.cache.lock().locks().clone()
    }
}

/// One hardware thread.
#[derive(Debug)]
pub struct Hart {
    id: HartId,
    minion: Arc<Minion>,
    tensor_error: TensorError,
    tensor_mask: TensorMask,
}

impl Hart {
    /// Create hart `id` of `minion`, with a clear error register and an all-pass mask.
    ///
    /// Panics if `id` does not belong to `minion`.
    pub fn new(id: HartId, minion: Arc<Minion>) -> Self {
        assert_eq!(id.minion(), minion.id(), "{id} does not belong to {}", minion.id());
        Self {
            id,
            minion,
            tensor_error: TensorError::new(),
            tensor_mask: TensorMask::new(),
        }
    }

    pub fn id(&self) -> HartId {
        self.id
    }

    pub fn minion(&self) -> &Arc<Minion> {
        &self.minion
    }

    pub fn tensor_error(&self) -> TensorError {
        self.tensor_error
    }

    pub fn tensor_mask(&self) -> TensorMask {
        self.tensor_mask
    }

    /// Run `f` with a [`CacheController`] acting for this hart on `memory`.
    ///
    /// The minion's cache state stays locked while `f` runs, so the other hart of the minion
    /// cannot observe a partially performed operation.
    pub fn with_cache_controller<M, R>(
        &mut self,
        memory: &mut M,
        f: impl FnOnce(&mut CacheController<'_, M>) -> R,
    ) -> R
    where
        M: Mmu + PhysicalMemory,
    {
        let mut cache = self.minion.cache.lock();
        let mut controller = CacheController::new(
            &mut cache,
            memory,
            self.id.minion(),
            self.id.hart_in_minion(),
            &mut self.tensor_error,
            self.tensor_mask,
        );
        f(&mut controller)
    }

    /// Read one of the [`CacheCsr`]s. The operation CSRs read as zero.
    pub fn read_cache_csr(&self, csr: CsrSpecifier) -> Result<u64, UnknownCacheCsr> {
        Ok(match CacheCsr::try_from(csr)? {
            CacheCsr::CacheControl => u64::from(self.minion.cache_mode().bits()),
            CacheCsr::TensorMask => self.tensor_mask.read(),
            CacheCsr::TensorError => self.tensor_error.read(),
            _ => 0,
        })
    }

    /// Write `value` to one of the [`CacheCsr`]s, performing the cache operation it requests.
    ///
    /// `x31` is the current value of register `x31`, which holds the stride of the by-address
    /// operations.
    pub fn write_cache_csr<M>(
        &mut self,
        csr: CsrSpecifier,
        value: u64,
        x31: u64,
        memory: &mut M,
    ) -> Result<(), UnknownCacheCsr>
    where
        M: Mmu + PhysicalMemory,
    {
        let request = CacheRequest::decode(csr, value, x31)?;
        trace!("{}: {request:?}", self.id);
        self.execute(request, memory);
        Ok(())
    }

    /// Perform a decoded cache CSR write.
    pub fn execute<M>(&mut self, request: CacheRequest, memory: &mut M)
    where
        M: Mmu + PhysicalMemory,
    {
        match request {
            CacheRequest::WriteTensorMask(value) => self.tensor_mask.write(value),
            CacheRequest::WriteTensorError(value) => self.tensor_error.write(value),
            CacheRequest::WriteCacheControl(value) => {
                self.with_cache_controller(memory, |c| c.write_mode(value));
            }
            CacheRequest::EvictSetWay { dest, walk } => {
                self.with_cache_controller(memory, |c| c.evict_flush_set_way(true, dest, walk));
            }
            CacheRequest::FlushSetWay { dest, walk } => {
                self.with_cache_controller(memory, |c| c.evict_flush_set_way(false, dest, walk));
            }
            CacheRequest::LockSetWay { way, paddr } => {
                self.with_cache_controller(memory, |c| c.lock_paddr(way, paddr));
            }
            CacheRequest::UnlockSetWay { set, way } => {
                self.with_cache_controller(memory, |c| c.unlock_set_way(set, way));
            }
            CacheRequest::EvictVirtual { dest, walk } => {
                self.with_cache_controller(memory, |c| c.evict_flush_vaddr(true, dest, walk));
            }
            CacheRequest::FlushVirtual { dest, walk } => {
                self.with_cache_controller(memory, |c| c.evict_flush_vaddr(false, dest, walk));
            }
            CacheRequest::PrefetchVirtual { dest, walk } => {
                self.with_cache_controller(memory, |c| c.prefetch_vaddr(dest, walk));
            }
            CacheRequest::LockVirtual { walk } => {
                self.with_cache_controller(memory, |c| c.lock_vaddr(walk));
            }
            CacheRequest::UnlockVirtual { walk } => {
                self.with_cache_controller(memory, |c| c.unlock_vaddr(walk));
            }
        }
    }
}

assert_impl_all!(Minion: Send, Sync);
assert_impl_all!(Hart: Send);
