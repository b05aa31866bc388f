// rust/ckpt-core/src/region.rs

//! Registry of caller-owned memory regions.
//!
//! The registry never owns the memory it describes. Each entry is a raw
//! pointer plus a byte length handed over by the caller through an
//! `unsafe` registration call; the caller promises the range stays valid
//! for every client call that reads or writes it (checkpoint write and
//! recover). Entries are kept in a `BTreeMap` so iteration is always in
//! ascending id order, which fixes the catalog order on disk.

use std::collections::BTreeMap;
use std::mem;

/// Caller-assigned identifier of a protected region.
pub type RegionId = i32;

/// A non-owning handle on a caller-managed memory range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    id: RegionId,
    ptr: *mut u8,
    len: usize,
}

impl MemoryRegion {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Views the region as bytes.
    ///
    /// # Safety
    ///
    /// The registration contract must still hold: the range is valid for
    /// reads and nothing writes to it for the lifetime of the slice.
    pub(crate) unsafe fn as_bytes(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.ptr, self.len)
    }

    /// Views the region as mutable bytes.
    ///
    /// # Safety
    ///
    /// The registration contract must still hold: the range is valid for
    /// writes and nothing else accesses it for the lifetime of the slice.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn as_bytes_mut(&self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        std::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

/// Id-ordered map of protected regions.
#[derive(Debug, Default)]
pub struct Registry {
    regions: BTreeMap<RegionId, MemoryRegion>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers) `len` bytes at `ptr` under `id`.
    ///
    /// Registering an id that is already present overwrites its address and
    /// length. Always succeeds.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes for as long
    /// as the entry stays registered and a checkpoint write or recovery may
    /// touch it, and nothing else may access the range while such a call is
    /// running.
    pub unsafe fn protect(&mut self, id: RegionId, ptr: *mut u8, len: usize) -> bool {
        self.regions.insert(id, MemoryRegion { id, ptr, len });
        true
    }

    /// Registers a typed slice, covering `slice.len() * size_of::<T>()` bytes.
    ///
    /// # Safety
    ///
    /// Same contract as [`Registry::protect`]: the slice's backing storage
    /// must outlive the registration, and `T` must be valid for any bit
    /// pattern a recovery may write into it.
    pub unsafe fn protect_slice<T: Copy>(&mut self, id: RegionId, slice: &mut [T]) -> bool {
        let len = mem::size_of_val(slice);
        self.protect(id, slice.as_mut_ptr().cast::<u8>(), len)
    }

    /// Removes a registration. Returns true iff an entry existed.
    pub fn unprotect(&mut self, id: RegionId) -> bool {
        self.regions.remove(&id).is_some()
    }

    pub fn get(&self, id: RegionId) -> Option<&MemoryRegion> {
        self.regions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.regions.keys().copied()
    }

    /// Regions in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion> + '_ {
        self.regions.values()
    }

    /// Sum of the byte lengths of every registered region.
    pub fn total_bytes(&self) -> usize {
        self.regions.values().map(|r| r.len).sum()
    }
}
