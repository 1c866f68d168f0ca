//! The raw region provider contract (§1 of the design: "out of scope,
//! listed with the contract the core requires from each collaborator").
//!
//! The heap core never talks to `sbrk` or a backing buffer directly — it
//! only ever asks a [`RegionProvider`] to grow the region and to report its
//! current bounds. Production code backs this with [`SbrkRegion`]; tests
//! back it with [`VecRegion`], a fixed-capacity buffer that can simulate
//! out-of-memory by refusing to grow past its capacity.

use libc::{c_void, intptr_t, sbrk};

/// Supplies heap bytes to the core allocator.
///
/// The region is byte-addressable, never shrinks, and `extend` is the only
/// way the core acquires new bytes. Implementations must return the *same*
/// address from consecutive `extend` calls that a straight-line `lo()`/`hi()`
/// pair would predict — i.e. growth is always contiguous and monotonic.
pub trait RegionProvider {
    /// Grows the region by exactly `bytes`, returning the address of the
    /// first newly available byte, or `None` on failure (fault).
    fn extend(&mut self, bytes: usize) -> Option<*mut u8>;

    /// The lowest address ever handed out by this provider.
    fn lo(&self) -> *mut u8;

    /// One past the highest address currently committed.
    fn hi(&self) -> *mut u8;
}

/// A [`RegionProvider`] that grows the process break via `sbrk(2)`.
///
/// `Heap` only ever calls `extend` in `CHUNK`-sized batches rather than once
/// per allocation, so `sbrk` overhead is amortized across many requests.
pub struct SbrkRegion {
    start: *mut u8,
    current: *mut u8,
}

// The process break is process-wide state, not thread-local; a region
// handle is sound to move to another thread as long as callers don't
// also share it without synchronization (see `global::GlobalHeap`).
unsafe impl Send for SbrkRegion {}

impl SbrkRegion {
    /// Captures the current program break as the region's low bound.
    pub fn new() -> Self {
        let start = unsafe { sbrk(0) } as *mut u8;
        Self { start, current: start }
    }
}

impl Default for SbrkRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionProvider for SbrkRegion {
    fn extend(&mut self, bytes: usize) -> Option<*mut u8> {
        let raw = unsafe { sbrk(bytes as intptr_t) };
        if raw == usize::MAX as *mut c_void {
            return None;
        }
        let old_break = raw as *mut u8;
        self.current = unsafe { old_break.add(bytes) };
        Some(old_break)
    }

    fn lo(&self) -> *mut u8 {
        self.start
    }

    fn hi(&self) -> *mut u8 {
        self.current
    }
}

/// A [`RegionProvider`] backed by a fixed-capacity, heap-allocated buffer.
///
/// The buffer is boxed once at construction and never moved or
/// reallocated, so addresses handed out to the core stay valid for the
/// provider's lifetime — growth only ever advances a `committed` watermark
/// within the reserved capacity, the same way a real OS reserves address
/// space ahead of committing pages to it. Requesting growth past the
/// reserved capacity returns `None`, which is how tests simulate an
/// out-of-memory condition deterministically.
pub struct VecRegion {
    buf: Box<[u8]>,
    committed: usize,
}

/// Default reservation for [`VecRegion::default`]; generous enough for the
/// boundary scenarios in the test suite without making every test allocate
/// a large buffer up front being a concern (1 MiB).
pub const DEFAULT_CAPACITY: usize = 1 << 20;

impl VecRegion {
    /// Reserves `capacity` bytes of address space up front; nothing is
    /// committed until `extend` is called.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            committed: 0,
        }
    }

    /// Bytes still available to commit.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.committed
    }
}

impl Default for VecRegion {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RegionProvider for VecRegion {
    fn extend(&mut self, bytes: usize) -> Option<*mut u8> {
        let new_committed = self.committed.checked_add(bytes)?;
        if new_committed > self.buf.len() {
            return None;
        }
        let addr = unsafe { self.buf.as_mut_ptr().add(self.committed) };
        self.committed = new_committed;
        Some(addr)
    }

    fn lo(&self) -> *mut u8 {
        self.buf.as_ptr() as *mut u8
    }

    fn hi(&self) -> *mut u8 {
        unsafe { self.buf.as_ptr().add(self.committed) as *mut u8 }
    }
}
