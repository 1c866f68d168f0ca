//! The allocator core (C2: heap framing, C6: public operations).
//!
//! `Heap<R>` owns one contiguous, monotonically growing region obtained
//! from a [`RegionProvider`]. The region is framed by a prologue block
//! (always allocated, `2*WORD` bytes) and an epilogue block (always
//! allocated, zero payload) so [`block::prev_block`]/[`block::next_block`]
//! never have to special-case the ends of the heap.
//!
//! ```text
//! base                                                      region.hi()
//! |pad|prologue hdr|prologue ftr|epilogue hdr| ... free/allocated blocks ... |
//!      ^-- prologue bp                        ^-- first real block
//! ```
//!
//! Growing the heap overwrites the old epilogue header with the new
//! block's header and writes a fresh epilogue header past the newly
//! committed bytes — the region provider's contiguity guarantee is what
//! makes this safe.

use std::ptr;

use tracing::{debug, instrument, trace, warn};

use crate::block::{self, MIN_BLOCK, WORD};
use crate::coalesce;
use crate::error::HeapError;
use crate::free_list::FreeList;
use crate::placement;
use crate::region::RegionProvider;

/// Default extension granularity when the free list can't satisfy a
/// request and the region must grow.
pub const CHUNK: usize = 4096;

/// A single-threaded explicit-free-list allocator over one growable region.
pub struct Heap<R: RegionProvider> {
    region: R,
    base: *mut u8,
    free: FreeList,
}

// `Heap` owns raw pointers into its own region and is never implicitly
// shareable across threads; callers who need that provide their own
// synchronization (see `global::GlobalHeap`).
unsafe impl<R: RegionProvider + Send> Send for Heap<R> {}

impl<R: RegionProvider> Heap<R> {
    /// Lays down the prologue/epilogue sentinels and an initial chunk of
    /// free space.
    #[instrument(skip(region))]
    pub fn initialize(mut region: R) -> Result<Self, HeapError> {
        let raw = region
            .extend(4 * WORD)
            .ok_or(HeapError::InitialExtensionFailed)?;
        let base = raw;

        unsafe {
            let prologue_bp = base.add(2 * WORD);
            block::write_block(prologue_bp, (2 * WORD) as u32, true);
            (base.add(3 * WORD) as *mut u32).write(block::pack(0, true));
        }

        let mut heap = Self {
            region,
            base,
            free: FreeList::new(),
        };

        heap.extend(CHUNK)
            .ok_or(HeapError::InitialExtensionFailed)?;

        debug!(base = ?heap.base, chunk = CHUNK, "heap initialized");
        Ok(heap)
    }

    /// Grows the region by `bytes` (must already be `ALIGN`-aligned),
    /// frames the new space as a free block, coalesces it with whatever
    /// was previously the rightmost block, and links it in.
    fn extend(&mut self, bytes: usize) -> Option<*mut u8> {
        debug_assert_eq!(bytes % block::ALIGN, 0);
        let bp = self.region.extend(bytes)?;
        unsafe {
            block::write_block(bp, bytes as u32, false);
            let epilogue = block::next_block(bp);
            (block::header(epilogue)).write(block::pack(0, true));

            let bp = coalesce::coalesce(&mut self.free, self.base, bp);
            self.free.insert(self.base, bp);
            trace!(bytes, "extended region");
            Some(bp)
        }
    }

    /// Allocates at least `requested` bytes, returning a null pointer on
    /// failure (region exhaustion). A `requested` of zero returns null
    /// without touching the heap, matching the libc convention this
    /// allocator's fallback path relies on.
    #[instrument(skip(self))]
    pub unsafe fn allocate(&mut self, requested: usize) -> *mut u8 {
        if requested == 0 {
            return ptr::null_mut();
        }
        let sz = block::adjust_request(requested);

        let bp = match unsafe { placement::first_fit(&self.free, self.base, sz) } {
            Some(bp) => bp,
            None => {
                let extend_size = sz.max(CHUNK as u32) as usize;
                match self.extend(extend_size) {
                    Some(bp) => bp,
                    None => {
                        warn!(requested, "region exhausted, allocation failed");
                        return ptr::null_mut();
                    }
                }
            }
        };

        unsafe {
            self.free.remove(self.base, bp);
            placement::place(&mut self.free, self.base, bp, sz);
        }
        bp
    }

    /// Returns a previously allocated block to the free list, coalescing
    /// with free physical neighbors. A null `bp` is a no-op.
    #[instrument(skip(self))]
    pub unsafe fn free(&mut self, bp: *mut u8) {
        if bp.is_null() {
            return;
        }
        unsafe {
            let sz = block::size(bp);
            block::write_block(bp, sz, false);
            let bp = coalesce::coalesce(&mut self.free, self.base, bp);
            self.free.insert(self.base, bp);
        }
    }

    /// Resizes a previously allocated block, trying (in order) shrink in
    /// place, grow into a free right neighbor, then falling back to
    /// allocate-copy-free. `bp == null` behaves like `allocate`; `requested
    /// == 0` behaves like `free` and returns null.
    #[instrument(skip(self))]
    pub unsafe fn reallocate(&mut self, bp: *mut u8, requested: usize) -> *mut u8 {
        if bp.is_null() {
            return unsafe { self.allocate(requested) };
        }
        if requested == 0 {
            unsafe { self.free(bp) };
            return ptr::null_mut();
        }

        let sz = block::adjust_request(requested);
        let old_size = unsafe { block::size(bp) };

        if sz <= old_size {
            let remainder = old_size - sz;
            if remainder >= MIN_BLOCK as u32 {
                unsafe {
                    block::write_block(bp, sz, true);
                    let next = block::next_block(bp);
                    block::write_block(next, remainder, false);
                    let next = coalesce::coalesce(&mut self.free, self.base, next);
                    self.free.insert(self.base, next);
                }
            }
            return bp;
        }

        let next = unsafe { block::next_block(bp) };
        if !unsafe { block::allocated(next) } {
            let combined = old_size + unsafe { block::size(next) };
            if combined >= sz {
                unsafe { self.free.remove(self.base, next) };
                let remainder = combined - sz;
                unsafe {
                    if remainder >= MIN_BLOCK as u32 {
                        block::write_block(bp, sz, true);
                        let tail = block::next_block(bp);
                        block::write_block(tail, remainder, false);
                        self.free.insert(self.base, tail);
                    } else {
                        block::write_block(bp, combined, true);
                    }
                }
                return bp;
            }
        }

        let new_bp = unsafe { self.allocate(requested) };
        if new_bp.is_null() {
            return ptr::null_mut();
        }
        let copy_len = (old_size as usize - 2 * WORD).min(requested);
        unsafe {
            ptr::copy_nonoverlapping(bp, new_bp, copy_len);
            self.free(bp);
        }
        new_bp
    }

    /// The region's low address (where the prologue lives).
    pub(crate) fn base(&self) -> *mut u8 {
        self.base
    }

    /// Payload pointer of the first real (non-sentinel) block.
    pub(crate) fn first_block(&self) -> *mut u8 {
        unsafe {
            let prologue_bp = self.base.add(2 * WORD);
            block::next_block(prologue_bp)
        }
    }

    pub(crate) fn free_list(&self) -> &FreeList {
        &self.free
    }

    pub(crate) fn region(&self) -> &R {
        &self.region
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::VecRegion;

    fn new_heap(capacity: usize) -> Heap<VecRegion> {
        Heap::initialize(VecRegion::with_capacity(capacity)).unwrap()
    }

    #[test]
    fn allocate_returns_null_for_zero_request() {
        let mut heap = new_heap(1 << 16);
        assert!(unsafe { heap.allocate(0) }.is_null());
    }

    #[test]
    fn tiny_request_gets_minimum_block() {
        let mut heap = new_heap(1 << 16);
        let bp = unsafe { heap.allocate(1) };
        assert!(!bp.is_null());
        assert_eq!(unsafe { block::size(bp) }, MIN_BLOCK as u32);
        assert!(unsafe { block::allocated(bp) });
    }

    #[test]
    fn allocate_exact_and_split_remainder() {
        let mut heap = new_heap(1 << 16);
        // Drain the initial chunk down to a single, precisely sized free
        // block so the next allocate's split math is observable.
        let _ = unsafe { heap.allocate(CHUNK - 64) };
        let bp = unsafe { heap.allocate(8) };
        assert!(!bp.is_null());
        assert_eq!(unsafe { block::size(bp) }, 16);
    }

    #[test]
    fn free_then_allocate_reuses_freed_block_lifo() {
        let mut heap = new_heap(1 << 16);
        let a = unsafe { heap.allocate(16) };
        let b = unsafe { heap.allocate(16) };
        unsafe {
            heap.free(a);
            heap.free(b);
        }
        // LIFO free list: b was freed last, so it's reused first.
        let c = unsafe { heap.allocate(16) };
        assert_eq!(c, b);
    }

    #[test]
    fn free_coalesces_adjacent_blocks() {
        let mut heap = new_heap(1 << 16);
        let a = unsafe { heap.allocate(16) };
        let b = unsafe { heap.allocate(16) };
        let c = unsafe { heap.allocate(16) };
        unsafe {
            heap.free(a);
            heap.free(c);
            heap.free(b);
        }
        // All three should have merged into one free block headed at `a`.
        unsafe {
            assert!(!block::allocated(a));
            assert_eq!(block::size(a), 16 * 3);
        }
    }

    #[test]
    fn reallocate_shrink_in_place_keeps_pointer() {
        let mut heap = new_heap(1 << 16);
        let bp = unsafe { heap.allocate(100) };
        let shrunk = unsafe { heap.reallocate(bp, 8) };
        assert_eq!(shrunk, bp);
        assert_eq!(unsafe { block::size(bp) }, 16);
    }

    #[test]
    fn reallocate_grows_into_free_right_neighbor() {
        let mut heap = new_heap(1 << 16);
        let a = unsafe { heap.allocate(16) };
        let b = unsafe { heap.allocate(16) };
        unsafe { heap.free(b) };
        let grown = unsafe { heap.reallocate(a, 64) };
        assert_eq!(grown, a);
        assert!(unsafe { block::size(a) } >= block::adjust_request(64));
    }

    #[test]
    fn reallocate_falls_back_to_copy_when_neighbor_unusable() {
        let mut heap = new_heap(1 << 16);
        let a = unsafe { heap.allocate(16) };
        let _b = unsafe { heap.allocate(16) }; // keeps a's right neighbor allocated
        unsafe {
            ptr::write_bytes(a, 0xAB, 8);
        }
        let moved = unsafe { heap.reallocate(a, 64) };
        assert_ne!(moved, a);
        assert!(!moved.is_null());
        let byte = unsafe { ptr::read(moved) };
        assert_eq!(byte, 0xAB);
    }

    #[test]
    fn reallocate_with_null_pointer_behaves_like_allocate() {
        let mut heap = new_heap(1 << 16);
        let bp = unsafe { heap.reallocate(ptr::null_mut(), 32) };
        assert!(!bp.is_null());
    }

    #[test]
    fn reallocate_with_zero_size_behaves_like_free() {
        let mut heap = new_heap(1 << 16);
        let bp = unsafe { heap.allocate(32) };
        let result = unsafe { heap.reallocate(bp, 0) };
        assert!(result.is_null());
        assert!(!unsafe { block::allocated(bp) });
    }

    #[test]
    fn out_of_memory_returns_null_without_panicking() {
        let mut heap = new_heap(4 * WORD + CHUNK);
        // First chunk is already committed by `initialize`; this request
        // forces another extend that the capacity can't satisfy.
        let bp = unsafe { heap.allocate(CHUNK * 2) };
        assert!(bp.is_null());
    }

    #[test]
    fn extend_grows_by_more_than_chunk_for_large_requests() {
        let mut heap = new_heap(1 << 20);
        let bp = unsafe { heap.allocate(CHUNK * 2) };
        assert!(!bp.is_null());
        assert!(unsafe { block::size(bp) } as usize >= CHUNK * 2);
    }

    mod properties {
        use super::*;
        use crate::diagnostics;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Alloc(usize),
            Free(usize),
            Realloc(usize, usize),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1usize..256).prop_map(Op::Alloc),
                (0usize..32).prop_map(Op::Free),
                (0usize..32, 1usize..256).prop_map(|(i, sz)| Op::Realloc(i, sz)),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Any sequence of allocate/free/reallocate calls against a
            /// generously sized region leaves the heap's physical block
            /// chain and free list in agreement.
            #[test]
            fn random_workload_preserves_consistency(ops in prop::collection::vec(op_strategy(), 0..80)) {
                let mut heap = new_heap(1 << 22);
                let mut live: Vec<*mut u8> = Vec::new();

                for op in ops {
                    match op {
                        Op::Alloc(sz) => {
                            let bp = unsafe { heap.allocate(sz) };
                            if !bp.is_null() {
                                live.push(bp);
                            }
                        }
                        Op::Free(idx) => {
                            if !live.is_empty() {
                                let bp = live.remove(idx % live.len());
                                unsafe { heap.free(bp) };
                            }
                        }
                        Op::Realloc(idx, sz) => {
                            if !live.is_empty() {
                                let i = idx % live.len();
                                let bp = live[i];
                                let new_bp = unsafe { heap.reallocate(bp, sz) };
                                if new_bp.is_null() {
                                    live.remove(i);
                                } else {
                                    live[i] = new_bp;
                                }
                            }
                        }
                    }

                    let violations = unsafe { diagnostics::check(&heap) };
                    prop_assert!(violations.is_empty(), "{:?}", violations);
                }
            }
        }
    }
}
