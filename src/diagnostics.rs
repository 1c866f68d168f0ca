//! Consistency checker (C7, optional by design — see spec §4.7).
//!
//! Walks the heap two ways: linearly over every physical block between the
//! prologue and epilogue, and separately over the free list (bounded, so a
//! corrupted cyclic list is reported rather than hung on), cross checking
//! that the two views agree. Returns violations rather than panicking or
//! printing, so callers (tests, a debug CLI) decide what to do with them.
//!
//! Validates, per spec §7/§8: prologue/epilogue intact, every block
//! A-aligned, header==footer agreement, no two adjacent free blocks, every
//! free block reachable from the list head and vice versa, every free-list
//! node inside the region's current bounds, and free-list acyclicity.

use std::collections::HashSet;

use tracing::warn;

use crate::block;
use crate::heap::Heap;
use crate::region::RegionProvider;

/// A single inconsistency found by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// Two physically adjacent blocks are both free — they should have
    /// been coalesced.
    UncoalescedFreeNeighbors { first: usize, second: usize },
    /// A block reachable from the free list is tagged allocated.
    AllocatedBlockInFreeList { block: usize },
    /// A free block is not reachable by walking the free list.
    FreeBlockMissingFromList { block: usize },
    /// A block's header and footer tags disagree.
    HeaderFooterMismatch { block: usize },
    /// A block's size is below the minimum block size.
    UndersizedBlock { block: usize, size: u32 },
    /// A free-list node lies outside the region's current bounds.
    FreeNodeOutOfBounds { block: usize },
    /// A block's payload address is not `ALIGN`-aligned.
    MisalignedBlock { block: usize },
    /// The free list revisited a node (or exceeded the maximum possible
    /// number of free blocks), which can only happen if it is cyclic.
    FreeListCycle { at: usize },
    /// The prologue's header/footer tags don't match `(2*WORD, allocated)`.
    PrologueCorrupt { tag: u32 },
    /// The epilogue's header tag doesn't match `(0, allocated)`.
    EpilogueCorrupt { tag: u32 },
}

/// Checks every consistency invariant the allocator is supposed to
/// maintain between public operations.
///
/// # Safety
/// `heap` must be in a quiescent state (no operation in progress).
pub unsafe fn check<R: RegionProvider>(heap: &Heap<R>) -> Vec<ConsistencyViolation> {
    let mut violations = Vec::new();
    let base = heap.base() as usize;

    let (lo, hi) = (heap.region().lo() as usize, heap.region().hi() as usize);

    unsafe {
        let prologue_bp = heap.base().add(2 * block::WORD);
        let expected_prologue = block::pack((2 * block::WORD) as u32, true);
        let prologue_header = block::header(prologue_bp).read();
        let prologue_footer = block::footer(prologue_bp).read();
        if prologue_header != expected_prologue || prologue_footer != expected_prologue {
            violations.push(ConsistencyViolation::PrologueCorrupt { tag: prologue_header });
        }
    }

    // The free list can only be acyclic if it has no more nodes than there
    // are possible minimum-size blocks in the committed region; walking
    // further than that without hitting the sentinel `NULL` link proves a
    // cycle, so the walk below never runs unbounded.
    let max_free_nodes = (hi - lo) / block::MIN_BLOCK + 1;
    let mut free_blocks = HashSet::new();
    unsafe {
        let mut seen = HashSet::new();
        for bp in heap.free_list().iter(heap.base()).take(max_free_nodes + 1) {
            let addr = bp as usize - base;
            if !seen.insert(addr) {
                violations.push(ConsistencyViolation::FreeListCycle { at: addr });
                break;
            }
            free_blocks.insert(addr);
            if block::allocated(bp) {
                violations.push(ConsistencyViolation::AllocatedBlockInFreeList { block: addr });
            }
            if (bp as usize) < lo || (bp as usize) >= hi {
                violations.push(ConsistencyViolation::FreeNodeOutOfBounds { block: addr });
            }
            if seen.len() > max_free_nodes {
                violations.push(ConsistencyViolation::FreeListCycle { at: addr });
                break;
            }
        }
    }

    let mut bp = heap.first_block();
    let mut prev_was_free = false;
    loop {
        let sz = unsafe { block::size(bp) };
        if sz == 0 {
            let epilogue_tag = unsafe { block::header(bp).read() };
            if epilogue_tag != block::pack(0, true) {
                violations.push(ConsistencyViolation::EpilogueCorrupt { tag: epilogue_tag });
            }
            break;
        }
        let addr = bp as usize - base;

        if (bp as usize) % block::ALIGN != 0 {
            violations.push(ConsistencyViolation::MisalignedBlock { block: addr });
        }

        if sz < block::MIN_BLOCK as u32 {
            violations.push(ConsistencyViolation::UndersizedBlock { block: addr, size: sz });
        }

        let header_tag = unsafe { block::header(bp).read() };
        let footer_tag = unsafe { block::footer(bp).read() };
        if header_tag != footer_tag {
            violations.push(ConsistencyViolation::HeaderFooterMismatch { block: addr });
        }

        let is_free = !unsafe { block::allocated(bp) };
        if is_free {
            if prev_was_free {
                let prev_addr = unsafe { block::prev_block(bp) } as usize - base;
                violations.push(ConsistencyViolation::UncoalescedFreeNeighbors {
                    first: prev_addr,
                    second: addr,
                });
            }
            if !free_blocks.remove(&addr) {
                violations.push(ConsistencyViolation::FreeBlockMissingFromList { block: addr });
            }
        }
        prev_was_free = is_free;

        bp = unsafe { block::next_block(bp) };
    }

    for leftover in free_blocks {
        violations.push(ConsistencyViolation::FreeBlockMissingFromList { block: leftover });
    }

    if !violations.is_empty() {
        warn!(count = violations.len(), "heap consistency violations found");
    }
    violations
}

/// Logs a human-readable dump of every block in the heap at `debug` level.
///
/// # Safety
/// Same requirement as [`check`].
pub unsafe fn dump<R: RegionProvider>(heap: &Heap<R>) {
    let base = heap.base() as usize;
    let mut bp = heap.first_block();
    loop {
        let sz = unsafe { block::size(bp) };
        if sz == 0 {
            tracing::debug!(addr = bp as usize - base, "epilogue");
            break;
        }
        let alloc = unsafe { block::allocated(bp) };
        tracing::debug!(addr = bp as usize - base, size = sz, allocated = alloc, "block");
        bp = unsafe { block::next_block(bp) };
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
    fn freshly_initialized_heap_is_consistent() {
        let heap = new_heap(1 << 16);
        let violations = unsafe { check(&heap) };
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn heap_stays_consistent_through_alloc_free_cycles() {
        let mut heap = new_heap(1 << 16);
        let mut ptrs = Vec::new();
        for i in 0..20 {
            ptrs.push(unsafe { heap.allocate(8 + i) });
        }
        for (i, &p) in ptrs.iter().enumerate() {
            if i % 2 == 0 {
                unsafe { heap.free(p) };
            }
        }
        let violations = unsafe { check(&heap) };
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn heap_stays_consistent_after_reallocate_sequence() {
        let mut heap = new_heap(1 << 16);
        let mut bp = unsafe { heap.allocate(16) };
        for sz in [32, 8, 128, 4] {
            bp = unsafe { heap.reallocate(bp, sz) };
            assert!(!bp.is_null());
        }
        let violations = unsafe { check(&heap) };
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn detects_cyclic_free_list_without_hanging() {
        let mut heap = new_heap(1 << 16);
        let a = unsafe { heap.allocate(16) };
        unsafe { heap.free(a) };
        // `a` is now the free-list head; point its own `next` link back at
        // itself, forming a one-node cycle the walk must not loop forever on.
        let self_offset = (a as usize - heap.base() as usize) as u32;
        unsafe { (a as *mut u32).write(self_offset) };

        let violations = unsafe { check(&heap) };
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, ConsistencyViolation::FreeListCycle { .. })),
            "{violations:?}"
        );
    }

    #[test]
    fn detects_corrupted_prologue() {
        let heap = new_heap(1 << 16);
        unsafe {
            let prologue_bp = heap.base().add(2 * block::WORD);
            block::header(prologue_bp).write(block::pack(4 * block::WORD as u32, true));
        }

        let violations = unsafe { check(&heap) };
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, ConsistencyViolation::PrologueCorrupt { .. })),
            "{violations:?}"
        );
    }

    #[test]
    fn detects_corrupted_epilogue() {
        let heap = new_heap(1 << 16);
        unsafe {
            let mut bp = heap.first_block();
            while block::size(bp) != 0 {
                bp = block::next_block(bp);
            }
            block::header(bp).write(block::pack(0, false));
        }

        let violations = unsafe { check(&heap) };
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, ConsistencyViolation::EpilogueCorrupt { .. })),
            "{violations:?}"
        );
    }

    #[test]
    fn detects_misaligned_block() {
        let mut heap = new_heap(1 << 16);
        let a = unsafe { heap.allocate(16) };
        let _b = unsafe { heap.allocate(16) };
        unsafe {
            // Bump `a`'s header size by one word without touching its
            // footer, shifting the next physical block off the 8-byte grid.
            let sz = block::size(a);
            block::header(a).write(block::pack(sz + 4, true));
        }

        let violations = unsafe { check(&heap) };
        assert!(
            violations
                .iter()
                .any(|v| matches!(v, ConsistencyViolation::MisalignedBlock { .. })),
            "{violations:?}"
        );
    }
}
