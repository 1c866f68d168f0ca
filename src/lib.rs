//! # heap_alloc - An Explicit Free List Memory Allocator
//!
//! This crate provides a single-threaded, user-space dynamic memory
//! allocator implementation in Rust: an **explicit free list** allocator
//! with boundary-tag coalescing, built over one contiguous, monotonically
//! growing region of memory.
//!
//! ## Overview
//!
//! Unlike a bump allocator, which can never reuse freed space, an explicit
//! free list allocator threads every free block onto a doubly-linked list
//! so it can satisfy later requests out of previously freed memory:
//!
//! ```text
//!   Explicit Free List Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌─────┬───────────┬─────┬───────────┬─────┬────────────────────┐  │
//!   │   │ A1  │  free (F1)│ A2  │  free (F2)│ A3  │     uncommitted    │  │
//!   │   └─────┴───────────┴─────┴───────────┴─────┴────────────────────┘  │
//!   │              │                 │                                    │
//!   │              └─────────────────┴──── free list: F2 <-> F1           │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation walks the free list first (first fit); only when nothing
//!   fits does the region grow.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   heap_alloc
//!   ├── align        - Alignment macros (align!, align_to!)
//!   ├── block        - Tagged block layout: header/footer, size, alloc bit
//!   ├── region       - RegionProvider trait; SbrkRegion, VecRegion
//!   ├── free_list    - The explicit doubly-linked free list
//!   ├── placement    - First-fit search and block splitting
//!   ├── coalesce     - Four-case boundary-tag coalescing
//!   ├── heap         - Heap<R>: the allocator core (allocate/free/reallocate)
//!   ├── diagnostics  - Consistency checker and block dump
//!   ├── error        - HeapError
//!   └── global       - GlobalAlloc adapter (GlobalHeap)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use heap_alloc::{Heap, SbrkRegion};
//!
//! fn main() {
//!     let mut heap = Heap::initialize(SbrkRegion::new()).unwrap();
//!
//!     unsafe {
//!         let ptr = heap.allocate(64) as *mut u64;
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!         heap.free(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## How It Works
//!
//! Memory is carved from one region, framed by prologue and epilogue
//! sentinel blocks so every block's physical neighbors are always safe to
//! inspect:
//!
//! ```text
//!   One block's tagged layout:
//!
//!   ┌───────────┬─────────────────────────────┬───────────┐
//!   │  header   │           payload           │  footer   │
//!   │ size|alloc│   (or next/prev if free)    │ size|alloc│
//!   └───────────┴─────────────────────────────┴───────────┘
//!       4 bytes          size - 8 bytes            4 bytes
//! ```
//!
//! Freeing a block checks both physical neighbors via their boundary tags
//! and merges with whichever are also free, so adjacent free space never
//! fragments into list-walkable-but-unmergeable slivers.
//!
//! ## Features
//!
//! - **Block reuse**: freed blocks of any position are reusable, not just
//!   the most recent one
//! - **Boundary-tag coalescing**: O(1) merge with either physical neighbor
//! - **Pluggable region source**: `SbrkRegion` for production, `VecRegion`
//!   for deterministic, OOM-simulating tests
//! - **Optional consistency checker**: walks the heap and free list and
//!   reports disagreements without panicking
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap<R>` has no internal synchronization;
//!   `global::GlobalHeap` adds a mutex for use as a `#[global_allocator]`
//! - **Unix-only `SbrkRegion`**: requires `libc` and `sbrk` (POSIX systems)
//! - **No realloc-in-place beyond one neighbor**: growing past what the
//!   immediate right neighbor can offer always falls back to copy
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! `Heap::allocate`/`free`/`reallocate` are `unsafe fn`: callers must
//! uphold the usual C allocator contract (no double free, no use after
//! free, pointers passed to `free`/`reallocate` must have come from this
//! same heap).

pub mod align;
mod block;
mod coalesce;
mod diagnostics;
mod error;
mod free_list;
mod global;
mod heap;
mod placement;
mod region;

pub use diagnostics::{check, dump, ConsistencyViolation};
pub use error::HeapError;
pub use global::GlobalHeap;
pub use heap::{Heap, CHUNK};
pub use region::{RegionProvider, SbrkRegion, VecRegion};
