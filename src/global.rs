//! `#[global_allocator]` adapter.
//!
//! Wraps a lazily-initialized [`Heap<SbrkRegion>`] behind a mutex so it can
//! implement [`GlobalAlloc`]. Initialization is deferred to the first
//! allocation request since `sbrk` isn't available to call at const-eval
//! time; a failed first-time initialization surfaces as a null return from
//! `alloc`, same as any other allocation failure.

use std::alloc::{GlobalAlloc, Layout};
use std::ptr;
use std::sync::Mutex;

use tracing::error;

use crate::heap::Heap;
use crate::region::SbrkRegion;

/// A `GlobalAlloc` over one process-wide [`Heap<SbrkRegion>`].
///
/// # Safety
/// Installing this as `#[global_allocator]` commits the whole process to a
/// single-threaded allocator; concurrent allocation from multiple threads
/// is serialized by the internal mutex but the allocator itself performs
/// no lock-free tricks, so contention under heavy multi-threaded use will
/// be worse than a purpose-built concurrent allocator.
pub struct GlobalHeap {
    inner: Mutex<Option<Heap<SbrkRegion>>>,
}

impl GlobalHeap {
    /// An adapter with no heap yet; the first allocation initializes one.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }
}

impl Default for GlobalHeap {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for GlobalHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let Ok(mut guard) = self.inner.lock() else {
            return ptr::null_mut();
        };
        if guard.is_none() {
            match Heap::initialize(SbrkRegion::new()) {
                Ok(heap) => *guard = Some(heap),
                Err(err) => {
                    error!(?err, "failed to initialize global heap");
                    return ptr::null_mut();
                }
            }
        }
        unsafe { guard.as_mut().unwrap().allocate(layout.size()) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        if let Some(heap) = guard.as_mut() {
            unsafe { heap.free(ptr) };
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
        let Ok(mut guard) = self.inner.lock() else {
            return ptr::null_mut();
        };
        match guard.as_mut() {
            Some(heap) => unsafe { heap.reallocate(ptr, new_size) },
            None => ptr::null_mut(),
        }
    }
}
