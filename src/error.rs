//! Error types surfaced at the public boundary.
//!
//! `allocate`/`free`/`reallocate` keep the allocator's native null-pointer
//! sentinel (see [`crate::heap`]) since that is the ABI a [`core::alloc::GlobalAlloc`]
//! adapter must forward unchanged. `initialize` is the one operation with a
//! real "did this work" question, so it gets a proper error type.

/// Failure reported by [`crate::Heap::initialize`].
#[derive(Debug, thiserror::Error)]
pub enum HeapError {
    /// The region provider refused to grant the bytes needed to lay down the
    /// prologue/epilogue sentinels and seed the first free block.
    #[error("region provider refused initial heap extension")]
    InitialExtensionFailed,
}
