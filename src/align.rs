//! Alignment macros shared by the rest of the crate.
//!
//! `align!` rounds up to the machine word size (used by the few spots that
//! still think in pointer-sized units); `align_to!` rounds up to an
//! arbitrary power-of-two alignment, which is what the heap itself needs
//! since its block alignment (`A = 8`) is independent of `size_of::<usize>()`.

/// Calculates the machine word alignment for the given size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use heap_alloc::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
    ($value:expr) => {
        ($value + mem::size_of::<usize>() - 1) & !(mem::size_of::<usize>() - 1)
    };
}

/// Rounds `value` up to the nearest multiple of `align`, which must be a
/// power of two.
///
/// # Examples
///
/// ```rust
/// use heap_alloc::align_to;
///
/// assert_eq!(align_to!(13usize, 8usize), 16);
/// assert_eq!(align_to!(16usize, 8usize), 16);
/// ```
#[macro_export]
macro_rules! align_to {
    ($value:expr, $align:expr) => {
        (($value) + ($align) - 1) & !(($align) - 1)
    };
}
