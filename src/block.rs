//! Block layout primitives (C1).
//!
//! Every block — prologue, epilogue, allocated, or free — shares the same
//! tagged layout:
//!
//! ```text
//! offset 0     : header  (1 word) = size | allocated-bit
//! offset W     : payload begins (or next/prev link pair, if free)
//! offset size-W: footer  (1 word) = size | allocated-bit
//! ```
//!
//! `W` is fixed at 4 bytes regardless of the host's pointer width: the
//! header/footer word, and the free-block `next`/`prev` link words, are all
//! `u32`. This is what lets `MIN_BLOCK` stay at the spec's literal 16 bytes
//! (header + next + prev + footer) instead of growing to 24 on a 64-bit
//! host where a raw pointer is 8 bytes — see `SPEC_FULL.md` §3 for the
//! rationale. Free-block links are therefore stored as `u32` byte offsets
//! from the region's low address rather than as raw pointers; [`crate::free_list`]
//! does the offset/pointer conversion.
//!
//! All functions here are `unsafe`: they trust that `bp` points at a live
//! block's payload and that its header is already written.

/// Word size in bytes. Also the size of a header, footer, or free-block
/// link word.
pub const WORD: usize = 4;

/// Payload alignment in bytes (two words).
pub const ALIGN: usize = 8;

/// Smallest block that can exist: header + next + prev + footer.
pub const MIN_BLOCK: usize = 4 * WORD;

const ALLOC_BIT: u32 = 0x1;
const SIZE_MASK: u32 = !0x7u32;

/// Packs a size and allocated bit into a single tagged word.
#[inline]
pub const fn pack(size: u32, allocated: bool) -> u32 {
    size | (allocated as u32)
}

/// Address of `bp`'s header word.
#[inline]
pub unsafe fn header(bp: *mut u8) -> *mut u32 {
    unsafe { bp.sub(WORD) as *mut u32 }
}

/// Address of `bp`'s footer word. Requires the header to already hold the
/// block's current size.
#[inline]
pub unsafe fn footer(bp: *mut u8) -> *mut u32 {
    unsafe { bp.add(size(bp) as usize - 2 * WORD) as *mut u32 }
}

/// Reads the block's size (masking off the allocated bit and the two
/// reserved bits below it).
#[inline]
pub unsafe fn size(bp: *mut u8) -> u32 {
    unsafe { header(bp).read() & SIZE_MASK }
}

/// Reads the block's allocated bit.
#[inline]
pub unsafe fn allocated(bp: *mut u8) -> bool {
    unsafe { (header(bp).read() & ALLOC_BIT) != 0 }
}

/// Payload pointer of the block physically following `bp`.
#[inline]
pub unsafe fn next_block(bp: *mut u8) -> *mut u8 {
    unsafe { bp.add(size(bp) as usize) }
}

/// Payload pointer of the block physically preceding `bp`, found by reading
/// the preceding footer to learn that block's size.
#[inline]
pub unsafe fn prev_block(bp: *mut u8) -> *mut u8 {
    unsafe {
        let prev_footer = bp.sub(2 * WORD) as *mut u32;
        let prev_size = prev_footer.read() & SIZE_MASK;
        bp.sub(prev_size as usize)
    }
}

/// Writes an identical tagged word to both header and footer. The footer
/// address is derived from `sz`, so header must be (and is) written first.
#[inline]
pub unsafe fn write_block(bp: *mut u8, sz: u32, alloc: bool) {
    let tag = pack(sz, alloc);
    unsafe {
        header(bp).write(tag);
        footer(bp).write(tag);
    }
}

/// Rounds `n` up to the nearest multiple of [`ALIGN`].
#[inline]
pub const fn align_up(n: usize) -> usize {
    (n + ALIGN - 1) & !(ALIGN - 1)
}

/// Converts a requested payload size into a total block size: header and
/// footer overhead included, rounded up to [`ALIGN`].
///
/// Per the spec's open question #1, requests of exactly `ALIGN` bytes take
/// the `<=` branch (returning `2 * ALIGN`), matching every coursework draft.
#[inline]
pub fn adjust_request(requested: usize) -> u32 {
    let adjusted = if requested <= ALIGN {
        2 * ALIGN
    } else {
        ALIGN * ((requested + ALIGN + (ALIGN - 1)) / ALIGN)
    };
    adjusted as u32
}
