use std::io::Read;

use heap_alloc::{check, Heap, SbrkRegion};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
    println!(
        "[{}] PID = {}, program break (sbrk(0)) = {:?}",
        label,
        std::process::id(),
        unsafe { sbrk(0) },
    );
}

fn main() {
    // Unlike a bump allocator, this heap keeps an explicit free list: freed
    // blocks of any size or position become reusable, not just the most
    // recent allocation.
    let mut heap = Heap::initialize(SbrkRegion::new()).expect("initial heap extension failed");

    unsafe {
        print_program_break("start");
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 1) Allocate a u32.
        // ------------------------------------------------------------------
        let first_block = heap.allocate(4) as *mut u32;
        println!("\n[1] Allocate u32 at {:?}", first_block);
        first_block.write(0xDEADBEEF);
        println!("[1] Value written to first_block = 0x{:X}", first_block.read());
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 2) Allocate 12 bytes, showing odd-sized requests get rounded up.
        // ------------------------------------------------------------------
        let second_block = heap.allocate(12);
        println!("\n[2] Allocate [u8; 12] at {:?}", second_block);
        std::ptr::write_bytes(second_block, 0xAB, 12);
        println!("[2] Initialized second block with 0xAB");
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 3) Allocate a u64 to observe alignment.
        // ------------------------------------------------------------------
        let third_block = heap.allocate(8) as *mut u64;
        println!("\n[3] Allocate u64 at {:?}", third_block);
        third_block.write(0x1122334455667788);
        println!(
            "[3] Address = {:#X}, addr % 8 = {}",
            third_block as usize,
            third_block as usize % 8
        );
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 4) Free the first block, then allocate something small and see
        //    whether the free list reuses it.
        // ------------------------------------------------------------------
        heap.free(first_block as *mut u8);
        println!("\n[4] Freed first_block at {:?}", first_block);
        block_until_enter_pressed();

        let fourth_block = heap.allocate(2);
        println!("\n[5] Allocate [u8; 2] (check reuse of freed block)");
        println!(
            "[5] fourth_block == first_block? {}",
            if fourth_block == first_block as *mut u8 {
                "Yes, it reused the freed block"
            } else {
                "No, it allocated somewhere else"
            }
        );
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 5) Grow the second block in place via reallocate.
        // ------------------------------------------------------------------
        let grown = heap.reallocate(second_block, 64);
        println!(
            "\n[6] Reallocated second_block {:?} -> {:?} (grew: {})",
            second_block,
            grown,
            grown == second_block
        );
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 6) Allocate a large block to observe heap growth past one chunk.
        // ------------------------------------------------------------------
        print_program_break("before large alloc");
        let big_block = heap.allocate(64 * 1024);
        println!("\n[7] Allocate large 64 KiB block at {:?}", big_block);
        print_program_break("after large alloc");
        block_until_enter_pressed();

        // ------------------------------------------------------------------
        // 7) Run the consistency checker before exiting.
        // ------------------------------------------------------------------
        let violations = check(&heap);
        println!("\n[8] Consistency check found {} violation(s)", violations.len());
        for violation in &violations {
            println!("    {:?}", violation);
        }

        println!("\n[9] End of demo. Process will exit and the OS will reclaim all memory.");
    }
}
