//! Basic usage example for `BlockPool`.
//!
//! This example walks the pool through its whole life cycle: build with
//! validated parameters, allocate until exhaustion, free, reset and drop.

use block_pool::{BlockPool, Error};

fn main() {
    let pool = BlockPool::builder()
        .block_count(20)
        .block_size(128)
        .build()
        .expect("20 blocks of 128 bytes are valid pool parameters");

    println!(
        "Reserved {} bytes: {} blocks of {} bytes",
        pool.capacity(),
        pool.block_count(),
        pool.block_size()
    );

    // Fill a few blocks with caller data.
    let mut held = Vec::new();
    for index in 0..5_u8 {
        let mut block = pool.alloc().expect("pool has free blocks");

        for byte in block.as_uninit_slice() {
            byte.write(index);
        }

        held.push(block);
    }

    println!("Allocated 5 blocks, used {} bytes", pool.used());

    // Drain the rest of the pool.
    while let Ok(block) = pool.alloc() {
        held.push(block);
    }

    println!(
        "Pool exhausted at used {} bytes (peak {})",
        pool.used(),
        pool.peak()
    );

    // One more allocation reports exhaustion instead of blocking.
    match pool.alloc() {
        Err(Error::PoolExhausted) => println!("Further allocation refused, as expected"),
        Err(other) => println!("Unexpected error: {other}"),
        Ok(_) => unreachable!("the pool was drained above"),
    }

    // Return everything; the most recently freed block is reused first.
    for block in held.drain(..) {
        pool.free(block);
    }

    println!("All blocks returned, used {} bytes", pool.used());

    // SAFETY: Every handle was consumed by `free()` above.
    unsafe {
        pool.reset();
    }

    println!(
        "After reset: used {} bytes, peak {} bytes",
        pool.used(),
        pool.peak()
    );

    println!("The region is released when the pool is dropped");
}
