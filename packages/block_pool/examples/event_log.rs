//! Logging every pool transition through the observer hook.
//!
//! The pool performs no I/O of its own; this example installs an observer
//! that prints one line per alloc/free transition, with the region base, the
//! affected block address and the resulting used-byte count.

use block_pool::{BlockPool, PoolEvent, PoolObserver, PoolOperation};

/// Prints one line per transition.
#[derive(Debug)]
struct StdoutLogger;

impl PoolObserver for StdoutLogger {
    fn on_event(&self, event: PoolEvent) {
        let tag = match event.operation {
            PoolOperation::Alloc => 'A',
            PoolOperation::Free => 'F',
        };

        println!(
            "{tag}\t@S {:p}\t@R {:p}\tM {}",
            event.region_start, event.address, event.used
        );
    }
}

fn main() {
    let pool = BlockPool::builder()
        .block_count(4)
        .block_size(64)
        .observer(StdoutLogger)
        .build()
        .expect("4 blocks of 64 bytes are valid pool parameters");

    let first = pool.alloc().expect("pool has free blocks");
    let second = pool.alloc().expect("pool has free blocks");

    pool.free(first);

    let third = pool.alloc().expect("pool has free blocks");

    pool.free(second);
    pool.free(third);
}
