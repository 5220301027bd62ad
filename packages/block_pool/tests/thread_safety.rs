//! Concurrency tests for [`BlockPool`]: many threads allocating and freeing
//! against one shared pool.

use std::collections::HashSet;
use std::thread;

use block_pool::{BlockPool, Error};

const N_BLOCKS: usize = 20;
const BLOCK_SIZE: usize = 128;

#[test]
fn threads_fill_the_pool_without_duplicates() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 25;

    // Exactly THREADS * PER_THREAD blocks: every allocation must succeed,
    // and no two threads may hold the same address at once.
    let pool = BlockPool::builder()
        .block_count(THREADS * PER_THREAD)
        .block_size(64)
        .build()
        .expect("pool parameters are valid");

    thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    (0..PER_THREAD)
                        .map(|_| pool.alloc().expect("pool holds a block for every request"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let held: Vec<_> = workers
            .into_iter()
            .flat_map(|worker| worker.join().expect("worker thread completed"))
            .collect();

        // Every block is out at this point.
        assert_eq!(pool.used(), pool.capacity());
        assert!(matches!(pool.alloc(), Err(Error::PoolExhausted)));

        let distinct: HashSet<_> = held.iter().map(|block| block.ptr()).collect();
        assert_eq!(distinct.len(), THREADS * PER_THREAD);

        for block in held {
            pool.free(block);
        }
    });

    assert_eq!(pool.used(), 0);
    assert_eq!(pool.peak(), pool.capacity());
}

#[test]
fn concurrent_alloc_free_cycles_balance() {
    const THREADS: usize = 2;
    const PER_THREAD: usize = 10;
    const ROUNDS: usize = 50;

    let pool = BlockPool::builder()
        .block_count(N_BLOCKS)
        .block_size(BLOCK_SIZE)
        .build()
        .expect("pool parameters are valid");

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    let held: Vec<_> = (0..PER_THREAD)
                        .map(|_| pool.alloc().expect("both threads fit in the pool"))
                        .collect();

                    for block in held {
                        pool.free(block);
                    }
                }
            });
        }
    });

    assert_eq!(pool.used(), 0);
    assert!(pool.peak() <= pool.capacity());
    assert!(pool.peak() >= PER_THREAD * BLOCK_SIZE);
}

#[test]
fn contended_exhaustion_hands_out_each_block_once() {
    const THREADS: usize = 4;

    let pool = BlockPool::builder()
        .block_count(N_BLOCKS)
        .block_size(BLOCK_SIZE)
        .build()
        .expect("pool parameters are valid");

    // Each thread asks for the whole pool; collectively exactly N_BLOCKS
    // requests succeed and the rest see PoolExhausted.
    thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let mut granted = Vec::new();
                    let mut refused = 0_usize;

                    for _ in 0..N_BLOCKS {
                        match pool.alloc() {
                            Ok(block) => granted.push(block),
                            Err(Error::PoolExhausted) => refused += 1,
                            Err(other) => panic!("unexpected allocation error: {other}"),
                        }
                    }

                    (granted, refused)
                })
            })
            .collect();

        let mut all_granted = Vec::new();
        let mut total_refused = 0_usize;

        for worker in workers {
            let (granted, refused) = worker.join().expect("worker thread completed");
            all_granted.extend(granted);
            total_refused += refused;
        }

        assert_eq!(all_granted.len(), N_BLOCKS);
        assert_eq!(total_refused, (THREADS - 1) * N_BLOCKS);

        let distinct: HashSet<_> = all_granted.iter().map(|block| block.ptr()).collect();
        assert_eq!(distinct.len(), N_BLOCKS);

        for block in all_granted {
            pool.free(block);
        }
    });

    assert_eq!(pool.used(), 0);
}

#[test]
fn handles_move_between_threads() {
    let pool = BlockPool::builder()
        .block_count(2)
        .block_size(BLOCK_SIZE)
        .build()
        .expect("pool parameters are valid");

    thread::scope(|scope| {
        let block = pool.alloc().expect("pool has free blocks");

        // Allocated on this thread, freed on another.
        scope.spawn(|| {
            pool.free(block);
        });
    });

    assert_eq!(pool.used(), 0);
}
