//! A thread-safe memory pool that reserves one contiguous region once and
//! thereafter serves equally-sized blocks from it in O(1).
//!
//! This crate provides [`BlockPool`] for callers that need predictable,
//! low-overhead allocation of many same-size objects - fixed-size records,
//! connection buffers and similar - under concurrent access from multiple
//! threads. After the single up-front reservation, allocating and freeing a
//! block never calls into the system allocator: free blocks are recycled
//! through an intrusive free list whose links live inside the free blocks
//! themselves.
//!
//! # Key features
//!
//! - **One reservation**: the region is allocated when the pool is built and
//!   released when it is dropped; the pool never grows.
//! - **O(1) alloc and free**: both are a single free-list operation plus
//!   counter updates.
//! - **Move-only handles**: [`BlockHandle`] is a capability to exactly one
//!   block, consumed by [`free()`][BlockPool::free] - double-free and
//!   use-after-free are compile errors, not runtime corruption.
//! - **Thread safety**: the pool is [`Send`] and [`Sync`]; all operations
//!   serialize on one internal mutex.
//! - **Usage accounting**: [`used()`][BlockPool::used] and
//!   [`peak()`][BlockPool::peak] byte counters, resettable with
//!   [`reset()`][BlockPool::reset].
//! - **Observability hook**: an injectable [`PoolObserver`] sees every
//!   alloc/free transition; the pool itself performs no I/O.
//!
//! # Examples
//!
//! ```
//! use block_pool::BlockPool;
//!
//! let pool = BlockPool::builder()
//!     .block_count(20)
//!     .block_size(128)
//!     .build()
//!     .expect("pool parameters are valid");
//!
//! // Write into a block.
//! let mut block = pool.alloc().expect("pool has free blocks");
//! for byte in block.as_uninit_slice() {
//!     byte.write(0);
//! }
//!
//! assert_eq!(pool.used(), 128);
//!
//! pool.free(block);
//! assert_eq!(pool.used(), 0);
//! ```
//!
//! Concurrent use:
//!
//! ```
//! use std::thread;
//!
//! use block_pool::BlockPool;
//!
//! let pool = BlockPool::builder()
//!     .block_count(64)
//!     .block_size(256)
//!     .build()
//!     .expect("pool parameters are valid");
//!
//! thread::scope(|scope| {
//!     for _ in 0..8 {
//!         scope.spawn(|| {
//!             for _ in 0..100 {
//!                 let block = pool.alloc().expect("at most 8 blocks are out at once");
//!                 pool.free(block);
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(pool.used(), 0);
//! ```

mod builder;
mod error;
mod free_list;
mod handle;
mod observer;
mod pool;

pub use builder::*;
pub use error::Error;
pub(crate) use error::Result;
pub(crate) use free_list::*;
pub use handle::*;
pub use observer::*;
pub use pool::BlockPool;
