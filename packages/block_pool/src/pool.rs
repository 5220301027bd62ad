use std::alloc::{Layout, alloc, dealloc};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{
    BlockHandle, BlockPoolBuilder, Error, FreeList, PoolEvent, PoolObserver, PoolOperation, Result,
};

/// Global counter for generating unique pool IDs.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique pool ID.
fn generate_pool_id() -> u64 {
    POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Mutable allocator state, guarded by a single mutex.
///
/// The original design of this allocator family takes four separate locks on
/// every operation; that is equivalent to one exclusive critical section, so
/// one mutex is all we carry.
#[derive(Debug)]
struct PoolState {
    /// Addresses of the blocks that are currently free, as a LIFO stack.
    free_list: FreeList,

    /// Bytes currently allocated. Always a multiple of the block size and
    /// never larger than the capacity.
    used: usize,

    /// The maximum value `used` has reached since the last reset.
    peak: usize,
}

/// A thread-safe memory pool that reserves one contiguous region and serves
/// fixed-size blocks from it in O(1).
///
/// The region is reserved exactly once, when the pool is built; after that,
/// [`alloc()`](Self::alloc) and [`free()`](Self::free) recycle blocks through
/// an intrusive free list without any further system allocation. The pool
/// never grows.
///
/// # Block handles
///
/// [`alloc()`](Self::alloc) returns a move-only [`BlockHandle`] rather than a
/// raw address. [`free()`](Self::free) consumes the handle, so freeing the
/// same block twice is a compile error rather than silent free-list
/// corruption, and handles borrow the pool, so the region cannot be released
/// while blocks are outstanding. Returning a handle to a pool other than the
/// one that issued it panics.
///
/// # Concurrency
///
/// The pool is [`Send`] and [`Sync`]; any number of threads may call
/// [`alloc()`](Self::alloc) and [`free()`](Self::free) on a shared pool.
/// All operations serialize on one internal mutex - a single coarse critical
/// section rather than per-field locking. No operation blocks waiting for a
/// state change: allocating from an exhausted pool reports
/// [`PoolExhausted`][Error::PoolExhausted] immediately instead of waiting for
/// a concurrent free.
///
/// # Examples
///
/// ```
/// use block_pool::BlockPool;
///
/// let pool = BlockPool::builder()
///     .block_count(8)
///     .block_size(64)
///     .build()
///     .expect("pool parameters are valid");
///
/// assert_eq!(pool.capacity(), 8 * 64);
///
/// let block = pool.alloc().expect("pool has free blocks");
/// assert_eq!(pool.used(), 64);
///
/// pool.free(block);
/// assert_eq!(pool.used(), 0);
/// assert_eq!(pool.peak(), 64);
/// ```
///
/// Sharing a pool across threads:
///
/// ```
/// use std::thread;
///
/// use block_pool::BlockPool;
///
/// let pool = BlockPool::builder()
///     .block_count(16)
///     .block_size(128)
///     .build()
///     .expect("pool parameters are valid");
///
/// thread::scope(|scope| {
///     for _ in 0..4 {
///         scope.spawn(|| {
///             let block = pool.alloc().expect("pool has a block per thread");
///             pool.free(block);
///         });
///     }
/// });
///
/// assert_eq!(pool.used(), 0);
/// ```
pub struct BlockPool {
    /// We need to uniquely identify each pool to ensure that handles are not
    /// returned to the wrong pool. If the pool ID does not match when a
    /// handle is returned, we panic.
    pool_id: u64,

    /// The number of blocks in the region. Immutable after construction.
    block_count: usize,

    /// The size of each block in bytes. Immutable after construction.
    block_size: usize,

    /// `block_count * block_size`, verified not to overflow at construction.
    capacity: usize,

    /// Base address of the reserved region. Set once, released on drop.
    start: NonNull<u8>,

    /// The layout the region was allocated with, required for deallocation.
    region_layout: Layout,

    /// All mutable allocator state, behind the pool's single lock.
    state: Mutex<PoolState>,

    /// Optional observer notified of every alloc/free transition.
    observer: Option<Box<dyn PoolObserver>>,
}

impl BlockPool {
    /// Creates a builder for configuring and constructing a [`BlockPool`].
    ///
    /// Both the block count and the block size must be set before calling
    /// [`build()`][BlockPoolBuilder::build].
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::BlockPool;
    ///
    /// let pool = BlockPool::builder()
    ///     .block_count(4)
    ///     .block_size(256)
    ///     .build()
    ///     .expect("pool parameters are valid");
    /// ```
    #[inline]
    pub fn builder() -> BlockPoolBuilder {
        BlockPoolBuilder::new()
    }

    /// Validates the parameters, reserves the region and seeds the free list.
    ///
    /// This method is used internally by the builder to construct the actual
    /// pool.
    pub(crate) fn new_inner(
        block_count: usize,
        block_size: usize,
        observer: Option<Box<dyn PoolObserver>>,
    ) -> Result<Self> {
        if block_count == 0 {
            return Err(Error::InvalidArgument {
                problem: "block count must be greater than zero",
            });
        }

        if block_size == 0 {
            return Err(Error::InvalidArgument {
                problem: "block size must be greater than zero",
            });
        }

        // The free list stores a link in the first bytes of every free block.
        if block_size < mem::size_of::<*mut u8>() {
            return Err(Error::InvalidArgument {
                problem: "block size must be at least one pointer width",
            });
        }

        let Some(capacity) = block_count.checked_mul(block_size) else {
            return Err(Error::CapacityOverflow {
                block_count,
                block_size,
            });
        };

        // The region itself only needs byte alignment for the caller's data,
        // but we request pointer alignment so the first free-list link is
        // aligned whenever the block size is a multiple of the pointer width.
        let Ok(region_layout) = Layout::from_size_align(capacity, mem::align_of::<*mut u8>())
        else {
            return Err(Error::CapacityOverflow {
                block_count,
                block_size,
            });
        };

        // SAFETY: `capacity` is nonzero because both factors are nonzero.
        let Some(start) = NonNull::new(unsafe { alloc(region_layout) }) else {
            return Err(Error::AllocationFailure { capacity });
        };

        let pool = Self {
            pool_id: generate_pool_id(),
            block_count,
            block_size,
            capacity,
            start,
            region_layout,
            state: Mutex::new(PoolState {
                free_list: FreeList::new(),
                used: 0,
                peak: 0,
            }),
            observer,
        };

        // SAFETY: No handles have been issued yet.
        unsafe {
            pool.reset();
        }

        Ok(pool)
    }

    /// Allocates one block and returns the exclusive handle to it.
    ///
    /// O(1): pops the free list, updates the usage counters and returns.
    /// Never blocks waiting for a block to become free.
    ///
    /// The block's bytes are not zeroed; they hold either uninitialized
    /// memory or whatever a previous holder left behind.
    ///
    /// # Errors
    ///
    /// Returns [`PoolExhausted`][Error::PoolExhausted] if every block is
    /// currently allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::{BlockPool, Error};
    ///
    /// let pool = BlockPool::builder()
    ///     .block_count(1)
    ///     .block_size(64)
    ///     .build()
    ///     .expect("pool parameters are valid");
    ///
    /// let block = pool.alloc().expect("pool has one free block");
    /// assert!(matches!(pool.alloc(), Err(Error::PoolExhausted)));
    ///
    /// pool.free(block);
    /// ```
    pub fn alloc(&self) -> Result<BlockHandle<'_>> {
        let mut state = self.lock_state();

        let block = state.free_list.pop().ok_or(Error::PoolExhausted)?;

        // Cannot overflow: `used` never exceeds `capacity`, which was
        // verified to be representable at construction.
        state.used = state.used.wrapping_add(self.block_size);
        state.peak = state.peak.max(state.used);

        self.notify(PoolEvent {
            operation: PoolOperation::Alloc,
            region_start: self.start,
            address: block,
            used: state.used,
        });

        Ok(BlockHandle {
            pool_id: self.pool_id,
            ptr: block,
            len: self.block_size,
            _pool: PhantomData,
        })
    }

    /// Returns a previously allocated block to the pool.
    ///
    /// Consumes the handle, so the block cannot be freed again or accessed
    /// afterwards. The most recently freed block is the first one that
    /// [`alloc()`](Self::alloc) hands out again.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::BlockPool;
    ///
    /// let pool = BlockPool::builder()
    ///     .block_count(2)
    ///     .block_size(32)
    ///     .build()
    ///     .expect("pool parameters are valid");
    ///
    /// let block = pool.alloc().expect("pool has free blocks");
    /// let address = block.ptr();
    ///
    /// pool.free(block);
    ///
    /// // LIFO reuse: the freed block comes back first.
    /// let again = pool.alloc().expect("pool has free blocks");
    /// assert_eq!(again.ptr(), address);
    /// pool.free(again);
    /// ```
    pub fn free(&self, handle: BlockHandle<'_>) {
        assert_eq!(
            handle.pool_id, self.pool_id,
            "block handle was returned to a pool that did not issue it"
        );

        let offset = handle.ptr.addr().get().wrapping_sub(self.start.addr().get());
        debug_assert!(
            offset < self.capacity,
            "block handle address lies outside the pool region"
        );
        debug_assert_eq!(
            offset % self.block_size,
            0,
            "block handle address is not congruent to a block start"
        );

        let mut state = self.lock_state();

        // Cannot underflow: issuing the handle added `block_size` to `used`,
        // and the handle could not be freed before now.
        state.used = state.used.wrapping_sub(self.block_size);

        // SAFETY: The handle was issued by this pool and is consumed here, so
        // the block's bytes are valid and nothing else accesses them until
        // the block is popped again.
        unsafe {
            state.free_list.push(handle.ptr);
        }

        self.notify(PoolEvent {
            operation: PoolOperation::Free,
            region_start: self.start,
            address: handle.ptr,
            used: state.used,
        });
    }

    /// Returns every block to the free list and zeroes the usage counters,
    /// without releasing or re-reserving the region.
    ///
    /// Blocks are seeded so that subsequent allocations hand out ascending
    /// addresses starting at the region base, exactly as after construction.
    ///
    /// # Safety
    ///
    /// No [`BlockHandle`] issued by this pool may exist when this is called.
    /// An outstanding handle would become indistinguishable from a free
    /// block: the pool could hand the same bytes to another caller while the
    /// old holder still writes to them.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::BlockPool;
    ///
    /// let pool = BlockPool::builder()
    ///     .block_count(4)
    ///     .block_size(64)
    ///     .build()
    ///     .expect("pool parameters are valid");
    ///
    /// let block = pool.alloc().expect("pool has free blocks");
    /// pool.free(block);
    /// assert_eq!(pool.peak(), 64);
    ///
    /// // SAFETY: Every handle has been returned to the pool.
    /// unsafe {
    ///     pool.reset();
    /// }
    ///
    /// assert_eq!(pool.used(), 0);
    /// assert_eq!(pool.peak(), 0);
    /// ```
    pub unsafe fn reset(&self) {
        let mut state = self.lock_state();

        state.used = 0;
        state.peak = 0;
        state.free_list = FreeList::new();

        // Push in descending address order so allocation pops ascending
        // addresses, starting at the region base.
        for index in (0..self.block_count).rev() {
            // Cannot overflow: `index * block_size < capacity`.
            let offset = index.wrapping_mul(self.block_size);

            // SAFETY: `offset` is less than the region size, so the result
            // stays inside the reserved allocation.
            let block = unsafe { self.start.add(offset) };

            // SAFETY: The block lies within the exclusively owned region, is
            // at least one pointer wide (checked at construction), and the
            // caller guarantees no outstanding handle references it.
            unsafe {
                state.free_list.push(block);
            }
        }
    }

    /// The largest block count for which the free-list bookkeeping itself
    /// cannot overflow address-width arithmetic.
    ///
    /// A pure bound for pre-validating construction parameters; whether a
    /// given `(block_count, block_size)` pair is accepted is still decided by
    /// [`build()`][BlockPoolBuilder::build].
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::{BlockPool, Error};
    ///
    /// let result = BlockPool::builder()
    ///     .block_count(BlockPool::max_block_count())
    ///     .block_size(512)
    ///     .build();
    ///
    /// assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
    /// ```
    #[must_use]
    #[inline]
    pub const fn max_block_count() -> usize {
        usize::MAX / mem::size_of::<*mut u8>()
    }

    /// Total size of the reserved region in bytes: block count times block
    /// size.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The size of each block in bytes.
    #[must_use]
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The number of blocks in the region.
    #[must_use]
    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Bytes currently allocated: block size times the number of outstanding
    /// blocks.
    #[must_use]
    pub fn used(&self) -> usize {
        self.lock_state().used
    }

    /// The maximum value [`used()`](Self::used) has reached since
    /// construction or the last [`reset()`](Self::reset).
    #[must_use]
    pub fn peak(&self) -> usize {
        self.lock_state().peak
    }

    /// Acquires the pool's single critical section.
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        // A poisoning panic can only come from a contract-violation panic in
        // another thread; there is nothing useful to continue with.
        self.state.lock().expect("block pool state lock is poisoned")
    }

    /// Delivers an event to the observer, if one is installed.
    fn notify(&self, event: PoolEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        // Outstanding handles borrow the pool, so none exist by now.
        //
        // SAFETY: The region was allocated in `new_inner` with
        // `region_layout` and is deallocated exactly once, here.
        unsafe {
            dealloc(self.start.as_ptr(), self.region_layout);
        }
    }
}

impl fmt::Debug for BlockPool {
    #[cfg_attr(test, mutants::skip)] // Formatting output is not behavior worth mutating.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("block_count", &self.block_count)
            .field("block_size", &self.block_size)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

// SAFETY: The region is exclusively owned and all mutable state is behind the
// mutex; the raw pointers are plain addresses with no thread affinity.
unsafe impl Send for BlockPool {}

// SAFETY: Every operation that touches mutable state first acquires the
// mutex, so concurrent shared access cannot race.
unsafe impl Sync for BlockPool {}
