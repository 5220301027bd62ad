use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crate::{BlockPool, PoolObserver, Result};

/// Builder for creating an instance of [`BlockPool`].
///
/// The block count and block size are mandatory; the observer is optional.
/// [`build()`](Self::build) validates the parameters, reserves the backing
/// region and seeds the free list, so a successfully built pool is
/// immediately ready to allocate from.
///
/// # Examples
///
/// ```
/// use block_pool::BlockPool;
///
/// let pool = BlockPool::builder()
///     .block_count(32)
///     .block_size(256)
///     .build()
///     .expect("pool parameters are valid");
///
/// assert_eq!(pool.capacity(), 32 * 256);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred
/// between threads, allowing pool configuration to happen on different
/// threads than where the pool is used. However, it is not thread-safe
/// ([`Sync`]) as it contains mutable configuration state.
#[must_use]
pub struct BlockPoolBuilder {
    block_count: Option<usize>,
    block_size: Option<usize>,
    observer: Option<Box<dyn PoolObserver>>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl BlockPoolBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            block_count: None,
            block_size: None,
            observer: None,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of blocks the pool will hold.
    ///
    /// [`BlockPool::max_block_count()`] is the largest value that can pass
    /// validation, regardless of block size.
    #[inline]
    pub fn block_count(mut self, block_count: usize) -> Self {
        self.block_count = Some(block_count);
        self
    }

    /// Sets the size of each block in bytes.
    ///
    /// Must be at least one pointer width; the free list stores its links
    /// inside the free blocks themselves.
    #[inline]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Installs an observer that is notified of every alloc/free transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_pool::{BlockPool, PoolEvent, PoolObserver};
    ///
    /// #[derive(Debug)]
    /// struct Silent;
    ///
    /// impl PoolObserver for Silent {
    ///     fn on_event(&self, _event: PoolEvent) {}
    /// }
    ///
    /// let pool = BlockPool::builder()
    ///     .block_count(4)
    ///     .block_size(64)
    ///     .observer(Silent)
    ///     .build()
    ///     .expect("pool parameters are valid");
    /// ```
    #[inline]
    pub fn observer(mut self, observer: impl PoolObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Builds the pool: validates the parameters, reserves the region and
    /// seeds the free list.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument`][crate::Error::InvalidArgument] if the block
    ///   count is zero, the block size is zero, or the block size is smaller
    ///   than one pointer width.
    /// - [`CapacityOverflow`][crate::Error::CapacityOverflow] if
    ///   `block_count * block_size` cannot be represented in address-width
    ///   arithmetic.
    /// - [`AllocationFailure`][crate::Error::AllocationFailure] if the
    ///   operating system cannot supply the backing region.
    ///
    /// # Panics
    ///
    /// Panics if the block count or block size was never set - a missing
    /// parameter is a programming error, not a runtime condition.
    pub fn build(self) -> Result<BlockPool> {
        let block_count = self
            .block_count
            .expect("block count must be set with .block_count() before calling .build()");
        let block_size = self
            .block_size
            .expect("block size must be set with .block_size() before calling .build()");

        BlockPool::new_inner(block_count, block_size, self.observer)
    }
}

impl fmt::Debug for BlockPoolBuilder {
    #[cfg_attr(test, mutants::skip)] // Formatting output is not behavior worth mutating.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPoolBuilder")
            .field("block_count", &self.block_count)
            .field("block_size", &self.block_size)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
