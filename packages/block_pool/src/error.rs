use thiserror::Error;

/// Errors that can occur when constructing or allocating from a
/// [`BlockPool`][crate::BlockPool].
///
/// All errors are synchronous and reported to the immediate caller. The pool
/// never retries internally; after [`PoolExhausted`][Error::PoolExhausted] the
/// caller may retry once some block has been returned with
/// [`free()`][crate::BlockPool::free].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A construction parameter was unusable: a zero block count, a zero block
    /// size, or a block size smaller than one pointer width (the free list
    /// stores its links inside free blocks, so every block must be able to
    /// hold one pointer).
    #[error("invalid pool parameters: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: &'static str,
    },

    /// The product of block count and block size cannot be represented in
    /// address-width arithmetic.
    #[error("{block_count} blocks of {block_size} bytes cannot be represented in the address space")]
    CapacityOverflow {
        /// The requested number of blocks.
        block_count: usize,

        /// The requested size of each block, in bytes.
        block_size: usize,
    },

    /// The operating system could not supply the backing memory region.
    #[error("the system could not reserve {capacity} bytes for the pool region")]
    AllocationFailure {
        /// The number of bytes that was requested.
        capacity: usize,
    },

    /// Every block is currently allocated. The call does not wait for a
    /// concurrent [`free()`][crate::BlockPool::free] - it reports exhaustion
    /// immediately.
    #[error("all blocks are allocated")]
    PoolExhausted,
}

/// A specialized `Result` type for block pool operations, returning the
/// crate's [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
