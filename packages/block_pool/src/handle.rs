use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::slice;

use crate::BlockPool;

/// Exclusive handle to one allocated block of a [`BlockPool`].
///
/// A handle is a capability to exactly one block's bytes, valid from the
/// [`alloc()`][BlockPool::alloc] call that issued it until the
/// [`free()`][BlockPool::free] call that consumes it. It cannot be copied or
/// cloned, so a block cannot be freed twice, and it borrows the pool, so the
/// pool cannot be dropped while any block is outstanding.
///
/// Dropping a handle without returning it to the pool leaks the block: the
/// pool will not hand it out again until [`reset()`][BlockPool::reset].
///
/// # Examples
///
/// ```
/// use block_pool::BlockPool;
///
/// let pool = BlockPool::builder()
///     .block_count(2)
///     .block_size(16)
///     .build()
///     .expect("pool parameters are valid");
///
/// let mut block = pool.alloc().expect("pool has free blocks");
///
/// // The block's bytes start out uninitialized.
/// for byte in block.as_uninit_slice() {
///     byte.write(0xAB);
/// }
///
/// pool.free(block);
/// ```
#[derive(Debug)]
pub struct BlockHandle<'pool> {
    /// Ensures this handle can only be returned to the pool it came from.
    pub(crate) pool_id: u64,

    /// Start address of the block inside the pool's reserved region.
    pub(crate) ptr: NonNull<u8>,

    /// Size of the block in bytes.
    pub(crate) len: usize,

    /// Ties the handle to the issuing pool so the region outlives it.
    pub(crate) _pool: PhantomData<&'pool BlockPool>,
}

impl BlockHandle<'_> {
    /// Returns the start address of the block.
    ///
    /// The pointer is valid for reads and writes of
    /// [`block_size()`][BlockPool::block_size] bytes for as long as the
    /// handle exists. Any access through a copy of this pointer after the
    /// handle has been freed is a use-after-free.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Returns the block's bytes for exclusive access.
    ///
    /// The bytes are uninitialized on first allocation and contain whatever
    /// a previous holder left behind after reuse.
    #[must_use]
    pub fn as_uninit_slice(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: The handle is the sole capability to this block, the
        // exclusive borrow of the handle makes this slice the only live
        // access path, and the borrow of the pool keeps the region alive.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<MaybeUninit<u8>>(), self.len) }
    }
}

// SAFETY: The handle is the sole referent of its block's bytes; the pool
// reuses them only after `free()` has consumed the handle.
unsafe impl Send for BlockHandle<'_> {}

// SAFETY: Shared references to the handle permit no writes to the block, so
// sharing it across threads is harmless.
unsafe impl Sync for BlockHandle<'_> {}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(BlockHandle<'static>: Send, Sync, Debug);
    assert_not_impl_any!(BlockHandle<'static>: Clone, Copy);

    #[test]
    fn uninit_slice_spans_the_block() {
        let pool = BlockPool::builder()
            .block_count(1)
            .block_size(32)
            .build()
            .expect("pool parameters are valid");

        let mut block = pool.alloc().expect("pool has free blocks");
        let start = block.ptr().as_ptr();

        let bytes = block.as_uninit_slice();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes.as_mut_ptr().cast::<u8>(), start);

        pool.free(block);
    }

    #[test]
    fn written_bytes_read_back() {
        let pool = BlockPool::builder()
            .block_count(1)
            .block_size(16)
            .build()
            .expect("pool parameters are valid");

        let mut block = pool.alloc().expect("pool has free blocks");

        for (index, byte) in block.as_uninit_slice().iter_mut().enumerate() {
            byte.write(u8::try_from(index).expect("block size fits in u8"));
        }

        // SAFETY: Every byte was initialized just above.
        let first = unsafe { block.ptr().as_ptr().read() };
        assert_eq!(first, 0);

        // SAFETY: As above; the last byte was initialized to 15.
        let last = unsafe { block.ptr().as_ptr().add(15).read() };
        assert_eq!(last, 15);

        pool.free(block);
    }
}
