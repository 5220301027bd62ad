use std::ptr::{self, NonNull};

/// An intrusive LIFO stack of free block addresses.
///
/// The stack has no backing storage of its own: the "next" link of each entry
/// is written into the first pointer-width bytes of the free block itself.
/// A link exists only while the block is on the stack; once popped, the bytes
/// belong to the caller again.
///
/// Links are written with unaligned stores, so block addresses are not
/// required to be pointer-aligned.
///
/// The stack performs no validation: it does not know which region the pushed
/// addresses belong to, and it does not detect duplicate pushes. Both are the
/// responsibility of the pool that owns it.
#[derive(Debug)]
pub(crate) struct FreeList {
    /// Address of the most recently pushed free block, if any.
    head: Option<NonNull<u8>>,
}

impl FreeList {
    /// Creates an empty stack.
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self { head: None }
    }

    /// Pushes a free block address onto the stack.
    ///
    /// Writes the current head into the block's first pointer-width bytes and
    /// makes the block the new head. O(1), allocates nothing.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `block` is valid for reads and writes of `size_of::<*mut u8>()`
    ///   bytes.
    /// - Nothing else reads or writes those bytes until the block is returned
    ///   by [`pop()`](Self::pop).
    pub(crate) unsafe fn push(&mut self, block: NonNull<u8>) {
        let next = self.head.map_or(ptr::null_mut(), NonNull::as_ptr);

        // SAFETY: The caller guarantees the block is valid for a
        // pointer-width write and that we have exclusive access to it.
        unsafe {
            block.cast::<*mut u8>().as_ptr().write_unaligned(next);
        }

        self.head = Some(block);
    }

    /// Pops the most recently pushed free block address, if any.
    ///
    /// O(1), allocates nothing. After this returns, the stack no longer
    /// touches the block's bytes.
    pub(crate) fn pop(&mut self) -> Option<NonNull<u8>> {
        let top = self.head?;

        // SAFETY: `top` was pushed under the contract of `push()`, which
        // keeps its link bytes valid and unaliased until the block is popped.
        let next = unsafe { top.cast::<*mut u8>().as_ptr().read_unaligned() };

        self.head = NonNull::new(next);

        Some(top)
    }

    /// Returns `true` if no block address is on the stack.
    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

// SAFETY: The stack stores raw block addresses but only dereferences them
// under the contract of `push()`, which grants it exclusive access to the
// link bytes. No thread-local state is involved.
unsafe impl Send for FreeList {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pointer-aligned backing storage for link-sized test blocks.
    fn block_addresses(storage: &mut [u64]) -> Vec<NonNull<u8>> {
        storage
            .iter_mut()
            .map(|slot| NonNull::from(slot).cast::<u8>())
            .collect()
    }

    #[test]
    fn starts_empty() {
        let mut list = FreeList::new();

        assert!(list.is_empty());
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn pop_is_lifo() {
        let mut storage = [0_u64; 4];
        let blocks = block_addresses(&mut storage);

        let mut list = FreeList::new();

        for block in &blocks {
            // SAFETY: Each address covers one exclusively owned u64 slot,
            // which is at least pointer-sized.
            unsafe {
                list.push(*block);
            }
        }

        assert!(!list.is_empty());
        assert_eq!(list.pop(), Some(blocks[3]));
        assert_eq!(list.pop(), Some(blocks[2]));
        assert_eq!(list.pop(), Some(blocks[1]));
        assert_eq!(list.pop(), Some(blocks[0]));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn interleaved_push_pop() {
        let mut storage = [0_u64; 3];
        let blocks = block_addresses(&mut storage);

        let mut list = FreeList::new();

        // SAFETY: Exclusively owned pointer-sized slots, as above.
        unsafe {
            list.push(blocks[0]);
            list.push(blocks[1]);
        }

        assert_eq!(list.pop(), Some(blocks[1]));

        // SAFETY: blocks[1] was popped above, so pushing blocks[2] and
        // re-pushing blocks[1] touches only unaliased slots.
        unsafe {
            list.push(blocks[2]);
            list.push(blocks[1]);
        }

        assert_eq!(list.pop(), Some(blocks[1]));
        assert_eq!(list.pop(), Some(blocks[2]));
        assert_eq!(list.pop(), Some(blocks[0]));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn popped_block_is_released() {
        let mut storage = [0_u64; 1];
        let blocks = block_addresses(&mut storage);

        let mut list = FreeList::new();

        // SAFETY: Exclusively owned pointer-sized slot.
        unsafe {
            list.push(blocks[0]);
        }

        let popped = list.pop().expect("one block was pushed");
        assert_eq!(popped, blocks[0]);

        // The slot is ours again: writing caller data must not confuse a
        // later push/pop cycle.
        storage[0] = u64::MAX;

        // SAFETY: Exclusively owned pointer-sized slot.
        unsafe {
            list.push(blocks[0]);
        }

        assert_eq!(list.pop(), Some(blocks[0]));
        assert_eq!(list.pop(), None);
    }
}
