use std::ptr::NonNull;

/// The allocation state transition that a [`PoolEvent`] describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PoolOperation {
    /// A block was handed out by [`alloc()`][crate::BlockPool::alloc].
    Alloc,

    /// A block was returned by [`free()`][crate::BlockPool::free].
    Free,
}

/// A snapshot of one allocation or free transition, delivered to the
/// pool's [`PoolObserver`].
///
/// The addresses in the event identify memory but grant no access to it -
/// by the time an observer processes a stored event, an allocated block may
/// already have been freed and reissued.
#[derive(Clone, Copy, Debug)]
pub struct PoolEvent {
    /// Which transition occurred.
    pub operation: PoolOperation,

    /// Base address of the pool's reserved region.
    pub region_start: NonNull<u8>,

    /// Address of the block that was allocated or freed.
    pub address: NonNull<u8>,

    /// Bytes allocated from the pool immediately after the transition.
    pub used: usize,
}

// SAFETY: The event carries addresses purely as identifiers; it grants no
// access to the memory they point at.
unsafe impl Send for PoolEvent {}

// SAFETY: As above - the event is plain immutable data.
unsafe impl Sync for PoolEvent {}

/// Observes allocation and free transitions of a [`BlockPool`][crate::BlockPool].
///
/// An observer is installed at construction time via
/// [`BlockPoolBuilder::observer()`][crate::BlockPoolBuilder::observer] and is
/// invoked synchronously inside the pool's critical section, so the `used`
/// value it sees is exact and events arrive in transition order. Keep
/// implementations short: a slow observer delays every other thread using
/// the pool.
///
/// The pool itself performs no console or file I/O; any logging of
/// allocation events belongs in an observer.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use block_pool::{BlockPool, PoolEvent, PoolObserver};
///
/// #[derive(Debug, Default)]
/// struct TransitionCounter(AtomicUsize);
///
/// impl PoolObserver for TransitionCounter {
///     fn on_event(&self, _event: PoolEvent) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let pool = BlockPool::builder()
///     .block_count(4)
///     .block_size(64)
///     .observer(TransitionCounter::default())
///     .build()
///     .expect("pool parameters are valid");
///
/// let block = pool.alloc().expect("pool has free blocks");
/// pool.free(block);
/// ```
pub trait PoolObserver: Send + Sync {
    /// Called once per allocation or free, inside the pool's critical
    /// section.
    fn on_event(&self, event: PoolEvent);
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolEvent: Send, Sync, Copy, Debug);
    assert_impl_all!(PoolOperation: Send, Sync, Copy, Debug);

    #[test]
    fn operations_are_distinct() {
        assert_ne!(PoolOperation::Alloc, PoolOperation::Free);
    }
}
