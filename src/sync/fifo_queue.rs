//! Safe FIFO queue
//!
//! A fixed-capacity, allocation-free queue of `T` over caller-provided
//! storage. Elements are moved or cloned in and out one at a time; a full
//! queue blocks pushers and an empty one blocks poppers.
//!
//! # Example
//!
//! ```ignore
//! use rtos_fifo::sync::{FifoQueue, FifoQueueStorage};
//!
//! static mut STORAGE: FifoQueueStorage<u32, 8> = FifoQueueStorage::new();
//!
//! let queue = FifoQueue::from_storage(unsafe { &mut STORAGE });
//!
//! // producer task
//! queue.push_value(42)?;
//!
//! // consumer task
//! let value = queue.receive()?;
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use super::semaphore::{Block, CountingSemaphore, Semaphore};
use crate::error::{Error, Result};
use crate::scheduler::fifo_queue_base::FifoQueueBase;
use crate::types::*;

/// Storage for one queue element.
///
/// Uninitialized until an element is pushed into it.
#[repr(transparent)]
pub struct FifoQueueSlot<T>(MaybeUninit<T>);

impl<T> FifoQueueSlot<T> {
    /// An empty slot.
    pub const fn new() -> Self {
        Self(MaybeUninit::uninit())
    }

    pub(crate) fn as_mut_ptr(slot: *mut Self) -> *mut T {
        slot.cast()
    }
}

impl<T> Default for FifoQueueSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Statically sized storage for a [`FifoQueue`] of `N` elements.
///
/// Can be placed in a `static`.
pub struct FifoQueueStorage<T, const N: usize>([FifoQueueSlot<T>; N]);

impl<T, const N: usize> FifoQueueStorage<T, N> {
    /// `N` empty slots.
    pub const fn new() -> Self {
        Self([const { FifoQueueSlot::new() }; N])
    }

    /// The slots, for [`FifoQueue::new`].
    pub fn as_mut_slice(&mut self) -> &mut [FifoQueueSlot<T>] {
        &mut self.0
    }
}

impl<T, const N: usize> Default for FifoQueueStorage<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A failed move into the queue.
pub struct PushError<T> {
    /// Why the push failed.
    pub error: Error,
    /// The rejected element.
    ///
    /// `None` when the element reached the queue but waking the other side
    /// failed.
    pub value: Option<T>,
}

impl<T> PushError<T> {
    /// Take the rejected element back.
    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError")
            .field("error", &self.error)
            .field("returned", &self.value.is_some())
            .finish()
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push failed: {}", self.error)
    }
}

#[cfg(feature = "std")]
impl<T> std::error::Error for PushError<T> {}

impl<T> From<PushError<T>> for Error {
    fn from(error: PushError<T>) -> Self {
        error.error
    }
}

/// A type-safe FIFO queue for inter-task communication.
///
/// Any number of tasks may push and pop concurrently. Elements pushed by one
/// task come out in the order that task pushed them; between producers the
/// order is the order in which they win a free slot. The semaphore type `S`
/// decides how a blocked caller waits, [`CountingSemaphore`] works on every
/// port.
///
/// Element clones, constructors and destructors run outside the critical
/// section. They may block, and they may push to or pop from the same queue.
pub struct FifoQueue<'s, T, S: Semaphore = CountingSemaphore> {
    base: FifoQueueBase<S>,
    _storage: PhantomData<&'s mut [FifoQueueSlot<T>]>,
}

// Safety: elements move between tasks through the queue, access to the
// cursors is serialized by the semaphores and the port critical section.
unsafe impl<T: Send, S: Semaphore + Send> Send for FifoQueue<'_, T, S> {}
unsafe impl<T: Send, S: Semaphore + Sync> Sync for FifoQueue<'_, T, S> {}

impl<'s, T, S: Semaphore> FifoQueue<'s, T, S> {
    /// Creates an empty queue holding up to `storage.len()` elements.
    ///
    /// Returns `None` if `storage` is empty.
    pub fn new(storage: &'s mut [FifoQueueSlot<T>]) -> Option<Self> {
        if storage.is_empty() {
            return None;
        }
        let base = unsafe { FifoQueueBase::new(storage.as_mut_ptr(), storage.len()) };
        Some(Self {
            base,
            _storage: PhantomData,
        })
    }

    /// Creates an empty queue over statically sized storage.
    pub fn from_storage<const N: usize>(storage: &'s mut FifoQueueStorage<T, N>) -> Self {
        const { assert!(N > 0, "a FIFO queue needs at least one slot") };
        let base = unsafe { FifoQueueBase::new(storage.0.as_mut_ptr(), N) };
        Self {
            base,
            _storage: PhantomData,
        }
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Pushes a clone of `value`, blocking while the queue is full.
    pub fn push(&self, value: &T) -> Result<()>
    where
        T: Clone,
    {
        unsafe { self.base.push(value, Block::Forever) }
    }

    /// Pushes a clone of `value` without blocking.
    ///
    /// Fails with [`Error::WouldBlock`] if the queue is full.
    pub fn try_push(&self, value: &T) -> Result<()>
    where
        T: Clone,
    {
        unsafe { self.base.push(value, Block::Never) }
    }

    /// Pushes a clone of `value`, blocking for at most `ticks`.
    pub fn push_for(&self, value: &T, ticks: TickType_t) -> Result<()>
    where
        T: Clone,
    {
        unsafe { self.base.push(value, Block::For(ticks)) }
    }

    /// Moves `value` into the queue, blocking while the queue is full.
    pub fn push_value(&self, value: T) -> core::result::Result<(), PushError<T>> {
        unsafe { self.base.push_value(value, Block::Forever) }
    }

    /// Moves `value` into the queue without blocking.
    pub fn try_push_value(&self, value: T) -> core::result::Result<(), PushError<T>> {
        unsafe { self.base.push_value(value, Block::Never) }
    }

    /// Moves `value` into the queue, blocking for at most `ticks`.
    pub fn push_value_for(
        &self,
        value: T,
        ticks: TickType_t,
    ) -> core::result::Result<(), PushError<T>> {
        unsafe { self.base.push_value(value, Block::For(ticks)) }
    }

    /// Constructs an element in place, blocking while the queue is full.
    ///
    /// `constructor` only runs once a slot is reserved.
    pub fn emplace(&self, constructor: impl FnOnce() -> T) -> Result<()> {
        unsafe { self.base.emplace(constructor, Block::Forever) }
    }

    /// Constructs an element in place without blocking.
    pub fn try_emplace(&self, constructor: impl FnOnce() -> T) -> Result<()> {
        unsafe { self.base.emplace(constructor, Block::Never) }
    }

    /// Constructs an element in place, blocking for at most `ticks`.
    pub fn emplace_for(&self, constructor: impl FnOnce() -> T, ticks: TickType_t) -> Result<()> {
        unsafe { self.base.emplace(constructor, Block::For(ticks)) }
    }

    // =========================================================================
    // Pop
    // =========================================================================

    /// Pops the oldest element into `value`, blocking while the queue is empty.
    ///
    /// The previous content of `value` is dropped.
    pub fn pop(&self, value: &mut T) -> Result<()> {
        unsafe { self.base.pop(value, Block::Forever) }
    }

    /// Pops the oldest element into `value` without blocking.
    pub fn try_pop(&self, value: &mut T) -> Result<()> {
        unsafe { self.base.pop(value, Block::Never) }
    }

    /// Pops the oldest element into `value`, blocking for at most `ticks`.
    pub fn pop_for(&self, value: &mut T, ticks: TickType_t) -> Result<()> {
        unsafe { self.base.pop(value, Block::For(ticks)) }
    }

    /// Removes and returns the oldest element, blocking while the queue is
    /// empty.
    pub fn receive(&self) -> Result<T> {
        unsafe { self.base.receive(Block::Forever) }
    }

    /// Removes and returns the oldest element without blocking.
    pub fn try_receive(&self) -> Result<T> {
        unsafe { self.base.receive(Block::Never) }
    }

    /// Removes and returns the oldest element, blocking for at most `ticks`.
    pub fn receive_for(&self, ticks: TickType_t) -> Result<T> {
        unsafe { self.base.receive(Block::For(ticks)) }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Number of elements waiting to be popped.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Number of free slots.
    pub fn free_slots(&self) -> usize {
        self.base.free_slots()
    }

    /// Number of slots, fixed at creation.
    pub fn capacity(&self) -> usize {
        self.base.capacity()
    }

    /// `true` when no element is available.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when no slot is free.
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Wakes every blocked push and pop with [`Error::Interrupted`].
    ///
    /// The queue content is not touched.
    pub fn interrupt_waiters(&self) {
        self.base.interrupt();
    }

    /// Fails every current and future push and pop with [`Error::Invalid`].
    ///
    /// Elements still queued are dropped with the queue.
    pub fn close(&self) {
        self.base.close();
    }
}

impl<T, S: Semaphore> Drop for FifoQueue<'_, T, S> {
    fn drop(&mut self) {
        unsafe {
            self.base.drain::<T>();
        }
    }
}
