/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] Type-erased core of the FIFO queue. It is generic over the
 * semaphore only, so every element type shares one copy of the transfer
 * logic. Element actions reach it as `&mut dyn Functor`.
 */

//! FIFO Queue Core
//!
//! Two semaphores and two cursors over caller-provided storage:
//!
//! - `pop_semaphore` - number of elements available for reading
//! - `push_semaphore` - number of free slots
//! - `read_position` / `write_position` - next slot to read / write
//!
//! A push waits on `push_semaphore`, writes the slot at `write_position`,
//! advances (wrapping at the end of storage) and posts `pop_semaphore`. A pop
//! does the same in the other direction.
//!
//! Only the raw slot write or read and the advance run with kernel interrupts
//! masked. Element code (`Clone`, constructors, `Drop`) runs outside that
//! window, so it may block or call back into the same queue. Slots are claimed
//! in cursor order, and every post follows a completed write or read, so the
//! counted slots are always the ones next to the cursors.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::mem::{self, size_of, MaybeUninit};
use core::ptr;

use crate::config::configASSERT;
use crate::error::Result;
use crate::port::critical;
use crate::sync::{Block, FifoQueueSlot, PushError, Semaphore};
use crate::trace;

// =============================================================================
// Element actions
// =============================================================================

/// Type-erased element action.
pub trait Functor {
    /// Produce whatever the slot transfer needs.
    ///
    /// Runs after the wait succeeded, outside the critical section. This is
    /// the only place an action may run element code.
    fn prepare(&mut self) {}

    /// Transfer one element to or from the slot at `*storage` and move
    /// `*storage` one slot forward.
    ///
    /// Runs inside the critical section and must not call element code.
    ///
    /// # Safety
    ///
    /// `*storage` must point to a slot of the element type the functor was
    /// made for, initialized or not as the action expects.
    unsafe fn call(&mut self, storage: &mut *mut u8);
}

/// Action on a single slot of type `T`, advancing by exactly one slot.
pub struct BoundedFunctor<T, F> {
    functor: F,
    _marker: PhantomData<fn(*mut FifoQueueSlot<T>)>,
}

impl<T, F> Functor for BoundedFunctor<T, F>
where
    F: FnMut(*mut FifoQueueSlot<T>),
{
    unsafe fn call(&mut self, storage: &mut *mut u8) {
        let slot = *storage as *mut FifoQueueSlot<T>;
        (self.functor)(slot);
        *storage = slot.add(1) as *mut u8;
    }
}

/// Wrap a slot action so the core can call it without knowing `T`.
pub fn make_bounded_functor<T, F>(functor: F) -> BoundedFunctor<T, F>
where
    F: FnMut(*mut FifoQueueSlot<T>),
{
    BoundedFunctor {
        functor,
        _marker: PhantomData,
    }
}

/// Push action: builds the element in `prepare`, moves it into the slot in
/// `call`.
///
/// `value` still holds the element when the push failed before the transfer.
pub struct PushFunctor<T, F> {
    constructor: Option<F>,
    value: Option<T>,
}

impl<T> PushFunctor<T, fn() -> T> {
    /// Push an element that already exists.
    pub fn with_value(value: T) -> Self {
        Self {
            constructor: None,
            value: Some(value),
        }
    }
}

impl<T, F: FnOnce() -> T> PushFunctor<T, F> {
    /// Push the result of `constructor`, run once a slot is reserved.
    pub fn with_constructor(constructor: F) -> Self {
        Self {
            constructor: Some(constructor),
            value: None,
        }
    }

    /// The element, if it never reached the queue.
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

impl<T, F: FnOnce() -> T> Functor for PushFunctor<T, F> {
    fn prepare(&mut self) {
        if let Some(constructor) = self.constructor.take() {
            self.value = Some(constructor());
        }
    }

    unsafe fn call(&mut self, storage: &mut *mut u8) {
        let slot = *storage as *mut FifoQueueSlot<T>;
        configASSERT(self.value.is_some());
        if let Some(value) = self.value.take() {
            FifoQueueSlot::as_mut_ptr(slot).write(value);
        }
        *storage = slot.add(1) as *mut u8;
    }
}

/// A count taken from a semaphore and not yet matched by a transfer.
///
/// Dropping it gives the count back. Forget it once the slot was transferred.
struct Permit<'a, S: Semaphore> {
    semaphore: &'a S,
}

impl<S: Semaphore> Drop for Permit<'_, S> {
    fn drop(&mut self) {
        // cannot overflow: the count was taken by this permit
        let _ = self.semaphore.post();
    }
}

// =============================================================================
// Queue core
// =============================================================================

/// FIFO queue core over a pair of semaphores.
pub struct FifoQueueBase<S: Semaphore> {
    /// Value equals the number of available elements
    pop_semaphore: S,

    /// Value equals the number of free slots
    push_semaphore: S,

    storage_begin: *mut u8,

    /// Past-the-last slot
    storage_end: *mut u8,

    read_position: UnsafeCell<*mut u8>,

    write_position: UnsafeCell<*mut u8>,
}

impl<S: Semaphore> FifoQueueBase<S> {
    /// Create an empty queue over `max_elements` slots at `storage`.
    ///
    /// # Safety
    ///
    /// `storage` must be valid for `max_elements` slots for as long as the
    /// queue exists, and nothing else may access them meanwhile.
    pub unsafe fn new<T>(storage: *mut FifoQueueSlot<T>, max_elements: usize) -> Self {
        configASSERT(max_elements > 0);

        let storage_begin = storage as *mut u8;
        let storage_end = storage.add(max_elements) as *mut u8;

        let queue = Self {
            pop_semaphore: S::new(0, max_elements),
            push_semaphore: S::new(max_elements, max_elements),
            storage_begin,
            storage_end,
            read_position: UnsafeCell::new(storage_begin),
            write_position: UnsafeCell::new(storage_begin),
        };
        trace::traceFIFO_QUEUE_CREATE(queue.id(), max_elements, size_of::<T>());
        queue
    }

    fn id(&self) -> *const () {
        self as *const Self as *const ()
    }

    /// Wait on `wait_semaphore`, prepare `functor`, run it on the slot at
    /// `storage`, wrap the cursor and post `post_semaphore`.
    ///
    /// A failed wait is returned unchanged and nothing else happens. If
    /// `prepare` unwinds, the count taken by the wait is given back.
    fn pop_push_implementation(
        &self,
        functor: &mut dyn Functor,
        wait_semaphore: &S,
        post_semaphore: &S,
        storage: &UnsafeCell<*mut u8>,
        block: Block,
    ) -> Result<()> {
        block.wait_on(wait_semaphore)?;
        let permit = Permit {
            semaphore: wait_semaphore,
        };

        functor.prepare();

        critical(|| unsafe {
            let position = &mut *storage.get();
            functor.call(position);
            if *position == self.storage_end {
                *position = self.storage_begin;
            }
        });
        mem::forget(permit);

        post_semaphore
            .post()
            .inspect_err(|&error| trace::traceFIFO_QUEUE_POST_FAILED(self.id(), error))
    }

    /// Run `functor` on the first free slot.
    pub fn push_implementation(&self, functor: &mut dyn Functor, block: Block) -> Result<()> {
        let result = self.pop_push_implementation(
            functor,
            &self.push_semaphore,
            &self.pop_semaphore,
            &self.write_position,
            block,
        );
        match result {
            Ok(()) => trace::traceFIFO_QUEUE_PUSH(self.id()),
            Err(error) => trace::traceFIFO_QUEUE_PUSH_FAILED(self.id(), error),
        }
        result
    }

    /// Run `functor` on the oldest element.
    pub fn pop_implementation(&self, functor: &mut dyn Functor, block: Block) -> Result<()> {
        let result = self.pop_push_implementation(
            functor,
            &self.pop_semaphore,
            &self.push_semaphore,
            &self.read_position,
            block,
        );
        match result {
            Ok(()) => trace::traceFIFO_QUEUE_POP(self.id()),
            Err(error) => trace::traceFIFO_QUEUE_POP_FAILED(self.id(), error),
        }
        result
    }

    // =========================================================================
    // Typed actions
    // =========================================================================
    //
    // Safety for all of them: the queue must have been created with storage
    // of `FifoQueueSlot<T>`.

    /// Push a clone of `value`.
    pub unsafe fn push<T: Clone>(&self, value: &T, block: Block) -> Result<()> {
        self.emplace(|| value.clone(), block)
    }

    /// Move `value` into the queue.
    ///
    /// On failure the value is handed back unless it already reached the
    /// queue.
    pub unsafe fn push_value<T>(
        &self,
        value: T,
        block: Block,
    ) -> core::result::Result<(), PushError<T>> {
        let mut functor = PushFunctor::with_value(value);
        let result = self.push_implementation(&mut functor, block);
        result.map_err(|error| PushError {
            error,
            value: functor.into_value(),
        })
    }

    /// Construct an element from `constructor` once a slot is reserved.
    pub unsafe fn emplace<T, F>(&self, constructor: F, block: Block) -> Result<()>
    where
        F: FnOnce() -> T,
    {
        let mut functor = PushFunctor::with_constructor(constructor);
        self.push_implementation(&mut functor, block)
    }

    /// Swap the oldest element into `value`, then destroy what was swapped
    /// out.
    ///
    /// The old value is dropped after the slot was freed.
    pub unsafe fn pop<T>(&self, value: &mut T, block: Block) -> Result<()> {
        let mut element = self.receive::<T>(block)?;
        mem::swap(value, &mut element);
        drop(element);
        Ok(())
    }

    /// Move the oldest element out.
    ///
    /// If the free-slot post fails after the move, the element is dropped
    /// before the error is returned.
    pub unsafe fn receive<T>(&self, block: Block) -> Result<T> {
        let mut received = MaybeUninit::<T>::uninit();
        let mut moved = false;
        let result = {
            let mut functor = make_bounded_functor(|slot: *mut FifoQueueSlot<T>| {
                received.write(FifoQueueSlot::as_mut_ptr(slot).read());
                moved = true;
            });
            self.pop_implementation(&mut functor, block)
        };

        match result {
            Ok(()) => Ok(received.assume_init()),
            Err(error) => {
                if moved {
                    received.assume_init_drop();
                }
                Err(error)
            }
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Number of available elements.
    pub fn len(&self) -> usize {
        self.pop_semaphore.value()
    }

    /// Number of free slots.
    pub fn free_slots(&self) -> usize {
        self.push_semaphore.value()
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.push_semaphore.max_value()
    }

    /// Fail every blocked push and pop with `Error::Interrupted`.
    pub fn interrupt(&self) {
        self.pop_semaphore.interrupt();
        self.push_semaphore.interrupt();
    }

    /// Fail every current and future push and pop with `Error::Invalid`.
    pub fn close(&self) {
        self.pop_semaphore.close();
        self.push_semaphore.close();
        trace::traceFIFO_QUEUE_CLOSE(self.id());
    }

    /// Destroy the remaining elements, oldest first, and return how many
    /// there were.
    ///
    /// Works on a closed queue too: the semaphores are only read.
    pub unsafe fn drain<T>(&mut self) -> usize {
        let count = self.pop_semaphore.value();
        let mut position = *self.read_position.get_mut();

        for _ in 0..count {
            let slot = position as *mut FifoQueueSlot<T>;
            ptr::drop_in_place(FifoQueueSlot::as_mut_ptr(slot));
            position = slot.add(1) as *mut u8;
            if position == self.storage_end {
                position = self.storage_begin;
            }
        }

        *self.read_position.get_mut() = position;
        trace::traceFIFO_QUEUE_DELETE(self.id(), count);
        count
    }

    #[cfg(test)]
    fn positions(&self) -> (*mut u8, *mut u8) {
        unsafe { (*self.read_position.get(), *self.write_position.get()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sync::CountingSemaphore;
    use crate::types::TickType_t;
    use std::cell::Cell;
    use std::rc::Rc;

    fn slots<T, const N: usize>() -> [FifoQueueSlot<T>; N] {
        [const { FifoQueueSlot::new() }; N]
    }

    #[test]
    fn cursors_wrap_at_end_of_storage() {
        let mut storage = slots::<u32, 3>();
        let begin = storage.as_mut_ptr() as *mut u8;
        let queue: FifoQueueBase<CountingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 3) };

        for i in 0..3u32 {
            unsafe { queue.push(&i, Block::Never).unwrap() };
        }
        assert_eq!(queue.positions(), (begin, begin));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.free_slots(), 0);

        for i in 0..3 {
            assert_eq!(unsafe { queue.receive::<u32>(Block::Never) }, Ok(i));
        }
        assert_eq!(queue.positions(), (begin, begin));
        assert_eq!(queue.free_slots(), 3);
    }

    #[test]
    fn failed_wait_leaves_cursors_alone() {
        let mut storage = slots::<u8, 2>();
        let queue: FifoQueueBase<CountingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 2) };
        let before = queue.positions();

        let mut called = false;
        let mut functor = make_bounded_functor(|_: *mut FifoQueueSlot<u8>| called = true);
        assert_eq!(
            queue.pop_implementation(&mut functor, Block::Never),
            Err(Error::WouldBlock)
        );
        drop(functor);

        assert!(!called);
        assert_eq!(queue.positions(), before);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.free_slots(), 2);
    }

    #[test]
    fn zero_sized_elements_use_no_storage() {
        let mut storage = slots::<(), 4>();
        let queue: FifoQueueBase<CountingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 4) };

        for _ in 0..4 {
            unsafe { queue.push_value((), Block::Never).unwrap() };
        }
        assert!(unsafe { queue.push_value((), Block::Never) }.is_err());
        assert_eq!(unsafe { queue.receive::<()>(Block::Never) }, Ok(()));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn drain_destroys_remaining_elements_once() {
        let token = Rc::new(());
        let mut storage = slots::<Rc<()>, 3>();
        let mut queue: FifoQueueBase<CountingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 3) };

        unsafe {
            // advance the cursors so the remaining elements wrap
            queue.push(&token, Block::Never).unwrap();
            queue.push(&token, Block::Never).unwrap();
            drop(queue.receive::<Rc<()>>(Block::Never).unwrap());
            queue.push(&token, Block::Never).unwrap();
            queue.push(&token, Block::Never).unwrap();
        }
        assert_eq!(Rc::strong_count(&token), 4);

        assert_eq!(unsafe { queue.drain::<Rc<()>>() }, 3);
        assert_eq!(Rc::strong_count(&token), 1);
    }

    std::thread_local! {
        static REFUSE_POST: Cell<bool> = const { Cell::new(false) };
    }

    /// Counting semaphore whose posts fail while `REFUSE_POST` is set.
    struct RefusingSemaphore(CountingSemaphore);

    impl Semaphore for RefusingSemaphore {
        fn new(value: usize, max_value: usize) -> Self {
            Self(CountingSemaphore::new(value, max_value))
        }
        fn wait(&self) -> Result<()> {
            self.0.wait()
        }
        fn try_wait(&self) -> Result<()> {
            self.0.try_wait()
        }
        fn wait_for(&self, ticks: TickType_t) -> Result<()> {
            self.0.wait_for(ticks)
        }
        fn post(&self) -> Result<()> {
            if REFUSE_POST.with(Cell::get) {
                return Err(Error::Overflow);
            }
            self.0.post()
        }
        fn value(&self) -> usize {
            self.0.value()
        }
        fn max_value(&self) -> usize {
            self.0.max_value()
        }
        fn interrupt(&self) {
            self.0.interrupt()
        }
        fn close(&self) {
            self.0.close()
        }
    }

    #[test]
    fn failed_post_after_receive_drops_the_element() {
        let token = Rc::new(());
        let mut storage = slots::<Rc<()>, 2>();
        let queue: FifoQueueBase<RefusingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 2) };

        unsafe { queue.push(&token, Block::Never).unwrap() };
        assert_eq!(Rc::strong_count(&token), 2);

        REFUSE_POST.with(|refuse| refuse.set(true));
        let received = unsafe { queue.receive::<Rc<()>>(Block::Never) };
        REFUSE_POST.with(|refuse| refuse.set(false));

        assert_eq!(received.err(), Some(Error::Overflow));
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn failed_post_after_push_keeps_the_element_queued() {
        let mut storage = slots::<u32, 2>();
        let queue: FifoQueueBase<RefusingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 2) };

        REFUSE_POST.with(|refuse| refuse.set(true));
        let pushed = unsafe { queue.push_value(7u32, Block::Never) };
        REFUSE_POST.with(|refuse| refuse.set(false));

        let error = pushed.unwrap_err();
        assert_eq!(error.error, Error::Overflow);
        assert_eq!(error.value, None);
    }

    #[test]
    fn unwinding_constructor_returns_the_free_slot() {
        let mut storage = slots::<u32, 2>();
        let queue: FifoQueueBase<CountingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 2) };
        let before = queue.positions();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            queue.emplace::<u32, _>(|| panic!("constructor failed"), Block::Never)
        }));

        assert!(result.is_err());
        assert_eq!(queue.positions(), before);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.free_slots(), 2);
    }

    #[test]
    fn prepare_runs_outside_the_critical_section() {
        struct Prepared<'a> {
            inner: &'a FifoQueueBase<CountingSemaphore>,
            inner_result: Option<Result<()>>,
        }

        impl Functor for Prepared<'_> {
            fn prepare(&mut self) {
                // a nested transfer on the same direction takes the next slot
                self.inner_result = Some(unsafe { self.inner.push_value(1u32, Block::Never) }
                    .map_err(|error| error.error));
            }

            unsafe fn call(&mut self, storage: &mut *mut u8) {
                let slot = *storage as *mut FifoQueueSlot<u32>;
                FifoQueueSlot::as_mut_ptr(slot).write(2);
                *storage = slot.add(1) as *mut u8;
            }
        }

        let mut storage = slots::<u32, 3>();
        let queue: FifoQueueBase<CountingSemaphore> =
            unsafe { FifoQueueBase::new(storage.as_mut_ptr(), 3) };

        let mut functor = Prepared {
            inner: &queue,
            inner_result: None,
        };
        assert_eq!(queue.push_implementation(&mut functor, Block::Never), Ok(()));
        assert_eq!(functor.inner_result, Some(Ok(())));

        assert_eq!(queue.len(), 2);
        assert_eq!(unsafe { queue.receive::<u32>(Block::Never) }, Ok(1));
        assert_eq!(unsafe { queue.receive::<u32>(Block::Never) }, Ok(2));
        assert_eq!(queue.free_slots(), 3);
    }
}
