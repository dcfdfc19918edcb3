//! Counting semaphores
//!
//! [`Semaphore`] is the contract the FIFO queue is built on. Any kernel
//! semaphore can be plugged in by implementing it; this crate ships
//! [`CountingSemaphore`], which works on every port, and `HostSemaphore`
//! (with `std`), which parks host threads on a condition variable.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::port::{critical, portYIELD, xPortGetTickCount};
use crate::trace;
use crate::types::*;

/// A counting semaphore with a fixed maximum value.
///
/// `wait` decrements the count, suspending the caller while it is zero.
/// `post` increments it and wakes at most one waiter. Which waiter is woken is
/// up to the scheduler.
///
/// A failed wait never changes the count.
pub trait Semaphore {
    /// Creates a semaphore with the given initial and maximum value.
    fn new(value: usize, max_value: usize) -> Self
    where
        Self: Sized;

    /// Decrements the count, blocking until it is above zero.
    ///
    /// Fails with [`Error::Interrupted`] when [`interrupt`](Self::interrupt)
    /// is called during the wait, [`Error::Invalid`] once the semaphore is
    /// closed.
    fn wait(&self) -> Result<()>;

    /// Decrements the count without blocking.
    ///
    /// Fails with [`Error::WouldBlock`] when the count is zero.
    fn try_wait(&self) -> Result<()>;

    /// Decrements the count, blocking for at most `ticks` tick periods.
    ///
    /// Fails with [`Error::TimedOut`] when the ticks elapse. `portMAX_DELAY`
    /// waits forever.
    fn wait_for(&self, ticks: TickType_t) -> Result<()>;

    /// Increments the count and wakes one waiter.
    ///
    /// Fails with [`Error::Overflow`] when the count is already at its maximum.
    fn post(&self) -> Result<()>;

    /// Current count.
    fn value(&self) -> usize;

    /// Maximum count.
    fn max_value(&self) -> usize;

    /// Fails every wait that is currently blocked with [`Error::Interrupted`].
    fn interrupt(&self);

    /// Fails every current and future wait with [`Error::Invalid`].
    ///
    /// Posts are still accepted so that a transfer in flight can complete.
    fn close(&self);
}

/// How long a wait may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Block {
    Never,
    For(TickType_t),
    Forever,
}

impl Block {
    pub(crate) fn wait_on<S: Semaphore>(self, semaphore: &S) -> Result<()> {
        match self {
            Block::Never => semaphore.try_wait(),
            Block::For(ticks) => semaphore.wait_for(ticks),
            Block::Forever => semaphore.wait(),
        }
    }
}

/// A counting semaphore for any port.
///
/// The count is only changed inside the port critical section. A task that has
/// to wait gives the processor away with `portYIELD` and retries when it is
/// scheduled again; timeouts are counted in kernel ticks.
///
/// # Example
///
/// ```ignore
/// use rtos_fifo::sync::{CountingSemaphore, Semaphore};
///
/// // Max 5, 3 available
/// let pool = CountingSemaphore::new(3, 5);
///
/// pool.wait()?;
/// pool.post()?;
/// ```
pub struct CountingSemaphore {
    // load/store only: ARMv6-M has no atomic read-modify-write
    value: AtomicUsize,
    max_value: usize,
    interrupts: AtomicUsize,
    closed: AtomicBool,
}

impl CountingSemaphore {
    /// Creates a semaphore with the given initial and maximum value.
    pub const fn new(value: usize, max_value: usize) -> Self {
        Self {
            value: AtomicUsize::new(value),
            max_value,
            interrupts: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn id(&self) -> *const () {
        self as *const Self as *const ()
    }

    /// One attempt to take the semaphore. `None` means the count was zero.
    fn take(&self, generation: usize) -> Option<Result<()>> {
        critical(|| {
            if self.closed.load(Ordering::Relaxed) {
                return Some(Err(Error::Invalid));
            }
            let value = self.value.load(Ordering::Relaxed);
            if value > 0 {
                self.value.store(value - 1, Ordering::Relaxed);
                return Some(Ok(()));
            }
            if self.interrupts.load(Ordering::Relaxed) != generation {
                return Some(Err(Error::Interrupted));
            }
            None
        })
    }

    fn acquire(&self, block: Block) -> Result<()> {
        let generation = critical(|| self.interrupts.load(Ordering::Relaxed));
        let start = xPortGetTickCount();
        let mut blocked = false;

        loop {
            if let Some(result) = self.take(generation) {
                return result;
            }

            match block {
                Block::Never => return Err(Error::WouldBlock),
                Block::For(ticks) if xPortGetTickCount().wrapping_sub(start) >= ticks => {
                    return Err(Error::TimedOut);
                }
                _ => {}
            }

            if !blocked {
                trace::traceSEMAPHORE_BLOCK(self.id());
                blocked = true;
            }
            portYIELD();
        }
    }
}

impl Semaphore for CountingSemaphore {
    fn new(value: usize, max_value: usize) -> Self {
        CountingSemaphore::new(value, max_value)
    }

    fn wait(&self) -> Result<()> {
        self.acquire(Block::Forever)
    }

    fn try_wait(&self) -> Result<()> {
        self.acquire(Block::Never)
    }

    fn wait_for(&self, ticks: TickType_t) -> Result<()> {
        if ticks == portMAX_DELAY {
            self.acquire(Block::Forever)
        } else {
            self.acquire(Block::For(ticks))
        }
    }

    fn post(&self) -> Result<()> {
        critical(|| {
            let value = self.value.load(Ordering::Relaxed);
            if value >= self.max_value {
                trace::traceSEMAPHORE_POST_OVERFLOW(self.id(), self.max_value);
                return Err(Error::Overflow);
            }
            self.value.store(value + 1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn value(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }

    fn max_value(&self) -> usize {
        self.max_value
    }

    fn interrupt(&self) {
        critical(|| {
            let generation = self.interrupts.load(Ordering::Relaxed);
            self.interrupts
                .store(generation.wrapping_add(1), Ordering::Relaxed);
        });
        trace::traceSEMAPHORE_INTERRUPT(self.id());
    }

    fn close(&self) {
        critical(|| self.closed.store(true, Ordering::Relaxed));
        trace::traceSEMAPHORE_CLOSE(self.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::xPortSysTickHandler;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn counts_down_and_up() {
        let sem = CountingSemaphore::new(2, 3);
        assert_eq!(sem.wait(), Ok(()));
        assert_eq!(sem.try_wait(), Ok(()));
        assert_eq!(sem.value(), 0);
        assert_eq!(sem.try_wait(), Err(Error::WouldBlock));
        assert_eq!(sem.value(), 0);
        sem.post().unwrap();
        assert_eq!(sem.value(), 1);
    }

    #[test]
    fn post_above_max_overflows() {
        let sem = CountingSemaphore::new(1, 1);
        assert_eq!(sem.post(), Err(Error::Overflow));
        assert_eq!(sem.value(), 1);
    }

    #[test]
    fn wait_blocks_until_post() {
        let sem = CountingSemaphore::new(0, 1);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let result = sem.wait();
                done.store(true, Ordering::SeqCst);
                result
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!done.load(Ordering::SeqCst));

            sem.post().unwrap();
            assert_eq!(waiter.join().unwrap(), Ok(()));
        });
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn interrupt_fails_blocked_wait_without_consuming() {
        let sem = CountingSemaphore::new(0, 1);

        thread::scope(|s| {
            let waiter = s.spawn(|| sem.wait());
            thread::sleep(Duration::from_millis(50));
            sem.interrupt();
            assert_eq!(waiter.join().unwrap(), Err(Error::Interrupted));
        });

        // a later wait is not affected
        sem.post().unwrap();
        assert_eq!(sem.try_wait(), Ok(()));
    }

    #[test]
    fn closed_semaphore_is_invalid() {
        let sem = CountingSemaphore::new(1, 1);
        sem.close();
        assert_eq!(sem.wait(), Err(Error::Invalid));
        assert_eq!(sem.try_wait(), Err(Error::Invalid));
        assert_eq!(sem.value(), 1);
    }

    #[test]
    fn wait_for_times_out_on_ticks() {
        let sem = CountingSemaphore::new(0, 1);
        let stop = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                while !stop.load(Ordering::SeqCst) {
                    xPortSysTickHandler();
                    thread::sleep(Duration::from_millis(1));
                }
            });

            assert_eq!(sem.wait_for(5), Err(Error::TimedOut));
            stop.store(true, Ordering::SeqCst);
        });
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn wait_for_zero_ticks_does_not_block() {
        let sem = CountingSemaphore::new(0, 1);
        assert_eq!(sem.wait_for(0), Err(Error::TimedOut));
        sem.post().unwrap();
        assert_eq!(sem.wait_for(0), Ok(()));
    }
}
