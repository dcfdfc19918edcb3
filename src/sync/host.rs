//! Host semaphore
//!
//! A [`Semaphore`] for hosted builds. Waiters sleep on a condition variable
//! instead of spinning through `portYIELD`, and timeouts are converted from
//! ticks to wall-clock time with `pdTICKS_TO_MS`.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::semaphore::Semaphore;
use crate::error::{Error, Result};
use crate::trace;
use crate::types::*;

#[derive(Clone, Copy)]
enum Deadline {
    Now,
    At(Instant),
    Never,
}

struct State {
    value: usize,
    interrupts: u64,
    closed: bool,
}

/// Condition variable backed counting semaphore.
pub struct HostSemaphore {
    state: Mutex<State>,
    posted: Condvar,
    max_value: usize,
}

impl HostSemaphore {
    fn id(&self) -> *const () {
        self as *const Self as *const ()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, deadline: Deadline) -> Result<()> {
        let mut state = self.lock();
        let generation = state.interrupts;
        let mut blocked = false;

        loop {
            if state.closed {
                return Err(Error::Invalid);
            }
            if state.value > 0 {
                state.value -= 1;
                return Ok(());
            }
            if state.interrupts != generation {
                return Err(Error::Interrupted);
            }

            if !blocked {
                trace::traceSEMAPHORE_BLOCK(self.id());
                blocked = true;
            }

            state = match deadline {
                Deadline::Now => return Err(Error::WouldBlock),
                Deadline::Never => self
                    .posted
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Deadline::At(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::TimedOut);
                    }
                    self.posted
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

impl Semaphore for HostSemaphore {
    fn new(value: usize, max_value: usize) -> Self {
        Self {
            state: Mutex::new(State {
                value,
                interrupts: 0,
                closed: false,
            }),
            posted: Condvar::new(),
            max_value,
        }
    }

    fn wait(&self) -> Result<()> {
        self.acquire(Deadline::Never)
    }

    fn try_wait(&self) -> Result<()> {
        self.acquire(Deadline::Now)
    }

    fn wait_for(&self, ticks: TickType_t) -> Result<()> {
        if ticks == portMAX_DELAY {
            return self.acquire(Deadline::Never);
        }
        let timeout = Duration::from_millis(pdTICKS_TO_MS(ticks) as u64);
        self.acquire(Deadline::At(Instant::now() + timeout))
    }

    fn post(&self) -> Result<()> {
        let mut state = self.lock();
        if state.value >= self.max_value {
            trace::traceSEMAPHORE_POST_OVERFLOW(self.id(), self.max_value);
            return Err(Error::Overflow);
        }
        state.value += 1;
        drop(state);
        self.posted.notify_one();
        Ok(())
    }

    fn value(&self) -> usize {
        self.lock().value
    }

    fn max_value(&self) -> usize {
        self.max_value
    }

    fn interrupt(&self) {
        self.lock().interrupts += 1;
        self.posted.notify_all();
        trace::traceSEMAPHORE_INTERRUPT(self.id());
    }

    fn close(&self) {
        self.lock().closed = true;
        self.posted.notify_all();
        trace::traceSEMAPHORE_CLOSE(self.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn try_wait_on_empty_would_block() {
        let sem = HostSemaphore::new(0, 2);
        assert_eq!(sem.try_wait(), Err(Error::WouldBlock));
        sem.post().unwrap();
        sem.post().unwrap();
        assert_eq!(sem.post(), Err(Error::Overflow));
        assert_eq!(sem.value(), 2);
        assert_eq!(sem.max_value(), 2);
    }

    #[test]
    fn post_wakes_blocked_waiter() {
        let sem = HostSemaphore::new(0, 1);
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
    }

    #[test]
    fn wait_for_times_out() {
        let sem = HostSemaphore::new(0, 1);
        let start = Instant::now();
        assert_eq!(sem.wait_for(pdMS_TO_TICKS(20)), Err(Error::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn interrupt_and_close_release_waiters() {
        let sem = HostSemaphore::new(0, 1);

        thread::scope(|s| {
            let waiter = s.spawn(|| sem.wait());
            thread::sleep(Duration::from_millis(50));
            sem.interrupt();
            assert_eq!(waiter.join().unwrap(), Err(Error::Interrupted));

            let waiter = s.spawn(|| sem.wait());
            thread::sleep(Duration::from_millis(50));
            sem.close();
            assert_eq!(waiter.join().unwrap(), Err(Error::Invalid));
        });
        assert_eq!(sem.value(), 0);
    }
}
