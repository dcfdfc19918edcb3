//! Safe queue and semaphores
//!
//! [`FifoQueue`] is a type-safe wrapper around the type-erased queue core. It
//! borrows its storage, so the borrow checker guarantees the slots outlive the
//! queue and nothing else touches them meanwhile.
//!
//! # Example
//!
//! ```ignore
//! use rtos_fifo::sync::{FifoQueue, FifoQueueSlot};
//!
//! let mut slots: [FifoQueueSlot<u32>; 4] = Default::default();
//! let queue: FifoQueue<u32> = FifoQueue::new(&mut slots).unwrap();
//!
//! queue.push(&1)?;
//! assert_eq!(queue.receive()?, 1);
//! ```

mod fifo_queue;
#[cfg(any(feature = "std", test))]
mod host;
mod semaphore;

pub use fifo_queue::{FifoQueue, FifoQueueSlot, FifoQueueStorage, PushError};
#[cfg(any(feature = "std", test))]
pub use host::HostSemaphore;
pub(crate) use semaphore::Block;
pub use semaphore::{CountingSemaphore, Semaphore};
