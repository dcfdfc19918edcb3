//! rtos-fifo Demo Application
//!
//! Runs the FIFO queue on a Cortex-M4F without a task scheduler:
//! - Tick bootstrap with an explicit board configuration
//! - Blocking and non-blocking push/pop through FifoQueue
//! - A timed receive that expires on SysTick ticks
//!
//! Output is via semihosting - run under QEMU (`cargo run --release`) or with
//! a debugger attached.

#![no_std]
#![no_main]

extern crate panic_semihosting;

use core::ptr::addr_of_mut;

use cortex_m_rt::{entry, exception};
use cortex_m_semihosting::{debug, hprintln};

use rtos_fifo::port::{xPortGetTickCount, xPortStartScheduling, TickConfig};
use rtos_fifo::sync::{FifoQueue, FifoQueueStorage};
use rtos_fifo::{configMAX_SYSCALL_INTERRUPT_PRIORITY, pdMS_TO_TICKS, Error};

/// MPS2-AN386 runs its core and SysTick from a 25 MHz clock
const BOARD_TICK_CONFIG: TickConfig = TickConfig {
    bus_frequency_hz: 25_000_000,
    tick_frequency_hz: 1000,
    kernel_priority: configMAX_SYSCALL_INTERRUPT_PRIORITY as u8,
};

const QUEUE_LENGTH: usize = 4;

static mut STORAGE: FifoQueueStorage<u32, QUEUE_LENGTH> = FifoQueueStorage::new();

// =============================================================================
// Entry Point
// =============================================================================

#[entry]
fn main() -> ! {
    hprintln!("========================================");
    hprintln!("   rtos-fifo Demo - Cortex-M4F");
    hprintln!("========================================");

    match xPortStartScheduling(&BOARD_TICK_CONFIG) {
        Ok(reload) => hprintln!(
            "[Init] SysTick load {} (divide by 8: {})",
            reload.load,
            reload.divide_by_8
        ),
        Err(error) => {
            hprintln!("[Init] ERROR: {}", error);
            debug::exit(debug::EXIT_FAILURE);
        }
    }

    // Only borrowed here, once
    let queue: FifoQueue<u32> = FifoQueue::from_storage(unsafe { &mut *addr_of_mut!(STORAGE) });

    let failed = run(&queue).is_err();
    drop(queue);

    hprintln!("[Main] ticks elapsed: {}", xPortGetTickCount());
    if failed {
        hprintln!("[Main] FAILED");
        debug::exit(debug::EXIT_FAILURE);
    } else {
        hprintln!("[Main] done");
        debug::exit(debug::EXIT_SUCCESS);
    }

    loop {}
}

fn run(queue: &FifoQueue<u32>) -> Result<(), Error> {
    hprintln!("[Queue] capacity {}", queue.capacity());

    for value in 1..=QUEUE_LENGTH as u32 {
        queue.push_value(value * 10)?;
    }
    hprintln!("[Queue] full: {}", queue.is_full());

    match queue.try_push(&50) {
        Err(Error::WouldBlock) => hprintln!("[Queue] try_push on full queue would block"),
        other => {
            hprintln!("[Queue] unexpected try_push result: {:?}", other);
            return Err(Error::Invalid);
        }
    }

    let mut value = 0;
    queue.pop(&mut value)?;
    hprintln!("[Queue] pop -> {}", value);

    while let Ok(value) = queue.try_receive() {
        hprintln!("[Queue] receive -> {}", value);
    }

    let start = xPortGetTickCount();
    match queue.receive_for(pdMS_TO_TICKS(10)) {
        Err(Error::TimedOut) => hprintln!(
            "[Queue] receive_for timed out after {} ticks",
            xPortGetTickCount().wrapping_sub(start)
        ),
        other => {
            hprintln!("[Queue] unexpected receive_for result: {:?}", other);
            return Err(Error::Invalid);
        }
    }

    Ok(())
}

// =============================================================================
// Exception Handlers
// =============================================================================

/// No task scheduler in this demo: a pended switch returns to the same code.
#[exception]
fn PendSV() {}
