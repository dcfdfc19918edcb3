/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] This is the dummy port. It has no hardware behind it: critical
 * sections come from the `critical-section` crate (a global lock with its
 * `std` implementation) and ticks are produced by whoever calls
 * `xPortSysTickHandler`.
 *
 * Used for host builds and the test suite.
 */

//! Dummy Port Implementation
//!
//! - `critical` - `critical_section::with`
//! - `portYIELD` - `std::thread::yield_now` when `std` is available
//! - `xPortStartScheduling` - validates and records the tick configuration
//!
//! **WARNING**: the application must link a `critical-section` implementation
//! (the `std` feature provides one).

use core::cell::Cell;

use critical_section::Mutex;

use super::{vPortIncrementTickFromISR, SysTickReload, TickConfig};
use crate::error::TickConfigError;

// =============================================================================
// Critical Section Management
// =============================================================================

/// Run `f` inside a critical section.
#[inline(always)]
pub fn critical<R>(f: impl FnOnce() -> R) -> R {
    critical_section::with(|_| f())
}

// =============================================================================
// Context Switching / Yield
// =============================================================================

/// Give the processor to another task.
///
/// [AMENDMENT] On the host a task is a thread.
#[inline(always)]
pub fn portYIELD() {
    #[cfg(any(feature = "std", test))]
    std::thread::yield_now();

    #[cfg(not(any(feature = "std", test)))]
    core::hint::spin_loop();
}

// =============================================================================
// Scheduler Start
// =============================================================================

/// Tick configuration recorded by the last successful start.
static TICK_SETUP: Mutex<Cell<Option<SysTickReload>>> = Mutex::new(Cell::new(None));

/// Start scheduling with an explicit tick configuration.
///
/// [AMENDMENT] Nothing is programmed. The configuration is validated exactly
/// as a hardware port does and the selected reload is recorded.
pub fn xPortStartScheduling(config: &TickConfig) -> Result<SysTickReload, TickConfigError> {
    let reload = config.reload()?;
    critical_section::with(|cs| TICK_SETUP.borrow(cs).set(Some(reload)));
    crate::trace::traceSTART_SCHEDULING(&reload);
    Ok(reload)
}

/// Reload selected by the last [`xPortStartScheduling`], if any.
pub fn xPortGetTickSetup() -> Option<SysTickReload> {
    critical_section::with(|cs| TICK_SETUP.borrow(cs).get())
}

/// Tick interrupt.
///
/// [AMENDMENT] Call it periodically from a host thread to drive timeouts.
pub fn xPortSysTickHandler() {
    critical(|| unsafe {
        vPortIncrementTickFromISR();
    });
}
