/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] This module provides the port layer abstraction.
 * The port layer contains hardware-specific implementations of:
 * - Critical sections (interrupt masking)
 * - Yielding to the scheduler
 * - Tick timer and interrupt priority setup
 *
 * Select a port via Cargo features (e.g., `port-dummy`, `port-cortex-m4f`).
 */

//! Port Layer
//!
//! Hardware abstraction for the queue and its semaphores. Each port provides
//! the same interface:
//!
//! - `critical(f)` - run `f` with kernel interrupts masked
//! - `portYIELD()` - give the processor to the scheduler
//! - `xPortStartScheduling(config)` - interrupt priorities and tick timer
//! - `xPortSysTickHandler()` - tick interrupt
//!
//! ## Available Ports
//!
//! - `port-dummy` - Host port, critical sections from the `critical-section` crate
//! - `port-cortex-m4f` - ARMv7-M, BASEPRI masking
//! - `port-cortex-m0` - ARMv6-M, PRIMASK masking
//!
//! The port-independent part lives here: the SysTick reload computation and
//! the kernel tick count.

// Only use dummy if port-dummy is enabled AND no hardware port is enabled
// This makes the ports mutually exclusive
#[cfg(all(
    feature = "port-dummy",
    not(any(feature = "port-cortex-m4f", feature = "port-cortex-m0"))
))]
mod dummy;

#[cfg(all(
    feature = "port-dummy",
    not(any(feature = "port-cortex-m4f", feature = "port-cortex-m0"))
))]
pub use dummy::*;

#[cfg(feature = "port-cortex-m4f")]
mod cortex_m4f;

#[cfg(feature = "port-cortex-m4f")]
pub use cortex_m4f::*;

#[cfg(all(feature = "port-cortex-m0", not(feature = "port-cortex-m4f")))]
mod cortex_m0;

#[cfg(all(feature = "port-cortex-m0", not(feature = "port-cortex-m4f")))]
pub use cortex_m0::*;

use core::cell::UnsafeCell;

use crate::error::TickConfigError;
use crate::types::*;

// =============================================================================
// SysTick constants (ARMv6-M / ARMv7-M)
// =============================================================================

/// Largest period the 24-bit SysTick counter can produce
pub const portMAX_SYSTICK_PERIOD: u32 = 1 << 24;

/// Fixed pre-division of the SysTick clock when the external reference is selected
pub const portSYSTICK_PRESCALER: u32 = 8;

/// Priority for PendSV and SysTick (lowest priority = 255)
pub const portMIN_INTERRUPT_PRIORITY: u8 = 255;

/// SysTick enable bit
pub const SYST_CSR_ENABLE: u32 = 1 << 0;
/// SysTick interrupt enable bit
pub const SYST_CSR_TICKINT: u32 = 1 << 1;
/// SysTick clock source (processor clock)
pub const SYST_CSR_CLKSOURCE: u32 = 1 << 2;

// =============================================================================
// Tick Configuration
// =============================================================================

/// Explicit configuration for [`xPortStartScheduling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickConfig {
    /// Frequency of the clock feeding SysTick, in Hz.
    pub bus_frequency_hz: u32,
    /// Desired tick interrupt frequency, in Hz.
    pub tick_frequency_hz: u32,
    /// Priority of the kernel entry exception (SVCall).
    pub kernel_priority: u8,
}

/// Register values selected for the tick timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SysTickReload {
    /// Value for the SysTick reload register (period - 1).
    pub load: u32,
    /// Whether the /8 reference clock is used instead of the processor clock.
    pub divide_by_8: bool,
}

impl TickConfig {
    /// Select the SysTick reload value.
    ///
    /// The raw period is `bus / tick`. When it does not fit the 24-bit counter
    /// the pre-divided period is used instead; if that does not fit either the
    /// configuration is rejected.
    pub const fn reload(&self) -> Result<SysTickReload, TickConfigError> {
        if self.tick_frequency_hz == 0 {
            return Err(TickConfigError::ZeroTickFrequency);
        }

        let period = self.bus_frequency_hz / self.tick_frequency_hz;
        let period_divided_by_8 = period / portSYSTICK_PRESCALER;
        let divide_by_8 = period > portMAX_SYSTICK_PERIOD;
        let selected = if divide_by_8 { period_divided_by_8 } else { period };

        if selected > portMAX_SYSTICK_PERIOD {
            Err(TickConfigError::PeriodTooLong)
        } else if selected == 0 {
            Err(TickConfigError::PeriodTooShort)
        } else {
            Ok(SysTickReload {
                load: selected - 1,
                divide_by_8,
            })
        }
    }
}

impl SysTickReload {
    /// SysTick control register value that starts the timer.
    pub const fn control(&self) -> u32 {
        let clock_source = if self.divide_by_8 { 0 } else { SYST_CSR_CLKSOURCE };
        clock_source | SYST_CSR_ENABLE | SYST_CSR_TICKINT
    }

    /// Timer counts per tick.
    pub const fn period(&self) -> u32 {
        self.load + 1
    }
}

// =============================================================================
// Kernel Tick Count
// =============================================================================

struct TickCount(UnsafeCell<TickType_t>);

// Accessed only inside a critical section or with kernel interrupts masked.
unsafe impl Sync for TickCount {}

static TICK_COUNT: TickCount = TickCount(UnsafeCell::new(crate::config::configINITIAL_TICK_COUNT));

/// Current kernel tick count.
pub fn xPortGetTickCount() -> TickType_t {
    critical(|| unsafe { *TICK_COUNT.0.get() })
}

/// Advance the tick count by one and return the new value.
///
/// # Safety
///
/// Kernel interrupts must be masked (tick ISR or critical section).
pub(crate) unsafe fn vPortIncrementTickFromISR() -> TickType_t {
    let count = TICK_COUNT.0.get();
    *count = (*count).wrapping_add(1);
    crate::trace::traceTASK_INCREMENT_TICK(*count);
    *count
}

/// Reset the tick count at scheduler start.
///
/// # Safety
///
/// Kernel interrupts must be masked.
#[cfg(any(feature = "port-cortex-m4f", feature = "port-cortex-m0"))]
pub(crate) unsafe fn vPortResetTickCount() {
    *TICK_COUNT.0.get() = crate::config::configINITIAL_TICK_COUNT;
}
