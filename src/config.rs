/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] This module is the Rust equivalent of FreeRTOSConfig.h.
 * Configuration is done via:
 * - Cargo features for major toggles
 * - Constants in this module for numeric values
 * - Users can override by building their own `TickConfig`
 */

//! Kernel Configuration
//!
//! Numeric configuration for the tick timer and interrupt priorities, plus the
//! derived [`configTICK_CONFIG`] handed to `port::xPortStartScheduling`.

use crate::port::TickConfig;
use crate::types::*;

// =============================================================================
// Clock and Tick Configuration
// =============================================================================

/// Tick rate in Hz
pub const configTICK_RATE_HZ: TickType_t = 1000;

/// Bus clock feeding the tick timer, in Hz
/// [AMENDMENT] This should be set to match your target hardware.
/// Default: 80 MHz (common for Cortex-M4F parts like STM32L4, TI TM4C)
pub const configCPU_CLOCK_HZ: u32 = 80_000_000;

/// Initial tick count value
pub const configINITIAL_TICK_COUNT: TickType_t = 0;

// =============================================================================
// Interrupt Priorities
// =============================================================================

/// Priority of the kernel entry (SVCall) exception.
/// Interrupts with a numerically lower priority are never masked by the kernel.
/// Lower values = higher priority on Cortex-M (0 = highest).
pub const configMAX_SYSCALL_INTERRUPT_PRIORITY: u32 = 191; // 0xBF = priority 11 (of 0-15)

// =============================================================================
// Derived Configuration
// =============================================================================

/// Tick timer configuration used when the application has no board-specific one.
pub const configTICK_CONFIG: TickConfig = TickConfig {
    bus_frequency_hz: configCPU_CLOCK_HZ,
    tick_frequency_hz: configTICK_RATE_HZ as u32,
    kernel_priority: configMAX_SYSCALL_INTERRUPT_PRIORITY as u8,
};

// At least one of the two candidate reload values must fit the counter.
const _: () = assert!(
    configTICK_CONFIG.reload().is_ok(),
    "Invalid SysTick configuration!"
);

// =============================================================================
// Debug / Assert
// =============================================================================

/// configASSERT equivalent, active in debug builds
#[inline(always)]
pub fn configASSERT(condition: bool) {
    debug_assert!(condition, "rtos-fifo assertion failed");
}
