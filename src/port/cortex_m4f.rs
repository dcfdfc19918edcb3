/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] This is the Cortex-M4F (ARMv7-M) port.
 * It uses:
 * - SysTick for tick interrupts
 * - PendSV for context switching (handler supplied by the scheduler)
 * - SVCall for kernel entry, at a configurable priority
 * - BASEPRI for interrupt masking (allows configMAX_SYSCALL_INTERRUPT_PRIORITY)
 */

//! ARM Cortex-M4F Port Implementation
//!
//! - Critical sections using BASEPRI register
//! - Yield by pending PendSV
//! - Tick timer using SysTick, priorities through the SHPR registers
//!
//! ## Usage
//!
//! Enable with `--features port-cortex-m4f` and compile for `thumbv7em-none-eabihf`.
//!
//! ## Vector Table
//!
//! `SysTick` is aliased to [`xPortSysTickHandler`]. `PendSV` and `SVCall`
//! belong to the scheduler.

use core::sync::atomic::{AtomicUsize, Ordering};

use cortex_m::register::basepri;

use super::{
    portMIN_INTERRUPT_PRIORITY, vPortIncrementTickFromISR, vPortResetTickCount, SysTickReload,
    TickConfig,
};
use crate::config::*;
use crate::error::TickConfigError;
use crate::types::*;

// =============================================================================
// Port Constants
// =============================================================================

/// BASEPRI value for masking interrupts during critical sections
const portMAX_SYSCALL_INTERRUPT_PRIORITY: u8 = configMAX_SYSCALL_INTERRUPT_PRIORITY as u8;

/// NVIC ICSR register address (for pending PendSV)
const NVIC_ICSR: *mut u32 = 0xE000_ED04 as *mut u32;

/// Bit to pend PendSV
const NVIC_PENDSVSET_BIT: u32 = 1 << 28;

/// System handler priority register 2: SVCall in bits [31:24]
const SCB_SHPR2: *mut u32 = 0xE000_ED1C as *mut u32;
/// System handler priority register 3: PendSV in bits [23:16], SysTick in bits [31:24]
const SCB_SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;

/// SysTick control register
const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
/// SysTick reload value register
const SYST_RVR: *mut u32 = 0xE000_E014 as *mut u32;
/// SysTick current value register
const SYST_CVR: *mut u32 = 0xE000_E018 as *mut u32;

// =============================================================================
// Critical Section Management
// =============================================================================

/// Critical section nesting counter
static CRITICAL_NESTING: AtomicUsize = AtomicUsize::new(0);

/// Enter a critical section (disable interrupts via BASEPRI)
#[inline(always)]
pub fn portENTER_CRITICAL() {
    portDISABLE_INTERRUPTS();
    CRITICAL_NESTING.fetch_add(1, Ordering::SeqCst);
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

/// Exit a critical section (potentially re-enable interrupts)
#[inline(always)]
pub fn portEXIT_CRITICAL() {
    let prev = CRITICAL_NESTING.fetch_sub(1, Ordering::SeqCst);
    if prev == 1 {
        portENABLE_INTERRUPTS();
    }
}

/// Run `f` inside a critical section.
#[inline(always)]
pub fn critical<R>(f: impl FnOnce() -> R) -> R {
    portENTER_CRITICAL();
    let result = f();
    portEXIT_CRITICAL();
    result
}

/// Disable interrupts by setting BASEPRI
#[inline(always)]
pub fn portDISABLE_INTERRUPTS() {
    unsafe {
        basepri::write(portMAX_SYSCALL_INTERRUPT_PRIORITY);
    }
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

/// Enable interrupts by clearing BASEPRI
#[inline(always)]
pub fn portENABLE_INTERRUPTS() {
    unsafe {
        basepri::write(0);
    }
}

/// Set interrupt mask from ISR (save and disable)
#[inline(always)]
pub fn portSET_INTERRUPT_MASK_FROM_ISR() -> UBaseType_t {
    let saved = basepri::read() as UBaseType_t;
    unsafe {
        basepri::write(portMAX_SYSCALL_INTERRUPT_PRIORITY);
    }
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
    saved
}

/// Clear interrupt mask from ISR (restore previous state)
#[inline(always)]
pub fn portCLEAR_INTERRUPT_MASK_FROM_ISR(uxSavedInterruptStatus: UBaseType_t) {
    unsafe {
        basepri::write(uxSavedInterruptStatus as u8);
    }
}

// =============================================================================
// Context Switching / Yield
// =============================================================================

/// Trigger a context switch by pending PendSV
#[inline(always)]
pub fn portYIELD() {
    unsafe {
        core::ptr::write_volatile(NVIC_ICSR, NVIC_PENDSVSET_BIT);
    }
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

// =============================================================================
// Tick Interrupt
// =============================================================================

/// SysTick Handler - tick interrupt
///
/// Increments the tick count and pends a context switch so that tasks whose
/// timeout expired get to run.
#[no_mangle]
pub extern "C" fn xPortSysTickHandler() {
    let saved = portSET_INTERRUPT_MASK_FROM_ISR();

    unsafe {
        vPortIncrementTickFromISR();
        core::ptr::write_volatile(NVIC_ICSR, NVIC_PENDSVSET_BIT);
    }

    portCLEAR_INTERRUPT_MASK_FROM_ISR(saved);
}

// =============================================================================
// Scheduler Start
// =============================================================================

/// Replace one priority byte of a system handler priority register.
unsafe fn vPortSetHandlerPriority(register: *mut u32, shift: u32, priority: u8) {
    let mut value = core::ptr::read_volatile(register);
    value &= !(0xFF << shift);
    value |= (priority as u32) << shift;
    core::ptr::write_volatile(register, value);
}

/// Set SysTick and PendSV to the lowest priority and SVCall to the kernel priority.
pub fn vPortSetupInterruptPriorities(config: &TickConfig) {
    unsafe {
        vPortSetHandlerPriority(SCB_SHPR3, 16, portMIN_INTERRUPT_PRIORITY); // PendSV
        vPortSetHandlerPriority(SCB_SHPR3, 24, portMIN_INTERRUPT_PRIORITY); // SysTick
        vPortSetHandlerPriority(SCB_SHPR2, 24, config.kernel_priority); // SVCall
    }
}

/// Set up the SysTick timer
pub fn vPortSetupTimerInterrupt(reload: &SysTickReload) {
    unsafe {
        // Disable SysTick
        core::ptr::write_volatile(SYST_CSR, 0);

        core::ptr::write_volatile(SYST_RVR, reload.load);

        // Clear current value
        core::ptr::write_volatile(SYST_CVR, 0);

        // Enable SysTick, processor clock unless pre-divided
        core::ptr::write_volatile(SYST_CSR, reload.control());
    }
}

/// Configure interrupt priorities and start the tick timer.
///
/// Nothing is touched when the configuration is rejected.
pub fn xPortStartScheduling(config: &TickConfig) -> Result<SysTickReload, TickConfigError> {
    let reload = config.reload()?;

    vPortSetupInterruptPriorities(config);

    // Initialize critical nesting count
    CRITICAL_NESTING.store(0, Ordering::SeqCst);
    critical(|| unsafe { vPortResetTickCount() });

    vPortSetupTimerInterrupt(&reload);
    crate::trace::traceSTART_SCHEDULING(&reload);

    Ok(reload)
}

// =============================================================================
// Exception Handler Alias for cortex-m-rt
// =============================================================================

// cortex-m-rt expects the exception handler to be named SysTick.
use core::arch::global_asm;

global_asm!(
    ".thumb_func",
    ".global SysTick",
    ".type SysTick, %function",
    "SysTick:",
    "b xPortSysTickHandler",
);
