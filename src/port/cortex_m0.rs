/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] This is the Cortex-M0/M0+ (ARMv6-M) port.
 * It uses:
 * - SysTick for tick interrupts
 * - PendSV for context switching (handler supplied by the scheduler)
 * - PRIMASK for interrupt masking (no BASEPRI on ARMv6-M)
 *
 * Key differences from Cortex-M4F:
 * - Uses PRIMASK instead of BASEPRI (no priority-based masking)
 * - No atomic read-modify-write, so the nesting count is a plain static
 * - SVCall always runs at the highest priority
 */

//! ARM Cortex-M0/M0+ Port Implementation
//!
//! - Critical sections using PRIMASK register (disables all interrupts)
//! - Yield by pending PendSV
//! - Tick timer using SysTick
//!
//! ## Usage
//!
//! Enable with `--features port-cortex-m0` and compile for `thumbv6m-none-eabi`.

use core::arch::global_asm;

use super::{
    portMIN_INTERRUPT_PRIORITY, vPortIncrementTickFromISR, vPortResetTickCount, SysTickReload,
    TickConfig,
};
use crate::error::TickConfigError;
use crate::types::*;

// =============================================================================
// Port Constants
// =============================================================================

/// SVCall priority on ARMv6-M (no kernel BASEPRI to match)
const portSVCALL_PRIORITY: u8 = 0;

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

/// Critical section nesting counter.
/// Only touched with PRIMASK set.
static mut CRITICAL_NESTING: u32 = 0;

/// Enter a critical section (disable interrupts via PRIMASK)
#[inline(always)]
pub fn portENTER_CRITICAL() {
    portDISABLE_INTERRUPTS();
    unsafe {
        CRITICAL_NESTING += 1;
    }
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

/// Exit a critical section (potentially re-enable interrupts)
#[inline(always)]
pub fn portEXIT_CRITICAL() {
    unsafe {
        CRITICAL_NESTING -= 1;
        if CRITICAL_NESTING == 0 {
            portENABLE_INTERRUPTS();
        }
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

/// Disable interrupts by setting PRIMASK
///
/// Note: Unlike BASEPRI on Cortex-M3/M4, PRIMASK disables ALL interrupts,
/// including the tick interrupt. There is no priority-based masking.
#[inline(always)]
pub fn portDISABLE_INTERRUPTS() {
    cortex_m::interrupt::disable();
}

/// Enable interrupts by clearing PRIMASK
#[inline(always)]
pub fn portENABLE_INTERRUPTS() {
    unsafe {
        cortex_m::interrupt::enable();
    }
}

/// Set interrupt mask from ISR (save PRIMASK and disable)
#[inline(always)]
pub fn portSET_INTERRUPT_MASK_FROM_ISR() -> UBaseType_t {
    let was_active = cortex_m::register::primask::read().is_active();
    cortex_m::interrupt::disable();
    was_active as UBaseType_t
}

/// Clear interrupt mask from ISR (restore previous state)
#[inline(always)]
pub fn portCLEAR_INTERRUPT_MASK_FROM_ISR(uxSavedInterruptStatus: UBaseType_t) {
    if uxSavedInterruptStatus != 0 {
        unsafe {
            cortex_m::interrupt::enable();
        }
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
}

// =============================================================================
// Tick Interrupt
// =============================================================================

// SysTick Handler wrapper via global_asm - calls xPortSysTickHandler
global_asm!(
    ".syntax unified",
    ".section .text.SysTick",
    ".global SysTick",
    ".thumb_func",
    "SysTick:",
    "push {{lr}}",
    "bl xPortSysTickHandler",
    "pop {{pc}}",
);

/// SysTick Handler - tick interrupt
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
/// ARMv6-M only allows word access to the SHPR registers.
unsafe fn vPortSetHandlerPriority(register: *mut u32, shift: u32, priority: u8) {
    let mut value = core::ptr::read_volatile(register);
    value &= !(0xFF << shift);
    value |= (priority as u32) << shift;
    core::ptr::write_volatile(register, value);
}

/// Set SysTick and PendSV to the lowest priority and SVCall to the highest.
///
/// `kernel_priority` is ignored: without BASEPRI the kernel cannot leave
/// high-priority interrupts unmasked.
pub fn vPortSetupInterruptPriorities(_config: &TickConfig) {
    unsafe {
        vPortSetHandlerPriority(SCB_SHPR3, 16, portMIN_INTERRUPT_PRIORITY); // PendSV
        vPortSetHandlerPriority(SCB_SHPR3, 24, portMIN_INTERRUPT_PRIORITY); // SysTick
        vPortSetHandlerPriority(SCB_SHPR2, 24, portSVCALL_PRIORITY); // SVCall
    }
}

/// Set up the SysTick timer
pub fn vPortSetupTimerInterrupt(reload: &SysTickReload) {
    unsafe {
        // Disable SysTick
        core::ptr::write_volatile(SYST_CSR, 0);

        // Clear current value
        core::ptr::write_volatile(SYST_CVR, 0);

        core::ptr::write_volatile(SYST_RVR, reload.load);

        core::ptr::write_volatile(SYST_CSR, reload.control());
    }
}

/// Configure interrupt priorities and start the tick timer.
///
/// Nothing is touched when the configuration is rejected.
pub fn xPortStartScheduling(config: &TickConfig) -> Result<SysTickReload, TickConfigError> {
    let reload = config.reload()?;

    vPortSetupInterruptPriorities(config);

    critical(|| unsafe { vPortResetTickCount() });

    vPortSetupTimerInterrupt(&reload);
    crate::trace::traceSTART_SCHEDULING(&reload);

    Ok(reload)
}
