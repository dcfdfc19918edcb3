/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] This module provides the trace hook functions. In the original
 * C, these are macros that default to nothing but can be overridden by the
 * user for tracing/debugging.
 *
 * Here they are inline functions. They compile to nothing unless the `defmt`
 * feature is enabled, in which case each hook emits a defmt record.
 */

//! Trace Hooks
//!
//! Hooks are called at key points in the queue, the semaphores and the port
//! layer. By default they are no-ops. With the `defmt` feature they log
//! through [`defmt`] (`trace!` for normal flow, `warn!` for failures).
//!
//! ## Categories
//!
//! - `traceFIFO_QUEUE_*` - FIFO queue operations
//! - `traceSEMAPHORE_*` - Semaphore events
//! - `traceTASK_INCREMENT_TICK` / `traceSTART_SCHEDULING` - Port events
//!
//! Queue and semaphore objects are identified by their address.

#![allow(unused_variables)]

use crate::error::Error;
use crate::port::SysTickReload;
use crate::types::*;

// =============================================================================
// FIFO queue tracing
// =============================================================================

#[inline(always)]
pub fn traceFIFO_QUEUE_CREATE(pxQueue: *const (), uxCapacity: usize, uxItemSize: usize) {
    #[cfg(feature = "defmt")]
    defmt::trace!(
        "fifo {=usize:#x} created: {=usize} x {=usize} bytes",
        pxQueue as usize,
        uxCapacity,
        uxItemSize
    );
}

#[inline(always)]
pub fn traceFIFO_QUEUE_PUSH(pxQueue: *const ()) {
    #[cfg(feature = "defmt")]
    defmt::trace!("fifo {=usize:#x} push", pxQueue as usize);
}

#[inline(always)]
pub fn traceFIFO_QUEUE_PUSH_FAILED(pxQueue: *const (), xError: Error) {
    #[cfg(feature = "defmt")]
    defmt::trace!("fifo {=usize:#x} push failed: {}", pxQueue as usize, xError);
}

#[inline(always)]
pub fn traceFIFO_QUEUE_POP(pxQueue: *const ()) {
    #[cfg(feature = "defmt")]
    defmt::trace!("fifo {=usize:#x} pop", pxQueue as usize);
}

#[inline(always)]
pub fn traceFIFO_QUEUE_POP_FAILED(pxQueue: *const (), xError: Error) {
    #[cfg(feature = "defmt")]
    defmt::trace!("fifo {=usize:#x} pop failed: {}", pxQueue as usize, xError);
}

#[inline(always)]
pub fn traceFIFO_QUEUE_POST_FAILED(pxQueue: *const (), xError: Error) {
    #[cfg(feature = "defmt")]
    defmt::warn!("fifo {=usize:#x} post failed: {}", pxQueue as usize, xError);
}

#[inline(always)]
pub fn traceFIFO_QUEUE_CLOSE(pxQueue: *const ()) {
    #[cfg(feature = "defmt")]
    defmt::trace!("fifo {=usize:#x} closed", pxQueue as usize);
}

#[inline(always)]
pub fn traceFIFO_QUEUE_DELETE(pxQueue: *const (), uxDropped: usize) {
    #[cfg(feature = "defmt")]
    defmt::trace!(
        "fifo {=usize:#x} deleted, {=usize} element(s) dropped",
        pxQueue as usize,
        uxDropped
    );
}

// =============================================================================
// Semaphore tracing
// =============================================================================

#[inline(always)]
pub fn traceSEMAPHORE_BLOCK(pxSemaphore: *const ()) {
    #[cfg(feature = "defmt")]
    defmt::trace!("semaphore {=usize:#x} blocking", pxSemaphore as usize);
}

#[inline(always)]
pub fn traceSEMAPHORE_INTERRUPT(pxSemaphore: *const ()) {
    #[cfg(feature = "defmt")]
    defmt::trace!("semaphore {=usize:#x} waiters interrupted", pxSemaphore as usize);
}

#[inline(always)]
pub fn traceSEMAPHORE_CLOSE(pxSemaphore: *const ()) {
    #[cfg(feature = "defmt")]
    defmt::trace!("semaphore {=usize:#x} closed", pxSemaphore as usize);
}

#[inline(always)]
pub fn traceSEMAPHORE_POST_OVERFLOW(pxSemaphore: *const (), uxMaxValue: usize) {
    #[cfg(feature = "defmt")]
    defmt::warn!(
        "semaphore {=usize:#x} post above max {=usize}",
        pxSemaphore as usize,
        uxMaxValue
    );
}

// =============================================================================
// Port tracing
// =============================================================================

#[inline(always)]
pub fn traceTASK_INCREMENT_TICK(xTickCount: TickType_t) {}

#[inline(always)]
pub fn traceSTART_SCHEDULING(xReload: &SysTickReload) {
    #[cfg(feature = "defmt")]
    defmt::trace!(
        "tick timer: load {=u32}, divide by 8: {=bool}",
        xReload.load,
        xReload.divide_by_8
    );
}
