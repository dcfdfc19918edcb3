/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy of
 * this software and associated documentation files (the "Software"), to deal in
 * the Software without restriction, including without limitation the rights to
 * use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
 * the Software, and to permit persons to whom the Software is furnished to do so,
 * subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
 * FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
 * COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
 * IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
 * CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
 *
 * https://www.FreeRTOS.org
 * https://github.com/FreeRTOS
 *
 * [AMENDMENT] This file is part of rtos-fifo, the FIFO queue and tick
 * bootstrap of a preemptive kernel, in the structure of the FreeRTOS kernel.
 */

//! # rtos-fifo - FIFO queue for a preemptive RTOS
//!
//! A fixed-capacity, allocation-free FIFO queue for inter-task communication,
//! built on a pair of counting semaphores, plus the SysTick bootstrap that
//! makes timed waits possible.
//!
//! - [`sync::FifoQueue`] - type-safe queue over caller-provided storage
//! - [`sync::Semaphore`] - the semaphore contract the queue is built on
//! - [`port::xPortStartScheduling`] - interrupt priorities and tick timer
//!
//! ## Features
//!
//! - `port-dummy` - Host port, critical sections from `critical-section` (default)
//! - `port-cortex-m4f` - ARMv7-M port, BASEPRI masking
//! - `port-cortex-m0` - ARMv6-M port, PRIMASK masking
//! - `arch-32bit` - 32-bit architecture types (default)
//! - `arch-64bit` - 64-bit architecture types
//! - `tick-16bit` - 16-bit tick counter
//! - `tick-32bit` - 32-bit tick counter (default)
//! - `tick-64bit` - 64-bit tick counter
//! - `std` - `HostSemaphore` and the std critical-section implementation
//! - `defmt` - Emit trace hooks as defmt records

#![no_std]
#![allow(non_snake_case)]
#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]
#![allow(clippy::missing_safety_doc)]

#[cfg(any(feature = "std", test))]
extern crate std;

// Core modules
pub mod config;
pub mod error;
pub mod trace;
pub mod types;

// Port layer
pub mod port;

// Kernel modules
pub(crate) mod scheduler;

// Safe wrappers
pub mod sync;

// Re-export commonly used items at crate root (like FreeRTOS.h does)
pub use config::*;
pub use error::{Error, Result, TickConfigError};
pub use sync::{CountingSemaphore, FifoQueue, FifoQueueSlot, FifoQueueStorage, PushError, Semaphore};
#[cfg(any(feature = "std", test))]
pub use sync::HostSemaphore;
pub use types::*;
