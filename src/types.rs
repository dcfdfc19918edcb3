/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] Base types shared by the port layer and the queue. Widths are
 * selected with Cargo features, the way portmacro.h selects them per port.
 */

//! Base Types
//!
//! - `UBaseType_t` - architecture word size
//! - `TickType_t` - kernel tick counter
//!
//! ## Architecture Width
//! - `arch-32bit` feature: 32-bit types (default)
//! - `arch-64bit` feature: 64-bit types
//!
//! ## Tick Width
//! - `tick-16bit` feature: 16-bit tick counter
//! - `tick-32bit` feature: 32-bit tick counter (default)
//! - `tick-64bit` feature: 64-bit tick counter

// =============================================================================
// Architecture-dependent types
// =============================================================================

/// Unsigned base type - architecture word size
#[cfg(not(feature = "arch-64bit"))]
pub type UBaseType_t = u32;

#[cfg(feature = "arch-64bit")]
pub type UBaseType_t = u64;

// =============================================================================
// Tick type (configurable width independent of architecture)
// =============================================================================

/// Tick counter type - 16-bit variant
#[cfg(feature = "tick-16bit")]
pub type TickType_t = u16;

/// Wait forever when passed as a tick count
#[cfg(feature = "tick-16bit")]
pub const portMAX_DELAY: TickType_t = 0xFFFF;

/// Tick counter type - 32-bit variant (most common)
#[cfg(not(any(feature = "tick-16bit", feature = "tick-64bit")))]
pub type TickType_t = u32;

/// Wait forever when passed as a tick count
#[cfg(not(any(feature = "tick-16bit", feature = "tick-64bit")))]
pub const portMAX_DELAY: TickType_t = 0xFFFF_FFFF;

/// Tick counter type - 64-bit variant
#[cfg(all(feature = "tick-64bit", not(feature = "tick-16bit")))]
pub type TickType_t = u64;

/// Wait forever when passed as a tick count
#[cfg(all(feature = "tick-64bit", not(feature = "tick-16bit")))]
pub const portMAX_DELAY: TickType_t = 0xFFFF_FFFF_FFFF_FFFF;

// =============================================================================
// Tick conversions (from projdefs.h)
// =============================================================================

/// Convert milliseconds to ticks
#[inline(always)]
pub const fn pdMS_TO_TICKS(xTimeInMs: TickType_t) -> TickType_t {
    ((xTimeInMs as u64 * crate::config::configTICK_RATE_HZ as u64) / 1000u64) as TickType_t
}

/// Convert ticks to milliseconds
#[inline(always)]
pub const fn pdTICKS_TO_MS(xTimeInTicks: TickType_t) -> TickType_t {
    ((xTimeInTicks as u64 * 1000u64) / crate::config::configTICK_RATE_HZ as u64) as TickType_t
}
