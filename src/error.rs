/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 *
 * [AMENDMENT] Error types. The kernel reports errno-style codes; here they are
 * enums with the numeric code still available through `errno()`.
 */

//! Error Types
//!
//! [`Error`] is what a semaphore wait or post can fail with. The FIFO queue
//! never recovers from one locally, it hands the semaphore's error back to
//! the caller unchanged.
//!
//! [`TickConfigError`] rejects a tick timer configuration at scheduler start.

use core::fmt;

/// Semaphore and queue operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The blocked wait was interrupted by another entity.
    ///
    /// The semaphore count is left unchanged.
    Interrupted,

    /// A bounded wait ran out of ticks.
    TimedOut,

    /// A non-blocking wait found the count at zero.
    WouldBlock,

    /// The semaphore was closed.
    Invalid,

    /// A post would exceed the semaphore's maximum value.
    ///
    /// This is a configuration defect, not a runtime condition: the queue's
    /// paired counts can never reach it.
    Overflow,
}

impl Error {
    /// errno-style code for this error.
    pub const fn errno(self) -> i32 {
        match self {
            Error::Interrupted => 4,
            Error::WouldBlock => 11,
            Error::Invalid => 22,
            Error::Overflow => 75,
            Error::TimedOut => 110,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Interrupted => "wait interrupted",
            Error::TimedOut => "wait timed out",
            Error::WouldBlock => "operation would block",
            Error::Invalid => "semaphore closed",
            Error::Overflow => "semaphore count overflow",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result of a semaphore or queue operation.
pub type Result<T> = core::result::Result<T, Error>;

/// Rejected tick timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickConfigError {
    /// Tick frequency of zero.
    ZeroTickFrequency,

    /// The tick frequency is above the bus frequency.
    PeriodTooShort,

    /// Neither the raw period nor the pre-divided one fits the counter.
    PeriodTooLong,
}

impl fmt::Display for TickConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TickConfigError::ZeroTickFrequency => "tick frequency is zero",
            TickConfigError::PeriodTooShort => "tick frequency exceeds bus frequency",
            TickConfigError::PeriodTooLong => "tick period does not fit the SysTick counter",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TickConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn errno_codes_match_posix() {
        assert_eq!(Error::Interrupted.errno(), 4);
        assert_eq!(Error::WouldBlock.errno(), 11);
        assert_eq!(Error::Invalid.errno(), 22);
        assert_eq!(Error::Overflow.errno(), 75);
        assert_eq!(Error::TimedOut.errno(), 110);
    }

    #[test]
    fn display() {
        assert_eq!(Error::TimedOut.to_string(), "wait timed out");
        assert_eq!(
            TickConfigError::PeriodTooLong.to_string(),
            "tick period does not fit the SysTick counter"
        );
    }
}
