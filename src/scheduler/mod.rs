/*
 * FreeRTOS Kernel <DEVELOPMENT BRANCH>
 * Copyright (C) 2021 Amazon.com, Inc. or its affiliates. All Rights Reserved.
 *
 * SPDX-License-Identifier: MIT
 */

//! Kernel Core
//!
//! - [`fifo_queue_base`] - Type-erased FIFO queue over a pair of semaphores

pub mod fifo_queue_base;
