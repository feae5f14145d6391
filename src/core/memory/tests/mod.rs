// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! System Bus Tests
//!
//! Tests for the system bus, organized into logical categories:
//!
//! - `range`: Address ranges and registration points
//! - `width`: Width composition/decomposition in both byte orders
//! - `translation`: Access method resolution on registration
//! - `bus`: Registration, lookup and unmapped-address leniency
//! - `bulk`: Multi-byte accesses spanning several targets
//! - `hooks`: Read/write hooks and access logging
//! - `tags`: Tags, silenced ranges and unhandled-access reporting
//! - `concurrency`: Access from several threads
//! - `helpers`: Test peripherals

mod bus;
mod helpers;
mod translation;
