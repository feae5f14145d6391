// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Custom assertions for bus testing

use sysbus::core::memory::SystemBus;

/// Assert the double word at `address` has the expected value
#[allow(dead_code)]
pub fn assert_double_word(bus: &SystemBus, address: u64, expected: u32) {
    let actual = bus.read_double_word(address);
    assert_eq!(
        actual, expected,
        "Double word at 0x{:08X} mismatch: expected 0x{:08X}, got 0x{:08X}",
        address, expected, actual
    );
}

/// Assert a block of memory matches `expected`
#[allow(dead_code)]
pub fn assert_memory(bus: &SystemBus, address: u64, expected: &[u8]) {
    let mut actual = vec![0u8; expected.len()];
    bus.read_memory(address, &mut actual)
        .expect("Failed to read memory");
    assert_eq!(
        actual, expected,
        "Memory at 0x{:08X} mismatch",
        address
    );
}

/// Assert the unhandled access counters
#[allow(dead_code)]
pub fn assert_unhandled(bus: &SystemBus, reads: u64, writes: u64) {
    assert_eq!(
        (bus.unexpected_reads(), bus.unexpected_writes()),
        (reads, writes),
        "Unhandled access counters mismatch (reads, writes)"
    );
}
