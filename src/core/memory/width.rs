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

//! Transfer-width translation
//!
//! Pure functions that synthesise an access of one width from a peripheral
//! that only implements another, in either byte order.
//!
//! # Composition (wide request, narrow device)
//!
//! A word read through a byte-only device issues two byte reads and joins
//! them. Little-endian puts the byte at `address` in the low lane, big-endian
//! puts it in the high lane.
//!
//! # Decomposition (narrow request, wide device)
//!
//! A byte read through a word-only device reads the aligned word and shifts
//! the selected lane down. A narrow write does read-modify-write on the
//! aligned wide unit so that the untouched lanes keep their value:
//!
//! ```text
//! write_byte_using_word(addr = 0x11, value = 0xAB), little-endian
//!
//!   aligned = 0x10, lane = 1
//!   old     = 0x1234            (read_word(0x10))
//!   keep    = old & !0xFF00     = 0x0034
//!   new     = keep | 0xAB << 8  = 0xAB34
//! ```
//!
//! For big-endian the lane index is mirrored (`size - 1 - lane`).

use std::fmt;

use super::peripheral::{BytePeripheral, DoubleWordPeripheral, Endianness, WordPeripheral};
use crate::core::error::DmaError;

/// Access granularity of a single bus operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransferType {
    Byte = 1,
    Word = 2,
    DoubleWord = 4,
}

impl TransferType {
    /// Width in bytes
    #[inline(always)]
    pub fn size(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for TransferType {
    type Error = DmaError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TransferType::Byte),
            2 => Ok(TransferType::Word),
            4 => Ok(TransferType::DoubleWord),
            other => Err(DmaError::InvalidTransferType(other)),
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferType::Byte => "Byte",
            TransferType::Word => "Word",
            TransferType::DoubleWord => "DoubleWord",
        };
        f.write_str(name)
    }
}

/// Lane index of a narrow unit inside a wide one
///
/// `lanes` is the number of narrow units per wide unit and `index` the
/// position of the access counted from the lowest address.
#[inline(always)]
fn lane(index: u64, lanes: u64, endianness: Endianness) -> u32 {
    match endianness {
        Endianness::Little => index as u32,
        Endianness::Big => (lanes - 1 - index) as u32,
    }
}

// Byte device

pub fn read_word_using_byte<P>(peripheral: &mut P, address: u64, endianness: Endianness) -> u16
where
    P: BytePeripheral + ?Sized,
{
    let first = peripheral.read_byte(address);
    let second = peripheral.read_byte(address.wrapping_add(1));
    match endianness {
        Endianness::Little => u16::from_le_bytes([first, second]),
        Endianness::Big => u16::from_be_bytes([first, second]),
    }
}

pub fn write_word_using_byte<P>(peripheral: &mut P, address: u64, value: u16, endianness: Endianness)
where
    P: BytePeripheral + ?Sized,
{
    let bytes = match endianness {
        Endianness::Little => value.to_le_bytes(),
        Endianness::Big => value.to_be_bytes(),
    };
    // The most significant byte reaches the device first
    match endianness {
        Endianness::Little => {
            peripheral.write_byte(address.wrapping_add(1), bytes[1]);
            peripheral.write_byte(address, bytes[0]);
        }
        Endianness::Big => {
            peripheral.write_byte(address, bytes[0]);
            peripheral.write_byte(address.wrapping_add(1), bytes[1]);
        }
    }
}

pub fn read_double_word_using_byte<P>(peripheral: &mut P, address: u64, endianness: Endianness) -> u32
where
    P: BytePeripheral + ?Sized,
{
    let mut bytes = [0u8; 4];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = peripheral.read_byte(address.wrapping_add(i as u64));
    }
    match endianness {
        Endianness::Little => u32::from_le_bytes(bytes),
        Endianness::Big => u32::from_be_bytes(bytes),
    }
}

pub fn write_double_word_using_byte<P>(
    peripheral: &mut P,
    address: u64,
    value: u32,
    endianness: Endianness,
) where
    P: BytePeripheral + ?Sized,
{
    let bytes = match endianness {
        Endianness::Little => value.to_le_bytes(),
        Endianness::Big => value.to_be_bytes(),
    };
    let order: [usize; 4] = match endianness {
        Endianness::Little => [3, 2, 1, 0],
        Endianness::Big => [0, 1, 2, 3],
    };
    for i in order {
        peripheral.write_byte(address.wrapping_add(i as u64), bytes[i]);
    }
}

// Word device

pub fn read_byte_using_word<P>(peripheral: &mut P, address: u64, endianness: Endianness) -> u8
where
    P: WordPeripheral + ?Sized,
{
    let aligned = address & !1;
    let shift = lane(address & 1, 2, endianness) * 8;
    (peripheral.read_word(aligned) >> shift) as u8
}

pub fn write_byte_using_word<P>(peripheral: &mut P, address: u64, value: u8, endianness: Endianness)
where
    P: WordPeripheral + ?Sized,
{
    let aligned = address & !1;
    let shift = lane(address & 1, 2, endianness) * 8;
    let keep = peripheral.read_word(aligned) & !(0xFFu16 << shift);
    peripheral.write_word(aligned, keep | ((value as u16) << shift));
}

pub fn read_double_word_using_word<P>(peripheral: &mut P, address: u64, endianness: Endianness) -> u32
where
    P: WordPeripheral + ?Sized,
{
    let first = peripheral.read_word(address) as u32;
    let second = peripheral.read_word(address.wrapping_add(2)) as u32;
    match endianness {
        Endianness::Little => (second << 16) | first,
        Endianness::Big => (first << 16) | second,
    }
}

pub fn write_double_word_using_word<P>(
    peripheral: &mut P,
    address: u64,
    value: u32,
    endianness: Endianness,
) where
    P: WordPeripheral + ?Sized,
{
    let (first, second) = match endianness {
        Endianness::Little => (value as u16, (value >> 16) as u16),
        Endianness::Big => ((value >> 16) as u16, value as u16),
    };
    match endianness {
        Endianness::Little => {
            peripheral.write_word(address.wrapping_add(2), second);
            peripheral.write_word(address, first);
        }
        Endianness::Big => {
            peripheral.write_word(address, first);
            peripheral.write_word(address.wrapping_add(2), second);
        }
    }
}

// Double-word device

pub fn read_byte_using_double_word<P>(peripheral: &mut P, address: u64, endianness: Endianness) -> u8
where
    P: DoubleWordPeripheral + ?Sized,
{
    let aligned = address & !3;
    let shift = lane(address & 3, 4, endianness) * 8;
    (peripheral.read_double_word(aligned) >> shift) as u8
}

pub fn write_byte_using_double_word<P>(
    peripheral: &mut P,
    address: u64,
    value: u8,
    endianness: Endianness,
) where
    P: DoubleWordPeripheral + ?Sized,
{
    let aligned = address & !3;
    let shift = lane(address & 3, 4, endianness) * 8;
    let keep = peripheral.read_double_word(aligned) & !(0xFFu32 << shift);
    peripheral.write_double_word(aligned, keep | ((value as u32) << shift));
}

/// Bit position of a word that starts `offset` bytes into a double word
///
/// Offsets past the last full word (3) keep only the bytes that fit; for big
/// endian the offset wraps to the top lane.
#[inline(always)]
fn word_shift(offset: u64, endianness: Endianness) -> u32 {
    let index = match endianness {
        Endianness::Little => offset,
        Endianness::Big => 2u64.wrapping_sub(offset) & 3,
    };
    index as u32 * 8
}

/// The word starts at the byte offset of `address` inside the aligned double word
pub fn read_word_using_double_word<P>(peripheral: &mut P, address: u64, endianness: Endianness) -> u16
where
    P: DoubleWordPeripheral + ?Sized,
{
    let aligned = address & !3;
    let shift = word_shift(address & 3, endianness);
    (peripheral.read_double_word(aligned) >> shift) as u16
}

pub fn write_word_using_double_word<P>(
    peripheral: &mut P,
    address: u64,
    value: u16,
    endianness: Endianness,
) where
    P: DoubleWordPeripheral + ?Sized,
{
    let aligned = address & !3;
    let shift = word_shift(address & 3, endianness);
    let keep = peripheral.read_double_word(aligned) & !(0xFFFFu32 << shift);
    peripheral.write_double_word(aligned, keep | ((value as u32) << shift));
}
