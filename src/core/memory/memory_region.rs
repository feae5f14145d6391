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

//! Memory-like peripherals
//!
//! [`MappedMemory`] is a contiguous, gap-free byte array. It is the only
//! peripheral the bulk copy paths of the bus and the DMA engine treat as
//! plain memory. [`Silencer`] backs silenced ranges: reads are zero, writes
//! vanish, nothing is logged.

use super::peripheral::{
    AllowedTranslation, BusPeripheral, BytePeripheral, DoubleWordPeripheral, WordPeripheral,
};

/// Contiguous little-endian memory
///
/// Offsets past the end read as zero and drop writes, with a trace line.
///
/// # Example
///
/// ```
/// use sysbus::core::memory::{BytePeripheral, DoubleWordPeripheral, MappedMemory};
///
/// let mut ram = MappedMemory::new("ram", 0x100);
/// ram.write_double_word(0x10, 0x12345678);
/// assert_eq!(ram.read_byte(0x10), 0x78);
/// assert_eq!(ram.read_byte(0x13), 0x12);
/// ```
pub struct MappedMemory {
    name: String,
    data: Vec<u8>,
}

impl MappedMemory {
    /// Create a zero-filled memory of `size` bytes
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            data: vec![0; size],
        }
    }

    /// Create a memory initialised from `contents`
    pub fn with_contents(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: contents,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copy bytes starting at `offset` into `buffer`
    ///
    /// The part of `buffer` past the end of the memory is zero-filled.
    pub fn read_bytes(&self, offset: u64, buffer: &mut [u8]) {
        let copied = self.window(offset, buffer.len());
        if let Some((start, len)) = copied {
            buffer[..len].copy_from_slice(&self.data[start..start + len]);
            buffer[len..].fill(0);
        } else {
            buffer.fill(0);
        }
    }

    /// Copy `data` into the memory starting at `offset`
    ///
    /// Bytes that would land past the end are dropped.
    pub fn write_bytes(&mut self, offset: u64, data: &[u8]) {
        if let Some((start, len)) = self.window(offset, data.len()) {
            self.data[start..start + len].copy_from_slice(&data[..len]);
            if len < data.len() {
                log::trace!(
                    "{}: bulk write truncated at end of memory ({} of {} bytes)",
                    self.name,
                    len,
                    data.len()
                );
            }
        }
    }

    /// In-bounds part of `[offset, offset + len)` as (start, length)
    fn window(&self, offset: u64, len: usize) -> Option<(usize, usize)> {
        let start = usize::try_from(offset).ok()?;
        if start >= self.data.len() {
            return None;
        }
        Some((start, len.min(self.data.len() - start)))
    }

    #[inline(always)]
    fn load<const N: usize>(&self, offset: u64) -> [u8; N] {
        let mut bytes = [0u8; N];
        match self.window(offset, N) {
            Some((start, len)) if len == N => bytes.copy_from_slice(&self.data[start..start + N]),
            _ => log::trace!("{}: read outside memory at 0x{:X}", self.name, offset),
        }
        bytes
    }

    #[inline(always)]
    fn store<const N: usize>(&mut self, offset: u64, bytes: [u8; N]) {
        match self.window(offset, N) {
            Some((start, len)) if len == N => self.data[start..start + N].copy_from_slice(&bytes),
            _ => log::trace!("{}: write outside memory at 0x{:X}", self.name, offset),
        }
    }
}

impl BytePeripheral for MappedMemory {
    fn read_byte(&mut self, offset: u64) -> u8 {
        self.load::<1>(offset)[0]
    }

    fn write_byte(&mut self, offset: u64, value: u8) {
        self.store(offset, [value]);
    }
}

impl WordPeripheral for MappedMemory {
    fn read_word(&mut self, offset: u64) -> u16 {
        u16::from_le_bytes(self.load(offset))
    }

    fn write_word(&mut self, offset: u64, value: u16) {
        self.store(offset, value.to_le_bytes());
    }
}

impl DoubleWordPeripheral for MappedMemory {
    fn read_double_word(&mut self, offset: u64) -> u32 {
        u32::from_le_bytes(self.load(offset))
    }

    fn write_double_word(&mut self, offset: u64, value: u32) {
        self.store(offset, value.to_le_bytes());
    }
}

impl BusPeripheral for MappedMemory {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.data.fill(0);
    }

    fn allowed_translations(&self) -> AllowedTranslation {
        AllowedTranslation::all()
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        Some(self)
    }

    fn as_word(&mut self) -> Option<&mut dyn WordPeripheral> {
        Some(self)
    }

    fn as_double_word(&mut self) -> Option<&mut dyn DoubleWordPeripheral> {
        Some(self)
    }

    fn as_mapped_memory(&mut self) -> Option<&mut MappedMemory> {
        Some(self)
    }
}

/// Range that swallows every access without a trace
pub struct Silencer;

impl BytePeripheral for Silencer {
    fn read_byte(&mut self, _offset: u64) -> u8 {
        0
    }

    fn write_byte(&mut self, _offset: u64, _value: u8) {}
}

impl WordPeripheral for Silencer {
    fn read_word(&mut self, _offset: u64) -> u16 {
        0
    }

    fn write_word(&mut self, _offset: u64, _value: u16) {}
}

impl DoubleWordPeripheral for Silencer {
    fn read_double_word(&mut self, _offset: u64) -> u32 {
        0
    }

    fn write_double_word(&mut self, _offset: u64, _value: u32) {}
}

impl BusPeripheral for Silencer {
    fn name(&self) -> &str {
        "silencer"
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        Some(self)
    }

    fn as_word(&mut self) -> Option<&mut dyn WordPeripheral> {
        Some(self)
    }

    fn as_double_word(&mut self) -> Option<&mut dyn DoubleWordPeripheral> {
        Some(self)
    }
}
