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

//! DMA (Direct Memory Access) Engine
//!
//! This module implements the block-copy engine that peripheral models use to
//! move data without going through an emulated CPU. A copy is described by a
//! [`Request`] between two [`Place`]s, each either a raw host buffer or a bus
//! address.
//!
//! # Transfer
//!
//! Every copy is staged through a private buffer of `size` bytes:
//!
//! ```text
//!   source ──(stage)──► [ staging buffer ] ──(deliver)──► destination
//! ```
//!
//! Staging and delivery each pick one of two paths:
//!
//! | Path      | Condition                                              | Access                   |
//! |-----------|--------------------------------------------------------|--------------------------|
//! | Bulk      | target is memory (or unmapped) and step == unit width  | one `read_bytes`/`write_bytes` |
//! | Per-unit  | anything else (register banks, custom strides)         | one bus access per unit  |
//!
//! # Non-incrementing addresses
//!
//! - Bulk source: one unit is read and repeated across the staging buffer.
//! - Bulk destination: writing the same memory cell N times leaves only the
//!   last unit, so only the last unit is written.
//! - Per-unit paths perform every access at the same address, which is what
//!   a FIFO register expects.
//!
//! # Errors
//!
//! A request whose size is not a multiple of both transfer widths, or whose
//! raw buffers are too short, is rejected before anything is written.

use std::sync::Arc;

use crate::core::error::DmaError;
use crate::core::memory::{BusValue, SystemBus};

pub use crate::core::memory::TransferType;

#[cfg(test)]
mod tests;

/// DMA endpoint
#[derive(Debug)]
pub enum Place<'a> {
    /// Host buffer, starting at `start_index`
    Buffer { data: &'a mut [u8], start_index: usize },
    /// Bus address
    Address { address: u64 },
}

impl<'a> Place<'a> {
    pub fn buffer(data: &'a mut [u8], start_index: usize) -> Self {
        Place::Buffer { data, start_index }
    }

    pub fn address(address: u64) -> Self {
        Place::Address { address }
    }

    /// Bus address, `None` for buffers
    pub fn bus_address(&self) -> Option<u64> {
        match self {
            Place::Address { address } => Some(*address),
            Place::Buffer { .. } => None,
        }
    }

    /// Check that `size` bytes fit after the start index
    fn check_fits(&self, size: usize) -> Result<(), DmaError> {
        if let Place::Buffer { data, start_index } = self {
            let fits = start_index
                .checked_add(size)
                .is_some_and(|end| end <= data.len());
            if !fits {
                return Err(DmaError::BufferTooSmall {
                    start_index: *start_index,
                    needed: size,
                    len: data.len(),
                });
            }
        }
        Ok(())
    }
}

/// One block copy
///
/// # Example
///
/// ```
/// use sysbus::core::dma::{Place, Request, TransferType};
///
/// // Drain 16 bytes from a FIFO register into memory, word by word
/// let request = Request::new(
///     Place::address(0x4000_0010),
///     Place::address(0x2000_0000),
///     16,
///     TransferType::Word,
///     TransferType::Word,
/// )
/// .with_increment(false, true);
/// assert!(!request.increment_read_address);
/// ```
#[derive(Debug)]
pub struct Request<'a> {
    pub source: Place<'a>,
    pub destination: Place<'a>,
    /// Total size in bytes
    pub size: usize,
    pub read_transfer_type: TransferType,
    pub write_transfer_type: TransferType,
    /// Bytes the source address advances per read unit
    pub source_increment_step: usize,
    /// Bytes the destination address advances per write unit
    pub destination_increment_step: usize,
    pub increment_read_address: bool,
    pub increment_write_address: bool,
}

impl<'a> Request<'a> {
    /// Contiguous copy: steps equal to the transfer widths, both addresses
    /// incrementing
    pub fn new(
        source: Place<'a>,
        destination: Place<'a>,
        size: usize,
        read_transfer_type: TransferType,
        write_transfer_type: TransferType,
    ) -> Self {
        Self {
            source,
            destination,
            size,
            read_transfer_type,
            write_transfer_type,
            source_increment_step: read_transfer_type.size(),
            destination_increment_step: write_transfer_type.size(),
            increment_read_address: true,
            increment_write_address: true,
        }
    }

    pub fn with_increment_steps(mut self, source: usize, destination: usize) -> Self {
        self.source_increment_step = source;
        self.destination_increment_step = destination;
        self
    }

    pub fn with_increment(mut self, read: bool, write: bool) -> Self {
        self.increment_read_address = read;
        self.increment_write_address = write;
        self
    }

    fn validate(&self) -> Result<(), DmaError> {
        let read = self.read_transfer_type.size();
        let write = self.write_transfer_type.size();
        if self.size % read != 0 || self.size % write != 0 {
            return Err(DmaError::MisalignedSize {
                size: self.size,
                read,
                write,
            });
        }
        self.source.check_fits(self.size)?;
        self.destination.check_fits(self.size)
    }
}

/// Block-copy engine bound to one bus
pub struct DmaEngine {
    bus: Arc<SystemBus>,
}

impl DmaEngine {
    pub fn new(bus: Arc<SystemBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<SystemBus> {
        &self.bus
    }

    /// Perform `request` synchronously
    ///
    /// # Errors
    ///
    /// - `DmaError::MisalignedSize` if the size is not a multiple of both
    ///   transfer widths
    /// - `DmaError::BufferTooSmall` if a buffer place cannot hold `size` bytes
    ///
    /// Nothing is read or written when an error is returned.
    pub fn issue_copy(&self, request: Request<'_>) -> Result<(), DmaError> {
        request.validate()?;
        log::trace!(
            "dma: copy {} bytes ({} -> {}), steps {}/{}, increment {}/{}",
            request.size,
            request.read_transfer_type,
            request.write_transfer_type,
            request.source_increment_step,
            request.destination_increment_step,
            request.increment_read_address,
            request.increment_write_address
        );
        if request.size == 0 {
            return Ok(());
        }

        let mut staging = vec![0u8; request.size];
        match &request.source {
            Place::Buffer { data, start_index } => {
                staging.copy_from_slice(&data[*start_index..*start_index + request.size]);
            }
            Place::Address { address } => self.stage(*address, &request, &mut staging),
        }

        let Request {
            destination,
            write_transfer_type,
            destination_increment_step,
            increment_write_address,
            ..
        } = request;
        match destination {
            Place::Buffer { data, start_index } => {
                data[start_index..start_index + staging.len()].copy_from_slice(&staging);
            }
            Place::Address { address } => self.deliver(
                address,
                write_transfer_type,
                destination_increment_step,
                increment_write_address,
                &staging,
            ),
        }
        Ok(())
    }

    /// Whether a bus address can take the bulk path
    fn is_gap_free(&self, address: u64) -> bool {
        self.bus
            .what_is_at(address)
            .is_none_or(|registered| registered.is_memory)
    }

    fn stage(&self, address: u64, request: &Request<'_>, staging: &mut [u8]) {
        let unit = request.read_transfer_type.size();
        if self.is_gap_free(address) && unit == request.source_increment_step {
            if request.increment_read_address {
                self.bus.read_bytes(address, staging);
            } else {
                let (first, rest) = staging.split_at_mut(unit);
                self.bus.read_bytes(address, first);
                for chunk in rest.chunks_exact_mut(unit) {
                    chunk.copy_from_slice(first);
                }
            }
            return;
        }

        let step = if request.increment_read_address {
            request.source_increment_step as u64
        } else {
            0
        };
        match request.read_transfer_type {
            TransferType::Byte => self.read_units::<u8>(address, step, staging),
            TransferType::Word => self.read_units::<u16>(address, step, staging),
            TransferType::DoubleWord => self.read_units::<u32>(address, step, staging),
        }
    }

    fn deliver(
        &self,
        address: u64,
        transfer_type: TransferType,
        increment_step: usize,
        increment: bool,
        staging: &[u8],
    ) {
        let unit = transfer_type.size();
        if self.is_gap_free(address) && unit == increment_step {
            if increment {
                self.bus.write_bytes(address, staging);
            } else {
                let last = &staging[staging.len() - unit..];
                match transfer_type {
                    TransferType::Byte => self.bus.write(address, last[0]),
                    TransferType::Word => self.bus.write(address, u16::from_le_slice(last)),
                    TransferType::DoubleWord => {
                        self.bus.write(address, u32::from_le_slice(last))
                    }
                }
            }
            return;
        }

        let step = if increment { increment_step as u64 } else { 0 };
        match transfer_type {
            TransferType::Byte => self.write_units::<u8>(address, step, staging),
            TransferType::Word => self.write_units::<u16>(address, step, staging),
            TransferType::DoubleWord => self.write_units::<u32>(address, step, staging),
        }
    }

    fn read_units<T: BusValue>(&self, address: u64, step: u64, staging: &mut [u8]) {
        let mut offset = 0u64;
        for chunk in staging.chunks_exact_mut(T::TRANSFER_TYPE.size()) {
            let value: T = self.bus.read(address.wrapping_add(offset));
            value.store_le(chunk);
            offset = offset.wrapping_add(step);
        }
    }

    fn write_units<T: BusValue>(&self, address: u64, step: u64, staging: &[u8]) {
        let mut offset = 0u64;
        for chunk in staging.chunks_exact(T::TRANSFER_TYPE.size()) {
            self.bus
                .write(address.wrapping_add(offset), T::from_le_slice(chunk));
            offset = offset.wrapping_add(step);
        }
    }
}
