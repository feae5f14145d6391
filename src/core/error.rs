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

/// Emulator error types
use thiserror::Error;

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the bus core
///
/// Only configuration-time and validation failures are errors. Unmapped or
/// untranslated accesses at run time are logged and absorbed by the bus.
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Invalid range: start 0x{start:X}, size 0x{size:X}")]
    InvalidRange { start: u64, size: u64 },

    #[error("Given address {range} for peripheral {peripheral} conflicts with address {existing_range} of peripheral {existing}")]
    RegistrationConflict {
        peripheral: String,
        range: String,
        existing: String,
        existing_range: String,
    },

    #[error("Cannot register peripheral {0}, it does not implement any bus width interface")]
    NoBusInterface(String),

    #[error("Cannot register peripheral {0} at a point, its size is unknown")]
    UnknownSize(String),

    #[error("There is no peripheral registered at 0x{address:X}")]
    NoPeripheralAt { address: u64 },

    #[error("Peripheral {0} is not registered on the bus")]
    NotRegistered(String),

    #[error("Cannot tag {name}: {reason}")]
    TagConflict { name: String, reason: String },

    #[error("There is no tag at address 0x{address:X}")]
    NoTagAt { address: u64 },

    #[error("Tried to access {peripheral} at 0x{address:X} but only memory accesses were allowed")]
    NotMemory { address: u64, peripheral: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DMA error: {0}")]
    Dma(#[from] DmaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// DMA-specific error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DmaError {
    #[error("Request size {size} is not aligned to read transfer type ({read} bytes) or write transfer type ({write} bytes)")]
    MisalignedSize { size: usize, read: usize, write: usize },

    #[error("Buffer too small: {needed} bytes needed from index {start_index}, buffer holds {len}")]
    BufferTooSmall {
        start_index: usize,
        needed: usize,
        len: usize,
    },

    #[error("Invalid transfer type: {0}")]
    InvalidTransferType(u32),
}

/// Machine description errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid region {name}: {reason}")]
    InvalidRegion { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
