// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Bus Peripheral Traits
//!
//! This module defines the width interfaces a memory-mapped device can expose
//! to the system bus, and the [`BusPeripheral`] trait that ties them together.
//!
//! # Design Goals
//!
//! - **Decoupling**: The bus doesn't need to know about specific peripheral types
//! - **Explicit widths**: A device implements only the access widths its
//!   hardware really has; the bus translates the others when the device allows it
//! - **Testability**: Devices can be tested in isolation with mock implementations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   SystemBus                         │
//! ├─────────────────────────────────────────────────────┤
//! │  registrations: range -> AccessMethods              │
//! │                                                     │
//! │  read_word(addr) {                                  │
//! │    let (methods, peripheral) = lookup(addr);        │
//! │    methods.read_word.read(&mut *peripheral, off)    │
//! │  }                                                  │
//! └─────────────────────────────────────────────────────┘
//!           ▲                   ▲
//!           │                   │
//!    ┌──────┴──────┐    ┌──────┴──────────┐
//!    │ MappedMemory│    │ UART            │
//!    │ (8/16/32)   │    │ (8 only)        │
//!    └─────────────┘    └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sysbus::core::memory::{AllowedTranslation, BusPeripheral, BytePeripheral};
//!
//! struct Uart {
//!     data: u8,
//! }
//!
//! impl BytePeripheral for Uart {
//!     fn read_byte(&mut self, _offset: u64) -> u8 {
//!         self.data
//!     }
//!
//!     fn write_byte(&mut self, _offset: u64, value: u8) {
//!         self.data = value;
//!     }
//! }
//!
//! impl BusPeripheral for Uart {
//!     fn name(&self) -> &str {
//!         "uart"
//!     }
//!
//!     fn allowed_translations(&self) -> AllowedTranslation {
//!         AllowedTranslation::WORD_TO_BYTE | AllowedTranslation::DOUBLE_WORD_TO_BYTE
//!     }
//!
//!     fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
//!         Some(self)
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bitflags::bitflags;
use serde::Deserialize;

use super::memory_region::MappedMemory;
use super::wrappers::RegisterMapper;

/// Peripheral handle shared between the machine and the bus
///
/// The bus only references peripherals. The mutex serialises every access to
/// one peripheral, so two CPUs can never interleave inside the same device.
pub type SharedPeripheral = Arc<Mutex<dyn BusPeripheral>>;

/// Byte order used when composing wide accesses from narrow ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

bitflags! {
    /// Width translations a peripheral accepts
    ///
    /// The name reads as "requested width to serviced width": `WORD_TO_BYTE`
    /// means a word request may be serviced by two byte accesses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AllowedTranslation: u8 {
        const BYTE_TO_WORD = 1 << 0;
        const BYTE_TO_DOUBLE_WORD = 1 << 1;
        const WORD_TO_BYTE = 1 << 2;
        const WORD_TO_DOUBLE_WORD = 1 << 3;
        const DOUBLE_WORD_TO_BYTE = 1 << 4;
        const DOUBLE_WORD_TO_WORD = 1 << 5;
    }
}

/// 8-bit access interface
///
/// Offsets are relative to the peripheral, not absolute bus addresses.
pub trait BytePeripheral {
    fn read_byte(&mut self, offset: u64) -> u8;
    fn write_byte(&mut self, offset: u64, value: u8);
}

/// 16-bit access interface
pub trait WordPeripheral {
    fn read_word(&mut self, offset: u64) -> u16;
    fn write_word(&mut self, offset: u64, value: u16);
}

/// 32-bit access interface
pub trait DoubleWordPeripheral {
    fn read_double_word(&mut self, offset: u64) -> u32;
    fn write_double_word(&mut self, offset: u64, value: u32);
}

/// A device that can be attached to the system bus
///
/// A peripheral exposes one or more of the width interfaces through the
/// `as_*` accessors. Anything it does not expose is either translated by the
/// bus (when listed in [`allowed_translations`](Self::allowed_translations))
/// or answered with a warning and zero.
///
/// # Thread Safety
///
/// Peripherals must be `Send` because the bus may be driven from several CPU
/// threads. The bus locks the peripheral's mutex around each access; devices
/// with state shared outside the bus (e.g. a host-side character queue)
/// need their own locking for that state.
pub trait BusPeripheral: Send {
    /// Human-readable name used in log lines
    fn name(&self) -> &str {
        "Unknown Peripheral"
    }

    /// Return the device to its power-on state
    fn reset(&mut self) {}

    /// Byte order of this device, `None` to follow the bus
    fn endianness(&self) -> Option<Endianness> {
        None
    }

    /// Widths the bus may synthesise from the ones the device implements
    fn allowed_translations(&self) -> AllowedTranslation {
        AllowedTranslation::empty()
    }

    /// Size of the device, required for point registrations
    fn size(&self) -> Option<u64> {
        None
    }

    /// Register names used by access logging
    fn register_map(&self) -> RegisterMapper {
        RegisterMapper::default()
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        None
    }

    fn as_word(&mut self) -> Option<&mut dyn WordPeripheral> {
        None
    }

    fn as_double_word(&mut self) -> Option<&mut dyn DoubleWordPeripheral> {
        None
    }

    /// Contiguous gap-free memory, eligible for bulk copies
    fn as_mapped_memory(&mut self) -> Option<&mut MappedMemory> {
        None
    }
}

/// Lock a shared peripheral
///
/// A poisoned lock only means another thread panicked mid-access; the device
/// state is still the best we have, so the guard is recovered.
pub(crate) fn lock_peripheral(
    peripheral: &SharedPeripheral,
) -> MutexGuard<'_, dyn BusPeripheral + 'static> {
    peripheral.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Compare two peripheral handles by identity
pub(crate) fn same_peripheral(a: &SharedPeripheral, b: &SharedPeripheral) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
