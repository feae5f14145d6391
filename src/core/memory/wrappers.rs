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

//! Access methods and their decorators
//!
//! Every registration on the bus resolves, once, to six access methods (read
//! and write at each width). An access method is anything implementing
//! [`ReadMethod`] or [`WriteMethod`]; the bus calls it with the locked
//! peripheral and the peripheral-local offset.
//!
//! Method kinds:
//! - [`Native`]: the peripheral implements the width itself
//! - [`Translated`]: the width is synthesised from another resolved method
//! - [`NotTranslated`]: nothing fits, warn and degrade
//! - [`ReadHookWrapper`] / [`WriteHookWrapper`]: user interception
//! - [`ReadLoggingWrapper`] / [`WriteLoggingWrapper`]: access tracing
//!
//! Decorators own the method they wrap. A hook always wraps the method
//! resolved at registration, so installing one replaces the previous hook of
//! that width.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::access::BusValue;
use super::peripheral::{
    BusPeripheral, BytePeripheral, DoubleWordPeripheral, Endianness, WordPeripheral,
};
use super::range::Range;
use super::width;

/// Read access at width `T`
pub trait ReadMethod<T>: Send + Sync {
    fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> T;
}

/// Write access at width `T`
pub trait WriteMethod<T>: Send + Sync {
    fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: T);
}

/// Transform applied to a value read from a peripheral
///
/// Receives the value produced by the peripheral and the local offset, and
/// returns the value the reader will observe.
pub type ReadHook<T> = Arc<dyn Fn(T, u64) -> T + Send + Sync>;

/// Transform applied to a value before it is written to a peripheral
pub type WriteHook<T> = Arc<dyn Fn(T, u64) -> T + Send + Sync>;

/// Direct call into the peripheral's own width interface
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

impl<T: BusValue> ReadMethod<T> for Native {
    #[inline]
    fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> T {
        T::read_native(target, offset).unwrap_or_default()
    }
}

impl<T: BusValue> WriteMethod<T> for Native {
    #[inline]
    fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: T) {
        T::write_native(target, offset, value);
    }
}

/// Width the peripheral cannot service
///
/// Reads log a warning and return zero; writes log a warning and are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotTranslated;

impl<T: BusValue> ReadMethod<T> for NotTranslated {
    fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> T {
        log::warn!(
            "{}: Attempt to read {} from peripheral that doesn't support {} interface. Offset 0x{:X}.",
            target.name(),
            T::LABEL,
            T::LABEL,
            offset
        );
        T::default()
    }
}

impl<T: BusValue> WriteMethod<T> for NotTranslated {
    fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: T) {
        log::warn!(
            "{}: Attempt to write {} 0x{:X} to peripheral that doesn't support {} interface. Offset 0x{:X}.",
            target.name(),
            T::LABEL,
            value,
            T::LABEL,
            offset
        );
    }
}

/// Read/write method pair presented as a width interface
///
/// Lets the width adapters run on top of access methods instead of a
/// concrete peripheral interface.
pub struct Wrapper<'a, T> {
    target: &'a mut dyn BusPeripheral,
    read: &'a dyn ReadMethod<T>,
    write: &'a dyn WriteMethod<T>,
}

impl<'a, T> Wrapper<'a, T> {
    pub fn new(
        target: &'a mut dyn BusPeripheral,
        read: &'a dyn ReadMethod<T>,
        write: &'a dyn WriteMethod<T>,
    ) -> Self {
        Self {
            target,
            read,
            write,
        }
    }
}

impl BytePeripheral for Wrapper<'_, u8> {
    fn read_byte(&mut self, offset: u64) -> u8 {
        self.read.read(&mut *self.target, offset)
    }

    fn write_byte(&mut self, offset: u64, value: u8) {
        self.write.write(&mut *self.target, offset, value)
    }
}

impl WordPeripheral for Wrapper<'_, u16> {
    fn read_word(&mut self, offset: u64) -> u16 {
        self.read.read(&mut *self.target, offset)
    }

    fn write_word(&mut self, offset: u64, value: u16) {
        self.write.write(&mut *self.target, offset, value)
    }
}

impl DoubleWordPeripheral for Wrapper<'_, u32> {
    fn read_double_word(&mut self, offset: u64) -> u32 {
        self.read.read(&mut *self.target, offset)
    }

    fn write_double_word(&mut self, offset: u64, value: u32) {
        self.write.write(&mut *self.target, offset, value)
    }
}

/// Access synthesised from the methods of width `N`
pub struct Translated<N> {
    read: Arc<dyn ReadMethod<N>>,
    write: Arc<dyn WriteMethod<N>>,
    endianness: Endianness,
}

impl<N> Translated<N> {
    pub fn new(
        read: Arc<dyn ReadMethod<N>>,
        write: Arc<dyn WriteMethod<N>>,
        endianness: Endianness,
    ) -> Self {
        Self {
            read,
            write,
            endianness,
        }
    }

    fn wrap<'a>(&'a self, target: &'a mut dyn BusPeripheral) -> Wrapper<'a, N> {
        Wrapper::new(target, &*self.read, &*self.write)
    }
}

macro_rules! translated_access {
    ($via:ty, $value:ty, $read_fn:path, $write_fn:path) => {
        impl ReadMethod<$value> for Translated<$via> {
            fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> $value {
                $read_fn(&mut self.wrap(target), offset, self.endianness)
            }
        }

        impl WriteMethod<$value> for Translated<$via> {
            fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: $value) {
                $write_fn(&mut self.wrap(target), offset, value, self.endianness)
            }
        }
    };
}

translated_access!(u16, u8, width::read_byte_using_word, width::write_byte_using_word);
translated_access!(
    u32,
    u8,
    width::read_byte_using_double_word,
    width::write_byte_using_double_word
);
translated_access!(u8, u16, width::read_word_using_byte, width::write_word_using_byte);
translated_access!(
    u32,
    u16,
    width::read_word_using_double_word,
    width::write_word_using_double_word
);
translated_access!(
    u8,
    u32,
    width::read_double_word_using_byte,
    width::write_double_word_using_byte
);
translated_access!(
    u16,
    u32,
    width::read_double_word_using_word,
    width::write_double_word_using_word
);

/// Read method backed by a plain function
///
/// # Example
///
/// ```
/// use sysbus::core::memory::ReadFn;
///
/// let status = ReadFn::new(|_, offset| 0x80u8 | offset as u8);
/// # let _ = status;
/// ```
pub struct ReadFn<T, F> {
    func: F,
    _value: PhantomData<fn() -> T>,
}

impl<T, F> ReadFn<T, F>
where
    F: Fn(&mut dyn BusPeripheral, u64) -> T + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _value: PhantomData,
        }
    }
}

impl<T, F> ReadMethod<T> for ReadFn<T, F>
where
    F: Fn(&mut dyn BusPeripheral, u64) -> T + Send + Sync,
{
    fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> T {
        (self.func)(target, offset)
    }
}

/// Write method backed by a plain function
pub struct WriteFn<T, F> {
    func: F,
    _value: PhantomData<fn(T)>,
}

impl<T, F> WriteFn<T, F>
where
    F: Fn(&mut dyn BusPeripheral, u64, T) + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _value: PhantomData,
        }
    }
}

impl<T, F> WriteMethod<T> for WriteFn<T, F>
where
    F: Fn(&mut dyn BusPeripheral, u64, T) + Send + Sync,
{
    fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: T) {
        (self.func)(target, offset, value)
    }
}

/// Read interception, optionally limited to a sub-range of local offsets
///
/// Outside the sub-range the original method's result is returned as is.
pub struct ReadHookWrapper<T> {
    original: Arc<dyn ReadMethod<T>>,
    hook: ReadHook<T>,
    subrange: Option<Range>,
}

impl<T> ReadHookWrapper<T> {
    pub fn new(original: Arc<dyn ReadMethod<T>>, hook: ReadHook<T>, subrange: Option<Range>) -> Self {
        Self {
            original,
            hook,
            subrange,
        }
    }
}

impl<T> ReadMethod<T> for ReadHookWrapper<T> {
    fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> T {
        let value = self.original.read(target, offset);
        match self.subrange {
            Some(range) if !range.contains(offset) => value,
            _ => (self.hook)(value, offset),
        }
    }
}

/// Write interception, optionally limited to a sub-range of local offsets
///
/// The hook returns the value that actually reaches the peripheral.
pub struct WriteHookWrapper<T> {
    original: Arc<dyn WriteMethod<T>>,
    hook: WriteHook<T>,
    subrange: Option<Range>,
}

impl<T> WriteHookWrapper<T> {
    pub fn new(original: Arc<dyn WriteMethod<T>>, hook: WriteHook<T>, subrange: Option<Range>) -> Self {
        Self {
            original,
            hook,
            subrange,
        }
    }
}

impl<T> WriteMethod<T> for WriteHookWrapper<T> {
    fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: T) {
        let value = match self.subrange {
            Some(range) if !range.contains(offset) => value,
            _ => (self.hook)(value, offset),
        };
        self.original.write(target, offset, value);
    }
}

/// Offset to register-name table used by access logging
///
/// Offsets between two named registers resolve relative to the nearest
/// preceding one:
///
/// ```
/// use sysbus::core::memory::RegisterMapper;
///
/// let map = RegisterMapper::new()
///     .with(0x00, "DATA")
///     .with(0x04, "STATUS");
///
/// assert_eq!(map.resolve(0x04), "STATUS");
/// assert_eq!(map.resolve(0x06), "STATUS+0x2");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMapper {
    names: BTreeMap<u64, String>,
}

impl RegisterMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, offset: u64, name: impl Into<String>) -> Self {
        self.insert(offset, name);
        self
    }

    pub fn insert(&mut self, offset: u64, name: impl Into<String>) {
        self.names.insert(offset, name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn resolve(&self, offset: u64) -> String {
        match self.names.range(..=offset).next_back() {
            Some((&base, name)) if base == offset => name.clone(),
            Some((&base, name)) => format!("{}+0x{:x}", name, offset - base),
            None => "unknown".to_string(),
        }
    }
}

impl<S: Into<String>> FromIterator<(u64, S)> for RegisterMapper {
    fn from_iter<I: IntoIterator<Item = (u64, S)>>(iter: I) -> Self {
        let mut mapper = RegisterMapper::new();
        for (offset, name) in iter {
            mapper.insert(offset, name);
        }
        mapper
    }
}

impl fmt::Display for RegisterMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (offset, name) in &self.names {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "0x{:X}={}", offset, name)?;
            first = false;
        }
        Ok(())
    }
}

/// Read tracing decorator
pub struct ReadLoggingWrapper<T> {
    original: Arc<dyn ReadMethod<T>>,
    name: String,
    registers: RegisterMapper,
}

impl<T> ReadLoggingWrapper<T> {
    pub fn new(original: Arc<dyn ReadMethod<T>>, name: String, registers: RegisterMapper) -> Self {
        Self {
            original,
            name,
            registers,
        }
    }
}

impl<T: BusValue> ReadMethod<T> for ReadLoggingWrapper<T> {
    fn read(&self, target: &mut dyn BusPeripheral, offset: u64) -> T {
        let value = self.original.read(target, offset);
        log::debug!(
            "{}: Read{} from 0x{:X} ({}), returned 0x{:X}.",
            self.name,
            T::NAME,
            offset,
            self.registers.resolve(offset),
            value
        );
        value
    }
}

/// Write tracing decorator
pub struct WriteLoggingWrapper<T> {
    original: Arc<dyn WriteMethod<T>>,
    name: String,
    registers: RegisterMapper,
}

impl<T> WriteLoggingWrapper<T> {
    pub fn new(original: Arc<dyn WriteMethod<T>>, name: String, registers: RegisterMapper) -> Self {
        Self {
            original,
            name,
            registers,
        }
    }
}

impl<T: BusValue> WriteMethod<T> for WriteLoggingWrapper<T> {
    fn write(&self, target: &mut dyn BusPeripheral, offset: u64, value: T) {
        log::debug!(
            "{}: Write{} to 0x{:X} ({}), value 0x{:X}.",
            self.name,
            T::NAME,
            offset,
            self.registers.resolve(offset),
            value
        );
        self.original.write(target, offset, value);
    }
}
