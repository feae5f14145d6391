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

//! Per-registration access method table
//!
//! When a peripheral is registered, the bus resolves one read and one write
//! method for each width. Resolution order for a requested width:
//!
//! | Requested   | 1st    | 2nd                         | 3rd                         |
//! |-------------|--------|-----------------------------|-----------------------------|
//! | byte        | native | word (`BYTE_TO_WORD`)       | dword (`BYTE_TO_DOUBLE_WORD`) |
//! | word        | native | dword (`WORD_TO_DOUBLE_WORD`) | byte (`WORD_TO_BYTE`)     |
//! | double word | native | word (`DOUBLE_WORD_TO_WORD`)  | byte (`DOUBLE_WORD_TO_BYTE`) |
//!
//! and "not translated" when nothing matches.

use std::fmt;
use std::sync::Arc;

use super::peripheral::{AllowedTranslation, BusPeripheral, Endianness, SharedPeripheral};
use super::range::{BusRangeRegistration, Range};
use super::width::TransferType;
use super::wrappers::{
    Native, NotTranslated, ReadHook, ReadHookWrapper, ReadLoggingWrapper, ReadMethod,
    RegisterMapper, Translated, WriteHook, WriteHookWrapper, WriteLoggingWrapper, WriteMethod,
};

/// Value types the bus can move in a single access
pub trait BusValue: Copy + Default + Send + Sync + fmt::UpperHex + Into<u64> + 'static {
    const TRANSFER_TYPE: TransferType;
    /// Suffix used in access log lines (`ReadWord`, `WriteByte`, ...)
    const NAME: &'static str;
    /// Lower-case width name used in warnings
    const LABEL: &'static str;

    /// Call the peripheral's own interface, `None` if it has none
    fn read_native(target: &mut dyn BusPeripheral, offset: u64) -> Option<Self>;
    fn write_native(target: &mut dyn BusPeripheral, offset: u64, value: Self) -> bool;

    fn read_method(methods: &AccessMethods) -> &Arc<dyn ReadMethod<Self>>;
    fn write_method(methods: &AccessMethods) -> &Arc<dyn WriteMethod<Self>>;
    fn read_method_mut(methods: &mut AccessMethods) -> &mut Arc<dyn ReadMethod<Self>>;
    fn write_method_mut(methods: &mut AccessMethods) -> &mut Arc<dyn WriteMethod<Self>>;

    /// Keep the low bits of `value`
    fn truncate(value: u64) -> Self;
    fn from_le_slice(bytes: &[u8]) -> Self;
    fn store_le(self, out: &mut [u8]);
}

macro_rules! bus_value {
    (
        $ty:ty, $tt:ident, $name:literal, $label:literal,
        $as_iface:ident, $read:ident, $write:ident,
        $read_field:ident, $write_field:ident
    ) => {
        impl BusValue for $ty {
            const TRANSFER_TYPE: TransferType = TransferType::$tt;
            const NAME: &'static str = $name;
            const LABEL: &'static str = $label;

            #[inline]
            fn read_native(target: &mut dyn BusPeripheral, offset: u64) -> Option<Self> {
                target.$as_iface().map(|p| p.$read(offset))
            }

            #[inline]
            fn write_native(target: &mut dyn BusPeripheral, offset: u64, value: Self) -> bool {
                match target.$as_iface() {
                    Some(p) => {
                        p.$write(offset, value);
                        true
                    }
                    None => false,
                }
            }

            #[inline(always)]
            fn read_method(methods: &AccessMethods) -> &Arc<dyn ReadMethod<Self>> {
                &methods.$read_field
            }

            #[inline(always)]
            fn write_method(methods: &AccessMethods) -> &Arc<dyn WriteMethod<Self>> {
                &methods.$write_field
            }

            fn read_method_mut(methods: &mut AccessMethods) -> &mut Arc<dyn ReadMethod<Self>> {
                &mut methods.$read_field
            }

            fn write_method_mut(methods: &mut AccessMethods) -> &mut Arc<dyn WriteMethod<Self>> {
                &mut methods.$write_field
            }

            #[inline(always)]
            fn truncate(value: u64) -> Self {
                value as $ty
            }

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn store_le(self, out: &mut [u8]) {
                out[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

bus_value!(u8, Byte, "Byte", "byte", as_byte, read_byte, write_byte, read_byte, write_byte);
bus_value!(u16, Word, "Word", "word", as_word, read_word, write_word, read_word, write_word);
bus_value!(
    u32,
    DoubleWord,
    "DoubleWord",
    "double word",
    as_double_word,
    read_double_word,
    write_double_word,
    read_double_word,
    write_double_word
);

/// Resolved read/write methods of one registration
#[derive(Clone)]
pub struct AccessMethods {
    pub read_byte: Arc<dyn ReadMethod<u8>>,
    pub write_byte: Arc<dyn WriteMethod<u8>>,
    pub read_word: Arc<dyn ReadMethod<u16>>,
    pub write_word: Arc<dyn WriteMethod<u16>>,
    pub read_double_word: Arc<dyn ReadMethod<u32>>,
    pub write_double_word: Arc<dyn WriteMethod<u32>>,
}

impl AccessMethods {
    /// Resolve methods for `peripheral`
    ///
    /// Returns `None` if the peripheral implements no width interface at all.
    pub fn resolve(peripheral: &mut dyn BusPeripheral, bus_endianness: Endianness) -> Option<Self> {
        let has_byte = peripheral.as_byte().is_some();
        let has_word = peripheral.as_word().is_some();
        let has_double_word = peripheral.as_double_word().is_some();
        if !has_byte && !has_word && !has_double_word {
            return None;
        }

        let allowed = peripheral.allowed_translations();
        let endianness = peripheral.endianness().unwrap_or(bus_endianness);
        let can = |present: bool, flag: AllowedTranslation| present && allowed.contains(flag);

        let (read_byte, write_byte) = if has_byte {
            native_pair::<u8>()
        } else if can(has_word, AllowedTranslation::BYTE_TO_WORD) {
            translated_pair::<u16, u8>(endianness)
        } else if can(has_double_word, AllowedTranslation::BYTE_TO_DOUBLE_WORD) {
            translated_pair::<u32, u8>(endianness)
        } else {
            not_translated_pair::<u8>()
        };

        let (read_word, write_word) = if has_word {
            native_pair::<u16>()
        } else if can(has_double_word, AllowedTranslation::WORD_TO_DOUBLE_WORD) {
            translated_pair::<u32, u16>(endianness)
        } else if can(has_byte, AllowedTranslation::WORD_TO_BYTE) {
            translated_pair::<u8, u16>(endianness)
        } else {
            not_translated_pair::<u16>()
        };

        let (read_double_word, write_double_word) = if has_double_word {
            native_pair::<u32>()
        } else if can(has_word, AllowedTranslation::DOUBLE_WORD_TO_WORD) {
            translated_pair::<u16, u32>(endianness)
        } else if can(has_byte, AllowedTranslation::DOUBLE_WORD_TO_BYTE) {
            translated_pair::<u8, u32>(endianness)
        } else {
            not_translated_pair::<u32>()
        };

        Some(Self {
            read_byte,
            write_byte,
            read_word,
            write_word,
            read_double_word,
            write_double_word,
        })
    }

    /// Hook the read method of width `T`
    ///
    /// The hook wraps the method of `pristine`, replacing any hook already
    /// installed at that width.
    pub fn hook_read<T: BusValue>(
        &mut self,
        pristine: &AccessMethods,
        hook: ReadHook<T>,
        subrange: Option<Range>,
    ) {
        let original = T::read_method(pristine).clone();
        *T::read_method_mut(self) = Arc::new(ReadHookWrapper::new(original, hook, subrange));
    }

    /// Hook the write method of width `T`, replacing any previous write hook
    pub fn hook_write<T: BusValue>(
        &mut self,
        pristine: &AccessMethods,
        hook: WriteHook<T>,
        subrange: Option<Range>,
    ) {
        let original = T::write_method(pristine).clone();
        *T::write_method_mut(self) = Arc::new(WriteHookWrapper::new(original, hook, subrange));
    }

    /// Put back the read method of width `T` from `pristine`
    pub fn restore_read<T: BusValue>(&mut self, pristine: &AccessMethods) {
        *T::read_method_mut(self) = T::read_method(pristine).clone();
    }

    /// Put back the write method of width `T` from `pristine`
    pub fn restore_write<T: BusValue>(&mut self, pristine: &AccessMethods) {
        *T::write_method_mut(self) = T::write_method(pristine).clone();
    }

    /// Copy of this table with every method traced
    pub fn with_logging(&self, name: &str, registers: &RegisterMapper) -> Self {
        fn read<T: BusValue>(
            m: &Arc<dyn ReadMethod<T>>,
            name: &str,
            registers: &RegisterMapper,
        ) -> Arc<dyn ReadMethod<T>> {
            Arc::new(ReadLoggingWrapper::new(m.clone(), name.to_string(), registers.clone()))
        }

        fn write<T: BusValue>(
            m: &Arc<dyn WriteMethod<T>>,
            name: &str,
            registers: &RegisterMapper,
        ) -> Arc<dyn WriteMethod<T>> {
            Arc::new(WriteLoggingWrapper::new(m.clone(), name.to_string(), registers.clone()))
        }

        Self {
            read_byte: read(&self.read_byte, name, registers),
            write_byte: write(&self.write_byte, name, registers),
            read_word: read(&self.read_word, name, registers),
            write_word: write(&self.write_word, name, registers),
            read_double_word: read(&self.read_double_word, name, registers),
            write_double_word: write(&self.write_double_word, name, registers),
        }
    }
}

type MethodPair<T> = (Arc<dyn ReadMethod<T>>, Arc<dyn WriteMethod<T>>);

fn native_pair<T: BusValue>() -> MethodPair<T> {
    (Arc::new(Native), Arc::new(Native))
}

/// Width `T` serviced through the native methods of width `V`
fn translated_pair<V, T>(endianness: Endianness) -> MethodPair<T>
where
    V: BusValue,
    Translated<V>: ReadMethod<T> + WriteMethod<T>,
{
    let translated = Arc::new(Translated::<V>::new(
        Arc::new(Native),
        Arc::new(Native),
        endianness,
    ));
    (translated.clone(), translated)
}

fn not_translated_pair<T: BusValue>() -> MethodPair<T> {
    (Arc::new(NotTranslated), Arc::new(NotTranslated))
}

/// Peripheral attached at one range
#[derive(Clone)]
pub struct BusRegistered {
    pub peripheral: SharedPeripheral,
    pub registration: BusRangeRegistration,
    pub name: String,
    /// Whether the peripheral is a [`MappedMemory`](super::MappedMemory)
    pub is_memory: bool,
}

impl BusRegistered {
    /// Translate a bus address inside the registration to a local offset
    #[inline(always)]
    pub fn local_offset(&self, address: u64) -> u64 {
        (address - self.registration.range.start()).wrapping_add(self.registration.offset)
    }
}

impl fmt::Debug for BusRegistered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusRegistered")
            .field("name", &self.name)
            .field("registration", &self.registration)
            .field("is_memory", &self.is_memory)
            .finish()
    }
}
