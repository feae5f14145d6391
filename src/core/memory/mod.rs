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

//! System bus
//!
//! The [`SystemBus`] owns the mapping from address ranges to peripherals and
//! routes every read and write to the peripheral that answers it, at the
//! requested width.
//!
//! # Dispatch
//!
//! ```text
//!   read_word(addr)
//!        │
//!        ▼
//!   registration table ──(none)──► unhandled access: log, count, 0 / tag default
//!        │
//!        ▼
//!   Block { range, methods, peripheral }
//!        │  offset = addr - range.start + registration.offset
//!        ▼
//!   methods.read_word ─► Native | Translated | NotTranslated (+ hooks, logging)
//! ```
//!
//! # Failure policy
//!
//! Run-time anomalies never surface as errors. A read from an unmapped
//! address returns zero (or the default value of a tag covering it) and a
//! write there is dropped. Only configuration operations return `Result`.
//!
//! # Thread Safety
//!
//! All methods take `&self`. The registration table sits behind a
//! `RwLock` that is released before a peripheral is called, and each
//! peripheral is locked for the duration of one access.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use sysbus::core::memory::{BusRangeRegistration, MappedMemory, Range, SystemBus};
//!
//! let bus = SystemBus::new();
//! let ram = Arc::new(Mutex::new(MappedMemory::new("ram", 0x1000)));
//! bus.register(ram, BusRangeRegistration::new(Range::new(0x8000_0000, 0x1000).unwrap()))
//!     .unwrap();
//!
//! bus.write_double_word(0x8000_0000, 0x12345678);
//! assert_eq!(bus.read_word(0x8000_0002), 0x1234);
//! assert_eq!(bus.read_byte(0x9000_0000), 0); // unmapped
//! ```

pub mod access;
mod collection;
pub mod memory_region;
pub mod peripheral;
pub mod range;
pub mod width;
pub mod wrappers;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;

use crate::core::error::{EmulatorError, Result};
use collection::{Block, PeripheralCollection};
use peripheral::lock_peripheral;

pub use access::{AccessMethods, BusRegistered, BusValue};
pub use memory_region::{MappedMemory, Silencer};
pub use peripheral::{
    AllowedTranslation, BusPeripheral, BytePeripheral, DoubleWordPeripheral, Endianness,
    SharedPeripheral, WordPeripheral,
};
pub use range::{BusPointRegistration, BusRangeRegistration, Range};
pub use width::TransferType;
pub use wrappers::{
    Native, NotTranslated, ReadFn, ReadHook, ReadHookWrapper, ReadLoggingWrapper, ReadMethod,
    RegisterMapper, Translated, Wrapper, WriteFn, WriteHook, WriteHookWrapper,
    WriteLoggingWrapper, WriteMethod,
};

/// Chunk size used when zeroing large ranges
const ZERO_CHUNK: usize = 64 * 1024;

/// Whether unhandled accesses are logged
///
/// Unhandled accesses are always counted; this only controls the warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnhandledAccessBehaviour {
    #[default]
    Report,
    DoNotReport,
    ReportIfTagged,
    ReportIfNotTagged,
}

impl UnhandledAccessBehaviour {
    fn should_report(self, tagged: bool) -> bool {
        match self {
            UnhandledAccessBehaviour::Report => true,
            UnhandledAccessBehaviour::DoNotReport => false,
            UnhandledAccessBehaviour::ReportIfTagged => tagged,
            UnhandledAccessBehaviour::ReportIfNotTagged => !tagged,
        }
    }
}

/// Named unmapped range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub range: Range,
    pub name: String,
    /// Value returned by unhandled reads inside the range
    pub default_value: u32,
}

/// Part of a bulk access served by one registration, or a hole
struct Segment {
    address: u64,
    /// Position inside the caller's buffer
    position: usize,
    len: usize,
    target: Option<(BusRegistered, Arc<AccessMethods>)>,
}

/// Address-space router
pub struct SystemBus {
    endianness: Endianness,
    peripherals: RwLock<PeripheralCollection>,
    tags: RwLock<Vec<Tag>>,
    unhandled_access: RwLock<UnhandledAccessBehaviour>,
    unexpected_reads: AtomicU64,
    unexpected_writes: AtomicU64,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// Create an empty little-endian bus
    pub fn new() -> Self {
        Self::with_endianness(Endianness::Little)
    }

    /// Create an empty bus with the given byte order
    ///
    /// The byte order applies to width translations of peripherals that do
    /// not declare their own.
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self {
            endianness,
            peripherals: RwLock::new(PeripheralCollection::new()),
            tags: RwLock::new(Vec::new()),
            unhandled_access: RwLock::new(UnhandledAccessBehaviour::default()),
            unexpected_reads: AtomicU64::new(0),
            unexpected_writes: AtomicU64::new(0),
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn collection(&self) -> RwLockReadGuard<'_, PeripheralCollection> {
        self.peripherals.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn collection_mut(&self) -> RwLockWriteGuard<'_, PeripheralCollection> {
        self.peripherals.write().unwrap_or_else(PoisonError::into_inner)
    }

    // Registration

    /// Attach a peripheral at a range
    ///
    /// # Errors
    ///
    /// - `NoBusInterface` if the peripheral exposes no width interface
    /// - `RegistrationConflict` if the range intersects an existing registration
    pub fn register(
        &self,
        peripheral: SharedPeripheral,
        registration: BusRangeRegistration,
    ) -> Result<()> {
        let (name, methods, is_memory) = {
            let mut device = lock_peripheral(&peripheral);
            let name = device.name().to_string();
            let methods = AccessMethods::resolve(&mut *device, self.endianness)
                .ok_or_else(|| EmulatorError::NoBusInterface(name.clone()))?;
            let is_memory = device.as_mapped_memory().is_some();
            (name, methods, is_memory)
        };

        let mut collection = self.collection_mut();
        if let Some(existing) = collection.find_overlapping(&registration.range) {
            return Err(EmulatorError::RegistrationConflict {
                peripheral: name,
                range: registration.range.to_string(),
                existing: existing.registered.name.clone(),
                existing_range: existing.range.to_string(),
            });
        }

        log::debug!("sysbus: registered {} at {}", name, registration);
        collection.add(Block::new(
            BusRegistered {
                peripheral,
                registration,
                name,
                is_memory,
            },
            methods,
        ));
        Ok(())
    }

    /// Attach a sized peripheral at a starting address
    pub fn register_at(
        &self,
        peripheral: SharedPeripheral,
        point: BusPointRegistration,
    ) -> Result<()> {
        let size = {
            let device = lock_peripheral(&peripheral);
            device
                .size()
                .ok_or_else(|| EmulatorError::UnknownSize(device.name().to_string()))?
        };
        let range = Range::new(point.address, size)?;
        self.register(peripheral, BusRangeRegistration::with_offset(range, point.offset))
    }

    /// Detach every registration of `peripheral`
    pub fn unregister(&self, peripheral: &SharedPeripheral) -> Result<()> {
        let removed = self.collection_mut().remove_peripheral(peripheral);
        if removed.is_empty() {
            let name = lock_peripheral(peripheral).name().to_string();
            return Err(EmulatorError::NotRegistered(name));
        }
        for block in &removed {
            log::debug!("sysbus: unregistered {} from {}", block.registered.name, block.range);
        }
        Ok(())
    }

    /// Detach the registration covering `address`
    pub fn unregister_from_address(&self, address: u64) -> Result<()> {
        let mut collection = self.collection_mut();
        let range = collection
            .find(address)
            .map(|b| b.range)
            .ok_or(EmulatorError::NoPeripheralAt { address })?;
        for block in collection.remove_where(|b| b.range == range) {
            log::debug!("sysbus: unregistered {} from {}", block.registered.name, block.range);
        }
        Ok(())
    }

    /// Registration covering `address`
    pub fn what_is_at(&self, address: u64) -> Option<BusRegistered> {
        self.collection().find(address).map(|b| b.registered.clone())
    }

    pub fn what_peripheral_is_at(&self, address: u64) -> Option<SharedPeripheral> {
        self.collection()
            .find(address)
            .map(|b| b.registered.peripheral.clone())
    }

    /// Memory registration covering `address`, ignoring other peripherals
    pub fn find_memory(&self, address: u64) -> Option<BusRegistered> {
        self.what_is_at(address).filter(|r| r.is_memory)
    }

    /// Every registration, in address order
    pub fn peripherals(&self) -> Vec<BusRegistered> {
        self.collection().iter().map(|b| b.registered.clone()).collect()
    }

    pub fn registration_points(&self, peripheral: &SharedPeripheral) -> Vec<BusRangeRegistration> {
        self.collection()
            .iter()
            .filter(|b| peripheral::same_peripheral(&b.registered.peripheral, peripheral))
            .map(|b| b.registered.registration)
            .collect()
    }

    pub fn is_registered(&self, peripheral: &SharedPeripheral) -> bool {
        !self.registration_points(peripheral).is_empty()
    }

    // Single accesses

    /// Resolve `address` to a method table, peripheral and local offset
    #[inline]
    fn target(&self, address: u64) -> Option<(Arc<AccessMethods>, SharedPeripheral, u64)> {
        let collection = self.collection();
        let block = collection.find(address)?;
        Some((
            block.methods().clone(),
            block.registered.peripheral.clone(),
            block.registered.local_offset(address),
        ))
    }

    /// Read a value of width `T`
    #[inline]
    pub fn read<T: BusValue>(&self, address: u64) -> T {
        match self.target(address) {
            Some((methods, peripheral, offset)) => {
                let mut device = lock_peripheral(&peripheral);
                T::read_method(&methods).read(&mut *device, offset)
            }
            None => self.report_non_existing_read(address),
        }
    }

    /// Write a value of width `T`
    #[inline]
    pub fn write<T: BusValue>(&self, address: u64, value: T) {
        match self.target(address) {
            Some((methods, peripheral, offset)) => {
                let mut device = lock_peripheral(&peripheral);
                T::write_method(&methods).write(&mut *device, offset, value);
            }
            None => self.report_non_existing_write(address, value),
        }
    }

    pub fn read_byte(&self, address: u64) -> u8 {
        self.read(address)
    }

    pub fn write_byte(&self, address: u64, value: u8) {
        self.write(address, value)
    }

    pub fn read_word(&self, address: u64) -> u16 {
        self.read(address)
    }

    pub fn write_word(&self, address: u64, value: u16) {
        self.write(address, value)
    }

    pub fn read_double_word(&self, address: u64) -> u32 {
        self.read(address)
    }

    pub fn write_double_word(&self, address: u64, value: u32) {
        self.write(address, value)
    }

    // Bulk accesses

    /// Split `[address, address + len)` into targets and holes
    fn segments(&self, address: u64, len: usize) -> Vec<Segment> {
        if len == 0 {
            return Vec::new();
        }
        let Ok(range) = Range::new(address, len as u64) else {
            log::warn!(
                "sysbus: bulk access of {} bytes at 0x{:X} wraps the address space",
                len,
                address
            );
            return Vec::new();
        };

        let collection = self.collection();
        let mut segments = Vec::new();
        let mut cursor = Some(range.start());
        let hole = |from: u64, to_inclusive: u64| Segment {
            address: from,
            position: (from - range.start()) as usize,
            len: (to_inclusive - from + 1) as usize,
            target: None,
        };

        for block in collection.blocks_in(&range) {
            let Some(part) = block.range.intersect(&range) else {
                continue;
            };
            match cursor {
                Some(at) if part.start() > at => segments.push(hole(at, part.start() - 1)),
                _ => {}
            }
            segments.push(Segment {
                address: part.start(),
                position: (part.start() - range.start()) as usize,
                len: part.size() as usize,
                target: Some((block.registered.clone(), block.methods().clone())),
            });
            cursor = part.end().checked_add(1);
        }
        match cursor {
            Some(at) if at <= range.end() => segments.push(hole(at, range.end())),
            _ => {}
        }
        segments
    }

    fn report_hole(&self, segment: &Segment) {
        if self.unhandled_access_behaviour() == UnhandledAccessBehaviour::DoNotReport {
            return;
        }
        let end = segment.address + (segment.len as u64 - 1);
        if let Ok(range) = Range::from_bounds(segment.address, end) {
            log::warn!(
                "sysbus: Tried to access bytes at non-existing peripheral in range {}.",
                range
            );
        }
    }

    /// Read `buffer.len()` bytes starting at `address`
    ///
    /// Memory targets are copied in bulk, other peripherals are read byte by
    /// byte. Holes read as zero.
    pub fn read_bytes(&self, address: u64, buffer: &mut [u8]) {
        for segment in self.segments(address, buffer.len()) {
            let out = &mut buffer[segment.position..segment.position + segment.len];
            match segment.target {
                Some((registered, methods)) => {
                    let offset = registered.local_offset(segment.address);
                    let mut device = lock_peripheral(&registered.peripheral);
                    if registered.is_memory {
                        if let Some(memory) = device.as_mapped_memory() {
                            memory.read_bytes(offset, out);
                            continue;
                        }
                    }
                    for (i, byte) in out.iter_mut().enumerate() {
                        *byte = methods.read_byte.read(&mut *device, offset + i as u64);
                    }
                }
                None => {
                    out.fill(0);
                    self.report_hole(&segment);
                }
            }
        }
    }

    /// Write `data` starting at `address`
    pub fn write_bytes(&self, address: u64, data: &[u8]) {
        for segment in self.segments(address, data.len()) {
            let input = &data[segment.position..segment.position + segment.len];
            match segment.target {
                Some((registered, methods)) => {
                    let offset = registered.local_offset(segment.address);
                    let mut device = lock_peripheral(&registered.peripheral);
                    if registered.is_memory {
                        if let Some(memory) = device.as_mapped_memory() {
                            memory.write_bytes(offset, input);
                            continue;
                        }
                    }
                    for (i, &byte) in input.iter().enumerate() {
                        methods.write_byte.write(&mut *device, offset + i as u64, byte);
                    }
                }
                None => self.report_hole(&segment),
            }
        }
    }

    /// Fail if any peripheral in the range is not memory
    ///
    /// Holes pass; the bulk access logs them and reads them as zero.
    fn check_memory(segments: &[Segment]) -> Result<()> {
        for segment in segments {
            if let Some((registered, _)) = &segment.target {
                if !registered.is_memory {
                    return Err(EmulatorError::NotMemory {
                        address: segment.address,
                        peripheral: registered.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Read from memory only
    ///
    /// # Errors
    ///
    /// Fails before copying anything if a peripheral in the range is not
    /// memory.
    pub fn read_memory(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        Self::check_memory(&self.segments(address, buffer.len()))?;
        self.read_bytes(address, buffer);
        Ok(())
    }

    /// Write to memory only
    pub fn write_memory(&self, address: u64, data: &[u8]) -> Result<()> {
        Self::check_memory(&self.segments(address, data.len()))?;
        self.write_bytes(address, data);
        Ok(())
    }

    /// Write zeros over `range`
    pub fn zero_range(&self, range: Range) {
        let zeros = vec![0u8; ZERO_CHUNK.min(range.size() as usize)];
        let mut address = range.start();
        let mut remaining = range.size();
        while remaining > 0 {
            let chunk = remaining.min(zeros.len() as u64) as usize;
            self.write_bytes(address, &zeros[..chunk]);
            remaining -= chunk as u64;
            address = address.wrapping_add(chunk as u64);
        }
    }

    // Unhandled accesses

    /// Register a peripheral that silently absorbs every access in `range`
    pub fn silence_range(&self, range: Range) -> Result<()> {
        self.register(
            Arc::new(Mutex::new(Silencer)),
            BusRangeRegistration::new(range),
        )
    }

    pub fn unhandled_access_behaviour(&self) -> UnhandledAccessBehaviour {
        *self
            .unhandled_access
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_unhandled_access_behaviour(&self, behaviour: UnhandledAccessBehaviour) {
        *self
            .unhandled_access
            .write()
            .unwrap_or_else(PoisonError::into_inner) = behaviour;
    }

    /// Number of reads that hit no peripheral since the last reset
    pub fn unexpected_reads(&self) -> u64 {
        self.unexpected_reads.load(Ordering::Relaxed)
    }

    /// Number of writes that hit no peripheral since the last reset
    pub fn unexpected_writes(&self) -> u64 {
        self.unexpected_writes.load(Ordering::Relaxed)
    }

    fn find_tag(&self, address: u64) -> Option<(String, u32)> {
        self.tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.range.contains(address))
            .map(|t| (t.name.clone(), t.default_value))
    }

    fn report_non_existing_read<T: BusValue>(&self, address: u64) -> T {
        self.unexpected_reads.fetch_add(1, Ordering::Relaxed);
        let tag = self.find_tag(address);
        let value = tag
            .as_ref()
            .map(|(_, default)| T::truncate(*default as u64))
            .unwrap_or_default();

        if self.unhandled_access_behaviour().should_report(tag.is_some()) {
            match tag {
                Some((name, _)) => log::warn!(
                    "sysbus: (tag: '{}') Read{} from non existing peripheral at 0x{:X}, returning 0x{:X}.",
                    name,
                    T::NAME,
                    address,
                    value
                ),
                None => log::warn!(
                    "sysbus: Read{} from non existing peripheral at 0x{:X}.",
                    T::NAME,
                    address
                ),
            }
        }
        value
    }

    fn report_non_existing_write<T: BusValue>(&self, address: u64, value: T) {
        self.unexpected_writes.fetch_add(1, Ordering::Relaxed);
        let tag = self.find_tag(address);

        if self.unhandled_access_behaviour().should_report(tag.is_some()) {
            match tag {
                Some((name, _)) => log::warn!(
                    "sysbus: (tag: '{}') Write{} to non existing peripheral at 0x{:X}, value 0x{:X}.",
                    name,
                    T::NAME,
                    address,
                    value
                ),
                None => log::warn!(
                    "sysbus: Write{} to non existing peripheral at 0x{:X}, value 0x{:X}.",
                    T::NAME,
                    address,
                    value
                ),
            }
        }
    }

    /// Name an unmapped range
    ///
    /// A tag placed entirely inside an existing tag splits it: the parts of
    /// the parent outside the new range keep the parent's name and default,
    /// and the new range is named `parent/name`.
    ///
    /// # Errors
    ///
    /// `TagConflict` if the range intersects more than one tag, or partially
    /// overlaps one.
    pub fn tag(&self, range: Range, name: &str, default_value: u32) -> Result<()> {
        let mut tags = self.tags.write().unwrap_or_else(PoisonError::into_inner);
        let intersecting: Vec<usize> = tags
            .iter()
            .enumerate()
            .filter(|(_, t)| t.range.intersects(&range))
            .map(|(i, _)| i)
            .collect();

        match intersecting.as_slice() {
            [] => {
                tags.push(Tag {
                    range,
                    name: name.to_string(),
                    default_value,
                });
                Ok(())
            }
            [index] => {
                let parent = tags[*index].clone();
                if !parent.range.contains_range(&range) {
                    return Err(EmulatorError::TagConflict {
                        name: name.to_string(),
                        reason: format!("subtag has to be completely contained in {}", parent.name),
                    });
                }
                tags.remove(*index);
                if range.start() > parent.range.start() {
                    tags.push(Tag {
                        range: Range::from_bounds(parent.range.start(), range.start() - 1)?,
                        ..parent.clone()
                    });
                }
                if parent.range.end() > range.end() {
                    tags.push(Tag {
                        range: Range::from_bounds(range.end() + 1, parent.range.end())?,
                        ..parent.clone()
                    });
                }
                tags.push(Tag {
                    range,
                    name: format!("{}/{}", parent.name, name),
                    default_value,
                });
                Ok(())
            }
            many => {
                let names: Vec<&str> = many.iter().map(|&i| tags[i].name.as_str()).collect();
                Err(EmulatorError::TagConflict {
                    name: name.to_string(),
                    reason: format!("intersects with tags: {}", names.join(", ")),
                })
            }
        }
    }

    /// Remove every tag covering `address`
    pub fn remove_tag(&self, address: u64) -> Result<()> {
        let mut tags = self.tags.write().unwrap_or_else(PoisonError::into_inner);
        let before = tags.len();
        tags.retain(|t| !t.range.contains(address));
        if tags.len() == before {
            return Err(EmulatorError::NoTagAt { address });
        }
        Ok(())
    }

    /// Every tag, in address order
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = self
            .tags
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        tags.sort_by_key(|t| t.range.start());
        tags
    }

    // Hooks and logging

    /// Trace every access to `peripheral` at debug level
    ///
    /// Enabling twice has no additional effect.
    pub fn log_peripheral_access(&self, peripheral: &SharedPeripheral, enable: bool) {
        let registers = lock_peripheral(peripheral).register_map();
        for block in self.collection_mut().blocks_of(peripheral) {
            match (enable, block.is_logging()) {
                (true, false) => block.set_logging(Some(registers.clone())),
                (false, true) => block.set_logging(None),
                _ => {}
            }
        }
    }

    /// Transform values read from `peripheral` at width `T`
    ///
    /// `subrange` limits the hook to local offsets inside it. A new hook
    /// replaces the previous read hook of the same width.
    pub fn set_hook_after_peripheral_read<T, F>(
        &self,
        peripheral: &SharedPeripheral,
        hook: F,
        subrange: Option<Range>,
    ) -> Result<()>
    where
        T: BusValue,
        F: Fn(T, u64) -> T + Send + Sync + 'static,
    {
        let hook: ReadHook<T> = Arc::new(hook);
        self.update_hooks(peripheral, |methods, pristine| {
            methods.hook_read(pristine, hook.clone(), subrange)
        })
    }

    /// Transform values written to `peripheral` at width `T`
    ///
    /// Replaces the previous write hook of the same width.
    pub fn set_hook_before_peripheral_write<T, F>(
        &self,
        peripheral: &SharedPeripheral,
        hook: F,
        subrange: Option<Range>,
    ) -> Result<()>
    where
        T: BusValue,
        F: Fn(T, u64) -> T + Send + Sync + 'static,
    {
        let hook: WriteHook<T> = Arc::new(hook);
        self.update_hooks(peripheral, |methods, pristine| {
            methods.hook_write(pristine, hook.clone(), subrange)
        })
    }

    /// Remove the read hook of width `T` from `peripheral`
    pub fn clear_hook_after_peripheral_read<T: BusValue>(
        &self,
        peripheral: &SharedPeripheral,
    ) -> Result<()> {
        self.update_hooks(peripheral, |methods, pristine| methods.restore_read::<T>(pristine))
    }

    /// Remove the write hook of width `T` from `peripheral`
    pub fn clear_hook_before_peripheral_write<T: BusValue>(
        &self,
        peripheral: &SharedPeripheral,
    ) -> Result<()> {
        self.update_hooks(peripheral, |methods, pristine| methods.restore_write::<T>(pristine))
    }

    fn update_hooks(
        &self,
        peripheral: &SharedPeripheral,
        update: impl Fn(&mut AccessMethods, &AccessMethods),
    ) -> Result<()> {
        let mut collection = self.collection_mut();
        let mut found = false;
        for block in collection.blocks_of(peripheral) {
            block.update_hooks(&update);
            found = true;
        }
        if !found {
            drop(collection);
            return Err(EmulatorError::NotRegistered(
                lock_peripheral(peripheral).name().to_string(),
            ));
        }
        Ok(())
    }

    /// Drop every hook installed on `peripheral`
    pub fn clear_peripheral_hooks(&self, peripheral: &SharedPeripheral) {
        for block in self.collection_mut().blocks_of(peripheral) {
            block.clear_hooks();
        }
    }

    // Lifecycle

    /// Reset every registered peripheral once and zero the counters
    pub fn reset(&self) {
        let mut seen = HashSet::new();
        let peripherals: Vec<SharedPeripheral> = self
            .collection()
            .iter()
            .map(|b| b.registered.peripheral.clone())
            .filter(|p| seen.insert(Arc::as_ptr(p) as *const () as usize))
            .collect();

        for peripheral in &peripherals {
            lock_peripheral(peripheral).reset();
        }
        self.unexpected_reads.store(0, Ordering::Relaxed);
        self.unexpected_writes.store(0, Ordering::Relaxed);
        log::debug!("sysbus: reset {} peripherals", peripherals.len());
    }

    /// Drop every registration and tag
    pub fn clear(&self) {
        self.collection_mut().clear();
        self.tags
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        log::debug!("sysbus: cleared");
    }
}

#[cfg(test)]
mod tests;
