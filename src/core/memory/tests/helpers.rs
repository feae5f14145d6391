// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Test peripherals for bus tests

use super::super::*;

/// Register file exposing a single access width
///
/// Registers are stored little-endian in a flat byte array so that tests can
/// inspect exactly which bytes an access touched.
pub struct RegisterFile {
    pub name: &'static str,
    pub bytes: Vec<u8>,
    pub width: TransferType,
    pub allowed: AllowedTranslation,
    pub endianness: Option<Endianness>,
    pub accesses: usize,
    pub resets: usize,
}

impl RegisterFile {
    pub fn new(name: &'static str, size: usize, width: TransferType) -> Self {
        Self {
            name,
            bytes: vec![0; size],
            width,
            allowed: AllowedTranslation::all(),
            endianness: None,
            accesses: 0,
            resets: 0,
        }
    }

    pub fn with_allowed(mut self, allowed: AllowedTranslation) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = Some(endianness);
        self
    }

    fn load(&mut self, offset: u64, len: usize) -> u32 {
        self.accesses += 1;
        let mut value = 0u32;
        for i in (0..len).rev() {
            let byte = self.bytes.get(offset as usize + i).copied().unwrap_or(0);
            value = (value << 8) | byte as u32;
        }
        value
    }

    fn store(&mut self, offset: u64, len: usize, value: u32) {
        self.accesses += 1;
        for i in 0..len {
            if let Some(byte) = self.bytes.get_mut(offset as usize + i) {
                *byte = (value >> (8 * i)) as u8;
            }
        }
    }
}

impl BytePeripheral for RegisterFile {
    fn read_byte(&mut self, offset: u64) -> u8 {
        self.load(offset, 1) as u8
    }

    fn write_byte(&mut self, offset: u64, value: u8) {
        self.store(offset, 1, value as u32)
    }
}

impl WordPeripheral for RegisterFile {
    fn read_word(&mut self, offset: u64) -> u16 {
        self.load(offset, 2) as u16
    }

    fn write_word(&mut self, offset: u64, value: u16) {
        self.store(offset, 2, value as u32)
    }
}

impl DoubleWordPeripheral for RegisterFile {
    fn read_double_word(&mut self, offset: u64) -> u32 {
        self.load(offset, 4)
    }

    fn write_double_word(&mut self, offset: u64, value: u32) {
        self.store(offset, 4, value)
    }
}

impl BusPeripheral for RegisterFile {
    fn name(&self) -> &str {
        self.name
    }

    fn reset(&mut self) {
        self.bytes.fill(0);
        self.resets += 1;
    }

    fn endianness(&self) -> Option<Endianness> {
        self.endianness
    }

    fn allowed_translations(&self) -> AllowedTranslation {
        self.allowed
    }

    fn size(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }

    fn register_map(&self) -> RegisterMapper {
        RegisterMapper::new().with(0x0, "CTRL").with(0x4, "DATA")
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        match self.width {
            TransferType::Byte => Some(self),
            _ => None,
        }
    }

    fn as_word(&mut self) -> Option<&mut dyn WordPeripheral> {
        match self.width {
            TransferType::Word => Some(self),
            _ => None,
        }
    }

    fn as_double_word(&mut self) -> Option<&mut dyn DoubleWordPeripheral> {
        match self.width {
            TransferType::DoubleWord => Some(self),
            _ => None,
        }
    }
}

/// Peripheral without any width interface
pub struct Inert;

impl BusPeripheral for Inert {
    fn name(&self) -> &str {
        "inert"
    }
}

/// Shared handle plus a typed handle to the same device
pub fn shared<P: BusPeripheral + 'static>(device: P) -> (SharedPeripheral, Arc<Mutex<P>>) {
    let typed = Arc::new(Mutex::new(device));
    let shared: SharedPeripheral = typed.clone();
    (shared, typed)
}

pub fn range(start: u64, size: u64) -> Range {
    Range::new(start, size).unwrap()
}

/// Register a `MappedMemory` of `size` bytes at `start`
#[allow(dead_code)]
pub fn add_ram(bus: &SystemBus, start: u64, size: usize) -> Arc<Mutex<MappedMemory>> {
    let (shared, typed) = shared(MappedMemory::new("ram", size));
    bus.register(shared, BusRangeRegistration::new(range(start, size as u64)))
        .unwrap();
    typed
}

/// Register a single-width register file at `start`
#[allow(dead_code)]
pub fn add_registers(
    bus: &SystemBus,
    start: u64,
    device: RegisterFile,
) -> (SharedPeripheral, Arc<Mutex<RegisterFile>>) {
    let size = device.bytes.len() as u64;
    let (shared, typed) = shared(device);
    bus.register(shared.clone(), BusRangeRegistration::new(range(start, size)))
        .unwrap();
    (shared, typed)
}
