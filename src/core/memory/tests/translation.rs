// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Access method resolution tests

use super::super::*;
use super::helpers::*;

/// Device with native byte and double-word interfaces that records which one
/// served each access
struct DualWidth {
    log: Vec<&'static str>,
}

impl BytePeripheral for DualWidth {
    fn read_byte(&mut self, _offset: u64) -> u8 {
        self.log.push("byte");
        0
    }

    fn write_byte(&mut self, _offset: u64, _value: u8) {
        self.log.push("byte");
    }
}

impl DoubleWordPeripheral for DualWidth {
    fn read_double_word(&mut self, _offset: u64) -> u32 {
        self.log.push("dword");
        0
    }

    fn write_double_word(&mut self, _offset: u64, _value: u32) {
        self.log.push("dword");
    }
}

impl BusPeripheral for DualWidth {
    fn allowed_translations(&self) -> AllowedTranslation {
        AllowedTranslation::all()
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        Some(self)
    }

    fn as_double_word(&mut self) -> Option<&mut dyn DoubleWordPeripheral> {
        Some(self)
    }
}

#[test]
fn test_double_word_through_byte_device() {
    let bus = SystemBus::new();
    let (_, device) = add_registers(&bus, 0x1000, RegisterFile::new("uart", 16, TransferType::Byte));

    bus.write_double_word(0x1004, 0x1122_3344);

    let device = device.lock().unwrap();
    assert_eq!(&device.bytes[4..8], &[0x44, 0x33, 0x22, 0x11]);
    assert_eq!(device.accesses, 4);
    drop(device);

    assert_eq!(bus.read_double_word(0x1004), 0x1122_3344);
    assert_eq!(bus.read_word(0x1006), 0x1122);
}

#[test]
fn test_byte_through_word_device() {
    let bus = SystemBus::new();
    let (_, device) = add_registers(&bus, 0x2000, RegisterFile::new("timer", 8, TransferType::Word));

    bus.write_word(0x2000, 0x1234);
    bus.write_byte(0x2001, 0xAB);

    assert_eq!(bus.read_word(0x2000), 0xAB34);
    assert_eq!(bus.read_byte(0x2000), 0x34);
    assert_eq!(device.lock().unwrap().bytes[0..2], [0x34, 0xAB]);
}

#[test]
fn test_disallowed_translation_degrades() {
    let bus = SystemBus::new();
    let device = RegisterFile::new("strict", 8, TransferType::Byte)
        .with_allowed(AllowedTranslation::empty());
    let (_, device) = add_registers(&bus, 0x3000, device);

    bus.write_byte(0x3000, 0x55);
    bus.write_word(0x3002, 0xFFFF);
    bus.write_double_word(0x3004, 0xFFFF_FFFF);

    assert_eq!(bus.read_word(0x3000), 0);
    assert_eq!(bus.read_double_word(0x3000), 0);
    assert_eq!(bus.read_byte(0x3000), 0x55);
    assert_eq!(device.lock().unwrap().bytes, vec![0x55, 0, 0, 0, 0, 0, 0, 0]);

    // Untranslated accesses hit a peripheral, so they are not unhandled
    assert_eq!(bus.unexpected_reads(), 0);
    assert_eq!(bus.unexpected_writes(), 0);
}

#[test]
fn test_partially_allowed_translations() {
    let bus = SystemBus::new();
    let device = RegisterFile::new("uart", 8, TransferType::Byte)
        .with_allowed(AllowedTranslation::WORD_TO_BYTE);
    add_registers(&bus, 0x3000, device);

    bus.write_word(0x3000, 0xBEEF);
    bus.write_double_word(0x3004, 0xDEAD_BEEF);

    assert_eq!(bus.read_word(0x3000), 0xBEEF);
    assert_eq!(bus.read_double_word(0x3000), 0);
    assert_eq!(bus.read_byte(0x3004), 0);
}

#[test]
fn test_word_prefers_double_word_over_byte() {
    let bus = SystemBus::new();
    let (shared, device) = shared(DualWidth { log: Vec::new() });
    bus.register(shared, BusRangeRegistration::new(range(0x4000, 0x10)))
        .unwrap();

    bus.read_word(0x4000);
    bus.read_byte(0x4000);
    bus.read_double_word(0x4000);

    assert_eq!(device.lock().unwrap().log, vec!["dword", "byte", "dword"]);
}

#[test]
fn test_peripheral_endianness_overrides_bus() {
    let bus = SystemBus::new();
    let device = RegisterFile::new("be", 8, TransferType::Byte).with_endianness(Endianness::Big);
    let (_, device) = add_registers(&bus, 0x5000, device);

    bus.write_double_word(0x5000, 0x1122_3344);

    assert_eq!(&device.lock().unwrap().bytes[0..4], &[0x11, 0x22, 0x33, 0x44]);
    assert_eq!(bus.read_double_word(0x5000), 0x1122_3344);
}

#[test]
fn test_bus_endianness_applies_by_default() {
    let bus = SystemBus::with_endianness(Endianness::Big);
    let (_, device) = add_registers(&bus, 0x5000, RegisterFile::new("dev", 8, TransferType::Byte));

    bus.write_word(0x5000, 0xA1B2);

    assert_eq!(&device.lock().unwrap().bytes[0..2], &[0xA1, 0xB2]);
    assert_eq!(bus.endianness(), Endianness::Big);
}

#[test]
fn test_peripheral_without_interface_rejected() {
    let bus = SystemBus::new();
    let (shared, _) = shared(Inert);

    let result = bus.register(shared, BusRangeRegistration::new(range(0, 0x10)));
    assert!(matches!(result, Err(EmulatorError::NoBusInterface(name)) if name == "inert"));
    assert!(bus.peripherals().is_empty());
}

#[test]
fn test_resolve_table_directly() {
    let mut device = RegisterFile::new("dev", 8, TransferType::Word);
    let methods = AccessMethods::resolve(&mut device, Endianness::Little).unwrap();

    methods.write_double_word.write(&mut device, 0, 0x0102_0304);
    assert_eq!(methods.read_byte.read(&mut device, 3), 0x01);
    assert_eq!(methods.read_word.read(&mut device, 2), 0x0102);

    assert!(AccessMethods::resolve(&mut Inert, Endianness::Little).is_none());
}
