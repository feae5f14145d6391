// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Registration and single-access routing tests

use super::super::*;
use super::helpers::*;

#[test]
fn test_register_and_route() {
    let bus = SystemBus::new();
    let ram = add_ram(&bus, 0x8000_0000, 0x1000);

    bus.write_double_word(0x8000_0010, 0xDEAD_BEEF);

    assert_eq!(bus.read_double_word(0x8000_0010), 0xDEAD_BEEF);
    assert_eq!(bus.read_byte(0x8000_0013), 0xDE);
    assert_eq!(ram.lock().unwrap().as_slice()[0x10..0x14], [0xEF, 0xBE, 0xAD, 0xDE]);
}

#[test]
fn test_registration_conflict() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x1000, 0x100);

    let (other, _) = shared(MappedMemory::new("rom", 0x100));
    let result = bus.register(other.clone(), BusRangeRegistration::new(range(0x10F0, 0x100)));

    match result {
        Err(EmulatorError::RegistrationConflict {
            peripheral,
            existing,
            ..
        }) => {
            assert_eq!(peripheral, "rom");
            assert_eq!(existing, "ram");
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    assert!(!bus.is_registered(&other));
    assert_eq!(bus.peripherals().len(), 1);
}

#[test]
fn test_adjacent_registrations() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x1000, 0x100);
    add_registers(&bus, 0x1100, RegisterFile::new("uart", 0x10, TransferType::Byte));

    assert_eq!(bus.what_is_at(0x10FF).unwrap().name, "ram");
    assert_eq!(bus.what_is_at(0x1100).unwrap().name, "uart");
    assert!(bus.what_is_at(0x1110).is_none());
}

#[test]
fn test_register_at_uses_peripheral_size() {
    let bus = SystemBus::new();
    let (regs, _) = shared(RegisterFile::new("timer", 0x20, TransferType::DoubleWord));

    bus.register_at(regs.clone(), BusPointRegistration::new(0x4000_0000))
        .unwrap();

    let points = bus.registration_points(&regs);
    assert_eq!(points, vec![BusRangeRegistration::new(range(0x4000_0000, 0x20))]);
}

#[test]
fn test_register_at_without_size() {
    let bus = SystemBus::new();
    let (silencer, _) = shared(Silencer);

    let result = bus.register_at(silencer, BusPointRegistration::new(0));
    assert!(matches!(result, Err(EmulatorError::UnknownSize(name)) if name == "silencer"));
}

#[test]
fn test_registration_offset() {
    let bus = SystemBus::new();
    let (regs, device) = shared(RegisterFile::new("bank", 0x20, TransferType::DoubleWord));
    bus.register(
        regs,
        BusRangeRegistration::with_offset(range(0x5000, 0x10), 0x10),
    )
    .unwrap();

    bus.write_double_word(0x5004, 0x1234_5678);

    // Bus address 0x5004 is local offset 0x14
    assert_eq!(&device.lock().unwrap().bytes[0x14..0x18], &[0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn test_same_peripheral_at_two_ranges() {
    let bus = SystemBus::new();
    let (ram, _) = shared(MappedMemory::new("shared", 0x100));
    bus.register(ram.clone(), BusRangeRegistration::new(range(0x0, 0x100)))
        .unwrap();
    bus.register(ram.clone(), BusRangeRegistration::new(range(0x1000, 0x100)))
        .unwrap();

    bus.write_word(0x0042, 0xABCD);

    assert_eq!(bus.read_word(0x1042), 0xABCD);
    assert_eq!(bus.registration_points(&ram).len(), 2);

    bus.unregister(&ram).unwrap();
    assert!(bus.peripherals().is_empty());
    assert!(matches!(bus.unregister(&ram), Err(EmulatorError::NotRegistered(_))));
}

#[test]
fn test_unregister_from_address() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x1000, 0x100);
    add_ram(&bus, 0x2000, 0x100);

    bus.unregister_from_address(0x1080).unwrap();

    assert!(bus.what_is_at(0x1000).is_none());
    assert!(bus.what_is_at(0x2000).is_some());
    assert!(matches!(
        bus.unregister_from_address(0x1080),
        Err(EmulatorError::NoPeripheralAt { address: 0x1080 })
    ));
}

#[test]
fn test_unmapped_access_is_lenient() {
    let bus = SystemBus::new();

    bus.write_double_word(0xDEAD_0000, 0xFFFF_FFFF);

    assert_eq!(bus.read_byte(0xDEAD_0000), 0);
    assert_eq!(bus.read_word(0xDEAD_0000), 0);
    assert_eq!(bus.read_double_word(0xDEAD_0000), 0);
    assert_eq!(bus.unexpected_reads(), 3);
    assert_eq!(bus.unexpected_writes(), 1);
}

#[test]
fn test_lookup_large_and_unaligned_blocks() {
    let bus = SystemBus::new();
    // Larger than the paging threshold
    add_ram(&bus, 0x10_0000, 0x10_0000);
    // Not page aligned
    add_registers(&bus, 0x2_0010, RegisterFile::new("odd", 0x30, TransferType::Byte));
    // Page aligned, one full page and a partial tail
    add_registers(&bus, 0x3_0000, RegisterFile::new("tail", 0xC00, TransferType::Byte));

    assert_eq!(bus.what_is_at(0x1F_FFFF).unwrap().name, "ram");
    assert!(bus.what_is_at(0x20_0000).is_none());
    assert_eq!(bus.what_is_at(0x2_0010).unwrap().name, "odd");
    assert!(bus.what_is_at(0x2_000F).is_none());
    assert!(bus.what_is_at(0x2_0040).is_none());
    assert_eq!(bus.what_is_at(0x3_07FF).unwrap().name, "tail");
    assert_eq!(bus.what_is_at(0x3_0BFF).unwrap().name, "tail");
    assert!(bus.what_is_at(0x3_0C00).is_none());
}

#[test]
fn test_lookup_after_unregister_reindexes() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x0, 0x800);
    add_ram(&bus, 0x800, 0x800);

    bus.unregister_from_address(0x0).unwrap();

    assert!(bus.what_is_at(0x10).is_none());
    assert_eq!(bus.what_is_at(0x810).unwrap().registration.range.start(), 0x800);
}

#[test]
fn test_find_memory() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x0, 0x100);
    add_registers(&bus, 0x100, RegisterFile::new("uart", 0x10, TransferType::Byte));

    assert!(bus.find_memory(0x80).is_some());
    assert!(bus.find_memory(0x100).is_none());
    assert!(bus.what_is_at(0x100).is_some());
    assert!(bus.what_peripheral_is_at(0x100).is_some());
}

#[test]
fn test_peripherals_in_address_order() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x3000, 0x10);
    add_ram(&bus, 0x1000, 0x10);
    add_ram(&bus, 0x2000, 0x10);

    let starts: Vec<u64> = bus
        .peripherals()
        .iter()
        .map(|r| r.registration.range.start())
        .collect();
    assert_eq!(starts, vec![0x1000, 0x2000, 0x3000]);
}

#[test]
fn test_reset_once_per_peripheral() {
    let bus = SystemBus::new();
    let (regs, device) = shared(RegisterFile::new("dup", 0x10, TransferType::Byte));
    bus.register(regs.clone(), BusRangeRegistration::new(range(0x0, 0x10)))
        .unwrap();
    bus.register(regs, BusRangeRegistration::new(range(0x100, 0x10)))
        .unwrap();
    bus.write_byte(0x0, 0x42);
    bus.read_byte(0x9999);

    bus.reset();

    let device = device.lock().unwrap();
    assert_eq!(device.resets, 1);
    assert_eq!(device.bytes[0], 0);
    assert_eq!(bus.unexpected_reads(), 0);
}

#[test]
fn test_clear() {
    let bus = SystemBus::new();
    add_ram(&bus, 0x0, 0x100);
    bus.tag(range(0x1000, 0x10), "gpio", 0).unwrap();

    bus.clear();

    assert!(bus.peripherals().is_empty());
    assert!(bus.tags().is_empty());
}
