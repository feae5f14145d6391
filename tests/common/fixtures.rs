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

//! Test fixtures for common bus scenarios

use std::sync::{Arc, Mutex};

use sysbus::core::config::BusConfig;
use sysbus::core::memory::{
    AllowedTranslation, BusPeripheral, BusRangeRegistration, BytePeripheral, Range,
    RegisterMapper, SharedPeripheral, SystemBus,
};

/// Microcontroller-like layout: flash, SRAM, a tagged clock controller and a
/// silenced debug block
pub const MACHINE: &str = r#"
    endianness = "little"
    unhandled_access = "report-if-not-tagged"

    [[memory]]
    name = "flash"
    start = 0x0800_0000
    size = 0x4000

    [[memory]]
    name = "sram"
    start = "0x2000_0000"
    size = "0x2000"

    [[tag]]
    name = "RCC"
    start = 0x4002_1000
    size = 0x400
    default = 0x0000_0083

    [[silence]]
    start = 0xE000_E000
    size = 0x1000
"#;

pub const UART_BASE: u64 = 0x4001_3800;

/// Byte-wide serial port: writes to DATA are transmitted, STATUS always
/// reports "transmit empty"
#[derive(Default)]
pub struct Uart {
    pub transmitted: Vec<u8>,
    pub control: u8,
}

impl Uart {
    pub const STATUS: u64 = 0x0;
    pub const DATA: u64 = 0x4;
    pub const CONTROL: u64 = 0xC;
}

impl BytePeripheral for Uart {
    fn read_byte(&mut self, offset: u64) -> u8 {
        match offset {
            Self::STATUS => 0x80,
            Self::CONTROL => self.control,
            _ => 0,
        }
    }

    fn write_byte(&mut self, offset: u64, value: u8) {
        match offset {
            Self::DATA => self.transmitted.push(value),
            Self::CONTROL => self.control = value,
            _ => {}
        }
    }
}

impl BusPeripheral for Uart {
    fn name(&self) -> &str {
        "usart1"
    }

    fn reset(&mut self) {
        self.transmitted.clear();
        self.control = 0;
    }

    fn allowed_translations(&self) -> AllowedTranslation {
        AllowedTranslation::WORD_TO_BYTE | AllowedTranslation::DOUBLE_WORD_TO_BYTE
    }

    fn size(&self) -> Option<u64> {
        Some(0x400)
    }

    fn register_map(&self) -> RegisterMapper {
        RegisterMapper::new()
            .with(Self::STATUS, "SR")
            .with(Self::DATA, "DR")
            .with(Self::CONTROL, "CR")
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        Some(self)
    }
}

/// Bus built from [`MACHINE`]
#[allow(dead_code)]
pub fn create_machine() -> SystemBus {
    BusConfig::from_toml_str(MACHINE)
        .expect("Failed to parse machine description")
        .build()
        .expect("Failed to build bus")
}

/// Bus built from [`MACHINE`] with a UART at [`UART_BASE`]
#[allow(dead_code)]
pub fn create_machine_with_uart() -> (Arc<SystemBus>, SharedPeripheral, Arc<Mutex<Uart>>) {
    let bus = create_machine();
    let uart = Arc::new(Mutex::new(Uart::default()));
    let shared: SharedPeripheral = uart.clone();
    bus.register(
        shared.clone(),
        BusRangeRegistration::new(Range::new(UART_BASE, 0x400).expect("Invalid UART range")),
    )
    .expect("Failed to register UART");
    (Arc::new(bus), shared, uart)
}

/// Write a program image at `address`
#[allow(dead_code)]
pub fn load_image(bus: &SystemBus, address: u64, words: &[u32]) {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    bus.write_memory(address, &bytes)
        .expect("Failed to load image");
}
