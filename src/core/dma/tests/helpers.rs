// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Bus fixtures for DMA tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::super::*;
use crate::core::memory::{
    BusPeripheral, BusRangeRegistration, BytePeripheral, DoubleWordPeripheral, MappedMemory,
    Range, SharedPeripheral,
};

/// Double-word data register: reads pop a receive queue, writes append to a
/// transmit log
#[derive(Default)]
pub struct Fifo {
    pub rx: VecDeque<u32>,
    pub tx: Vec<u32>,
}

impl DoubleWordPeripheral for Fifo {
    fn read_double_word(&mut self, _offset: u64) -> u32 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn write_double_word(&mut self, _offset: u64, value: u32) {
        self.tx.push(value);
    }
}

impl BusPeripheral for Fifo {
    fn name(&self) -> &str {
        "fifo"
    }

    fn as_double_word(&mut self) -> Option<&mut dyn DoubleWordPeripheral> {
        Some(self)
    }
}

/// Byte register bank recording every write
pub struct ByteBank {
    pub bytes: Vec<u8>,
    pub writes: Vec<(u64, u8)>,
}

impl ByteBank {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            writes: Vec::new(),
        }
    }
}

impl BytePeripheral for ByteBank {
    fn read_byte(&mut self, offset: u64) -> u8 {
        self.bytes.get(offset as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, offset: u64, value: u8) {
        self.writes.push((offset, value));
        if let Some(byte) = self.bytes.get_mut(offset as usize) {
            *byte = value;
        }
    }
}

impl BusPeripheral for ByteBank {
    fn name(&self) -> &str {
        "bank"
    }

    fn as_byte(&mut self) -> Option<&mut dyn BytePeripheral> {
        Some(self)
    }
}

pub fn engine() -> DmaEngine {
    DmaEngine::new(Arc::new(SystemBus::new()))
}

pub fn attach<P: BusPeripheral + 'static>(dma: &DmaEngine, start: u64, size: u64, device: P) -> Arc<Mutex<P>> {
    let typed = Arc::new(Mutex::new(device));
    let shared: SharedPeripheral = typed.clone();
    dma.bus()
        .register(shared, BusRangeRegistration::new(Range::new(start, size).unwrap()))
        .unwrap();
    typed
}

/// RAM of `contents.len()` bytes at `start`, pre-filled
pub fn ram(dma: &DmaEngine, start: u64, contents: Vec<u8>) -> Arc<Mutex<MappedMemory>> {
    let size = contents.len() as u64;
    attach(dma, start, size, MappedMemory::with_contents("ram", contents))
}
