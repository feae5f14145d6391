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

//! System bus and DMA core for a full-machine emulator
//!
//! This library provides the address-space router that sits between CPUs,
//! DMA controllers and peripheral models: address decoding, width translation
//! between byte/word/double-word accesses, access hooks, and a DMA engine
//! that moves blocks between raw buffers and bus addresses.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use sysbus::core::dma::{DmaEngine, Place, Request, TransferType};
//! use sysbus::core::memory::{BusRangeRegistration, MappedMemory, Range, SystemBus};
//!
//! let bus = Arc::new(SystemBus::new());
//! let ram = Arc::new(Mutex::new(MappedMemory::new("ram", 0x1000)));
//! bus.register(ram, BusRangeRegistration::new(Range::new(0x8000_0000, 0x1000).unwrap()))
//!     .unwrap();
//!
//! bus.write_double_word(0x8000_0000, 0x1234_5678);
//! assert_eq!(bus.read_word(0x8000_0002), 0x1234);
//!
//! let dma = DmaEngine::new(bus.clone());
//! let request = Request::new(
//!     Place::address(0x8000_0000),
//!     Place::address(0x8000_0100),
//!     4,
//!     TransferType::DoubleWord,
//!     TransferType::DoubleWord,
//! );
//! dma.issue_copy(request).unwrap();
//! assert_eq!(bus.read_double_word(0x8000_0100), 0x1234_5678);
//! ```

pub mod core;
