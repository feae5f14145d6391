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

//! Core bus components
//!
//! This module contains the address-space and transfer machinery:
//! - Memory bus (address decoding, width translation, hooks)
//! - DMA engine (block copies between buffers and bus addresses)
//! - Machine description loading
//! - Error types

pub mod config;
pub mod dma;
pub mod error;
pub mod memory;

// Re-export commonly used types
pub use config::BusConfig;
pub use dma::{DmaEngine, Place, Request, TransferType};
pub use error::{ConfigError, DmaError, EmulatorError, Result};
pub use memory::{MappedMemory, Range, SystemBus};
