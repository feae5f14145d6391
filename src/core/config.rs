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

//! Machine description
//!
//! A TOML file describing the memory layout of a bus:
//!
//! ```toml
//! endianness = "little"
//! unhandled_access = "report-if-not-tagged"
//!
//! [[memory]]
//! name = "sram"
//! start = "0x2000_0000"
//! size = 0x10000
//!
//! [[tag]]
//! name = "RCC"
//! start = 0x4002_1000
//! size = 0x400
//! default = 0xFFFF_FFFF
//!
//! [[silence]]
//! start = 0xE000_E000
//! size = 0x1000
//! ```
//!
//! Addresses and sizes accept TOML integers or strings in hex (`0x`) or
//! decimal, with optional `_` separators.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::core::error::{ConfigError, Result};
use crate::core::memory::{
    BusRangeRegistration, Endianness, MappedMemory, Range, SystemBus, UnhandledAccessBehaviour,
};

/// Environment variable naming the description file
pub const CONFIG_ENV_VAR: &str = "SYSBUS_CONFIG";

/// Memory region backed by a [`MappedMemory`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryRegionConfig {
    pub name: String,
    #[serde(deserialize_with = "number")]
    pub start: u64,
    #[serde(deserialize_with = "number")]
    pub size: u64,
}

/// Named unmapped range
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagConfig {
    pub name: String,
    #[serde(deserialize_with = "number")]
    pub start: u64,
    #[serde(deserialize_with = "number")]
    pub size: u64,
    #[serde(default, deserialize_with = "number")]
    pub default: u64,
}

/// Range whose accesses are absorbed silently
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SilenceConfig {
    #[serde(deserialize_with = "number")]
    pub start: u64,
    #[serde(deserialize_with = "number")]
    pub size: u64,
}

/// Bus description
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    pub endianness: Endianness,
    pub unhandled_access: UnhandledAccessBehaviour,
    pub memory: Vec<MemoryRegionConfig>,
    pub tag: Vec<TagConfig>,
    pub silence: Vec<SilenceConfig>,
}

impl BusConfig {
    /// Parse a description from TOML text
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a description file
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        log::debug!("Loading bus description from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Load the file named by `SYSBUS_CONFIG`
    ///
    /// A `.env` file in the working directory is read first. Returns the
    /// default (empty) description when the variable is not set.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to load .env file: {}", e);
            }
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Create a bus populated with the described regions
    ///
    /// # Errors
    ///
    /// Zero-sized or overflowing regions are reported as
    /// `ConfigError::InvalidRegion`; overlapping regions fail registration.
    pub fn build(&self) -> Result<SystemBus> {
        let bus = SystemBus::with_endianness(self.endianness);
        bus.set_unhandled_access_behaviour(self.unhandled_access);

        for region in &self.memory {
            let range = region_range(&region.name, region.start, region.size)?;
            let size = usize::try_from(region.size).map_err(|_| ConfigError::InvalidRegion {
                name: region.name.clone(),
                reason: format!("size 0x{:X} does not fit in host memory", region.size),
            })?;
            let memory = Arc::new(Mutex::new(MappedMemory::new(region.name.clone(), size)));
            bus.register(memory, BusRangeRegistration::new(range))?;
        }

        for tag in &self.tag {
            let range = region_range(&tag.name, tag.start, tag.size)?;
            let default = u32::try_from(tag.default).map_err(|_| ConfigError::InvalidRegion {
                name: tag.name.clone(),
                reason: format!("default value 0x{:X} is wider than 32 bits", tag.default),
            })?;
            bus.tag(range, &tag.name, default)?;
        }

        for silence in &self.silence {
            let range = region_range("silence", silence.start, silence.size)?;
            bus.silence_range(range)?;
        }

        log::info!(
            "Bus built: {} memory regions, {} tags, {} silenced ranges",
            self.memory.len(),
            self.tag.len(),
            self.silence.len()
        );
        Ok(bus)
    }
}

fn region_range(name: &str, start: u64, size: u64) -> std::result::Result<Range, ConfigError> {
    Range::new(start, size).map_err(|_| ConfigError::InvalidRegion {
        name: name.to_string(),
        reason: format!("start 0x{:X} size 0x{:X} is not a valid range", start, size),
    })
}

/// Parse `0x`-prefixed hex or decimal, ignoring `_`
pub fn parse_number(text: &str) -> std::result::Result<u64, String> {
    let cleaned: String = text.trim().chars().filter(|&c| c != '_').collect();
    let parsed = match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", text, e))
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    struct NumberVisitor;

    impl de::Visitor<'_> for NumberVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a hex/decimal string")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<u64, E> {
            u64::try_from(value).map_err(|_| E::custom(format!("negative number {}", value)))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<u64, E> {
            Ok(value)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<u64, E> {
            parse_number(value).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(NumberVisitor)
}
