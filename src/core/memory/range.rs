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

//! Address ranges and registration points
//!
//! A [`Range`] is the half-open interval `[start, start + size)` of the bus
//! address space. Ranges are never empty: the constructor rejects a zero size
//! and any range whose last address would not fit in 64 bits.

use std::fmt;

use crate::core::error::{EmulatorError, Result};

/// Non-empty address range `[start, start + size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: u64,
    size: u64,
}

impl Range {
    /// Create a range starting at `start` spanning `size` bytes
    ///
    /// # Errors
    ///
    /// Returns `EmulatorError::InvalidRange` if `size` is zero or the range
    /// would wrap around the end of the address space.
    ///
    /// # Example
    ///
    /// ```
    /// use sysbus::core::memory::Range;
    ///
    /// let range = Range::new(0x1000, 0x100).unwrap();
    /// assert!(range.contains(0x10FF));
    /// assert!(!range.contains(0x1100));
    /// assert!(Range::new(0x1000, 0).is_err());
    /// ```
    pub fn new(start: u64, size: u64) -> Result<Self> {
        if size == 0 || start.checked_add(size - 1).is_none() {
            return Err(EmulatorError::InvalidRange { start, size });
        }
        Ok(Self { start, size })
    }

    /// Create a range from inclusive bounds
    pub fn from_bounds(start: u64, end_inclusive: u64) -> Result<Self> {
        if end_inclusive < start {
            return Err(EmulatorError::InvalidRange { start, size: 0 });
        }
        match (end_inclusive - start).checked_add(1) {
            Some(size) => Self::new(start, size),
            None => Err(EmulatorError::InvalidRange { start, size: 0 }),
        }
    }

    /// First address of the range
    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last address of the range (inclusive)
    #[inline(always)]
    pub fn end(&self) -> u64 {
        self.start + (self.size - 1)
    }

    /// Number of addresses covered
    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline(always)]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address - self.start < self.size
    }

    /// Check whether `other` lies entirely inside this range
    pub fn contains_range(&self, other: &Range) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Intersection of two ranges, `None` if they are disjoint
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        if start > end {
            return None;
        }
        Some(Range {
            start,
            size: end - start + 1,
        })
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.intersect(other).is_some()
    }

    /// Move the range by a signed displacement
    pub fn shift_by(&self, shift: i64) -> Result<Range> {
        let start = self
            .start
            .checked_add_signed(shift)
            .ok_or(EmulatorError::InvalidRange {
                start: self.start,
                size: self.size,
            })?;
        Range::new(start, self.size)
    }

    /// Same size, starting at zero
    pub fn move_to_zero(&self) -> Range {
        Range {
            start: 0,
            size: self.size,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0x{:08X}, 0x{:08X}>", self.start, self.end())
    }
}

/// Registration of a peripheral over an explicit range
///
/// `offset` is added to every peripheral-local offset, so a peripheral can be
/// mapped as a window into its own register space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusRangeRegistration {
    pub range: Range,
    pub offset: u64,
}

impl BusRangeRegistration {
    pub fn new(range: Range) -> Self {
        Self { range, offset: 0 }
    }

    pub fn with_offset(range: Range, offset: u64) -> Self {
        Self { range, offset }
    }
}

impl fmt::Display for BusRangeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset == 0 {
            write!(f, "{}", self.range)
        } else {
            write!(f, "{} with offset 0x{:X}", self.range, self.offset)
        }
    }
}

/// Registration of a sized peripheral at a single starting address
///
/// The range is derived from the peripheral's own size at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPointRegistration {
    pub address: u64,
    pub offset: u64,
}

impl BusPointRegistration {
    pub fn new(address: u64) -> Self {
        Self { address, offset: 0 }
    }
}
