// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Address-to-registration lookup
//!
//! Every block lives in a vector sorted by start address, searched by binary
//! search. Blocks that start on a page boundary and span at most
//! [`NUM_OF_PAGES_THRESHOLD`] pages are also indexed per page, which turns the
//! common case of a small register bank into a single hash lookup.
//!
//! ```text
//!   page index (2 KiB pages)        sorted blocks
//!   ┌──────────┬────────┐          ┌───┬───┬───┬───┐
//!   │ 0x1F8010 │ idx 2  │ ───────► │ 0 │ 1 │ 2 │ 3 │
//!   └──────────┴────────┘          └───┴───┴───┴───┘
//! ```
//!
//! Only pages fully covered by a block are indexed; the tail page of a block
//! whose size is not a multiple of the page size is found by binary search.

use std::collections::HashMap;
use std::sync::Arc;

use super::access::{AccessMethods, BusRegistered};
use super::peripheral::{same_peripheral, SharedPeripheral};
use super::range::Range;
use super::wrappers::RegisterMapper;

pub const PAGE_SIZE: u64 = 1 << 11;
pub const PAGE_ALIGN: u64 = PAGE_SIZE - 1;
pub const NUM_OF_PAGES_THRESHOLD: u64 = 4;

/// One registration with its access methods
pub struct Block {
    pub range: Range,
    pub registered: BusRegistered,
    /// Methods resolved at registration time
    pristine: AccessMethods,
    /// Pristine methods plus installed hooks
    hooked: AccessMethods,
    logging: Option<RegisterMapper>,
    /// Table used for dispatch
    methods: Arc<AccessMethods>,
}

impl Block {
    pub fn new(registered: BusRegistered, methods: AccessMethods) -> Self {
        Self {
            range: registered.registration.range,
            registered,
            pristine: methods.clone(),
            hooked: methods.clone(),
            logging: None,
            methods: Arc::new(methods),
        }
    }

    #[inline(always)]
    pub fn methods(&self) -> &Arc<AccessMethods> {
        &self.methods
    }

    pub fn is_logging(&self) -> bool {
        self.logging.is_some()
    }

    /// Change the hooked table; `update` also sees the pristine methods
    pub fn update_hooks(&mut self, update: impl FnOnce(&mut AccessMethods, &AccessMethods)) {
        update(&mut self.hooked, &self.pristine);
        self.rebuild();
    }

    pub fn clear_hooks(&mut self) {
        self.hooked = self.pristine.clone();
        self.rebuild();
    }

    pub fn set_logging(&mut self, registers: Option<RegisterMapper>) {
        self.logging = registers;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let methods = match &self.logging {
            Some(registers) => self.hooked.with_logging(&self.registered.name, registers),
            None => self.hooked.clone(),
        };
        self.methods = Arc::new(methods);
    }
}

/// Registration table of one bus
#[derive(Default)]
pub struct PeripheralCollection {
    blocks: Vec<Block>,
    pages: HashMap<u64, usize>,
}

impl PeripheralCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add a block; the caller guarantees it does not overlap another one
    pub fn add(&mut self, block: Block) {
        let index = self
            .blocks
            .partition_point(|b| b.range.start() < block.range.start());
        self.blocks.insert(index, block);
        self.reindex();
    }

    /// Remove and return every block matching `predicate`
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Block) -> bool) -> Vec<Block> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.drain(..) {
            if predicate(&block) {
                removed.push(block);
            } else {
                kept.push(block);
            }
        }
        self.blocks = kept;
        if !removed.is_empty() {
            self.reindex();
        }
        removed
    }

    pub fn remove_peripheral(&mut self, peripheral: &SharedPeripheral) -> Vec<Block> {
        self.remove_where(|b| same_peripheral(&b.registered.peripheral, peripheral))
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.pages.clear();
    }

    /// Block covering `address`
    #[inline]
    pub fn find(&self, address: u64) -> Option<&Block> {
        if let Some(&index) = self.pages.get(&(address >> PAGE_SIZE.trailing_zeros())) {
            return self.blocks.get(index);
        }
        let index = self.blocks.partition_point(|b| b.range.start() <= address);
        let block = self.blocks.get(index.checked_sub(1)?)?;
        block.range.contains(address).then_some(block)
    }

    /// First block intersecting `range`
    pub fn find_overlapping(&self, range: &Range) -> Option<&Block> {
        let index = self.blocks.partition_point(|b| b.range.end() < range.start());
        self.blocks
            .get(index)
            .filter(|b| b.range.intersects(range))
    }

    /// Blocks intersecting `range`, in address order
    pub fn blocks_in(&self, range: &Range) -> impl Iterator<Item = &Block> {
        let index = self.blocks.partition_point(|b| b.range.end() < range.start());
        let range = *range;
        self.blocks[index..]
            .iter()
            .take_while(move |b| b.range.start() <= range.end())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.iter_mut()
    }

    /// Blocks belonging to `peripheral`
    pub fn blocks_of<'a>(
        &'a mut self,
        peripheral: &'a SharedPeripheral,
    ) -> impl Iterator<Item = &'a mut Block> + 'a {
        self.blocks
            .iter_mut()
            .filter(move |b| same_peripheral(&b.registered.peripheral, peripheral))
    }

    fn reindex(&mut self) {
        self.pages.clear();
        for (index, block) in self.blocks.iter().enumerate() {
            let start = block.range.start();
            if start & PAGE_ALIGN != 0 {
                continue;
            }
            let full_pages = block.range.size() / PAGE_SIZE;
            let total_pages = block.range.size().div_ceil(PAGE_SIZE);
            if total_pages > NUM_OF_PAGES_THRESHOLD {
                continue;
            }
            let first_page = start >> PAGE_SIZE.trailing_zeros();
            for page in first_page..first_page + full_pages {
                self.pages.insert(page, index);
            }
        }
        log::trace!(
            "Peripheral collection reindexed: {} blocks, {} paged",
            self.blocks.len(),
            self.pages.len()
        );
    }
}
