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

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use sysbus::core::config::{parse_number, BusConfig};
use sysbus::core::dma::{DmaEngine, Place, Request, TransferType};
use sysbus::core::error::{EmulatorError, Result};
use sysbus::core::memory::SystemBus;

/// System bus inspector
#[derive(Parser)]
#[command(name = "sysbus")]
#[command(about = "Build a bus from a machine description and poke at it", long_about = None)]
struct Args {
    /// Machine description (TOML). Falls back to $SYSBUS_CONFIG
    #[arg(short = 'c', long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the registration table and tags
    Map,

    /// Read one value
    Peek {
        #[arg(value_parser = parse_number)]
        address: u64,

        #[arg(short = 'w', long, value_enum, default_value_t = Width::Dword)]
        width: Width,
    },

    /// Write one value and read it back
    Poke {
        #[arg(value_parser = parse_number)]
        address: u64,

        #[arg(value_parser = parse_number)]
        value: u64,

        #[arg(short = 'w', long, value_enum, default_value_t = Width::Dword)]
        width: Width,
    },

    /// Copy a block with the DMA engine and dump the destination
    Copy {
        #[arg(value_parser = parse_number)]
        from: u64,

        #[arg(value_parser = parse_number)]
        to: u64,

        #[arg(value_parser = parse_number)]
        size: u64,

        #[arg(long, value_enum, default_value_t = Width::Byte)]
        read_width: Width,

        #[arg(long, value_enum, default_value_t = Width::Byte)]
        write_width: Width,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Width {
    Byte,
    Word,
    Dword,
}

impl From<Width> for TransferType {
    fn from(width: Width) -> Self {
        match width {
            Width::Byte => TransferType::Byte,
            Width::Word => TransferType::Word,
            Width::Dword => TransferType::DoubleWord,
        }
    }
}

fn peek(bus: &SystemBus, address: u64, width: Width) -> u64 {
    match width {
        Width::Byte => bus.read_byte(address) as u64,
        Width::Word => bus.read_word(address) as u64,
        Width::Dword => bus.read_double_word(address) as u64,
    }
}

fn poke(bus: &SystemBus, address: u64, value: u64, width: Width) {
    match width {
        Width::Byte => bus.write_byte(address, value as u8),
        Width::Word => bus.write_word(address, value as u16),
        Width::Dword => bus.write_double_word(address, value as u32),
    }
}

fn print_map(bus: &SystemBus) {
    println!("{:<24} {:<28} {:<8} OFFSET", "PERIPHERAL", "RANGE", "MEMORY");
    for registered in bus.peripherals() {
        println!(
            "{:<24} {:<28} {:<8} 0x{:X}",
            registered.name,
            registered.registration.range.to_string(),
            if registered.is_memory { "yes" } else { "no" },
            registered.registration.offset
        );
    }
    for tag in bus.tags() {
        println!(
            "{:<24} {:<28} default 0x{:X}",
            format!("tag '{}'", tag.name),
            tag.range.to_string(),
            tag.default_value
        );
    }
}

fn hex_dump(address: u64, bytes: &[u8]) {
    for (i, line) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
        println!("0x{:08X}: {}", address + (i * 16) as u64, hex.join(" "));
    }
}

fn main() -> Result<()> {
    // Initialize logger with default level INFO, RUST_LOG overrides it
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("sysbus v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading machine description from: {}", path);
            BusConfig::load(path)
        }
        None => BusConfig::from_env(),
    }
    .map_err(|e| {
        error!("Failed to load machine description: {}", e);
        EmulatorError::Config(e)
    })?;

    let bus = Arc::new(config.build()?);

    match args.command {
        Command::Map => print_map(&bus),
        Command::Peek { address, width } => {
            println!("0x{:08X}: 0x{:X}", address, peek(&bus, address, width));
        }
        Command::Poke {
            address,
            value,
            width,
        } => {
            poke(&bus, address, value, width);
            println!("0x{:08X}: 0x{:X}", address, peek(&bus, address, width));
        }
        Command::Copy {
            from,
            to,
            size,
            read_width,
            write_width,
        } => {
            let size = usize::try_from(size).map_err(|_| EmulatorError::InvalidRange {
                start: from,
                size,
            })?;
            let dma = DmaEngine::new(bus.clone());
            let request = Request::new(
                Place::address(from),
                Place::address(to),
                size,
                read_width.into(),
                write_width.into(),
            );
            if let Err(e) = dma.issue_copy(request) {
                error!("DMA copy failed: {}", e);
                return Err(e.into());
            }
            info!("Copied {} bytes from 0x{:X} to 0x{:X}", size, from, to);

            let mut dump = vec![0u8; size];
            bus.read_bytes(to, &mut dump);
            hex_dump(to, &dump);
        }
    }

    if bus.unexpected_reads() + bus.unexpected_writes() > 0 {
        info!(
            "Unhandled accesses: {} reads, {} writes",
            bus.unexpected_reads(),
            bus.unexpected_writes()
        );
    }

    Ok(())
}
