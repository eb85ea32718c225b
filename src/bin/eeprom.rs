//! EEPROM simulator CLI
//!
//! One invocation, one device operation. The device directory is created on
//! first use and reloaded afterwards.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eeprom_sim::{ChecksumScheme, EepromBuilder, WearState};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "eeprom")]
#[command(about = "File-backed EEPROM simulator with endurance tracking and audit log")]
struct Args {
    /// Device directory
    #[arg(short = 'd', long, default_value = ".")]
    dir: PathBuf,

    /// TOML configuration for a fresh device
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of cells (fresh devices only)
    #[arg(short = 's', long)]
    size: Option<usize>,

    /// Write cycles per cell (fresh devices only)
    #[arg(short = 'm', long)]
    max_cycles: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one byte
    Read { address: usize },
    /// Read a block of bytes
    ReadRange { start: usize, len: usize },
    /// Read a 0x00-terminated string
    ReadString { address: usize },
    /// Write one byte (decimal or 0x-prefixed hex)
    Write {
        address: usize,
        #[arg(value_parser = parse_byte)]
        value: u8,
    },
    /// Write comma-separated bytes
    WriteRange {
        start: usize,
        #[arg(value_delimiter = ',', value_parser = parse_byte, required = true)]
        values: Vec<u8>,
    },
    /// Write a string plus separator
    WriteString { address: usize, text: String },
    /// Erase one byte
    Delete { address: usize },
    /// Erase a block
    DeleteRange { start: usize, len: usize },
    /// Erase every cell
    DeleteAll,
    /// Checksum a block
    Checksum {
        start: usize,
        len: usize,
        /// sum8, xor8, fletcher16 or crc32 (defaults to the device's scheme)
        #[arg(long, value_parser = parse_scheme)]
        scheme: Option<ChecksumScheme>,
    },
    /// Hex/ASCII dump of a block
    Dump {
        #[arg(default_value_t = 0)]
        start: usize,
        #[arg(default_value_t = 64)]
        len: usize,
    },
    /// Restore the default payload (or erase everything with --blank)
    Reset {
        #[arg(long)]
        blank: bool,
    },
    /// Record a power-cycle marker
    PowerCycle,
    /// Truncate the audit log
    ResetLog,
    /// Change the default payload used by reset
    SetDefault { text: String },
    /// Print the audit log
    Log,
    /// Show write counters
    Wear { address: Option<usize> },
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| format!("'{}' is not a byte (0-255 or 0x00-0xFF)", s))
}

fn parse_scheme(s: &str) -> Result<ChecksumScheme, String> {
    ChecksumScheme::parse(s).ok_or_else(|| {
        format!(
            "Invalid checksum scheme '{}'. Valid options: sum8, xor8, fletcher16, crc32",
            s
        )
    })
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    debug!("Parsed arguments: {:?}", args);

    let mut builder = EepromBuilder::new().dir(&args.dir);
    if let Some(config) = &args.config {
        builder = builder.config_file(config);
    }
    if let Some(size) = args.size {
        builder = builder.size(size);
    }
    if let Some(max_cycles) = args.max_cycles {
        builder = builder.max_cycles(max_cycles);
    }
    let mut dev = builder
        .build()
        .with_context(|| format!("opening device in {}", args.dir.display()))?;

    match args.command {
        Command::Read { address } => {
            let value = dev.read(address)?;
            println!("{}: {} (0x{:02X})", address, value, value);
        }
        Command::ReadRange { start, len } => {
            let bytes = dev.read_range(start, len)?;
            println!("{:?}", bytes);
        }
        Command::ReadString { address } => {
            println!("{}", dev.read_string(address)?);
        }
        Command::Write { address, value } => {
            dev.write(address, value)?;
            println!(
                "Wrote 0x{:02X} at {} (write cycles: {})",
                value,
                address,
                dev.counter_at(address)?
            );
        }
        Command::WriteRange { start, values } => {
            dev.write_range(start, &values)?;
            println!("Wrote {} bytes at {}", values.len(), start);
        }
        Command::WriteString { address, text } => {
            dev.write_string(address, &text)?;
            println!("Wrote '{}' at {}", text, address);
        }
        Command::Delete { address } => {
            dev.delete(address)?;
            println!("Deleted byte at {}", address);
        }
        Command::DeleteRange { start, len } => {
            dev.delete_range(start, len)?;
            println!("Deleted {} bytes from {}", len, start);
        }
        Command::DeleteAll => {
            let erased = dev.delete_all()?;
            println!("Erased {} cells", erased);
        }
        Command::Checksum { start, len, scheme } => {
            let sum = match scheme {
                Some(scheme) => dev.checksum_with(scheme, start, len)?,
                None => dev.checksum(start, len)?,
            };
            println!("Checksum of [{}-{}] = {}", start, start + len - 1, sum);
        }
        Command::Dump { start, len } => {
            let dump = dev.dump(start, len)?;
            print!("{}", dump);
            for found in dump.strings() {
                println!("Detected string at {}: '{}'", found.address, found.text);
            }
        }
        Command::Reset { blank } => {
            let report = dev.full_reset(!blank)?;
            println!("Reset {} cells", report.reset);
        }
        Command::PowerCycle => {
            dev.power_cycle()?;
            println!("Power cycle logged");
        }
        Command::ResetLog => {
            dev.reset_log()?;
            println!("Audit log reset");
        }
        Command::SetDefault { text } => {
            dev.set_default_payload(&text)?;
            println!("Default payload changed to '{}'", text);
        }
        Command::Log => {
            for entry in dev.audit_entries()? {
                println!("{}", entry);
            }
        }
        Command::Wear { address } => match address {
            Some(address) => match dev.wear_state(address)? {
                WearState::Fresh { remaining } => println!(
                    "{}: {} writes, {} remaining",
                    address,
                    dev.counter_at(address)?,
                    remaining
                ),
                WearState::Worn => println!("{}: worn ({} writes)", address, dev.max_cycles()),
            },
            None => {
                let summary = dev.wear_summary();
                println!(
                    "{} worn cells, highest counter {}, {} total writes (max {} per cell)",
                    summary.worn_cells,
                    summary.max_counter,
                    summary.total_writes,
                    dev.max_cycles()
                );
            }
        },
    }

    Ok(())
}
