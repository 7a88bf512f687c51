//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u8
fn parse_pin(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "riotee-probe")]
#[command(author, version, about = "Riotee probe programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Probe to use, e.g. "usb", "usb:serial=E6603", "dummy:variant=board"
    #[arg(short, long, global = true)]
    pub probe: Option<String>,

    /// Configuration file (defaults to ./riotee-probe.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Target device family
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    /// MSP430 over Spy-Bi-Wire
    Msp430,
    /// nRF52 over SWD
    Nrf52,
}

/// On/off switch argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

/// Output level for `gpio set`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

/// Pin direction for `gpio dir`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Program a hex file into the target
    Program {
        /// Intel hex firmware file
        #[arg(short, long)]
        firmware: PathBuf,

        /// Target device (default: nrf52, or the config file's `device`)
        #[arg(short, long, value_enum)]
        device: Option<Device>,

        /// Skip read-back verification
        #[arg(long)]
        no_verify: bool,

        /// Resume the target even if programming fails
        #[arg(long)]
        resume_on_fault: bool,
    },

    /// Reset the target
    Reset {
        /// Target device
        #[arg(short, long, value_enum)]
        device: Option<Device>,
    },

    /// Halt the target
    Halt {
        /// Target device
        #[arg(short, long, value_enum)]
        device: Option<Device>,
    },

    /// Resume the target
    Resume {
        /// Target device
        #[arg(short, long, value_enum)]
        device: Option<Device>,
    },

    /// Switch target power
    Power {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Switch the current measurement bypass (Riotee Board only)
    Bypass {
        #[arg(value_enum)]
        state: Switch,
    },

    /// GPIO operations (Riotee Probe only)
    #[command(subcommand)]
    Gpio(GpioCommands),

    /// Show the probe firmware version
    Version,

    /// List connected probes
    List,
}

/// GPIO subcommands
#[derive(Subcommand)]
pub enum GpioCommands {
    /// Drive a pin as output
    Set {
        #[arg(value_parser = parse_pin)]
        pin: u8,
        #[arg(value_enum)]
        level: Level,
    },

    /// Read a pin
    Get {
        #[arg(value_parser = parse_pin)]
        pin: u8,
    },

    /// Configure a pin direction
    Dir {
        #[arg(value_parser = parse_pin)]
        pin: u8,
        #[arg(value_enum)]
        direction: Direction,
    },
}
