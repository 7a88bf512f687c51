//! riotee-probe - Programmer for the Riotee Probe and Riotee Board
//!
//! Programs Intel hex firmware into either MCU of a Riotee module and
//! drives the probe's auxiliary functions (target power, GPIOs and the
//! current measurement bypass).
//!
//! # Architecture
//!
//! The probe speaks CMSIS-DAP v2 over USB. The MSP430 is reached through
//! vendor commands carrying Spy-Bi-Wire word frames; the nRF52 through the
//! standard SWD commands, driven by probe-rs. Both sit behind the `Target`
//! trait so the same commands work for either device.

mod cli;
mod commands;
mod config;
mod probes;

use clap::Parser;
use cli::{Cli, Commands, Device, Direction, GpioCommands, Level};
use commands::program::ProgramArgs;
use commands::target::Action;
use config::Config;
use riotee_core::probe::GpioDir;
use riotee_core::target::TargetKind;

impl From<Device> for TargetKind {
    fn from(device: Device) -> Self {
        match device {
            Device::Msp430 => TargetKind::Msp430,
            Device::Nrf52 => TargetKind::Nrf52,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = Config::load(cli.config.as_deref())?;

    let probe = cli
        .probe
        .clone()
        .or_else(|| config.probe.clone())
        .unwrap_or_else(|| probes::DEFAULT_PROBE.to_string());
    let swd_clock_khz = config.swd_clock_khz;
    let device = |d: Option<Device>| -> TargetKind {
        d.map(TargetKind::from)
            .or(config.device)
            .unwrap_or_default()
    };

    match cli.command {
        Commands::Program {
            firmware,
            device: d,
            no_verify,
            resume_on_fault,
        } => {
            // Parse before touching the target so a bad file never halts it
            let image = commands::program::load_image(&firmware)?;
            let args = ProgramArgs {
                verify: !no_verify && config.verify.unwrap_or(true),
                resume_on_fault,
            };
            probes::with_target(&probe, device(d), swd_clock_khz, |target| {
                commands::program::run_program(target, &image, args)
            })
        }
        Commands::Reset { device: d } => {
            probes::with_target(&probe, device(d), swd_clock_khz, |target| {
                commands::target::run_control(target, Action::Reset)
            })
        }
        Commands::Halt { device: d } => {
            probes::with_target(&probe, device(d), swd_clock_khz, |target| {
                commands::target::run_control(target, Action::Halt)
            })
        }
        Commands::Resume { device: d } => {
            probes::with_target(&probe, device(d), swd_clock_khz, |target| {
                commands::target::run_control(target, Action::Resume)
            })
        }
        Commands::Power { state } => probes::with_probe(&probe, |link, variant| {
            commands::probe::run_power(link, variant, state.is_on())
        }),
        Commands::Bypass { state } => probes::with_probe(&probe, |link, variant| {
            commands::probe::run_bypass(link, variant, state.is_on())
        }),
        Commands::Gpio(subcmd) => probes::with_probe(&probe, |link, variant| match subcmd {
            GpioCommands::Set { pin, level } => {
                commands::probe::run_gpio_set(link, variant, pin, level == Level::High)
            }
            GpioCommands::Get { pin } => commands::probe::run_gpio_get(link, variant, pin),
            GpioCommands::Dir { pin, direction } => {
                let dir = match direction {
                    Direction::In => GpioDir::In,
                    Direction::Out => GpioDir::Out,
                };
                commands::probe::run_gpio_dir(link, variant, pin, dir)
            }
        }),
        Commands::Version => probes::with_probe(&probe, commands::probe::run_version),
        Commands::List => commands::list_probes(),
    }
}
