//! riotee-nrf52 - nRF52 target for Riotee probes
//!
//! The nRF52 on a Riotee module is reached over SWD through the probe's
//! standard CMSIS-DAP commands. probe-rs does the debug-port work and
//! flashing; [`Nrf52`] puts it behind the `Target` trait of `riotee-core`
//! so the CLI treats both MCUs the same way.
//!
//! # Example
//!
//! ```no_run
//! use riotee_core::image::HexImage;
//! use riotee_core::target::Target;
//! use riotee_nrf52::{Nrf52, Nrf52Config};
//!
//! let text = std::fs::read_to_string("firmware.hex")?;
//! let image = HexImage::from_hex_str(&text)?;
//! let mut nrf = Nrf52::open(&Nrf52Config::default())?;
//! nrf.program(&image, true, &mut |p| println!("{}", p))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod session;
mod target;

pub use error::{Nrf52Error, Result};
pub use session::{riotee_variant, DebugSession, Nrf52Config, ProbeRsSession, DEFAULT_CHIP};
pub use target::Nrf52;
