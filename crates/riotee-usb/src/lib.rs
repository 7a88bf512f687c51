//! riotee-usb - USB transport for Riotee probes
//!
//! The Riotee Board and the Riotee Probe both enumerate as CMSIS-DAP v2
//! devices (VID 0x1209, PID 0xC8A0 / 0xC8A1). This crate finds them with
//! `nusb`, claims the vendor interface and moves command/response packets
//! over its bulk endpoints. [`UsbProbe`] implements the transport traits of
//! `riotee-core`, so it can drive the MSP430 and the vendor commands.
//!
//! # Example
//!
//! ```no_run
//! use riotee_core::probe::Probe;
//! use riotee_usb::UsbProbe;
//!
//! let mut usb = UsbProbe::open()?;
//! let variant = usb.variant();
//! let mut probe = Probe::new(&mut usb, variant);
//! println!("{} firmware {}", variant, probe.firmware_version()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{parse_options, UsbConfig, UsbProbe, UsbProbeInfo};
pub use error::{Result, UsbError};
