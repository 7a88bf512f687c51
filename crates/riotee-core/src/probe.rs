//! Riotee probe vendor commands
//!
//! Two hardware variants speak the same vendor command set. The Riotee Probe
//! has user GPIOs; the Riotee Board has a current-measurement bypass switch
//! instead. Each operation is gated on [`ProbeFeatures`] before anything is
//! sent, so an unsupported call never reaches the wire.

use alloc::string::String;
use bitflags::bitflags;
use core::fmt;

use crate::error::{Error, Result};
use crate::protocol::{
    Request, BYPASS_OFF, BYPASS_ON, IOSET_IN, IOSET_OUT_HIGH, IOSET_OUT_LOW, RIOTEE_BOARD_PRODUCT,
    RIOTEE_PROBE_PRODUCT, TARGET_POWER_OFF, TARGET_POWER_ON,
};
use crate::transport::CommandTransport;

bitflags! {
    /// Capabilities of a probe variant
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProbeFeatures: u8 {
        /// User GPIO pins
        const GPIO = 1 << 0;
        /// Current-measurement bypass switch
        const BYPASS = 1 << 1;
        /// Switchable target supply
        const POWER = 1 << 2;
        /// Spy-Bi-Wire to the MSP430
        const SBW = 1 << 3;
        /// SWD to the nRF52
        const SWD = 1 << 4;
    }
}

/// Probe hardware variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVariant {
    /// Riotee Board (probe integrated on the development board)
    Board,
    /// Standalone Riotee Probe
    Probe,
}

impl ProbeVariant {
    /// Identify the variant from its USB product id
    pub fn from_product_id(pid: u16) -> Option<Self> {
        match pid {
            RIOTEE_BOARD_PRODUCT => Some(Self::Board),
            RIOTEE_PROBE_PRODUCT => Some(Self::Probe),
            _ => None,
        }
    }

    /// USB product id of the variant
    pub fn product_id(self) -> u16 {
        match self {
            Self::Board => RIOTEE_BOARD_PRODUCT,
            Self::Probe => RIOTEE_PROBE_PRODUCT,
        }
    }

    /// Human readable product name, as reported in the USB descriptor
    pub fn name(self) -> &'static str {
        match self {
            Self::Board => "Riotee Board",
            Self::Probe => "Riotee Probe",
        }
    }

    /// Capabilities of the variant
    pub fn features(self) -> ProbeFeatures {
        let common = ProbeFeatures::POWER | ProbeFeatures::SBW | ProbeFeatures::SWD;
        match self {
            Self::Board => common | ProbeFeatures::BYPASS,
            Self::Probe => common | ProbeFeatures::GPIO,
        }
    }
}

impl fmt::Display for ProbeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a probe GPIO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioDir {
    /// Floating input
    In,
    /// Output, initially driven low
    Out,
}

/// Vendor command front end for one probe
pub struct Probe<'a, T: CommandTransport + ?Sized> {
    transport: &'a mut T,
    variant: ProbeVariant,
}

impl<'a, T: CommandTransport + ?Sized> Probe<'a, T> {
    /// Wrap a transport talking to a probe of the given variant
    pub fn new(transport: &'a mut T, variant: ProbeVariant) -> Self {
        Self { transport, variant }
    }

    /// Hardware variant
    pub fn variant(&self) -> ProbeVariant {
        self.variant
    }

    /// Capabilities of this probe
    pub fn features(&self) -> ProbeFeatures {
        self.variant.features()
    }

    fn require(&self, feature: ProbeFeatures) -> Result<()> {
        if self.features().contains(feature) {
            Ok(())
        } else {
            log::debug!("{} lacks {:?}", self.variant, feature);
            Err(Error::Unsupported)
        }
    }

    /// Firmware version string of the probe
    pub fn firmware_version(&mut self) -> Result<String> {
        let raw = self.transport.vendor(Request::Version, &[])?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        core::str::from_utf8(&raw[..end])
            .map(String::from)
            .map_err(|_| Error::InvalidResponse)
    }

    /// Switch the target supply
    pub fn target_power(&mut self, on: bool) -> Result<()> {
        self.require(ProbeFeatures::POWER)?;
        let state = if on { TARGET_POWER_ON } else { TARGET_POWER_OFF };
        log::info!("Target power {}", if on { "on" } else { "off" });
        self.transport.send_write(Request::Power, &[state])
    }

    /// Drive a GPIO high or low
    pub fn gpio_set(&mut self, pin: u8, high: bool) -> Result<()> {
        self.require(ProbeFeatures::GPIO)?;
        let state = if high { IOSET_OUT_HIGH } else { IOSET_OUT_LOW };
        self.transport.send_write(Request::GpioSet, &[pin, state])
    }

    /// Sample a GPIO
    pub fn gpio_get(&mut self, pin: u8) -> Result<bool> {
        self.require(ProbeFeatures::GPIO)?;
        let rsp = self.transport.send_read(Request::GpioGet, &[pin])?;
        rsp.first().map(|&v| v != 0).ok_or(Error::ShortResponse {
            expected: 1,
            actual: 0,
        })
    }

    /// Configure a GPIO as input or (low) output
    pub fn gpio_dir(&mut self, pin: u8, dir: GpioDir) -> Result<()> {
        self.require(ProbeFeatures::GPIO)?;
        let state = match dir {
            GpioDir::In => IOSET_IN,
            GpioDir::Out => IOSET_OUT_LOW,
        };
        self.transport.send_write(Request::GpioSet, &[pin, state])
    }

    /// Enable or disable the current-measurement bypass
    pub fn bypass(&mut self, on: bool) -> Result<()> {
        self.require(ProbeFeatures::BYPASS)?;
        let state = if on { BYPASS_ON } else { BYPASS_OFF };
        self.transport.send_write(Request::Bypass, &[state])
    }
}
