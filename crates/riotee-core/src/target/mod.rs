//! Programmable targets
//!
//! The Riotee module carries two MCUs behind one probe: an MSP430 reached
//! through the probe's Spy-Bi-Wire vendor commands ([`Msp430`]) and an nRF52
//! reached over SWD, which the `riotee-nrf52` crate drives with probe-rs.
//! Both implement [`Target`].

mod msp430;

pub use msp430::Msp430;

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};
use crate::image::HexImage;
use crate::program::{ProgramStats, ProgressFraction};

/// Common capability set of a programmable target
pub trait Target {
    /// Stop the CPU
    fn halt(&mut self) -> Result<()>;

    /// Reset the target
    fn reset(&mut self) -> Result<()>;

    /// Let the CPU run
    fn resume(&mut self) -> Result<()>;

    /// Write `image` to the target's non-volatile memory
    ///
    /// `progress` is called after every transfer unit. On error the target
    /// is left halted.
    fn program(
        &mut self,
        image: &HexImage,
        verify: bool,
        progress: &mut dyn FnMut(ProgressFraction),
    ) -> Result<ProgramStats>;
}

/// Which of the two MCUs to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetKind {
    /// TI MSP430FR (Spy-Bi-Wire)
    Msp430,
    /// Nordic nRF52 (SWD)
    #[default]
    Nrf52,
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "msp430" => Ok(Self::Msp430),
            "nrf52" => Ok(Self::Nrf52),
            _ => Err(Error::Unsupported),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Msp430 => write!(f, "msp430"),
            Self::Nrf52 => write!(f, "nrf52"),
        }
    }
}
