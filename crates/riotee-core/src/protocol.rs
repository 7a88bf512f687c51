//! CMSIS-DAP and Riotee vendor protocol constants
//!
//! The probe is a CMSIS-DAP v2 device. Standard commands (SWD access to the
//! nRF52) are left to probe-rs; the vendor range (0x80..) carries power,
//! GPIO and the Spy-Bi-Wire (SBW) commands for the MSP430.

// Allow unused constants - these are protocol definitions kept for reference
#![allow(dead_code)]

/// USB vendor id shared by all Riotee probes (pid.codes)
pub const RIOTEE_USB_VENDOR: u16 = 0x1209;
/// Riotee Board USB product id
pub const RIOTEE_BOARD_PRODUCT: u16 = 0xC8A0;
/// Riotee Probe USB product id
pub const RIOTEE_PROBE_PRODUCT: u16 = 0xC8A1;

/// Size of one CMSIS-DAP command/response packet
pub const DAP_PACKET_SIZE: usize = 64;

/// Command completed
pub const DAP_OK: u8 = 0x00;
/// Command failed
pub const DAP_ERROR: u8 = 0xFF;
/// Echoed in place of the request id for unknown commands
pub const ID_DAP_INVALID: u8 = 0xFF;

/// First vendor command id
pub const ID_DAP_VENDOR0: u8 = 0x80;

/// Riotee vendor requests
///
/// The numeric values are the CMSIS-DAP command ids understood by the probe
/// firmware and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Request {
    /// Firmware version string
    Version = 0x80,
    /// Target power switch
    Power = 0x81,
    /// Attach the SBW interface (also powers the level translators)
    SbwConnect = 0x82,
    /// Detach the SBW interface
    SbwDisconnect = 0x83,
    /// Reset the MSP430
    SbwReset = 0x84,
    /// Halt the MSP430 CPU
    SbwHalt = 0x85,
    /// Release the MSP430 CPU
    SbwResume = 0x86,
    /// Read words from MSP430 memory
    SbwRead = 0x87,
    /// Write words to MSP430 memory
    SbwWrite = 0x88,
    /// Drive or float a probe GPIO
    GpioSet = 0x89,
    /// Sample a probe GPIO
    GpioGet = 0x8A,
    /// Current-measurement bypass switch (board only)
    Bypass = 0x8B,
}

impl Request {
    /// All vendor requests, in id order
    pub const ALL: [Request; 12] = [
        Request::Version,
        Request::Power,
        Request::SbwConnect,
        Request::SbwDisconnect,
        Request::SbwReset,
        Request::SbwHalt,
        Request::SbwResume,
        Request::SbwRead,
        Request::SbwWrite,
        Request::GpioSet,
        Request::GpioGet,
        Request::Bypass,
    ];

    /// Command id on the wire
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Look up a request by its command id
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.id() == id)
    }
}

impl core::fmt::Display for Request {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Request::Version => "VERSION",
            Request::Power => "POWER",
            Request::SbwConnect => "SBW_CONNECT",
            Request::SbwDisconnect => "SBW_DISCONNECT",
            Request::SbwReset => "SBW_RESET",
            Request::SbwHalt => "SBW_HALT",
            Request::SbwResume => "SBW_RESUME",
            Request::SbwRead => "SBW_READ",
            Request::SbwWrite => "SBW_WRITE",
            Request::GpioSet => "GPIO_SET",
            Request::GpioGet => "GPIO_GET",
            Request::Bypass => "BYPASS",
        };
        write!(f, "{}", name)
    }
}

// Vendor payload values
/// `Power` payload: switch target supply off
pub const TARGET_POWER_OFF: u8 = 0;
/// `Power` payload: switch target supply on
pub const TARGET_POWER_ON: u8 = 1;
/// `Bypass` payload: bypass disabled
pub const BYPASS_OFF: u8 = 0;
/// `Bypass` payload: bypass enabled
pub const BYPASS_ON: u8 = 1;
/// `GpioSet` state: output driven low
pub const IOSET_OUT_LOW: u8 = 0;
/// `GpioSet` state: output driven high
pub const IOSET_OUT_HIGH: u8 = 1;
/// `GpioSet` state: input
pub const IOSET_IN: u8 = 2;
