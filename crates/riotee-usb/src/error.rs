//! Error types for the USB transport

use thiserror::Error;

/// USB transport errors
#[derive(Debug, Error)]
pub enum UsbError {
    /// No matching probe is connected
    #[error("No Riotee probe found (VID:1209, PID:C8A0/C8A1)")]
    DeviceNotFound,

    /// More than one probe matches and no serial number was given
    #[error("Multiple Riotee probes found ({0}), specify serial=<serial>")]
    MultipleDevicesFound(usize),

    /// Enumerating USB devices failed
    #[error("Failed to list USB devices: {0}")]
    ListFailed(#[source] std::io::Error),

    /// Opening the device failed
    #[error("Failed to open probe: {0}")]
    OpenFailed(#[source] std::io::Error),

    /// Claiming the CMSIS-DAP interface failed
    #[error("Failed to claim interface {interface}: {source}")]
    ClaimFailed {
        interface: u8,
        #[source]
        source: std::io::Error,
    },

    /// A bulk transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(#[source] nusb::transfer::TransferError),

    /// The request does not fit one CMSIS-DAP packet
    #[error("Request of {len} bytes exceeds packet size {max}")]
    PacketTooLarge { len: usize, max: usize },

    /// Invalid probe option
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for USB operations
pub type Result<T> = std::result::Result<T, UsbError>;
