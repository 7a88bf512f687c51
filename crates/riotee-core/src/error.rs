//! Error types for riotee-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Details about a firmware image that cannot be programmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFault {
    /// A hex record failed to parse or checksum
    BadRecord {
        /// Zero-based index of the offending record
        index: usize,
    },
    /// Two records define different values for the same byte
    Overlap {
        /// First conflicting address
        addr: u32,
    },
    /// A segment starts on an odd address and cannot be read as words
    MisalignedSegment {
        /// Segment start address
        start: u32,
    },
    /// A segment holds an odd number of bytes
    OddLengthSegment {
        /// Segment start address
        start: u32,
        /// Segment length in bytes
        len: u32,
    },
    /// Record data runs past the 32-bit address space
    AddressOverflow,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Image errors
    /// Firmware image is malformed or not programmable
    MalformedImage(ImageFault),

    // Packet/frame errors
    /// A packet was asked to hold more words than its capacity
    PacketOverflow {
        /// Capacity of the packet in words
        capacity: usize,
    },
    /// Encoded frame would not fit the transport
    FrameTooLarge {
        /// Length of the frame that was requested
        len: usize,
        /// Exclusive upper bound of the transport
        max: usize,
    },
    /// Requested frame size cannot carry a single word
    InvalidFrameSize(usize),
    /// Read response carried fewer bytes than requested
    ShortResponse {
        /// Bytes needed
        expected: usize,
        /// Bytes received
        actual: usize,
    },

    // Programming errors
    /// Read-back did not match the data written
    VerifyFailed {
        /// Base address of the first mismatching packet
        addr: u32,
    },

    // Probe errors
    /// Transport (USB) failure
    Transport,
    /// Probe answered a command with a non-OK status byte
    ProbeStatus(u8),
    /// Probe response is malformed or does not belong to the request
    InvalidResponse,
    /// Operation is not supported by this probe or target
    Unsupported,
}

impl fmt::Display for ImageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRecord { index } => write!(f, "invalid hex record #{}", index),
            Self::Overlap { addr } => {
                write!(f, "conflicting data for address 0x{:08X}", addr)
            }
            Self::MisalignedSegment { start } => {
                write!(f, "segment at 0x{:08X} is not word aligned", start)
            }
            Self::OddLengthSegment { start, len } => write!(
                f,
                "segment at 0x{:08X} has odd length ({} bytes)",
                start, len
            ),
            Self::AddressOverflow => write!(f, "record data exceeds 32-bit address space"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedImage(fault) => write!(f, "malformed firmware image: {}", fault),
            Self::PacketOverflow { capacity } => {
                write!(f, "packet overflow (capacity {} words)", capacity)
            }
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame of {} bytes exceeds transport limit of {}", len, max)
            }
            Self::InvalidFrameSize(size) => write!(f, "invalid frame size {}", size),
            Self::ShortResponse { expected, actual } => write!(
                f,
                "short response: expected {} bytes, got {}",
                expected, actual
            ),
            Self::VerifyFailed { addr } => write!(f, "verification failed at 0x{:08X}", addr),
            Self::Transport => write!(f, "transport error"),
            Self::ProbeStatus(code) => write!(f, "probe returned error code 0x{:02X}", code),
            Self::InvalidResponse => write!(f, "invalid response from probe"),
            Self::Unsupported => write!(f, "operation not supported"),
        }
    }
}

impl From<ImageFault> for Error {
    fn from(fault: ImageFault) -> Self {
        Self::MalformedImage(fault)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
