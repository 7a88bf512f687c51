//! Probe transport traits
//!
//! Two layers are exposed to the rest of the crate:
//!
//! - [`DapTransport`] moves one raw CMSIS-DAP command packet to the probe
//!   and returns the response packet. USB backends implement this.
//! - [`CommandTransport`] speaks the Riotee vendor command set on top of it
//!   (status byte handling, SBW write/read frames, halt/reset/resume).
//!
//! Both are single in-flight request/response channels; nothing is pipelined.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::protocol::{Request, DAP_OK, ID_DAP_INVALID};

/// Raw CMSIS-DAP packet exchange
pub trait DapTransport {
    /// Send one command packet and return the probe's response packet
    ///
    /// The response is returned as received, including the echoed command
    /// id in byte 0.
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>>;

    /// Maximum command packet size in bytes
    fn packet_size(&self) -> usize {
        crate::protocol::DAP_PACKET_SIZE
    }
}

/// Riotee vendor command channel
///
/// Only [`vendor`](Self::vendor) is required; the SBW helpers are provided on
/// top of it. Every error is fatal to the caller's operation: the protocol
/// has no retry, since flash writes are not idempotent.
pub trait CommandTransport {
    /// Issue a vendor request and return its response payload
    ///
    /// The echoed command id and the status byte are stripped; a non-OK
    /// status is reported as [`Error::ProbeStatus`].
    fn vendor(&mut self, request: Request, payload: &[u8]) -> Result<Vec<u8>>;

    /// Send a frame that expects no data back
    fn send_write(&mut self, request: Request, frame: &[u8]) -> Result<()> {
        self.vendor(request, frame).map(|_| ())
    }

    /// Send a frame and return the response data
    fn send_read(&mut self, request: Request, frame: &[u8]) -> Result<Vec<u8>> {
        self.vendor(request, frame)
    }

    /// Attach the SBW interface
    fn connect(&mut self) -> Result<()> {
        self.send_write(Request::SbwConnect, &[])
    }

    /// Detach the SBW interface
    fn disconnect(&mut self) -> Result<()> {
        self.send_write(Request::SbwDisconnect, &[])
    }

    /// Halt the SBW target CPU
    fn halt(&mut self) -> Result<()> {
        self.send_write(Request::SbwHalt, &[])
    }

    /// Reset the SBW target
    fn reset(&mut self) -> Result<()> {
        self.send_write(Request::SbwReset, &[])
    }

    /// Release the SBW target CPU
    fn resume(&mut self) -> Result<()> {
        self.send_write(Request::SbwResume, &[])
    }
}

/// A probe link usable for both vendor commands and raw CMSIS-DAP access
pub trait ProbeLink: DapTransport + CommandTransport {}

impl<T: DapTransport + CommandTransport + ?Sized> ProbeLink for T {}

/// Run a vendor request over a raw CMSIS-DAP transport
///
/// Request packet: `id | payload`. Response packet: `id | status | data`.
pub fn vendor_exchange<T: DapTransport + ?Sized>(
    transport: &mut T,
    request: Request,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut packet = Vec::with_capacity(1 + payload.len());
    packet.push(request.id());
    packet.extend_from_slice(payload);
    if packet.len() > transport.packet_size() {
        return Err(Error::FrameTooLarge {
            len: packet.len(),
            max: transport.packet_size(),
        });
    }

    log::trace!("Vendor {} ({} byte payload)", request, payload.len());
    let rsp = transport.exchange(&packet)?;

    match rsp.first() {
        Some(&id) if id == request.id() => {}
        Some(&ID_DAP_INVALID) => {
            log::error!("Probe does not implement vendor request {}", request);
            return Err(Error::Unsupported);
        }
        _ => {
            log::error!("Response to {} has wrong id: {:02X?}", request, rsp.first());
            return Err(Error::InvalidResponse);
        }
    }

    match rsp.get(1) {
        Some(&DAP_OK) => Ok(rsp[2..].to_vec()),
        Some(&status) => {
            log::debug!("Vendor {} returned status 0x{:02X}", request, status);
            Err(Error::ProbeStatus(status))
        }
        None => Err(Error::InvalidResponse),
    }
}
