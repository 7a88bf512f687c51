//! MSP430 behind the probe's Spy-Bi-Wire vendor commands

use alloc::vec::Vec;

use super::Target;
use crate::error::{Error, Result};
use crate::frame::{self, MAX_FRAME_SIZE};
use crate::image::HexImage;
use crate::packet::Packet;
use crate::program::{self, ProgramOptions, ProgramStats, ProgressFraction};
use crate::protocol::Request;
use crate::transport::CommandTransport;

/// An attached MSP430
///
/// The SBW interface is connected for as long as this value lives and is
/// disconnected again when it is dropped.
pub struct Msp430<'a, T: CommandTransport + ?Sized> {
    transport: &'a mut T,
    max_frame_size: usize,
}

impl<'a, T: CommandTransport + ?Sized> Msp430<'a, T> {
    /// Attach to the MSP430 through `transport`
    pub fn open(transport: &'a mut T) -> Result<Self> {
        transport.connect()?;
        log::debug!("SBW connected");
        Ok(Self {
            transport,
            max_frame_size: MAX_FRAME_SIZE,
        })
    }

    /// Use a smaller command size than the default 64 bytes
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Result<Self> {
        frame::max_words(max_frame_size)?;
        self.max_frame_size = max_frame_size;
        Ok(self)
    }

    /// Write words at `addr` in a single frame
    pub fn write_words(&mut self, addr: u32, words: &[u16]) -> Result<()> {
        let mut packet = Packet::new(addr, words.len().max(1));
        for &w in words {
            packet.push(w)?;
        }
        let frame = frame::encode_write(&packet, self.max_frame_size)?;
        self.transport.send_write(Request::SbwWrite, &frame)
    }

    /// Read `n` words starting at `addr` in a single frame
    pub fn read_words(&mut self, addr: u32, n: usize) -> Result<Vec<u16>> {
        let max = frame::max_words(self.max_frame_size)?;
        if n > max {
            return Err(Error::FrameTooLarge {
                len: 2 * n,
                max: self.max_frame_size,
            });
        }
        let request = frame::encode_read(addr, n as u8);
        let raw = self.transport.send_read(Request::SbwRead, &request)?;
        frame::decode_read(&raw, n)
    }
}

impl<T: CommandTransport + ?Sized> Target for Msp430<'_, T> {
    fn halt(&mut self) -> Result<()> {
        self.transport.halt()
    }

    fn reset(&mut self) -> Result<()> {
        self.transport.reset()
    }

    fn resume(&mut self) -> Result<()> {
        self.transport.resume()
    }

    fn program(
        &mut self,
        image: &HexImage,
        verify: bool,
        progress: &mut dyn FnMut(ProgressFraction),
    ) -> Result<ProgramStats> {
        let options = ProgramOptions {
            max_frame_size: self.max_frame_size,
            verify,
        };
        program::program(&mut *self.transport, image, options, progress)
    }
}

impl<T: CommandTransport + ?Sized> Drop for Msp430<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.disconnect() {
            log::warn!("Failed to disconnect SBW: {}", e);
        }
    }
}
