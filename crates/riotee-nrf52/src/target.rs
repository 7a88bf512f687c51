//! nRF52 target

use riotee_core::error::{Error as CoreError, Result as CoreResult};
use riotee_core::image::HexImage;
use riotee_core::program::{ProgramStats, ProgressFraction};
use riotee_core::target::Target;

use crate::error::{Nrf52Error, Result};
use crate::session::{DebugSession, Nrf52Config, ProbeRsSession};

/// An attached nRF52
pub struct Nrf52<S: DebugSession = ProbeRsSession> {
    session: S,
}

impl Nrf52<ProbeRsSession> {
    /// Attach to the nRF52 behind the probe matching `config`
    pub fn open(config: &Nrf52Config) -> Result<Self> {
        Ok(Self::from_session(ProbeRsSession::open(config)?))
    }
}

impl<S: DebugSession> Nrf52<S> {
    /// Wrap an already attached debug session
    pub fn from_session(session: S) -> Self {
        Self { session }
    }

    /// The underlying debug session
    pub fn session(&self) -> &S {
        &self.session
    }
}

/// Log the probe-rs detail and reduce it to the core error kind
fn to_core(op: &str, e: Nrf52Error) -> CoreError {
    log::error!("nRF52 {} failed: {}", op, e);
    match e {
        Nrf52Error::ProbeNotFound | Nrf52Error::MultipleProbesFound(_) => CoreError::Unsupported,
        _ => CoreError::Transport,
    }
}

impl<S: DebugSession> Target for Nrf52<S> {
    fn halt(&mut self) -> CoreResult<()> {
        self.session.halt().map_err(|e| to_core("halt", e))
    }

    fn reset(&mut self) -> CoreResult<()> {
        self.session.reset().map_err(|e| to_core("reset", e))
    }

    fn resume(&mut self) -> CoreResult<()> {
        self.session.run().map_err(|e| to_core("resume", e))
    }

    fn program(
        &mut self,
        image: &HexImage,
        verify: bool,
        progress: &mut dyn FnMut(ProgressFraction),
    ) -> CoreResult<ProgramStats> {
        log::info!(
            "Programming {} bytes in {} segment(s){}",
            image.len(),
            image.segment_count(),
            if verify { ", verifying" } else { "" }
        );

        let pages = self
            .session
            .download(image, verify, progress)
            .map_err(|e| to_core("program", e))?;

        // The target stays halted after a failed download; only a complete
        // image gets to run
        self.session.reset().map_err(|e| to_core("reset", e))?;

        Ok(ProgramStats {
            segments: image.segment_count(),
            packets_written: pages,
            packets_verified: if verify { pages } else { 0 },
            bytes_written: image.len(),
        })
    }
}
