//! Error types for the nRF52 target

use probe_rs::flashing::FlashError;
use probe_rs::probe::DebugProbeError;
use thiserror::Error;

/// nRF52 debug session errors
#[derive(Debug, Error)]
pub enum Nrf52Error {
    /// No matching probe is connected
    #[error("No Riotee probe found (VID:1209, PID:C8A0/C8A1)")]
    ProbeNotFound,

    /// More than one probe matches and no serial number was given
    #[error("Multiple Riotee probes found ({0}), specify serial=<serial>")]
    MultipleProbesFound(usize),

    /// Opening or configuring the CMSIS-DAP probe failed
    #[error("Probe error: {0}")]
    Probe(#[from] DebugProbeError),

    /// Attaching to or controlling the core failed
    #[error("Debug session error: {0}")]
    Session(#[from] probe_rs::Error),

    /// Erasing, programming or verifying flash failed
    #[error("Flashing failed: {0}")]
    Flash(#[from] FlashError),

    /// The flashing thread did not finish
    #[error("Flash worker panicked")]
    WorkerPanicked,
}

/// Result type for nRF52 operations
pub type Result<T> = std::result::Result<T, Nrf52Error>;
