//! probe-rs debug session on the Riotee probe
//!
//! The probe's standard CMSIS-DAP commands give SWD access to the nRF52.
//! probe-rs owns everything below [`DebugSession`]: SW-DP bring-up, the
//! nRF reset sequences and the NVMC flash algorithm.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use probe_rs::flashing::{DownloadOptions, FlashProgress, ProgressEvent};
use probe_rs::probe::list::Lister;
use probe_rs::probe::WireProtocol;
use probe_rs::{Permissions, Session};
use riotee_core::image::HexImage;
use riotee_core::probe::ProbeVariant;
use riotee_core::program::ProgressFraction;
use riotee_core::protocol::RIOTEE_USB_VENDOR;

use crate::error::{Nrf52Error, Result};

/// probe-rs target name of the nRF52 on the Riotee module
pub const DEFAULT_CHIP: &str = "nRF52840_xxAA";

/// How long to wait for the core to halt
const HALT_TIMEOUT: Duration = Duration::from_millis(500);

/// Core control and flashing, as used by [`Nrf52`](crate::Nrf52)
pub trait DebugSession {
    /// Stop the core
    fn halt(&mut self) -> Result<()>;

    /// Reset the core and let it run
    fn reset(&mut self) -> Result<()>;

    /// Let a halted core run
    fn run(&mut self) -> Result<()>;

    /// Erase and program the flash pages covered by `image`
    ///
    /// Returns the number of pages programmed.
    fn download(
        &mut self,
        image: &HexImage,
        verify: bool,
        progress: &mut dyn FnMut(ProgressFraction),
    ) -> Result<usize>;
}

/// Configuration options for attaching to the nRF52
#[derive(Debug, Clone)]
pub struct Nrf52Config {
    /// USB serial number (substring) to match; None = the only probe present
    pub serial: Option<String>,
    /// SWD clock in kHz; None keeps the probe-rs default
    pub speed_khz: Option<u32>,
    /// probe-rs target name
    pub chip: String,
}

impl Default for Nrf52Config {
    fn default() -> Self {
        Self {
            serial: None,
            speed_khz: None,
            chip: DEFAULT_CHIP.to_string(),
        }
    }
}

/// Riotee variant behind a USB vendor/product id pair, if any
pub fn riotee_variant(vendor_id: u16, product_id: u16) -> Option<ProbeVariant> {
    if vendor_id != RIOTEE_USB_VENDOR {
        return None;
    }
    ProbeVariant::from_product_id(product_id)
}

fn serial_matches(serial: Option<&str>, filter: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(filter) => serial.is_some_and(|s| s.contains(filter)),
    }
}

/// A probe-rs session attached to the nRF52
pub struct ProbeRsSession {
    session: Session,
    variant: ProbeVariant,
}

impl ProbeRsSession {
    /// Find the probe matching `config` and attach to its nRF52
    pub fn open(config: &Nrf52Config) -> Result<Self> {
        let lister = Lister::new();
        let candidates: Vec<_> = lister
            .list_all()
            .into_iter()
            .filter_map(|info| {
                let variant = riotee_variant(info.vendor_id, info.product_id)?;
                serial_matches(info.serial_number.as_deref(), config.serial.as_deref())
                    .then_some((info, variant))
            })
            .collect();

        if candidates.is_empty() {
            return Err(Nrf52Error::ProbeNotFound);
        }
        if candidates.len() > 1 && config.serial.is_none() {
            return Err(Nrf52Error::MultipleProbesFound(candidates.len()));
        }

        let (info, variant) = &candidates[0];
        log::info!("Opening {} ({}) for SWD", variant, info.identifier);

        let mut probe = info.open()?;
        probe.select_protocol(WireProtocol::Swd)?;
        if let Some(khz) = config.speed_khz {
            let actual = probe.set_speed(khz)?;
            log::debug!("SWD clock {} kHz (requested {} kHz)", actual, khz);
        }

        let session = probe.attach(config.chip.as_str(), Permissions::default())?;
        log::debug!("Attached to {}", config.chip);

        Ok(Self {
            session,
            variant: *variant,
        })
    }

    /// Hardware variant of the probe
    pub fn variant(&self) -> ProbeVariant {
        self.variant
    }
}

impl DebugSession for ProbeRsSession {
    fn halt(&mut self) -> Result<()> {
        self.session.core(0)?.halt(HALT_TIMEOUT)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.session.core(0)?.reset()?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.session.core(0)?.run()?;
        Ok(())
    }

    fn download(
        &mut self,
        image: &HexImage,
        verify: bool,
        progress: &mut dyn FnMut(ProgressFraction),
    ) -> Result<usize> {
        let mut loader = self.session.target().flash_loader();
        for segment in image.segments() {
            loader.add_data(segment.start() as u64, segment.data())?;
        }

        // probe-rs reports progress from inside `commit`; the events are
        // forwarded to this thread so `progress` can stay a plain borrow
        let (tx, rx) = mpsc::channel();
        let session = &mut self.session;
        let mut tracker = FlashTracker::default();

        thread::scope(|s| {
            let worker = s.spawn(move || {
                let mut options = DownloadOptions::default();
                options.verify = verify;
                options.progress = Some(FlashProgress::new(move |event| {
                    let _ = tx.send(event);
                }));
                loader.commit(session, options)
            });

            for event in rx {
                match event {
                    ProgressEvent::StartedProgramming { length } => tracker.started(length as u64),
                    ProgressEvent::PageProgrammed { size, .. } => {
                        if let Some(p) = tracker.programmed(size as u64) {
                            progress(p);
                        }
                    }
                    _ => {}
                }
            }

            worker.join().map_err(|_| Nrf52Error::WorkerPanicked)
        })??;

        progress(ProgressFraction::COMPLETE);
        Ok(tracker.pages)
    }
}

/// Turns probe-rs page events into a [`ProgressFraction`]
#[derive(Debug, Default)]
struct FlashTracker {
    total: u64,
    done: u64,
    pages: usize,
}

impl FlashTracker {
    fn started(&mut self, total: u64) {
        log::debug!("Programming {} bytes", total);
        self.total = total;
        self.done = 0;
    }

    fn programmed(&mut self, size: u64) -> Option<ProgressFraction> {
        self.pages += 1;
        if self.total == 0 {
            return None;
        }
        self.done = (self.done + size).min(self.total);
        Some(ProgressFraction::new(self.done as usize, self.total as usize))
    }
}
