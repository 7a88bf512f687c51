//! Bounded-packet word programming
//!
//! [`program`] writes a [`HexImage`] to a word-addressed target through a
//! [`CommandTransport`]:
//!
//! ```text
//! Idle ──halt──► Halted ──► { Writing ──► Verifying }* ──resume──► Resumed ──► Idle
//!                               │              │
//!                               └──── error ───┴──► Faulted (target left halted)
//! ```
//!
//! The packet list is materialised before the target is halted, so the total
//! is known for progress reporting and any image problem is reported without
//! touching the target.

use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, Result};
use crate::frame::{self, MAX_FRAME_SIZE};
use crate::image::HexImage;
use crate::packet::{packetize, Packet};
use crate::protocol::Request;
use crate::transport::CommandTransport;

/// Fraction of a programming run that has completed, in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ProgressFraction(f64);

impl ProgressFraction {
    /// Run completed
    pub const COMPLETE: Self = Self(1.0);

    /// `done` out of `total` steps; an empty run counts as complete
    pub fn new(done: usize, total: usize) -> Self {
        if total == 0 || done >= total {
            return Self::COMPLETE;
        }
        Self(done as f64 / total as f64)
    }

    /// Value in `[0, 1]`
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Value in `[0, 100]`
    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl fmt::Display for ProgressFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.percent())
    }
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// Nothing issued yet, or run finished
    Idle,
    /// Target CPU halted
    Halted,
    /// Write frame in flight
    Writing,
    /// Read-back of the last packet in flight
    Verifying,
    /// Target CPU released
    Resumed,
    /// Run aborted; the target is left halted
    Faulted,
}

/// Options for one programming run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramOptions {
    /// Byte ceiling of one transport command, request id included
    pub max_frame_size: usize,
    /// Read back and compare each packet after writing it
    pub verify: bool,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            verify: true,
        }
    }
}

/// Statistics of a completed programming run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramStats {
    /// Number of image segments programmed
    pub segments: usize,
    /// Number of packets (or blocks) written
    pub packets_written: usize,
    /// Number of packets (or blocks) read back and compared
    pub packets_verified: usize,
    /// Total bytes written
    pub bytes_written: usize,
}

/// Tracks and logs orchestrator state transitions
struct Run {
    state: ProgramState,
}

impl Run {
    fn enter(&mut self, next: ProgramState) {
        if next != self.state {
            log::debug!("Program state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Record a failure and hand the error back to the caller
    fn fault(&mut self, err: Error) -> Error {
        log::debug!("Program state {:?} -> Faulted: {}", self.state, err);
        self.state = ProgramState::Faulted;
        err
    }
}

/// Cut every segment of `image` into packets for a `max_frame_size` transport
///
/// All segments are checked for word alignment before anything is returned.
pub fn packets_for(image: &HexImage, max_frame_size: usize) -> Result<Vec<Packet>> {
    let max_words = frame::max_words(max_frame_size)?;
    let mut packets = Vec::new();
    for segment in image.segments() {
        packets.extend(packetize(segment, max_words)?);
    }
    Ok(packets)
}

/// Program `image` through `transport`
///
/// Halts the target, writes every packet (reading it back first if
/// `options.verify` is set), reports progress after each packet and resumes
/// the target once all packets succeeded.
///
/// Every error aborts the run. On a verification mismatch the error carries
/// the base address of the offending packet and no further packet is sent.
/// The target is not resumed after a failure; whether to try is up to the
/// caller.
pub fn program<T, P>(
    transport: &mut T,
    image: &HexImage,
    options: ProgramOptions,
    mut progress: P,
) -> Result<ProgramStats>
where
    T: CommandTransport + ?Sized,
    P: FnMut(ProgressFraction),
{
    let packets = packets_for(image, options.max_frame_size)?;
    let total = packets.len();
    log::info!(
        "Programming {} bytes in {} segment(s), {} packet(s){}",
        image.len(),
        image.segment_count(),
        total,
        if options.verify { ", verifying" } else { "" }
    );

    let mut run = Run {
        state: ProgramState::Idle,
    };
    let mut stats = ProgramStats {
        segments: image.segment_count(),
        ..Default::default()
    };

    transport.halt().map_err(|e| run.fault(e))?;
    run.enter(ProgramState::Halted);

    for (i, packet) in packets.iter().enumerate() {
        run.enter(ProgramState::Writing);
        write_packet(transport, packet, options.max_frame_size).map_err(|e| run.fault(e))?;
        stats.packets_written += 1;
        stats.bytes_written += 2 * packet.len();

        if options.verify {
            run.enter(ProgramState::Verifying);
            verify_packet(transport, packet).map_err(|e| run.fault(e))?;
            stats.packets_verified += 1;
        }

        progress(ProgressFraction::new(i + 1, total));
    }

    transport.resume().map_err(|e| run.fault(e))?;
    run.enter(ProgramState::Resumed);
    run.enter(ProgramState::Idle);

    log::info!(
        "Programmed {} bytes ({} packets)",
        stats.bytes_written,
        stats.packets_written
    );
    Ok(stats)
}

fn write_packet<T: CommandTransport + ?Sized>(
    transport: &mut T,
    packet: &Packet,
    max_frame_size: usize,
) -> Result<()> {
    let frame = frame::encode_write(packet, max_frame_size)?;
    log::trace!(
        "Write {} words at 0x{:08X}",
        packet.len(),
        packet.address()
    );
    transport.send_write(Request::SbwWrite, &frame)
}

fn verify_packet<T: CommandTransport + ?Sized>(transport: &mut T, packet: &Packet) -> Result<()> {
    // Packets never exceed MAX_PACKET_WORDS, so the count fits the byte field
    let request = frame::encode_read(packet.address(), packet.len() as u8);
    let raw = transport.send_read(Request::SbwRead, &request)?;
    let words = frame::decode_read(&raw, packet.len())?;

    if words.as_slice() != packet.words() {
        log::error!("Verification failed at 0x{:08X}", packet.address());
        return Err(Error::VerifyFailed {
            addr: packet.address(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Halt,
        Resume,
        Write(u32, usize),
        Read(u32, usize),
    }

    /// Word-addressed memory behind the vendor command set
    #[derive(Default)]
    struct MockTarget {
        memory: BTreeMap<u32, u16>,
        calls: Vec<Call>,
        /// Flip a bit in read-backs of the packet at this address
        tamper: Option<u32>,
        /// Fail the n-th write with a transport error
        fail_write: Option<usize>,
        /// Fail this vendor request with a transport error
        fail: Option<Request>,
    }

    impl CommandTransport for MockTarget {
        fn vendor(&mut self, request: Request, payload: &[u8]) -> Result<Vec<u8>> {
            if self.fail == Some(request) {
                return Err(Error::Transport);
            }
            match request {
                Request::SbwHalt => self.calls.push(Call::Halt),
                Request::SbwResume => self.calls.push(Call::Resume),
                Request::SbwWrite => {
                    let writes = self
                        .calls
                        .iter()
                        .filter(|c| matches!(c, Call::Write(..)))
                        .count();
                    if self.fail_write == Some(writes) {
                        return Err(Error::Transport);
                    }
                    let packet = frame::decode_write(payload)?;
                    self.calls.push(Call::Write(packet.address(), packet.len()));
                    for (addr, word) in packet.iter() {
                        self.memory.insert(addr, word);
                    }
                }
                Request::SbwRead => {
                    let addr =
                        u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                    let n = payload[4] as usize;
                    self.calls.push(Call::Read(addr, n));
                    let mut out = Vec::new();
                    for i in 0..n as u32 {
                        let mut w = self.memory.get(&(addr + 2 * i)).copied().unwrap_or(0xFFFF);
                        if self.tamper == Some(addr) && i == 0 {
                            w ^= 1;
                        }
                        out.extend_from_slice(&w.to_le_bytes());
                    }
                    return Ok(out);
                }
                _ => return Err(Error::Unsupported),
            }
            Ok(Vec::new())
        }
    }

    fn image(words: usize) -> HexImage {
        let data: Vec<u8> = (0..2 * words).map(|i| i as u8).collect();
        HexImage::from_blocks(vec![(0x4400, data)]).unwrap()
    }

    #[test]
    fn test_program_writes_everything() {
        let img = image(100);
        let mut target = MockTarget::default();
        let stats = program(&mut target, &img, ProgramOptions::default(), |_| {}).unwrap();

        assert_eq!(stats.packets_written, 4); // 29 + 29 + 29 + 13
        assert_eq!(stats.packets_verified, 4);
        assert_eq!(stats.bytes_written, 200);
        for seg in img.segments() {
            for (addr, word) in seg.words() {
                assert_eq!(target.memory.get(&addr), Some(&word));
            }
        }
    }

    #[test]
    fn test_halt_first_resume_last() {
        let mut target = MockTarget::default();
        program(&mut target, &image(40), ProgramOptions::default(), |_| {}).unwrap();

        assert_eq!(target.calls.first(), Some(&Call::Halt));
        assert_eq!(target.calls.last(), Some(&Call::Resume));
        assert_eq!(
            &target.calls[1..5],
            &[
                Call::Write(0x4400, 29),
                Call::Read(0x4400, 29),
                Call::Write(0x4400 + 58, 11),
                Call::Read(0x4400 + 58, 11),
            ]
        );
    }

    #[test]
    fn test_progress_monotonic_to_one() {
        let mut target = MockTarget::default();
        let mut seen = Vec::new();
        program(&mut target, &image(200), ProgramOptions::default(), |p| {
            seen.push(p.as_f64())
        })
        .unwrap();

        assert_eq!(seen.len(), 7);
        assert!(seen[0] > 0.0);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn test_verify_fault_precision() {
        let img = image(100);
        let mut target = MockTarget {
            tamper: Some(0x4400 + 2 * 29),
            ..Default::default()
        };
        let mut reported = 0;
        let err = program(&mut target, &img, ProgramOptions::default(), |_| reported += 1)
            .unwrap_err();

        assert_eq!(err, Error::VerifyFailed { addr: 0x4400 + 58 });
        assert_eq!(reported, 1);
        // Nothing after the faulty packet, and no resume
        assert_eq!(target.calls.last(), Some(&Call::Read(0x4400 + 58, 29)));
        assert!(!target.calls.contains(&Call::Resume));
        assert_eq!(
            target
                .calls
                .iter()
                .filter(|c| matches!(c, Call::Write(..)))
                .count(),
            2
        );
    }

    #[test]
    fn test_verify_disabled() {
        let mut target = MockTarget {
            tamper: Some(0x4400),
            ..Default::default()
        };
        let options = ProgramOptions {
            verify: false,
            ..Default::default()
        };
        let stats = program(&mut target, &image(30), options, |_| {}).unwrap();
        assert_eq!(stats.packets_verified, 0);
        assert!(!target.calls.iter().any(|c| matches!(c, Call::Read(..))));
    }

    #[test]
    fn test_transport_error_is_fatal() {
        let mut target = MockTarget {
            fail_write: Some(1),
            ..Default::default()
        };
        let err = program(&mut target, &image(100), ProgramOptions::default(), |_| {})
            .unwrap_err();
        assert_eq!(err, Error::Transport);
        assert!(!target.calls.contains(&Call::Resume));
    }

    #[test]
    fn test_halt_error_is_fatal() {
        let mut target = MockTarget {
            fail: Some(Request::SbwHalt),
            ..Default::default()
        };
        let mut reported = 0;
        let err = program(&mut target, &image(100), ProgramOptions::default(), |_| {
            reported += 1
        })
        .unwrap_err();
        assert_eq!(err, Error::Transport);
        assert!(target.calls.is_empty());
        assert_eq!(reported, 0);
    }

    #[test]
    fn test_read_error_is_fatal() {
        let mut target = MockTarget {
            fail: Some(Request::SbwRead),
            ..Default::default()
        };
        let err = program(&mut target, &image(100), ProgramOptions::default(), |_| {})
            .unwrap_err();
        assert_eq!(err, Error::Transport);
        // Stops after the first write, never resumes
        assert_eq!(target.calls, vec![Call::Halt, Call::Write(0x4400, 29)]);
    }

    #[test]
    fn test_resume_error_is_fatal() {
        let mut target = MockTarget {
            fail: Some(Request::SbwResume),
            ..Default::default()
        };
        let mut last = 0.0;
        let err = program(&mut target, &image(100), ProgramOptions::default(), |p| {
            last = p.as_f64()
        })
        .unwrap_err();
        assert_eq!(err, Error::Transport);
        // Every packet went out before the resume failed
        assert_eq!(last, 1.0);
        assert_eq!(target.memory.len(), 100);
    }

    #[test]
    fn test_odd_segment_rejected_before_halt() {
        let img = HexImage::from_blocks(vec![(0x4400, vec![1, 2, 3])]).unwrap();
        let mut target = MockTarget::default();
        let err = program(&mut target, &img, ProgramOptions::default(), |_| {}).unwrap_err();
        assert!(matches!(err, Error::MalformedImage(_)));
        assert!(target.calls.is_empty());
    }

    #[test]
    fn test_smaller_frames() {
        let mut target = MockTarget::default();
        let options = ProgramOptions {
            max_frame_size: 16,
            verify: true,
        };
        let stats = program(&mut target, &image(10), options, |_| {}).unwrap();
        // (16 - 6) / 2 = 5 words per packet
        assert_eq!(stats.packets_written, 2);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(ProgressFraction::new(0, 0), ProgressFraction::COMPLETE);
        assert_eq!(ProgressFraction::new(1, 4).as_f64(), 0.25);
        assert_eq!(ProgressFraction::new(3, 3).percent(), 100.0);
    }
}
