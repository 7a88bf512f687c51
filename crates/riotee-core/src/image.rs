//! Sparse firmware images
//!
//! A [`HexImage`] holds the bytes defined by a firmware file as an ordered
//! list of disjoint, contiguous segments. Records are parsed with the `ihex`
//! crate (feature `std`); everything after parsing (merging records into
//! segments, byte lookup, word iteration) is `no_std`.

use alloc::vec::Vec;
use core::slice::ChunksExact;

use crate::error::{ImageFault, Result};

/// Owned storage for one segment
#[derive(Debug, Clone, PartialEq, Eq)]
struct SegmentData {
    start: u32,
    data: Vec<u8>,
}

impl SegmentData {
    fn end(&self) -> u64 {
        self.start as u64 + self.data.len() as u64
    }
}

/// A firmware image made of contiguous address segments
///
/// Segments are sorted by address, never empty and never touch each other
/// (touching records are merged when the image is built).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexImage {
    segments: Vec<SegmentData>,
    entry_point: Option<u32>,
}

impl HexImage {
    /// Build an image from `(address, bytes)` blocks in any order
    ///
    /// Overlapping blocks are accepted only if they agree on every shared
    /// byte; otherwise the first conflicting address is reported.
    pub fn from_blocks<I>(blocks: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, Vec<u8>)>,
    {
        let mut blocks: Vec<(u32, Vec<u8>)> = blocks
            .into_iter()
            .filter(|(_, data)| !data.is_empty())
            .collect();
        // Stable, so duplicate records keep file order
        blocks.sort_by_key(|(addr, _)| *addr);

        let mut segments: Vec<SegmentData> = Vec::new();
        for (addr, data) in blocks {
            // The exclusive end may be 2^32, so the last byte can sit at 0xFFFF_FFFF
            if addr as u64 + data.len() as u64 > 1 << 32 {
                return Err(ImageFault::AddressOverflow.into());
            }

            match segments.last_mut() {
                Some(seg) if seg.end() >= addr as u64 => {
                    let offset = (addr - seg.start) as usize;
                    let shared = (seg.data.len() - offset).min(data.len());
                    if let Some(i) = (0..shared).find(|&i| seg.data[offset + i] != data[i]) {
                        return Err(ImageFault::Overlap {
                            addr: addr + i as u32,
                        }
                        .into());
                    }
                    seg.data.extend_from_slice(&data[shared..]);
                }
                _ => segments.push(SegmentData { start: addr, data }),
            }
        }

        log::debug!(
            "Built image with {} segment(s), {} bytes",
            segments.len(),
            segments.iter().map(|s| s.data.len()).sum::<usize>()
        );

        Ok(Self {
            segments,
            entry_point: None,
        })
    }

    /// Parse an Intel-Hex document
    #[cfg(feature = "std")]
    pub fn from_hex_str(text: &str) -> Result<Self> {
        use ihex::Record;

        let mut base: u32 = 0;
        let mut entry_point = None;
        let mut blocks = Vec::new();

        for (index, record) in ihex::Reader::new(text).enumerate() {
            let record = record.map_err(|e| {
                log::error!("Hex record #{}: {}", index, e);
                ImageFault::BadRecord { index }
            })?;

            match record {
                Record::Data { offset, value } => {
                    let addr = base
                        .checked_add(offset as u32)
                        .ok_or(ImageFault::AddressOverflow)?;
                    blocks.push((addr, value));
                }
                Record::ExtendedSegmentAddress(segment) => base = (segment as u32) << 4,
                Record::ExtendedLinearAddress(upper) => base = (upper as u32) << 16,
                Record::StartSegmentAddress { cs, ip } => {
                    entry_point = Some(((cs as u32) << 4) + ip as u32)
                }
                Record::StartLinearAddress(addr) => entry_point = Some(addr),
                Record::EndOfFile => break,
            }
        }

        let mut image = Self::from_blocks(blocks)?;
        image.entry_point = entry_point;
        Ok(image)
    }

    /// Segments in ascending address order
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> + '_ {
        self.segments.iter().map(|s| Segment {
            start: s.start,
            data: &s.data,
        })
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total number of defined bytes
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }

    /// Whether the image defines no bytes at all
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Byte at `addr`, if defined
    pub fn get(&self, addr: u32) -> Option<u8> {
        // Last segment starting at or below addr
        let idx = self
            .segments
            .partition_point(|s| s.start <= addr)
            .checked_sub(1)?;
        self.segments[idx]
            .data
            .get((addr - self.segments[idx].start) as usize)
            .copied()
    }

    /// Entry point from a start-address record, if the file had one
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }
}

/// A contiguous run of defined bytes `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    start: u32,
    data: &'a [u8],
}

impl<'a> Segment<'a> {
    /// Create a segment view over `data` starting at `start`
    pub fn new(start: u32, data: &'a [u8]) -> Self {
        Self { start, data }
    }

    /// First address of the segment
    pub fn start(&self) -> u32 {
        self.start
    }

    /// One past the last address of the segment
    ///
    /// Wide enough for a segment that ends on the last 32-bit address.
    pub fn stop(&self) -> u64 {
        self.start as u64 + self.data.len() as u64
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the segment is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes of the segment
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Byte at `addr`, if inside the segment
    pub fn get(&self, addr: u32) -> Option<u8> {
        addr.checked_sub(self.start)
            .and_then(|off| self.data.get(off as usize))
            .copied()
    }

    /// Check that the segment can be consumed as 16-bit words
    ///
    /// Both the start address and the length must be even; the word view
    /// never drops a trailing byte silently.
    pub fn check_word_aligned(&self) -> Result<()> {
        if self.start % 2 != 0 {
            return Err(ImageFault::MisalignedSegment { start: self.start }.into());
        }
        if self.data.len() % 2 != 0 {
            return Err(ImageFault::OddLengthSegment {
                start: self.start,
                len: self.data.len() as u32,
            }
            .into());
        }
        Ok(())
    }

    /// Little-endian 16-bit words of the segment with their addresses
    ///
    /// The sequence is lazy and can be restarted by calling this again. Any
    /// trailing odd byte is not part of the sequence; use
    /// [`check_word_aligned`](Self::check_word_aligned) first.
    pub fn words(&self) -> Words<'a> {
        Words {
            addr: self.start,
            chunks: self.data.chunks_exact(2),
        }
    }

    /// Number of whole words in the segment
    pub fn word_count(&self) -> usize {
        self.data.len() / 2
    }
}

/// Iterator over `(address, word)` pairs of a segment
#[derive(Debug, Clone)]
pub struct Words<'a> {
    addr: u32,
    chunks: ChunksExact<'a, u8>,
}

impl Iterator for Words<'_> {
    type Item = (u32, u16);

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.chunks.next()?;
        let item = (self.addr, u16::from_le_bytes([pair[0], pair[1]]));
        self.addr = self.addr.wrapping_add(2);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Words<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use alloc::string::String;
    use alloc::vec;

    /// Format one Intel-Hex record with a valid checksum
    fn record(addr: u16, kind: u8, data: &[u8]) -> String {
        let mut bytes = vec![data.len() as u8, (addr >> 8) as u8, addr as u8, kind];
        bytes.extend_from_slice(data);
        let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        bytes.push(sum.wrapping_neg());

        let mut line = String::from(":");
        for b in bytes {
            line.push_str(&alloc::format!("{:02X}", b));
        }
        line.push('\n');
        line
    }

    #[test]
    fn test_merge_touching_blocks() {
        let image = HexImage::from_blocks(vec![
            (0x1004, vec![5, 6]),
            (0x1000, vec![1, 2, 3, 4]),
            (0x2000, vec![9, 9]),
        ])
        .unwrap();

        let segs: Vec<_> = image.segments().collect();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start(), 0x1000);
        assert_eq!(segs[0].stop(), 0x1006);
        assert_eq!(segs[0].data(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(segs[1].start(), 0x2000);
        assert_eq!(image.len(), 8);
    }

    #[test]
    fn test_top_of_address_space() {
        let image = HexImage::from_blocks(vec![(0xFFFF_FFFE, vec![1, 2])]).unwrap();
        let seg = image.segments().next().unwrap();
        assert_eq!(seg.stop(), 1 << 32);
        assert_eq!(image.get(0xFFFF_FFFF), Some(2));

        let err = HexImage::from_blocks(vec![(0xFFFF_FFFF, vec![1, 2])]).unwrap_err();
        assert_eq!(err, Error::MalformedImage(ImageFault::AddressOverflow));

        assert_eq!(Segment::new(0xFFFF_FFFF, &[7]).stop(), 0x1_0000_0000);
    }

    #[test]
    fn test_consistent_overlap_is_accepted() {
        let image =
            HexImage::from_blocks(vec![(0x10, vec![1, 2, 3, 4]), (0x12, vec![3, 4, 5])]).unwrap();
        assert_eq!(image.segment_count(), 1);
        assert_eq!(image.segments().next().unwrap().data(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_conflicting_overlap_is_rejected() {
        let err =
            HexImage::from_blocks(vec![(0x10, vec![1, 2, 3, 4]), (0x12, vec![3, 7])]).unwrap_err();
        assert_eq!(err, Error::MalformedImage(ImageFault::Overlap { addr: 0x13 }));
    }

    #[test]
    fn test_byte_lookup() {
        let image =
            HexImage::from_blocks(vec![(0x100, vec![0xAA, 0xBB]), (0x200, vec![0xCC])]).unwrap();
        assert_eq!(image.get(0x100), Some(0xAA));
        assert_eq!(image.get(0x101), Some(0xBB));
        assert_eq!(image.get(0x102), None);
        assert_eq!(image.get(0x0FF), None);
        assert_eq!(image.get(0x200), Some(0xCC));
    }

    #[test]
    fn test_words_little_endian() {
        let data = [0x34, 0x12, 0x78, 0x56];
        let seg = Segment::new(0x4400, &data);
        let words: Vec<_> = seg.words().collect();
        assert_eq!(words, vec![(0x4400, 0x1234), (0x4402, 0x5678)]);
        // Restartable
        assert_eq!(seg.words().count(), 2);
    }

    #[test]
    fn test_odd_segments_rejected() {
        let data = [1, 2, 3];
        let seg = Segment::new(0x1000, &data);
        assert_eq!(
            seg.check_word_aligned(),
            Err(Error::MalformedImage(ImageFault::OddLengthSegment {
                start: 0x1000,
                len: 3
            }))
        );
        // The word view itself never yields the trailing byte
        assert_eq!(seg.words().count(), 1);

        let seg = Segment::new(0x1001, &data[..2]);
        assert_eq!(
            seg.check_word_aligned(),
            Err(Error::MalformedImage(ImageFault::MisalignedSegment {
                start: 0x1001
            }))
        );
    }

    #[test]
    fn test_parse_hex() {
        let mut text = String::new();
        text.push_str(&record(0x0000, 0x04, &[0x00, 0x01]));
        text.push_str(&record(0x4400, 0x00, &[0x31, 0x40, 0x00, 0x24]));
        text.push_str(&record(0x4404, 0x00, &[0xB2, 0x40]));
        text.push_str(&record(0xFFFE, 0x00, &[0x00, 0x44]));
        text.push_str(&record(0x0000, 0x05, &[0x00, 0x01, 0x44, 0x00]));
        text.push_str(":00000001FF\n");

        let image = HexImage::from_hex_str(&text).unwrap();
        let segs: Vec<_> = image.segments().collect();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start(), 0x0001_4400);
        assert_eq!(segs[0].len(), 6);
        assert_eq!(segs[1].start(), 0x0001_FFFE);
        assert_eq!(image.entry_point(), Some(0x0001_4400));
    }

    #[test]
    fn test_parse_hex_bad_checksum() {
        let mut text = record(0x0000, 0x00, &[0x01, 0x02]);
        text.push_str(":0200020003040000\n");
        text.push_str(":00000001FF\n");

        let err = HexImage::from_hex_str(&text).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedImage(ImageFault::BadRecord { index: 1 })
        );
    }
}
